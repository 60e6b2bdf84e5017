use anyhow::Context as _;
use reqwest::{StatusCode, blocking::Client};
use std::{
    collections::{BTreeMap, HashMap},
    io::Read,
    path::{Path, PathBuf},
    sync::Arc,
};
use url::Url;

/// Where a location string points to
#[derive(Debug, PartialEq, Eq)]
enum Location<'a> {
    /// A path on the local filesystem, relative to the fetcher root
    Path(PathBuf),
    /// A resource relative to one of the resource directories
    Classpath(&'a str),
    /// An HTTP(S) url
    Remote(Url),
}

impl<'a> Location<'a> {
    fn parse(location: &'a str, root: &Path) -> anyhow::Result<Self> {
        if let Some(resource) = location.strip_prefix("classpath:") {
            return Ok(Self::Classpath(resource.trim_start_matches('/')));
        }

        // Single letter schemes are windows drive letters
        match Url::parse(location) {
            Ok(url) if url.scheme().len() > 1 => match url.scheme() {
                "http" | "https" => Ok(Self::Remote(url)),
                "file" => url
                    .to_file_path()
                    .map(Self::Path)
                    .map_err(|()| anyhow::anyhow!("'{location}' is not a valid file url")),
                unsupported => {
                    anyhow::bail!("unsupported url scheme '{unsupported}' for '{location}'")
                }
            },
            _ => Ok(Self::Path(root.join(location))),
        }
    }
}

/// Whether the location refers to a remote resource
pub fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Retrieves the text of override files, missing files, matcher files and
/// filter scripts. Retrieved contents are cached, as the same location is
/// often requested by several modules.
#[derive(Clone)]
pub struct Fetcher {
    cache: Arc<parking_lot::RwLock<HashMap<u64, Option<Arc<String>>>>>,
    http_client: Option<Client>,
    root: PathBuf,
    resource_dirs: Vec<PathBuf>,
    checksums: Arc<BTreeMap<String, String>>,
}

impl Fetcher {
    pub fn maybe_offline(http_client: Option<Client>, root: impl Into<PathBuf>) -> Self {
        Self {
            cache: Default::default(),
            http_client,
            root: root.into(),
            resource_dirs: Vec::new(),
            checksums: Default::default(),
        }
    }

    pub fn online(root: impl Into<PathBuf>) -> Self {
        Self::maybe_offline(Some(Client::new()), root)
    }

    pub fn offline(root: impl Into<PathBuf>) -> Self {
        Self::maybe_offline(None, root)
    }

    /// Sets the directories `classpath:` locations are resolved against,
    /// relative paths are relative to the fetcher root
    pub fn with_resource_dirs(mut self, dirs: &[PathBuf]) -> Self {
        self.resource_dirs = dirs.iter().map(|dir| self.root.join(dir)).collect();
        self
    }

    /// Sets the SHA-256 checksums the contents of specific locations must
    /// match
    pub fn with_checksums(mut self, checksums: BTreeMap<String, String>) -> Self {
        self.checksums = Arc::new(checksums);
        self
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The filesystem path a location refers to, `None` for remote and
    /// `classpath:` locations
    pub fn local_path(&self, location: &str) -> anyhow::Result<Option<PathBuf>> {
        Ok(match Location::parse(location, &self.root)? {
            Location::Path(path) => Some(path),
            Location::Classpath(_) | Location::Remote(_) => None,
        })
    }

    /// Retrieves the contents of the location, or `None` if there is nothing
    /// at the location
    pub fn fetch(&self, location: &str) -> anyhow::Result<Option<Arc<String>>> {
        let hash = {
            use std::hash::Hasher;
            let mut hasher = twox_hash::XxHash64::default();
            hasher.write(location.as_bytes());
            hasher.finish()
        };

        if let Some(contents) = self.cache.read().get(&hash) {
            return Ok(contents.clone());
        }

        let contents = match Location::parse(location, &self.root)? {
            Location::Path(path) => read_optional(&path)?,
            Location::Classpath(resource) => self.retrieve_resource(resource)?,
            Location::Remote(url) => self.retrieve_remote(&url)?,
        };

        if let (Some(contents), Some(expected)) = (&contents, self.checksums.get(location)) {
            crate::validate_sha256(contents, expected)
                .with_context(|| format!("contents of '{location}' failed verification"))?;
        }

        let contents = contents.map(Arc::new);
        self.cache.write().insert(hash, contents.clone());

        Ok(contents)
    }

    fn retrieve_resource(&self, resource: &str) -> anyhow::Result<Option<String>> {
        for dir in &self.resource_dirs {
            if let Some(contents) = read_optional(&dir.join(resource))? {
                return Ok(Some(contents));
            }
        }

        log::debug!("classpath resource '{resource}' was not found in any resource directory");
        Ok(None)
    }

    fn retrieve_remote(&self, url: &Url) -> anyhow::Result<Option<String>> {
        let http_client = self
            .http_client
            .as_ref()
            .with_context(|| format!("unable to fetch '{url}' in offline mode"))?;

        let res = http_client
            .get(url.clone())
            .send()
            .with_context(|| format!("failed to send request to '{url}'"))?;

        if res.status() == StatusCode::NOT_FOUND {
            log::debug!("'{url}' does not exist");
            return Ok(None);
        }

        let mut res = res
            .error_for_status()
            .with_context(|| format!("failed to fetch '{url}'"))?;

        let mut contents = String::with_capacity(res.content_length().unwrap_or(1024) as usize);
        res.read_to_string(&mut contents)
            .context("failed to read contents as utf-8")?;

        Ok(Some(contents))
    }
}

/// Reads a file, a file that does not exist is not an error
fn read_optional(path: &Path) -> anyhow::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("unable to read '{}'", path.display())),
    }
}
