use super::properties::Properties;
use crate::Gav;
use anyhow::Context as _;
use std::path::{Path, PathBuf};

/// The classifier of third-party descriptors
pub const DESCRIPTOR_CLASSIFIER: &str = "third-party";
/// The extension of third-party descriptors
pub const DESCRIPTOR_TYPE: &str = "properties";

/// Provides the license mapping files that artifacts publish alongside
/// themselves
pub trait DescriptorSource: Sync {
    /// The third-party descriptor published next to the artifact, mapping
    /// the artifact's own dependencies to their licenses
    fn third_party(&self, id: &Gav) -> anyhow::Result<Option<Properties>>;
    /// The contents of a license database artifact
    fn license_database(&self, id: &Gav) -> anyhow::Result<Option<Properties>>;
}

/// A local Maven repository, laid out as
/// `<group as path>/<artifact>/<version>/<artifact>-<version>[-<classifier>].<ext>`
pub struct LocalRepository {
    root: PathBuf,
}

impl LocalRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn artifact_path(&self, id: &Gav, classifier: Option<&str>, extension: &str) -> PathBuf {
        let file_name = match classifier {
            Some(classifier) => format!(
                "{}-{}-{classifier}.{extension}",
                id.artifact_id, id.version
            ),
            None => format!("{}-{}.{extension}", id.artifact_id, id.version),
        };

        let mut path = self.root.clone();
        path.extend(id.group_id.split('.'));
        path.push(&id.artifact_id);
        path.push(&id.version);
        path.push(file_name);
        path
    }

    fn read(path: &Path) -> anyhow::Result<Option<Properties>> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("unable to read '{}'", path.display()));
            }
        };

        if contents.is_empty() {
            log::debug!("skipping empty file '{}'", path.display());
            return Ok(None);
        }

        log::info!("loaded '{}'", path.display());
        Ok(Some(Properties::parse(&contents)))
    }
}

impl DescriptorSource for LocalRepository {
    fn third_party(&self, id: &Gav) -> anyhow::Result<Option<Properties>> {
        Self::read(&self.artifact_path(id, Some(DESCRIPTOR_CLASSIFIER), DESCRIPTOR_TYPE))
    }

    fn license_database(&self, id: &Gav) -> anyhow::Result<Option<Properties>> {
        Self::read(&self.artifact_path(id, None, crate::LICENSE_DB_TYPE))
    }
}
