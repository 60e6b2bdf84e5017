#![doc = include_str!("../README.md")]

use serde::{Deserialize, Serialize};
use std::{cmp, fmt};

pub mod generate;
pub mod licenses;

/// The artifact type of synthetic dependencies that carry additional
/// license mappings rather than code
pub const LICENSE_DB_TYPE: &str = "license.properties";

/// The `groupId:artifactId:version` identity of a dependency
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gav {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl Gav {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    /// The canonical `group--artifact--version` key used by missing files,
    /// override files and the artifact cache
    #[inline]
    pub fn key(&self) -> String {
        format!("{}--{}--{}", self.group_id, self.artifact_id, self.version)
    }
}

impl fmt::Display for Gav {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// A dependency that was accepted by the artifact filters, along with the
/// licenses it declares
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(flatten)]
    pub id: Gav,
    pub scope: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub classifier: Option<String>,
    pub optional: bool,
    /// The declared licenses, in declaration order
    pub licenses: Vec<licenses::LicenseEntry>,
    /// Raw artifact ids from the root of the graph to this dependency
    pub trail: Vec<String>,
    /// Diagnostics gathered while building or downloading for this dependency
    pub messages: Vec<String>,
    /// Set once a license matcher has certified or replaced the licenses
    pub approved: bool,
}

impl Dependency {
    #[inline]
    pub fn key(&self) -> String {
        self.id.key()
    }
}

impl Ord for Dependency {
    #[inline]
    fn cmp(&self, o: &Self) -> cmp::Ordering {
        self.id.cmp(&o.id)
    }
}

impl PartialOrd for Dependency {
    #[inline]
    fn partial_cmp(&self, o: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(o))
    }
}

impl PartialEq for Dependency {
    #[inline]
    fn eq(&self, o: &Self) -> bool {
        self.cmp(o) == cmp::Ordering::Equal
    }
}

impl Eq for Dependency {}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.id.fmt(f)
    }
}

/// The dependencies of one or more modules, ordered by identity
pub type Dependencies = std::collections::BTreeMap<Gav, Dependency>;

#[inline]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    const CHARS: &[u8] = b"0123456789abcdef";

    for &byte in bytes {
        s.push(CHARS[(byte >> 4) as usize] as char);
        s.push(CHARS[(byte & 0xf) as usize] as char);
    }

    s
}

#[inline]
pub fn sha256_hex(buffer: &str) -> String {
    to_hex(ring::digest::digest(&ring::digest::SHA256, buffer.as_bytes()).as_ref())
}

pub fn validate_sha256(buffer: &str, expected: &str) -> anyhow::Result<()> {
    anyhow::ensure!(
        expected.len() == 64,
        "checksum '{expected}' length is {} instead of expected 64",
        expected.len()
    );

    let mut ctx = ring::digest::Context::new(&ring::digest::SHA256);
    ctx.update(buffer.as_bytes());

    let content_digest = ctx.finish();
    let digest = content_digest.as_ref();

    for (ind, exp) in expected.as_bytes().chunks(2).enumerate() {
        let mut cur = match exp[0] {
            b'A'..=b'F' => exp[0] - b'A' + 10,
            b'a'..=b'f' => exp[0] - b'a' + 10,
            b'0'..=b'9' => exp[0] - b'0',
            c => {
                anyhow::bail!("invalid byte in checksum '{expected}' @ {ind}: {c}");
            }
        };

        cur <<= 4;

        cur |= match exp[1] {
            b'A'..=b'F' => exp[1] - b'A' + 10,
            b'a'..=b'f' => exp[1] - b'a' + 10,
            b'0'..=b'9' => exp[1] - b'0',
            c => {
                anyhow::bail!("invalid byte in checksum '{expected}' @ {ind}: {c}");
            }
        };

        if digest[ind] != cur {
            anyhow::bail!(
                "checksum mismatch, expected '{expected}' but content hashes to '{}'",
                to_hex(digest)
            );
        }
    }

    Ok(())
}
