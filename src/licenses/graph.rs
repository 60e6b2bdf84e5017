use super::LicenseEntry;
use crate::Gav;
use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::{fmt, path::Path};

/// The metadata of a project, as declared in its POM
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub group_id: Option<String>,
    pub artifact_id: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub licenses: Vec<LicenseEntry>,
    /// Problems the graph provider ran into while retrieving the metadata,
    /// such as a license text that could not be downloaded
    #[serde(default)]
    pub messages: Vec<String>,
}

/// A resolved node of a dependency graph
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    #[serde(default)]
    pub classifier: Option<String>,
    #[serde(default)]
    pub optional: bool,
    /// Whether this is a direct dependency of the project, inferred from the
    /// trail when not specified
    #[serde(default)]
    pub direct: Option<bool>,
    /// Raw artifact ids from the project to this artifact, both included
    #[serde(default)]
    pub trail: Vec<String>,
    /// The project metadata this artifact points to
    #[serde(default)]
    pub metadata: Option<ProjectMetadata>,
}

fn default_type() -> String {
    "jar".to_owned()
}

impl Artifact {
    /// The raw `group:artifact:type[:classifier]:version` id, as used in
    /// dependency trails
    pub fn id(&self) -> String {
        match self.classifier.as_deref().filter(|c| !c.is_empty()) {
            Some(classifier) => format!(
                "{}:{}:{}:{classifier}:{}",
                self.group_id, self.artifact_id, self.kind, self.version
            ),
            None => format!(
                "{}:{}:{}:{}",
                self.group_id, self.artifact_id, self.kind, self.version
            ),
        }
    }

    #[inline]
    pub fn gav(&self) -> Gav {
        Gav::new(&self.group_id, &self.artifact_id, &self.version)
    }

    #[inline]
    pub fn is_direct(&self) -> bool {
        self.direct.unwrap_or(self.trail.len() <= 2)
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

/// The resolved dependency graph of a single module
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyGraph {
    pub project: Gav,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

impl DependencyGraph {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to deserialize dependency graph")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read dependency graph '{}'", path.display()))?;
        Self::from_json(&json).with_context(|| format!("invalid dependency graph '{}'", path.display()))
    }
}

/// Retrieves the project metadata of an artifact
pub trait MetadataSource: Sync {
    fn project(&self, artifact: &Artifact) -> anyhow::Result<ProjectMetadata>;
}

/// Uses the metadata embedded in the dependency graph by the graph provider
pub struct EmbeddedMetadata;

impl MetadataSource for EmbeddedMetadata {
    fn project(&self, artifact: &Artifact) -> anyhow::Result<ProjectMetadata> {
        artifact
            .metadata
            .clone()
            .with_context(|| format!("no project metadata available for '{artifact}'"))
    }
}
