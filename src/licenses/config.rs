use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf};

fn default_true() -> bool {
    true
}

fn default_excluded_scopes() -> Vec<String> {
    vec!["system".to_owned()]
}

/// The contents of an `about.toml`
#[derive(Deserialize, Debug)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    /// Includes transitive dependencies, otherwise only the direct
    /// dependencies of each module are reported
    #[serde(default = "default_true")]
    pub include_transitive_dependencies: bool,
    /// Drops every dependency that is only reachable through an artifact
    /// that was excluded by the artifact filters
    #[serde(default)]
    pub exclude_transitive_dependencies: bool,
    /// Fragments of groupIds to include
    #[serde(default)]
    pub included_groups: Vec<String>,
    /// Fragments of groupIds to exclude
    #[serde(default)]
    pub excluded_groups: Vec<String>,
    /// Fragments of artifactIds to include
    #[serde(default)]
    pub included_artifacts: Vec<String>,
    /// Fragments of artifactIds to exclude
    #[serde(default)]
    pub excluded_artifacts: Vec<String>,
    #[serde(default)]
    pub included_scopes: Vec<String>,
    #[serde(default = "default_excluded_scopes")]
    pub excluded_scopes: Vec<String>,
    #[serde(default)]
    pub included_types: Vec<String>,
    #[serde(default)]
    pub excluded_types: Vec<String>,
    /// Reports optional dependencies
    #[serde(default = "default_true")]
    pub include_optional: bool,
    /// Location of an artifact filter script
    #[serde(default)]
    pub artifact_filters_url: Option<String>,
    /// Location of the property file mapping dependencies without a license
    /// to their license(s). Written back after resolution.
    #[serde(default)]
    pub missing_file: Option<String>,
    /// Location of a property file extending the missing file
    #[serde(default)]
    pub missing_file_url: Option<String>,
    /// Consults the third-party descriptors published next to the
    /// dependencies in the local repository
    #[serde(default = "default_true")]
    pub use_repository_missing_files: bool,
    /// Location of a property file whose entries replace the licenses of
    /// the dependencies they name
    #[serde(default)]
    pub override_file: Option<String>,
    /// Locations of license summary files whose entries are used as
    /// license matchers, applied in order
    #[serde(default)]
    pub license_matchers: Vec<String>,
    /// `Main | Alias | Alias` definitions of licenses to merge
    #[serde(default)]
    pub license_merges: Vec<String>,
    /// If not empty, the only licenses that are allowed
    #[serde(default)]
    pub included_licenses: Vec<String>,
    /// Licenses that are not allowed
    #[serde(default)]
    pub excluded_licenses: Vec<String>,
    /// Fails if any dependency is left without a license
    #[serde(default)]
    pub fail_on_missing: bool,
    /// Fails if any dependency uses a license that is not allowed
    #[serde(default)]
    pub fail_on_blacklist: bool,
    /// The root of the local Maven repository, defaults to `~/.m2/repository`
    #[serde(default)]
    pub local_repository: Option<PathBuf>,
    /// Directories searched for `classpath:` locations
    #[serde(default)]
    pub resource_dirs: Vec<PathBuf>,
    /// SHA-256 checksums that fetched locations must match
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,
    /// Disallows any network access
    #[serde(default)]
    pub offline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            include_transitive_dependencies: true,
            exclude_transitive_dependencies: false,
            included_groups: Vec::new(),
            excluded_groups: Vec::new(),
            included_artifacts: Vec::new(),
            excluded_artifacts: Vec::new(),
            included_scopes: Vec::new(),
            excluded_scopes: default_excluded_scopes(),
            included_types: Vec::new(),
            excluded_types: Vec::new(),
            include_optional: true,
            artifact_filters_url: None,
            missing_file: None,
            missing_file_url: None,
            use_repository_missing_files: true,
            override_file: None,
            license_matchers: Vec::new(),
            license_merges: Vec::new(),
            included_licenses: Vec::new(),
            excluded_licenses: Vec::new(),
            fail_on_missing: false,
            fail_on_blacklist: false,
            local_repository: None,
            resource_dirs: Vec::new(),
            checksums: BTreeMap::new(),
            offline: false,
        }
    }
}

impl Config {
    /// The root of the local repository
    pub fn local_repository(&self) -> Option<PathBuf> {
        self.local_repository
            .clone()
            .or_else(|| home::home_dir().map(|home| home.join(".m2").join("repository")))
    }
}
