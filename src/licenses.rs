pub mod config;
pub mod fetch;
pub mod filter;
pub mod graph;
pub mod loader;
pub mod map;
pub mod matchers;
pub mod properties;
pub mod repository;
pub mod resolution;
pub mod summary;

use crate::{Dependencies, Gav};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub use map::LicenseMap;

/// The license key used for dependencies without any usable license
pub const UNKNOWN_LICENSE: &str = "Unknown license";

/// A single license declaration, as found in a POM or a license summary
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LicenseEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distribution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// The name of a local file holding the license text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl LicenseEntry {
    /// Creates an entry from a bare license string, as found in missing and
    /// override files, where the string serves as both name and url
    pub fn from_text(text: &str) -> Self {
        Self {
            name: Some(text.to_owned()),
            url: Some(text.to_owned()),
            ..Default::default()
        }
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..Default::default()
        }
    }
}

/// Splits a `License A | License B` value into one entry per license.
/// Blank segments are dropped.
pub fn split_licenses(value: &str) -> Vec<LicenseEntry> {
    value
        .split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(LicenseEntry::from_text)
        .collect()
}

/// Applies `Main | Alias | Alias` merge definitions to the map. Entries
/// with the same main license are combined, an alias may only be named once.
pub fn merge_licenses(map: &mut LicenseMap<'_>, merges: &[String]) -> anyhow::Result<()> {
    let mut registered = BTreeSet::new();
    let mut parsed = BTreeMap::<&str, Vec<&str>>::new();

    for merge in merges {
        let mut names = merge.split('|').map(str::trim).filter(|s| !s.is_empty());

        let Some(main) = names.next() else {
            continue;
        };

        let aliases = parsed.entry(main).or_default();
        for alias in names {
            anyhow::ensure!(
                alias != main && registered.insert(alias),
                "license '{alias}' is merged more than once in license merges"
            );
            aliases.push(alias);
        }
    }

    for (main, aliases) in parsed {
        map.merge(main, &aliases);
    }

    Ok(())
}

/// A license found in the map that is not allowed by the license policy
#[derive(Debug, PartialEq, Eq)]
pub struct PolicyViolation {
    pub license: String,
    pub dependencies: Vec<Gav>,
}

/// Checks the licenses in the map against an allow list (ignored when empty)
/// and a deny list. The unknown bucket is never a violation.
pub fn check_policy(
    map: &LicenseMap<'_>,
    included: &[String],
    excluded: &[String],
) -> Vec<PolicyViolation> {
    map.iter()
        .filter(|(license, _)| *license != UNKNOWN_LICENSE)
        .filter(|(license, _)| {
            (!included.is_empty() && !included.iter().any(|inc| inc == *license))
                || excluded.iter().any(|exc| exc == *license)
        })
        .map(|(license, deps)| PolicyViolation {
            license: license.to_owned(),
            dependencies: deps.iter().map(|dep| dep.id.clone()).collect(),
        })
        .collect()
}

/// Everything gathered from one or more module graphs
#[derive(Default)]
pub struct Inventory {
    pub dependencies: Dependencies,
    /// Raw artifact ids whose metadata could not be built, and why
    pub failed: BTreeMap<String, String>,
    /// License database artifacts encountered in the graphs
    pub license_databases: BTreeSet<Gav>,
}

impl Inventory {
    /// Places every dependency in a map according to its current licenses
    pub fn license_map(&self) -> LicenseMap<'_> {
        let mut map = LicenseMap::default();
        for dep in self.dependencies.values() {
            map.add_licenses(dep, &dep.licenses);
        }
        map
    }
}

/// Loads the dependencies of one or more module graphs and applies the
/// configured license matchers to them
pub struct Gatherer<'a> {
    filters: &'a filter::ArtifactFilters,
    matchers: &'a matchers::LicenseMatchers,
    source: &'a dyn graph::MetadataSource,
    cache: loader::ArtifactCache,
    include_transitive: bool,
    exclude_transitive: bool,
}

impl<'a> Gatherer<'a> {
    pub fn new(
        filters: &'a filter::ArtifactFilters,
        matchers: &'a matchers::LicenseMatchers,
        source: &'a dyn graph::MetadataSource,
    ) -> Self {
        Self {
            filters,
            matchers,
            source,
            cache: loader::ArtifactCache::default(),
            include_transitive: true,
            exclude_transitive: false,
        }
    }

    /// Shares an artifact cache owned by the caller
    pub fn with_cache(mut self, cache: loader::ArtifactCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_config(mut self, cfg: &config::Config) -> Self {
        self.include_transitive = cfg.include_transitive_dependencies;
        self.exclude_transitive = cfg.exclude_transitive_dependencies;
        self
    }

    pub fn gather(&self, graphs: &[graph::DependencyGraph]) -> Inventory {
        let loader = loader::Loader {
            filters: self.filters,
            source: self.source,
            include_transitive: self.include_transitive,
            exclude_transitive: self.exclude_transitive,
        };

        let loaded = graphs
            .par_iter()
            .map(|graph| {
                log::info!("loading dependencies of '{}'", graph.project);
                loader.load(graph, Some(&self.cache))
            })
            .collect::<Vec<_>>();

        let mut inventory = Inventory::default();
        for module in loaded {
            inventory.dependencies.extend(module.dependencies);
            inventory.failed.extend(module.failed);
            inventory.license_databases.extend(module.license_databases);
        }

        for dep in inventory.dependencies.values_mut() {
            if self.matchers.replace_matches(dep) {
                log::debug!("license matchers applied to '{dep}'");
            }
        }

        inventory
    }
}
