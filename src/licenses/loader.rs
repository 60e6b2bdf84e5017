use super::{
    filter::ArtifactFilters,
    graph::{Artifact, DependencyGraph, MetadataSource},
};
use crate::{Dependencies, Dependency, Gav, LICENSE_DB_TYPE};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

/// Dependency records keyed by `group--artifact--version`, shared between
/// the loads of several modules. Cloning the cache shares it.
#[derive(Clone, Default)]
pub struct ArtifactCache {
    entries: Arc<parking_lot::RwLock<BTreeMap<String, Dependency>>>,
}

impl ArtifactCache {
    #[inline]
    pub fn get(&self, key: &str) -> Option<Dependency> {
        self.entries.read().get(key).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Adds the records, keeping the existing record for keys that are
    /// already cached
    pub fn extend(&self, records: impl IntoIterator<Item = (String, Dependency)>) {
        let mut entries = self.entries.write();
        for (key, dep) in records {
            entries.entry(key).or_insert(dep);
        }
    }
}

/// The dependencies loaded from a single graph
#[derive(Default, Debug)]
pub struct Loaded {
    pub dependencies: Dependencies,
    /// Raw ids of the artifacts that were filtered out or whose metadata
    /// could not be built
    pub excluded: BTreeSet<String>,
    /// Raw ids of artifacts whose metadata could not be built, and why
    pub failed: BTreeMap<String, String>,
    /// License database artifacts, which are never reported themselves
    pub license_databases: BTreeSet<Gav>,
}

pub struct Loader<'a> {
    pub filters: &'a ArtifactFilters,
    pub source: &'a dyn MetadataSource,
    pub include_transitive: bool,
    /// Drops dependencies that are only reachable through an excluded
    /// artifact
    pub exclude_transitive: bool,
}

impl Loader<'_> {
    pub fn load(&self, graph: &DependencyGraph, cache: Option<&ArtifactCache>) -> Loaded {
        let mut loaded = Loaded::default();
        let mut included = Vec::new();
        let mut built = BTreeMap::new();

        for artifact in graph
            .artifacts
            .iter()
            .filter(|artifact| self.include_transitive || artifact.is_direct())
        {
            if artifact.kind == LICENSE_DB_TYPE {
                log::debug!("found license database '{artifact}'");
                loaded.license_databases.insert(artifact.gav());
                loaded.excluded.insert(artifact.id());
                continue;
            }

            let id = artifact.id();

            if !self.filters.is_included(artifact) {
                log::debug!("excluding '{id}'");
                loaded.excluded.insert(id);
                continue;
            }

            let key = artifact.gav().key();
            let cached = cache
                .and_then(|cache| cache.get(&key))
                .or_else(|| built.get(&key).cloned());

            let dep = match cached {
                Some(dep) => dep,
                None => match self.build(artifact) {
                    Ok(dep) => {
                        built.insert(key, dep.clone());
                        dep
                    }
                    Err(err) => {
                        log::warn!("unable to build metadata for '{id}': {err:#}");
                        loaded.failed.insert(id.clone(), format!("{err:#}"));
                        loaded.excluded.insert(id);
                        continue;
                    }
                },
            };

            included.push((artifact, dep));
        }

        for (artifact, dep) in included {
            if self.exclude_transitive && has_excluded_ancestor(artifact, &loaded.excluded) {
                log::debug!("excluding '{artifact}' as it is only reachable through an excluded artifact");
                continue;
            }

            loaded.dependencies.insert(dep.id.clone(), dep);
        }

        if let Some(cache) = cache {
            cache.extend(built);
        }

        loaded
    }

    fn build(&self, artifact: &Artifact) -> anyhow::Result<Dependency> {
        let project = self.source.project(artifact)?;
        let id = artifact.gav();

        // The resolved coordinates always win over the declared ones
        for (field, declared, resolved) in [
            ("groupId", &project.group_id, &id.group_id),
            ("artifactId", &project.artifact_id, &id.artifact_id),
            ("version", &project.version, &id.version),
        ] {
            if let Some(declared) = declared.as_deref().filter(|d| *d != resolved.as_str()) {
                log::debug!(
                    "'{artifact}' declares {field} '{declared}', using resolved value '{resolved}'"
                );
            }
        }

        Ok(Dependency {
            id,
            scope: artifact.scope.clone(),
            kind: artifact.kind.clone(),
            classifier: artifact.classifier.clone(),
            optional: artifact.optional,
            licenses: project.licenses,
            trail: artifact.trail.clone(),
            messages: project.messages,
            approved: false,
        })
    }
}

/// Checks the trail between the root and the artifact itself, both
/// excluded, for an excluded artifact
fn has_excluded_ancestor(artifact: &Artifact, excluded: &BTreeSet<String>) -> bool {
    let trail = &artifact.trail;
    trail
        .get(1..trail.len().saturating_sub(1))
        .is_some_and(|ancestors| ancestors.iter().any(|id| excluded.contains(id)))
}
