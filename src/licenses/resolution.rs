use super::{
    LicenseMap, UNKNOWN_LICENSE,
    fetch::{self, Fetcher},
    properties::Properties,
    repository::DescriptorSource,
    split_licenses,
};
use crate::{Dependencies, Dependency, Gav};
use std::collections::{BTreeMap, BTreeSet};

/// Rewrites a legacy `group--artifact--version--type[--classifier]` key to
/// the canonical `group--artifact--version` form, returns `None` if the key
/// is not a legacy key
pub fn migrate_key(key: &str) -> Option<String> {
    let parts: Vec<_> = key.split("--").collect();

    let (group, artifact, version) = match parts.len() {
        0..=3 => return None,
        4 => (parts[0].to_owned(), parts[1], parts[2]),
        n => (parts[..n - 4].join("--"), parts[n - 4], parts[n - 3]),
    };

    if parts.iter().any(|part| part.is_empty()) {
        return None;
    }

    Some(format!("{group}--{artifact}--{version}"))
}

fn index(deps: &Dependencies) -> BTreeMap<String, &Dependency> {
    deps.values().map(|dep| (dep.key(), dep)).collect()
}

/// Reads the missing file and its remote extension, entries of the latter
/// replacing those of the former
pub fn load_mapping(
    fetcher: &Fetcher,
    missing_file: Option<&str>,
    missing_file_url: Option<&str>,
) -> anyhow::Result<Properties> {
    let mut mapping = Properties::default();

    for location in missing_file.into_iter().chain(missing_file_url) {
        match fetcher.fetch(location)? {
            Some(contents) => {
                let props = Properties::parse(&contents);
                log::info!("loaded {} license mappings from '{location}'", props.len());
                mapping.extend(props.into_inner());
            }
            None => log::debug!("no license mappings at '{location}'"),
        }
    }

    Ok(mapping)
}

/// Replaces the licenses of every dependency named by the overrides
pub fn override_licenses<'d>(
    map: &mut LicenseMap<'d>,
    deps: &'d Dependencies,
    overrides: &Properties,
    location: &str,
) {
    let known = index(deps);
    let remote = fetch::is_remote(location);

    for (key, value) in overrides.iter() {
        let licenses = split_licenses(value);
        if licenses.is_empty() {
            continue;
        }

        let dep = known
            .get(key)
            .or_else(|| migrate_key(key).and_then(|migrated| known.get(&migrated)));

        match dep {
            Some(dep) => {
                let dep = *dep;
                let previous = map.remove_dependency(dep);
                log::debug!("overriding licenses {previous:?} of '{dep}' with '{value}'");
                map.add_licenses(dep, &licenses);
            }
            None if remote => {
                log::debug!("dependency [{key}] from '{location}' does not exist in project");
            }
            None => {
                log::warn!(
                    "dependency [{key}] does not exist in project, remove it from '{location}'"
                );
            }
        }
    }
}

/// Resolves the licenses of the dependencies in the unknown license bucket
#[derive(Default)]
pub struct UnsafeResolver<'a> {
    descriptors: Option<&'a dyn DescriptorSource>,
    license_databases: Vec<Gav>,
}

impl<'a> UnsafeResolver<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consults the third-party descriptors of the known dependencies for
    /// dependencies that the mapping does not resolve
    pub fn with_descriptors(mut self, source: &'a dyn DescriptorSource) -> Self {
        self.descriptors = Some(source);
        self
    }

    /// License database artifacts consulted after the descriptors
    pub fn with_license_databases(mut self, databases: impl IntoIterator<Item = Gav>) -> Self {
        self.license_databases.extend(databases);
        self
    }

    /// Moves every dependency of the unknown bucket that can be resolved to
    /// the bucket(s) of its license(s).
    ///
    /// Returns the mapping, with legacy keys migrated, keys of dependencies
    /// that are not part of the project removed, the licenses found in
    /// descriptors and license databases recorded, and a blank entry for
    /// every dependency that is still unresolved.
    pub fn resolve<'d>(
        &self,
        map: &mut LicenseMap<'d>,
        deps: &'d Dependencies,
        mut mapping: Properties,
    ) -> anyhow::Result<Properties> {
        let known = index(deps);
        migrate_mapping(&mut mapping, &known);

        let mut unknown = map.unknown_dependencies().cloned().unwrap_or_default();

        if !unknown.is_empty() {
            apply(map, &mut unknown, &mapping, "missing file");
        }

        if let Some(source) = self.descriptors {
            for dep in deps.values() {
                if unknown.is_empty() {
                    break;
                }

                if unknown.contains(dep) {
                    continue;
                }

                if let Some(descriptor) = source.third_party(&dep.id)? {
                    log::debug!("consulting third-party descriptor of '{dep}'");
                    let resolved =
                        apply(map, &mut unknown, &canonical_keys(descriptor), &dep.id.to_string());
                    mapping.extend(resolved);
                }
            }

            for db in &self.license_databases {
                if unknown.is_empty() {
                    break;
                }

                if let Some(table) = source.license_database(db)? {
                    log::debug!("consulting license database '{db}'");
                    let resolved = apply(map, &mut unknown, &canonical_keys(table), &db.to_string());
                    mapping.extend(resolved);
                }
            }
        }

        if unknown.is_empty() {
            map.remove(UNKNOWN_LICENSE);
        } else {
            for dep in &unknown {
                mapping.insert(dep.key(), String::new());
            }
        }

        Ok(mapping)
    }
}

/// Migrates legacy keys and drops the keys of dependencies that are not
/// part of the project
fn migrate_mapping(mapping: &mut Properties, known: &BTreeMap<String, &Dependency>) {
    let keys: Vec<_> = mapping.keys().cloned().collect();

    for key in keys {
        let migrated = migrate_key(&key);
        let canonical = migrated.as_deref().unwrap_or(&key);

        if !known.contains_key(canonical) {
            log::warn!("dependency [{key}] does not exist in project, remove it from the missing file");
            mapping.remove(&key);
            continue;
        }

        if canonical != key {
            if let Some(value) = mapping.remove(&key) {
                log::info!("migrated missing file key [{key}] to [{canonical}]");
                mapping.insert(canonical.to_owned(), value);
            }
        }
    }
}

/// Rewrites legacy keys without dropping anything
fn canonical_keys(table: Properties) -> Properties {
    table
        .into_inner()
        .into_iter()
        .map(|(key, value)| (migrate_key(&key).unwrap_or(key), value))
        .collect()
}

/// Resolves the unknown dependencies named by the table, returning the
/// entries that were used
fn apply<'d>(
    map: &mut LicenseMap<'d>,
    unknown: &mut BTreeSet<&'d Dependency>,
    table: &Properties,
    source: &str,
) -> Vec<(String, String)> {
    let mut resolved = Vec::new();

    unknown.retain(|dep| {
        let key = dep.key();
        let Some(value) = table.get(&key) else {
            return true;
        };

        let licenses = split_licenses(value);
        if licenses.is_empty() {
            // Intentionally left unresolved
            return true;
        }

        log::debug!("resolved licenses of '{dep}' to '{value}' from {source}");
        map.remove_from(UNKNOWN_LICENSE, dep);
        map.add_licenses(*dep, &licenses);
        resolved.push((key, value.clone()));
        false
    });

    resolved
}
