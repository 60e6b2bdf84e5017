use super::{LicenseEntry, UNKNOWN_LICENSE};
use crate::Dependency;
use std::collections::{BTreeMap, BTreeSet, btree_map};

/// The set of dependencies holding a particular license
pub type Bucket<'d> = BTreeSet<&'d Dependency>;

/// Maps license keys to the dependencies that hold the license.
///
/// A dependency with several licenses is present in several buckets, and
/// placing a dependency in a bucket never removes it from the others, that
/// is the job of [`LicenseMap::remove_dependency`]. Empty buckets are never
/// kept in the map.
#[derive(Default, Debug)]
pub struct LicenseMap<'d> {
    buckets: BTreeMap<String, Bucket<'d>>,
}

impl<'d> LicenseMap<'d> {
    /// Adds the dependency to the bucket for `license`, returns false if it
    /// was already present
    pub fn put(&mut self, license: impl Into<String>, dep: &'d Dependency) -> bool {
        self.buckets.entry(license.into()).or_default().insert(dep)
    }

    pub fn put_all(&mut self, other: &LicenseMap<'d>) {
        for (license, deps) in &other.buckets {
            let bucket = self.buckets.entry(license.clone()).or_default();
            bucket.extend(deps.iter().copied());
        }
    }

    #[inline]
    pub fn get(&self, license: &str) -> Option<&Bucket<'d>> {
        self.buckets.get(license)
    }

    #[inline]
    pub fn iter(&self) -> btree_map::Iter<'_, String, Bucket<'d>> {
        self.buckets.iter()
    }

    #[inline]
    pub fn keys(&self) -> btree_map::Keys<'_, String, Bucket<'d>> {
        self.buckets.keys()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Removes an entire bucket
    #[inline]
    pub fn remove(&mut self, license: &str) -> Option<Bucket<'d>> {
        self.buckets.remove(license)
    }

    /// Removes the dependency from a single bucket
    pub fn remove_from(&mut self, license: &str, dep: &Dependency) -> bool {
        let Some(bucket) = self.buckets.get_mut(license) else {
            return false;
        };

        let removed = bucket.remove(dep);
        if bucket.is_empty() {
            self.buckets.remove(license);
        }
        removed
    }

    /// Removes the dependency from every bucket, returning the keys of the
    /// buckets it was removed from
    pub fn remove_dependency(&mut self, dep: &Dependency) -> Vec<String> {
        let mut removed = Vec::new();
        self.buckets.retain(|license, bucket| {
            if bucket.remove(dep) {
                removed.push(license.clone());
            }
            !bucket.is_empty()
        });
        removed
    }

    /// Moves the dependencies of every `aliases` bucket into the `main`
    /// bucket and removes the alias buckets
    pub fn merge(&mut self, main: &str, aliases: &[&str]) {
        let mut merged = self.buckets.remove(main).unwrap_or_default();

        for alias in aliases {
            if *alias == main {
                continue;
            }

            match self.buckets.remove(*alias) {
                Some(deps) => {
                    log::debug!("merging license '{alias}' into '{main}'");
                    merged.extend(deps);
                }
                None => log::debug!("no dependencies use license '{alias}', nothing to merge"),
            }
        }

        if !merged.is_empty() {
            self.buckets.insert(main.to_owned(), merged);
        }
    }

    /// The dependencies without any usable license
    #[inline]
    pub fn unknown_dependencies(&self) -> Option<&Bucket<'d>> {
        self.buckets.get(UNKNOWN_LICENSE)
    }

    /// Inverts the map, listing the sorted license keys of each dependency
    pub fn to_dependency_map(&self) -> BTreeMap<&'d Dependency, Vec<&str>> {
        let mut deps = BTreeMap::<&'d Dependency, Vec<&str>>::new();
        for (license, bucket) in &self.buckets {
            for dep in bucket {
                deps.entry(*dep).or_default().push(license.as_str());
            }
        }

        for licenses in deps.values_mut() {
            licenses.sort_unstable();
        }

        deps
    }

    /// Places the dependency under each of the specified licenses, or under
    /// the unknown license if it has none. Dependencies in the `system` scope
    /// are never placed.
    pub fn add_licenses(&mut self, dep: &'d Dependency, licenses: &[LicenseEntry]) {
        if dep.scope.as_deref() == Some("system") {
            log::debug!("ignoring '{dep}' as it has system scope");
            return;
        }

        if licenses.is_empty() {
            self.put(UNKNOWN_LICENSE, dep);
            return;
        }

        for license in licenses {
            let name = license.name.as_deref().map(str::trim).unwrap_or_default();
            let url = license.url.as_deref().map(str::trim).unwrap_or_default();

            let key = if !name.is_empty() {
                name
            } else if !url.is_empty() {
                log::warn!("license of '{dep}' has no name, using its url '{url}' instead");
                url
            } else {
                log::warn!("license of '{dep}' has neither name nor url");
                UNKNOWN_LICENSE
            };

            self.put(key, dep);
        }
    }
}

impl<'m, 'd> IntoIterator for &'m LicenseMap<'d> {
    type Item = (&'m String, &'m Bucket<'d>);
    type IntoIter = btree_map::Iter<'m, String, Bucket<'d>>;

    fn into_iter(self) -> Self::IntoIter {
        self.buckets.iter()
    }
}
