use crate::{
    Dependency,
    licenses::{LicenseMap, UNKNOWN_LICENSE},
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Serialize)]
pub struct License<'d> {
    /// The license key, after merges and overrides
    pub name: String,
    /// The dependencies this license was applied to, in identity order
    pub used_by: Vec<&'d Dependency>,
}

#[derive(Serialize)]
pub struct LicenseSet {
    /// Number of dependencies that use this license.
    pub count: usize,
    /// The license key
    pub name: String,
    /// Index of the entry for this license in [`ThirdPartyReport::licenses`]
    pub index: usize,
}

/// An artifact left out of the report because its metadata could not be
/// built
#[derive(Serialize)]
pub struct SkippedArtifact<'a> {
    pub id: &'a str,
    pub reason: &'a str,
}

#[derive(Serialize)]
pub struct DependencyLicenses<'d> {
    pub dependency: &'d Dependency,
    /// The sorted license keys the dependency is listed under
    pub licenses: Vec<String>,
}

#[derive(Serialize)]
pub struct ThirdPartyReport<'d> {
    /// All license keys and the index (in [`Self::licenses`]) of their entry,
    /// most used first
    pub overview: Vec<LicenseSet>,
    /// Every license except the unknown license, sorted by name
    pub licenses: Vec<License<'d>>,
    /// Every placed dependency with its licenses
    pub dependencies: Vec<DependencyLicenses<'d>>,
    /// Dependencies whose license is still unknown
    pub unknown: Vec<&'d Dependency>,
    /// Artifacts whose metadata could not be built
    pub skipped: Vec<SkippedArtifact<'d>>,
}

impl ThirdPartyReport<'_> {
    /// Renders the report the way the third-party file lists it, one line per
    /// dependency
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        if self.dependencies.is_empty() {
            out.push_str("The project has no dependencies.\n");
        } else {
            out.push_str(&format!(
                "\nLists of {} third-party dependencies.\n",
                self.dependencies.len()
            ));

            for dl in &self.dependencies {
                let licenses = dl
                    .licenses
                    .iter()
                    .map(|l| format!("({l})"))
                    .collect::<Vec<_>>()
                    .join(" ");

                out.push_str(&format!("     {licenses} {}\n", dl.dependency));
            }
        }

        if !self.skipped.is_empty() {
            out.push_str(&format!(
                "\n{} artifact(s) could not be inspected:\n",
                self.skipped.len()
            ));
            for skipped in &self.skipped {
                out.push_str(&format!("     {}: {}\n", skipped.id, skipped.reason));
            }
        }

        out
    }
}

/// Builds the report of the final license map, along with the artifacts
/// (raw id to reason) that were skipped while gathering it
pub fn generate<'d>(
    map: &LicenseMap<'d>,
    skipped: &'d BTreeMap<String, String>,
) -> ThirdPartyReport<'d> {
    let licenses: Vec<_> = map
        .iter()
        .filter(|(name, _)| name.as_str() != UNKNOWN_LICENSE)
        .map(|(name, bucket)| License {
            name: name.clone(),
            used_by: bucket.iter().copied().collect(),
        })
        .collect();

    let mut overview: Vec<_> = licenses
        .iter()
        .enumerate()
        .map(|(ndx, lic)| LicenseSet {
            count: lic.used_by.len(),
            name: lic.name.clone(),
            index: ndx,
        })
        .collect();

    // Show the most used licenses first
    overview.sort_by(|a, b| b.count.cmp(&a.count));

    let dependencies = map
        .to_dependency_map()
        .into_iter()
        .map(|(dependency, licenses)| DependencyLicenses {
            dependency,
            licenses: licenses.into_iter().map(String::from).collect(),
        })
        .collect();

    let unknown = map
        .unknown_dependencies()
        .map(|bucket| bucket.iter().copied().collect())
        .unwrap_or_default();

    let skipped = skipped
        .iter()
        .map(|(id, reason)| SkippedArtifact { id, reason })
        .collect();

    ThirdPartyReport {
        overview,
        licenses,
        dependencies,
        unknown,
        skipped,
    }
}
