use super::{
    LicenseEntry,
    fetch::Fetcher,
    summary::{self, SummaryEntry},
};
use crate::Dependency;
use anyhow::Context as _;
use regex::{Regex, RegexBuilder};

/// Compiles a case insensitive pattern that must match its entire input
fn compile(pattern: &str) -> anyhow::Result<Regex> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(true)
        .build()
        .with_context(|| format!("invalid matcher pattern '{pattern}'"))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Matches a single license entry. Each field that is not specified only
/// matches an absent or empty value, the license file is never compared.
#[derive(Debug)]
pub struct LicenseMatcher {
    name: Option<Regex>,
    url: Option<Regex>,
    distribution: Option<Regex>,
    comments: Option<Regex>,
}

impl LicenseMatcher {
    pub fn new(entry: &LicenseEntry) -> anyhow::Result<Self> {
        let field = |value: &Option<String>| non_empty(value.as_deref()).map(compile).transpose();

        Ok(Self {
            name: field(&entry.name)?,
            url: field(&entry.url)?,
            distribution: field(&entry.distribution)?,
            comments: field(&entry.comments)?,
        })
    }

    pub fn matches(&self, license: &LicenseEntry) -> bool {
        fn field(pattern: &Option<Regex>, value: &Option<String>) -> bool {
            let value = value.as_deref().unwrap_or_default();
            match pattern {
                Some(pattern) => pattern.is_match(value),
                None => value.is_empty(),
            }
        }

        field(&self.name, &license.name)
            && field(&self.url, &license.url)
            && field(&self.distribution, &license.distribution)
            && field(&self.comments, &license.comments)
    }
}

/// Literal `groupId` and `artifactId` matching, the version is ignored
#[derive(Debug)]
pub struct LegacyMatcher {
    group_id: Option<String>,
    artifact_id: Option<String>,
}

impl LegacyMatcher {
    pub fn new(group_id: Option<&str>, artifact_id: Option<&str>) -> Self {
        Self {
            group_id: non_empty(group_id).map(str::to_owned),
            artifact_id: non_empty(artifact_id).map(str::to_owned),
        }
    }

    pub fn matches(&self, dep: &Dependency) -> bool {
        self.group_id
            .as_ref()
            .is_none_or(|group| *group == dep.id.group_id)
            && self
                .artifact_id
                .as_ref()
                .is_none_or(|artifact| *artifact == dep.id.artifact_id)
    }
}

/// Regular expression matching of the coordinates, and optionally of the
/// exact list of licenses the dependency currently declares
#[derive(Debug)]
pub struct PatternMatcher {
    group_id: Option<Regex>,
    artifact_id: Option<Regex>,
    version: Option<Regex>,
    licenses: Option<Vec<LicenseMatcher>>,
}

impl PatternMatcher {
    pub fn new(
        group_id: Option<&str>,
        artifact_id: Option<&str>,
        version: Option<&str>,
        licenses: Option<&[LicenseEntry]>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            group_id: non_empty(group_id).map(compile).transpose()?,
            artifact_id: non_empty(artifact_id).map(compile).transpose()?,
            version: non_empty(version).map(compile).transpose()?,
            licenses: licenses
                .map(|licenses| {
                    licenses
                        .iter()
                        .map(LicenseMatcher::new)
                        .collect::<anyhow::Result<Vec<_>>>()
                })
                .transpose()?,
        })
    }

    pub fn matches(&self, dep: &Dependency) -> bool {
        let coordinate = |pattern: &Option<Regex>, value: &str| {
            pattern.as_ref().is_none_or(|pattern| pattern.is_match(value))
        };

        coordinate(&self.group_id, &dep.id.group_id)
            && coordinate(&self.artifact_id, &dep.id.artifact_id)
            && coordinate(&self.version, &dep.id.version)
            && self.licenses.as_ref().is_none_or(|matchers| {
                matchers.len() == dep.licenses.len()
                    && matchers
                        .iter()
                        .zip(&dep.licenses)
                        .all(|(matcher, license)| matcher.matches(license))
            })
    }
}

#[derive(Debug)]
pub enum DependencyMatcher {
    Legacy(LegacyMatcher),
    Pattern(PatternMatcher),
}

impl DependencyMatcher {
    #[inline]
    pub fn matches(&self, dep: &Dependency) -> bool {
        match self {
            Self::Legacy(legacy) => legacy.matches(dep),
            Self::Pattern(pattern) => pattern.matches(dep),
        }
    }
}

#[derive(Debug)]
pub struct MatcherRule {
    pub matcher: DependencyMatcher,
    /// The licenses that replace those of matching dependencies
    pub licenses: Vec<LicenseEntry>,
    /// Certifies the licenses of matching dependencies instead of replacing
    /// them
    pub approved: bool,
}

impl MatcherRule {
    /// Creates a rule from a license summary entry, entries with a
    /// `matchLicenses` block match with regular expressions, the others
    /// literally
    pub fn from_entry(entry: &SummaryEntry) -> anyhow::Result<Self> {
        let matcher = match &entry.match_licenses {
            Some(match_licenses) => DependencyMatcher::Pattern(PatternMatcher::new(
                Some(entry.group_id.as_str()),
                Some(entry.artifact_id.as_str()),
                entry.version.as_deref(),
                Some(match_licenses.as_slice()),
            )?),
            None => DependencyMatcher::Legacy(LegacyMatcher::new(
                Some(entry.group_id.as_str()),
                Some(entry.artifact_id.as_str()),
            )),
        };

        Ok(Self {
            matcher,
            licenses: entry.licenses.clone(),
            approved: entry.approved,
        })
    }
}

/// An ordered list of rules
#[derive(Debug, Default)]
pub struct LicenseMatchers {
    rules: Vec<MatcherRule>,
}

impl LicenseMatchers {
    pub fn new(rules: Vec<MatcherRule>) -> Self {
        Self { rules }
    }

    pub fn from_entries(entries: &[SummaryEntry]) -> anyhow::Result<Self> {
        Ok(Self {
            rules: entries
                .iter()
                .map(MatcherRule::from_entry)
                .collect::<anyhow::Result<_>>()?,
        })
    }

    /// Loads the rules of every location, in order. Locations that don't
    /// exist contribute no rules.
    pub fn load(fetcher: &Fetcher, locations: &[String]) -> anyhow::Result<Self> {
        let mut rules = Vec::new();

        for location in locations {
            let Some(contents) = fetcher.fetch(location)? else {
                log::warn!("license matchers '{location}' do not exist");
                continue;
            };

            let entries = summary::read(&contents, location)?;
            log::info!("loaded {} license matchers from '{location}'", entries.len());

            for entry in &entries {
                rules.push(
                    MatcherRule::from_entry(entry).with_context(|| {
                        format!(
                            "invalid license matcher for '{}:{}' in '{location}'",
                            entry.group_id, entry.artifact_id
                        )
                    })?,
                );
            }
        }

        Ok(Self { rules })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every matching rule in order, later rules overriding earlier
    /// ones. Returns true if any rule matched.
    pub fn replace_matches(&self, dep: &mut Dependency) -> bool {
        let mut matched = false;

        for rule in &self.rules {
            if !rule.matcher.matches(dep) {
                continue;
            }

            if !rule.approved {
                dep.licenses = rule.licenses.clone();
            }

            dep.approved = true;
            dep.messages.clear();
            matched = true;
        }

        matched
    }
}
