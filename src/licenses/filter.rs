use super::{config::Config, fetch::Fetcher, graph::Artifact};
use anyhow::Context as _;
use regex::Regex;

/// A set of include and exclude patterns for a single dimension of an
/// artifact. An empty include set includes everything, and excludes always
/// win over includes.
#[derive(Debug)]
struct IncludesExcludes<T> {
    includes: Vec<T>,
    excludes: Vec<T>,
}

impl<T> Default for IncludesExcludes<T> {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

trait Matcher {
    fn matches(&self, value: &str) -> bool;
}

impl Matcher for Regex {
    #[inline]
    fn matches(&self, value: &str) -> bool {
        self.is_match(value)
    }
}

impl Matcher for String {
    #[inline]
    fn matches(&self, value: &str) -> bool {
        self == value
    }
}

impl<T: Matcher> IncludesExcludes<T> {
    fn is_included(&self, value: Option<&str>) -> bool {
        let matches = |patterns: &[T]| {
            value.is_some_and(|value| patterns.iter().any(|p| p.matches(value)))
        };

        (self.includes.is_empty() || matches(&self.includes)) && !matches(&self.excludes)
    }
}

/// Decides which artifacts of a dependency graph are reported
#[derive(Debug)]
pub struct ArtifactFilters {
    coordinates: IncludesExcludes<Regex>,
    scopes: IncludesExcludes<String>,
    types: IncludesExcludes<String>,
    include_optional: bool,
}

impl Default for ArtifactFilters {
    fn default() -> Self {
        Self {
            coordinates: IncludesExcludes::default(),
            scopes: IncludesExcludes::default(),
            types: IncludesExcludes::default(),
            include_optional: true,
        }
    }
}

impl ArtifactFilters {
    #[inline]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Builds the filters described by the configuration, including the
    /// filter script at `artifact-filters-url` if one is configured
    pub fn from_config(cfg: &Config, fetcher: &Fetcher) -> anyhow::Result<Self> {
        let mut builder = Self::builder();

        for group in &cfg.included_groups {
            builder.include_group(group)?;
        }
        for group in &cfg.excluded_groups {
            builder.exclude_group(group)?;
        }
        for artifact in &cfg.included_artifacts {
            builder.include_artifact(artifact)?;
        }
        for artifact in &cfg.excluded_artifacts {
            builder.exclude_artifact(artifact)?;
        }
        for scope in &cfg.included_scopes {
            builder.include_scope(scope);
        }
        for scope in &cfg.excluded_scopes {
            builder.exclude_scope(scope);
        }
        for kind in &cfg.included_types {
            builder.include_type(kind);
        }
        for kind in &cfg.excluded_types {
            builder.exclude_type(kind);
        }
        builder.include_optional(cfg.include_optional);

        if let Some(url) = &cfg.artifact_filters_url {
            match fetcher.fetch(url)? {
                Some(script) => {
                    builder.script(&script, url)?;
                }
                None => log::warn!("artifact filter script '{url}' does not exist"),
            }
        }

        Ok(builder.build())
    }

    pub fn is_included(&self, artifact: &Artifact) -> bool {
        let coordinates = format!("{}:{}", artifact.group_id, artifact.artifact_id);

        self.scopes.is_included(artifact.scope.as_deref())
            && self.types.is_included(Some(&artifact.kind))
            && self.coordinates.is_included(Some(&coordinates))
            && (self.include_optional || !artifact.optional)
    }
}

/// Anchors a regular expression so that it must match the entire input
fn full_match(pattern: &str) -> anyhow::Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .with_context(|| format!("invalid artifact pattern '{pattern}'"))
}

#[derive(Debug, Default)]
pub struct Builder {
    filters: ArtifactFilters,
}

impl Builder {
    /// Includes artifacts whose `groupId:artifactId` matches the pattern
    pub fn include_ga(&mut self, pattern: &str) -> anyhow::Result<&mut Self> {
        self.filters.coordinates.includes.push(full_match(pattern)?);
        Ok(self)
    }

    /// Excludes artifacts whose `groupId:artifactId` matches the pattern
    pub fn exclude_ga(&mut self, pattern: &str) -> anyhow::Result<&mut Self> {
        self.filters.coordinates.excludes.push(full_match(pattern)?);
        Ok(self)
    }

    /// Includes artifacts whose groupId contains a match of the fragment
    pub fn include_group(&mut self, fragment: &str) -> anyhow::Result<&mut Self> {
        self.include_ga(&group_pattern(fragment))
    }

    pub fn exclude_group(&mut self, fragment: &str) -> anyhow::Result<&mut Self> {
        self.exclude_ga(&group_pattern(fragment))
    }

    /// Includes artifacts whose artifactId contains a match of the fragment
    pub fn include_artifact(&mut self, fragment: &str) -> anyhow::Result<&mut Self> {
        self.include_ga(&artifact_pattern(fragment))
    }

    pub fn exclude_artifact(&mut self, fragment: &str) -> anyhow::Result<&mut Self> {
        self.exclude_ga(&artifact_pattern(fragment))
    }

    pub fn include_scope(&mut self, scope: &str) -> &mut Self {
        self.filters.scopes.includes.push(scope.to_owned());
        self
    }

    pub fn exclude_scope(&mut self, scope: &str) -> &mut Self {
        self.filters.scopes.excludes.push(scope.to_owned());
        self
    }

    pub fn include_type(&mut self, kind: &str) -> &mut Self {
        self.filters.types.includes.push(kind.to_owned());
        self
    }

    pub fn exclude_type(&mut self, kind: &str) -> &mut Self {
        self.filters.types.excludes.push(kind.to_owned());
        self
    }

    pub fn include_optional(&mut self, include: bool) -> &mut Self {
        self.filters.include_optional = include;
        self
    }

    /// Applies a filter script, one rule per line:
    ///
    /// ```text
    /// # comment
    /// include gaPattern org\.example:.*
    /// exclude scope test
    /// exclude type pom
    /// include optional false
    /// ```
    pub fn script(&mut self, script: &str, source: &str) -> anyhow::Result<&mut Self> {
        for (i, line) in script.lines().enumerate() {
            let line_no = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let tokens: Vec<_> = line.split_whitespace().collect();
            let &[action, kind, value] = tokens.as_slice() else {
                anyhow::bail!(
                    "invalid artifact filter at line {line_no} of '{source}': expected 3 tokens but found {}",
                    tokens.len()
                );
            };

            match (action, kind) {
                ("include", "gaPattern") => {
                    self.include_ga(value).with_context(|| {
                        format!("invalid artifact filter at line {line_no} of '{source}'")
                    })?;
                }
                ("exclude", "gaPattern") => {
                    self.exclude_ga(value).with_context(|| {
                        format!("invalid artifact filter at line {line_no} of '{source}'")
                    })?;
                }
                ("include", "scope") => {
                    self.include_scope(value);
                }
                ("exclude", "scope") => {
                    self.exclude_scope(value);
                }
                ("include", "type") => {
                    self.include_type(value);
                }
                ("exclude", "type") => {
                    self.exclude_type(value);
                }
                ("include", "optional") => {
                    let include = value.parse().map_err(|_err| {
                        anyhow::anyhow!(
                            "invalid artifact filter at line {line_no} of '{source}': '{value}' is not a boolean"
                        )
                    })?;
                    self.include_optional(include);
                }
                ("include" | "exclude", kind) => {
                    anyhow::bail!(
                        "invalid artifact filter at line {line_no} of '{source}': unsupported filter '{kind}' for '{action}'"
                    );
                }
                (action, _) => {
                    anyhow::bail!(
                        "invalid artifact filter at line {line_no} of '{source}': unknown action '{action}'"
                    );
                }
            }
        }

        Ok(self)
    }

    #[inline]
    pub fn build(self) -> ArtifactFilters {
        self.filters
    }
}

#[inline]
fn group_pattern(fragment: &str) -> String {
    format!("[^:]*({fragment})[^:]*:[^:]+")
}

#[inline]
fn artifact_pattern(fragment: &str) -> String {
    format!("[^:]+:[^:]*({fragment})[^:]*")
}
