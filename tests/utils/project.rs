use anyhow::{Result, anyhow};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

pub const POM_FILENAME: &str = "pom.xml";
pub const GRAPH_FILENAME: &str = "dependencies.json";
pub const ABOUT_CONFIG_FILENAME: &str = "about.toml";
pub const ABOUT_TEMPLATE_FILENAME: &str = "third-party.hbs";
pub const MISSING_FILENAME: &str = "THIRD-PARTY.properties";

const ROOT_ID: &str = "com.acme:app:jar:1.0";

pub struct Project {
    pub dir: TempDir,
    pub template_filename: Option<String>,
}

impl Project {
    pub fn template(&self) -> Result<&str> {
        match self.template_filename.as_ref() {
            Some(template) => Ok(template),
            None => Err(anyhow!("project has no template")),
        }
    }

    pub fn read(&self, filename: &str) -> Result<String> {
        Ok(std::fs::read_to_string(self.dir.child(filename).path())?)
    }

    pub fn builder() -> ProjectBuilder {
        ProjectBuilder::default()
    }
}

impl Debug for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Project")?;
        for filename in [GRAPH_FILENAME, ABOUT_CONFIG_FILENAME] {
            writeln!(f, "{filename}:")?;
            writeln!(
                f,
                "{}",
                std::fs::read_to_string(self.dir.child(filename))
                    .unwrap_or_else(|_| "Couldn't read file.".into())
            )?;
        }
        Ok(())
    }
}

/// `group:artifact:version` to the raw `group:artifact:jar:version` id
fn raw_id(coords: &str) -> String {
    let parts: Vec<_> = coords.split(':').collect();
    format!("{}:{}:jar:{}", parts[0], parts[1], parts[2])
}

pub struct ProjectBuilder {
    artifacts: Vec<Value>,
    config: Vec<(String, toml_edit::Item)>,
    files: HashMap<String, String>,
    excludes: HashSet<String>,
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        ProjectBuilder {
            artifacts: Vec::new(),
            config: vec![(
                "local-repository".to_owned(),
                toml_edit::value("repository"),
            )],
            files: HashMap::new(),
            excludes: HashSet::new(),
        }
    }
}

impl ProjectBuilder {
    #[allow(dead_code)]
    pub fn no_about_config(&mut self) -> &mut Self {
        self.excludes.insert(ABOUT_CONFIG_FILENAME.into());
        self
    }

    pub fn no_template(&mut self) -> &mut Self {
        self.excludes.insert(ABOUT_TEMPLATE_FILENAME.into());
        self
    }

    pub fn no_graph(&mut self) -> &mut Self {
        self.excludes.insert(GRAPH_FILENAME.into());
        self
    }

    pub fn file(&mut self, filename: &str, content: &str) -> &mut Self {
        self.files.insert(filename.into(), content.into());
        self
    }

    /// Sets a key of the about.toml
    pub fn config(&mut self, key: &str, value: impl Into<toml_edit::Value>) -> &mut Self {
        self.config
            .push((key.to_owned(), toml_edit::Item::Value(value.into())));
        self
    }

    pub fn config_list(&mut self, key: &str, values: &[&str]) -> &mut Self {
        self.config(key, values.iter().copied().collect::<toml_edit::Array>())
    }

    /// Adds a direct compile dependency declaring the licenses
    pub fn dependency(&mut self, coords: &str, licenses: &[&str]) -> &mut Self {
        self.artifact(coords, "compile", &[], licenses)
    }

    /// Adds a compile dependency pulled in through the other dependencies
    pub fn transitive(&mut self, via: &[&str], coords: &str, licenses: &[&str]) -> &mut Self {
        self.artifact(coords, "compile", via, licenses)
    }

    pub fn artifact(
        &mut self,
        coords: &str,
        scope: &str,
        via: &[&str],
        licenses: &[&str],
    ) -> &mut Self {
        let parts: Vec<_> = coords.split(':').collect();

        let mut trail = vec![ROOT_ID.to_owned()];
        trail.extend(via.iter().map(|v| raw_id(v)));
        trail.push(raw_id(coords));

        let licenses: Vec<_> = licenses.iter().map(|l| json!({ "name": l })).collect();

        self.artifacts.push(json!({
            "groupId": parts[0],
            "artifactId": parts[1],
            "version": parts[2],
            "scope": scope,
            "trail": trail,
            "metadata": { "licenses": licenses },
        }));
        self
    }

    /// Adds a direct dependency whose project metadata is not available
    pub fn broken(&mut self, coords: &str) -> &mut Self {
        self.dependency(coords, &[]);
        if let Some(Value::Object(artifact)) = self.artifacts.last_mut() {
            artifact.remove("metadata");
        }
        self
    }

    /// Attaches metadata messages to the last added artifact
    pub fn messages(&mut self, messages: &[&str]) -> &mut Self {
        if let Some(metadata) = self
            .artifacts
            .last_mut()
            .and_then(|artifact| artifact.get_mut("metadata"))
        {
            metadata["messages"] = json!(messages);
        }
        self
    }

    fn not_overridden_or_excluded(&self, filename: &str) -> bool {
        !self.files.contains_key(filename) && !self.excludes.contains(filename)
    }

    fn write_default_pom(&self, dir: &TempDir) -> Result<()> {
        if self.not_overridden_or_excluded(POM_FILENAME) {
            dir.child(POM_FILENAME).write_str(
                "<project>\n  <groupId>com.acme</groupId>\n  <artifactId>app</artifactId>\n  <version>1.0</version>\n</project>\n",
            )?;
        }

        Ok(())
    }

    fn write_default_graph(&self, dir: &TempDir) -> Result<()> {
        if self.not_overridden_or_excluded(GRAPH_FILENAME) {
            let graph = json!({
                "project": { "groupId": "com.acme", "artifactId": "app", "version": "1.0" },
                "artifacts": self.artifacts,
            });

            dir.child(GRAPH_FILENAME)
                .write_str(&serde_json::to_string_pretty(&graph)?)?;
        }

        Ok(())
    }

    fn write_default_about_config(&self, dir: &TempDir) -> Result<()> {
        if self.not_overridden_or_excluded(ABOUT_CONFIG_FILENAME) {
            let mut config = toml_edit::DocumentMut::new();
            for (key, value) in &self.config {
                config[key.as_str()] = value.clone();
            }

            dir.child(ABOUT_CONFIG_FILENAME)
                .write_str(&config.to_string())?;
        }

        Ok(())
    }

    fn write_default_template_if_absent(&self, dir: &TempDir) -> Result<()> {
        if self.not_overridden_or_excluded(ABOUT_TEMPLATE_FILENAME) {
            // Counts the overview and licenses elements by repeating a
            // single letter, handlebars has no way to print the length
            let template = "\
#o:[{{#each overview}}o{{/each}}]
#l:[{{#each licenses}}l{{/each}}]
#u:[{{#each unknown}}u{{/each}}]
{{#each dependencies}}
{{dependency.groupId}}:{{dependency.artifactId}} = {{#each licenses}}[{{this}}]{{/each}}
{{/each}}";

            dir.child(ABOUT_TEMPLATE_FILENAME).write_str(template)?;
        }

        Ok(())
    }

    fn write_files(&self, dir: &TempDir) -> Result<()> {
        for (filename, content) in &self.files {
            dir.child(filename).write_str(content)?;
        }

        Ok(())
    }

    pub fn build(&self) -> Result<Project> {
        let dir = TempDir::new()?;

        self.write_default_pom(&dir)?;
        self.write_default_graph(&dir)?;
        self.write_default_about_config(&dir)?;
        self.write_default_template_if_absent(&dir)?;
        self.write_files(&dir)?;

        Ok(Project {
            dir,
            template_filename: if self.excludes.contains(ABOUT_TEMPLATE_FILENAME) {
                None
            } else {
                Some(ABOUT_TEMPLATE_FILENAME.into())
            },
        })
    }
}
