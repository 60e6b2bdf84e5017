use crate::utils::Project;

use anyhow::Result;
use assert_cmd::assert::Assert;
use assert_cmd::prelude::*;
use std::process::Command;

pub struct MvnAbout {
    cmd: Command,
}

impl MvnAbout {
    pub fn new(project: &Project) -> Result<Self> {
        let mut cmd = Command::cargo_bin("mvn-about")?;
        cmd.current_dir(&project.dir).arg("--offline");
        Ok(MvnAbout { cmd })
    }

    pub fn arg(&mut self, arg: &str) -> &mut Self {
        self.cmd.arg(arg);
        self
    }

    pub fn log_level(&mut self, level: &str) -> &mut Self {
        self.arg("-L").arg(level)
    }

    pub fn init(&mut self) -> &mut Self {
        self.arg("init")
    }

    pub fn generate(&mut self) -> &mut Self {
        self.arg("generate")
    }

    pub fn licenses_xml(&mut self) -> &mut Self {
        self.arg("licenses-xml")
    }

    pub fn template(&mut self, template: &str) -> &mut Self {
        self.arg("-t").arg(template)
    }

    pub fn assert(&mut self) -> Assert {
        self.cmd.assert()
    }
}
