use crate::utils::*;

use anyhow::Result;
use assert_fs::prelude::*;
use predicates::prelude::*;

#[test]
fn fails_when_graph_absent() -> Result<()> {
    let project = Project::builder().no_graph().build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "unable to read dependency graph",
        ));

    Ok(())
}

#[test]
fn fails_when_graph_invalid() -> Result<()> {
    let project = Project::builder().file(GRAPH_FILENAME, "{}").build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid dependency graph"));

    Ok(())
}

#[test]
fn falls_back_to_default_about_config_when_absent() -> Result<()> {
    let project = Project::builder()
        .no_about_config()
        .dependency("org.example:foo:1.0", &["MIT"])
        .build()?;

    MvnAbout::new(&project)?
        .log_level("info")
        .generate()
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "no 'about.toml' found, falling back to default configuration",
        ))
        .stdout(predicate::str::contains("(MIT) org.example:foo:1.0"));

    Ok(())
}

#[test]
fn fails_on_unknown_config_keys() -> Result<()> {
    let project = Project::builder().config("accepted", "MIT").build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .failure()
        .stderr(predicate::str::contains("unable to parse config"));

    Ok(())
}

#[test]
fn fails_when_template_file_missing() -> Result<()> {
    let project = Project::builder().no_template().build()?;

    MvnAbout::new(&project)?
        .generate()
        .template("non-existent.hbs")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "template(s) path non-existent.hbs does not exist",
        ));

    Ok(())
}

#[test]
fn reports_no_dependencies() -> Result<()> {
    let project = Project::builder().build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .success()
        .stdout(predicate::str::contains("The project has no dependencies."));

    Ok(())
}

#[test]
fn renders_template() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:a:1.0", &["MIT"])
        .dependency("org.example:b:1.0", &["Apache-2.0", "MIT"])
        .dependency("org.example:c:1.0", &[])
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .template(project.template()?)
        .assert()
        .success()
        .stdout(overview_count(2))
        .stdout(licenses_count(2))
        .stdout(unknown_count(1))
        .stdout(listed_with("org.example:b", &["Apache-2.0", "MIT"]))
        .stdout(listed_with("org.example:c", &["Unknown license"]));

    Ok(())
}

#[test]
fn outputs_json() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:a:1.0", &["MIT"])
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""artifactId": "a""#))
        .stdout(predicate::str::contains(r#""name": "MIT""#));

    Ok(())
}

#[test]
fn filters_excluded_scopes_and_groups() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:kept:1.0", &["MIT"])
        .artifact("org.example:tests:1.0", "test", &[], &["EPL-2.0"])
        .dependency("com.internal:lib:1.0", &["Proprietary"])
        .config_list("excluded-scopes", &["system", "test"])
        .config_list("excluded-groups", &["internal"])
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .success()
        .stdout(predicate::str::contains("org.example:kept:1.0"))
        .stdout(predicate::str::contains("org.example:tests").not())
        .stdout(predicate::str::contains("com.internal").not());

    Ok(())
}

#[test]
fn excludes_transitive_dependencies_of_excluded_artifacts() -> Result<()> {
    let project = Project::builder()
        .dependency("com.internal:lib:1.0", &["Proprietary"])
        .transitive(&["com.internal:lib:1.0"], "org.example:pulled:1.0", &["MIT"])
        .dependency("org.example:direct:1.0", &["MIT"])
        .config_list("excluded-groups", &["internal"])
        .config("exclude-transitive-dependencies", true)
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .success()
        .stdout(predicate::str::contains("org.example:direct:1.0"))
        .stdout(predicate::str::contains("org.example:pulled").not());

    Ok(())
}

#[test]
fn resolves_from_missing_file() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &[])
        .dependency("org.example:bar:1.0", &["MIT"])
        .config("missing-file", MISSING_FILENAME)
        .file(
            MISSING_FILENAME,
            "org.example--foo--1.0=Apache-2.0\norg.example--gone--1.0=MIT\n",
        )
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .template(project.template()?)
        .assert()
        .success()
        .stdout(unknown_count(0))
        .stdout(listed_with("org.example:foo", &["Apache-2.0"]))
        .stderr(stale_key_warning("org.example--gone--1.0"));

    let missing = project.read(MISSING_FILENAME)?;
    assert!(missing.contains("org.example--foo--1.0=Apache-2.0\n"));
    assert!(!missing.contains("gone"));
    assert!(missing.contains("#  - Apache-2.0"));

    Ok(())
}

#[test]
fn writes_blank_entries_for_unresolved_dependencies() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &[])
        .config("missing-file", "src/license/THIRD-PARTY.properties")
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .success()
        .stderr(predicate::str::contains("org.example:foo:1.0"));

    let missing = project.read("src/license/THIRD-PARTY.properties")?;
    assert!(missing.contains("Please fill the missing licenses for dependencies"));
    assert!(missing.contains("org.example--foo--1.0=\n"));

    Ok(())
}

#[test]
fn regenerates_missing_file_given_as_file_url() -> Result<()> {
    let project = Project::builder()
        .no_about_config()
        .dependency("org.example:foo:1.0", &[])
        .build()?;

    let missing = project.dir.child(MISSING_FILENAME);
    let url = url::Url::from_file_path(missing.path())
        .map_err(|()| anyhow::anyhow!("'{}' is not absolute", missing.path().display()))?;
    project
        .dir
        .child(ABOUT_CONFIG_FILENAME)
        .write_str(&format!("missing-file = \"{url}\"\n"))?;

    MvnAbout::new(&project)?.generate().assert().success();

    assert!(!project.dir.child("file:").path().exists());
    assert!(project.read(MISSING_FILENAME)?.contains("org.example--foo--1.0=\n"));

    Ok(())
}

#[test]
fn fails_on_missing_licenses() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &[])
        .config("missing-file", MISSING_FILENAME)
        .config("fail-on-missing", true)
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "there are 1 dependencies with no license, please fill the missing file 'THIRD-PARTY.properties'",
        ));

    // The missing file is still regenerated so that it can be filled in
    assert!(project.read(MISSING_FILENAME)?.contains("org.example--foo--1.0="));

    Ok(())
}

#[test]
fn resolves_from_third_party_descriptors() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:parent:1.0", &["MIT"])
        .transitive(&["org.example:parent:1.0"], "org.example:child:2.0", &[])
        .file(
            "repository/org/example/parent/1.0/parent-1.0-third-party.properties",
            "org.example--child--2.0--jar=BSD-3-Clause\n",
        )
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .template(project.template()?)
        .assert()
        .success()
        .stdout(unknown_count(0))
        .stdout(listed_with("org.example:child", &["BSD-3-Clause"]));

    Ok(())
}

#[test]
fn overrides_replace_licenses() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &["GPL-2.0", "MIT"])
        .config("override-file", "override.properties")
        .file("override.properties", "org.example--foo--1.0=Apache-2.0\n")
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .template(project.template()?)
        .assert()
        .success()
        .stdout(licenses_count(1))
        .stdout(listed_with("org.example:foo", &["Apache-2.0"]));

    Ok(())
}

#[test]
fn merges_licenses() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:a:1.0", &["ASL 2"])
        .dependency("org.example:b:1.0", &["The Apache Software License, Version 2.0"])
        .config_list(
            "license-merges",
            &["Apache-2.0 | ASL 2 | The Apache Software License, Version 2.0"],
        )
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .template(project.template()?)
        .assert()
        .success()
        .stdout(licenses_count(1))
        .stdout(listed_with("org.example:a", &["Apache-2.0"]))
        .stdout(listed_with("org.example:b", &["Apache-2.0"]));

    Ok(())
}

#[test]
fn fails_on_duplicate_merges() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:a:1.0", &["MIT"])
        .config_list("license-merges", &["MIT | Expat", "X11 | Expat"])
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "license 'Expat' is merged more than once",
        ));

    Ok(())
}

#[test]
fn fails_on_blacklisted_licenses() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:a:1.0", &["MIT"])
        .dependency("org.example:b:1.0", &["GPL-3.0"])
        .config_list("excluded-licenses", &["GPL-3.0"])
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .success()
        .stderr(predicate::str::contains("license 'GPL-3.0' is not allowed"));

    MvnAbout::new(&project)?
        .generate()
        .arg("--fail-on-blacklist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 license(s) are not allowed: GPL-3.0"));

    Ok(())
}

#[test]
fn applies_license_matchers() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &["Some License"])
        .dependency("org.example:bar:1.0", &[])
        .config_list("license-matchers", &["licenses.xml"])
        .file(
            "licenses.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?>
<licenseSummary>
  <dependencies>
    <dependency>
      <groupId>org\.example</groupId>
      <artifactId>foo</artifactId>
      <matchLicenses>
        <license>
          <name>Some\s+License</name>
        </license>
      </matchLicenses>
      <licenses>
        <license>
          <name>Apache-2.0</name>
        </license>
      </licenses>
    </dependency>
    <dependency>
      <groupId>org.example</groupId>
      <artifactId>bar</artifactId>
      <licenses>
        <license>
          <name>MIT</name>
        </license>
      </licenses>
    </dependency>
  </dependencies>
</licenseSummary>
"#,
        )
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .template(project.template()?)
        .assert()
        .success()
        .stdout(unknown_count(0))
        .stdout(listed_with("org.example:foo", &["Apache-2.0"]))
        .stdout(listed_with("org.example:bar", &["MIT"]));

    Ok(())
}

#[test]
fn writes_output_file() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:a:1.0", &["MIT"])
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .arg("-o")
        .arg("THIRD-PARTY.txt")
        .assert()
        .success()
        .stdout("");

    assert!(project.read("THIRD-PARTY.txt")?.contains("(MIT) org.example:a:1.0"));

    Ok(())
}

#[test]
fn reports_artifacts_without_metadata() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:fine:1.0", &["MIT"])
        .broken("org.example:broken:1.0")
        .build()?;

    MvnAbout::new(&project)?
        .generate()
        .assert()
        .success()
        .stderr(predicate::str::contains(
            "unable to build metadata for 'org.example:broken:jar:1.0'",
        ))
        .stderr(predicate::str::contains(
            "1 artifact(s) were skipped as their metadata could not be built",
        ))
        .stdout(predicate::str::contains("(MIT) org.example:fine:1.0"))
        .stdout(predicate::str::contains(
            "1 artifact(s) could not be inspected:\n     org.example:broken:jar:1.0: ",
        ));

    MvnAbout::new(&project)?
        .generate()
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""id": "org.example:broken:jar:1.0""#));

    Ok(())
}
