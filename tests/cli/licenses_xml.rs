use crate::utils::*;

use anyhow::Result;
use assert_fs::prelude::*;
use predicates::prelude::*;

#[test]
fn writes_license_summary() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &["MIT"])
        .dependency("org.example:bar:2.0", &[])
        .build()?;

    MvnAbout::new(&project)?
        .licenses_xml()
        .assert()
        .success();

    project
        .dir
        .child("licenses.xml")
        .assert(predicate::path::exists());

    let xml = project.read("licenses.xml")?;
    assert!(xml.contains("<artifactId>foo</artifactId>"));
    assert!(xml.contains("<name>MIT</name>"));
    assert!(xml.contains("No license information available."));
    assert!(!xml.contains("<version>"));

    Ok(())
}

#[test]
fn writes_versions_when_asked() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &["MIT"])
        .build()?;

    MvnAbout::new(&project)?
        .licenses_xml()
        .arg("--write-versions")
        .arg("-o")
        .arg("target/licenses.xml")
        .assert()
        .success();

    let xml = project.read("target/licenses.xml")?;
    assert!(xml.contains("<version>1.0</version>"));

    Ok(())
}

#[test]
fn written_summary_can_be_used_as_matchers() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &["MIT"])
        .config_list("license-matchers", &["licenses.xml"])
        .file("licenses.xml", "<licenseSummary><dependencies/></licenseSummary>")
        .build()?;

    MvnAbout::new(&project)?
        .licenses_xml()
        .assert()
        .success();

    MvnAbout::new(&project)?
        .generate()
        .template(project.template()?)
        .assert()
        .success()
        .stdout(listed_with("org.example:foo", &["MIT"]));

    Ok(())
}

#[test]
fn writes_metadata_messages() -> Result<()> {
    let project = Project::builder()
        .dependency("org.example:foo:1.0", &["Some License"])
        .messages(&["unable to download license text"])
        .build()?;

    MvnAbout::new(&project)?
        .licenses_xml()
        .assert()
        .success();

    let xml = project.read("licenses.xml")?;
    assert!(xml.contains("<downloaderMessage>unable to download license text</downloaderMessage>"));
    assert!(xml.contains("<matchLicenses>"));

    Ok(())
}
