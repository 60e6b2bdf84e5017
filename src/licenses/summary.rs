//! The license summary (`licenses.xml`) format, which doubles as the format
//! of license matcher files:
//!
//! ```xml
//! <licenseSummary>
//!   <dependencies>
//!     <dependency>
//!       <groupId>org.example</groupId>
//!       <artifactId>foo</artifactId>
//!       <version>1.0</version>
//!       <matchLicenses>
//!         <license><name>Apache.*</name></license>
//!       </matchLicenses>
//!       <licenses>
//!         <license><name>Apache-2.0</name></license>
//!       </licenses>
//!     </dependency>
//!   </dependencies>
//! </licenseSummary>
//! ```

use super::LicenseEntry;
use crate::Dependency;
use anyhow::Context as _;
use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use regex::Regex;

/// A `<dependency>` element of a license summary
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SummaryEntry {
    pub group_id: String,
    pub artifact_id: String,
    pub version: Option<String>,
    pub licenses: Vec<LicenseEntry>,
    /// Present when the entry has a `<matchLicenses>` block, even an empty one
    pub match_licenses: Option<Vec<LicenseEntry>>,
    /// Set by `<licenses approved="true">`
    pub approved: bool,
    pub messages: Vec<String>,
}

fn append(target: &mut Option<String>, text: &str) {
    target.get_or_insert_with(String::new).push_str(text);
}

fn is_approved(e: &BytesStart<'_>, source: &str, position: u64) -> anyhow::Result<bool> {
    let Some(attr) = e.try_get_attribute("approved")? else {
        return Ok(false);
    };

    let value = attr.unescape_value()?;
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        other => anyhow::bail!(
            "unsupported value '{other}' for 'approved' in '{source}' at position {position}"
        ),
    }
}

/// Reads the first `<dependencies>` element of a license summary
pub fn read(xml: &str, source: &str) -> anyhow::Result<Vec<SummaryEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut entry: Option<SummaryEntry> = None;
    let mut license: Option<LicenseEntry> = None;
    let mut field: Option<String> = None;

    loop {
        let event = reader
            .read_event()
            .with_context(|| format!("failed to parse '{source}' at position {}", reader.buffer_position()))?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                let parent = path.last().map(String::as_str);

                match (parent, name.as_str()) {
                    (Some("dependencies"), "dependency") => {
                        entry = Some(SummaryEntry::default());
                    }
                    (Some("dependency"), "licenses") => {
                        if let Some(entry) = entry.as_mut() {
                            entry.approved = is_approved(e, source, reader.buffer_position())?;
                        }
                    }
                    (Some("dependency"), "matchLicenses") => {
                        if let Some(entry) = entry.as_mut() {
                            entry.match_licenses.get_or_insert_with(Vec::new);
                        }
                    }
                    (Some("licenses" | "matchLicenses"), "license") => {
                        license = Some(LicenseEntry::default());
                    }
                    (Some("dependency" | "license"), _) | (Some("downloaderMessages"), _) => {
                        field = Some(String::new());
                    }
                    _ => {}
                }

                if is_empty {
                    if close(&name, &path, &mut entry, &mut license, &mut field, &mut entries, source)? {
                        break;
                    }
                } else {
                    path.push(name);
                }
            }
            Event::End(ref e) => {
                let name = String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned();
                path.pop();

                if close(&name, &path, &mut entry, &mut license, &mut field, &mut entries, source)? {
                    break;
                }
            }
            Event::Text(ref e) => {
                let text = e.unescape().with_context(|| format!("invalid text in '{source}'"))?;
                if let Some(field) = field.as_mut() {
                    field.push_str(&text);
                }
            }
            Event::CData(ref e) => {
                if let Some(field) = field.as_mut() {
                    field.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Handles the end of an element, returns true once the first
/// `<dependencies>` element has been read entirely
fn close(
    name: &str,
    path: &[String],
    entry: &mut Option<SummaryEntry>,
    license: &mut Option<LicenseEntry>,
    field: &mut Option<String>,
    entries: &mut Vec<SummaryEntry>,
    source: &str,
) -> anyhow::Result<bool> {
    let parent = path.last().map(String::as_str);

    match (parent, name) {
        (Some("dependencies"), "dependency") => {
            if let Some(entry) = entry.take() {
                anyhow::ensure!(
                    !(entry.approved && !entry.licenses.is_empty()),
                    "'{source}': licenses of '{}:{}' are approved and must not declare any license",
                    entry.group_id,
                    entry.artifact_id
                );
                entries.push(entry);
            }
        }
        (Some(_), "dependencies") if entry.is_none() => return Ok(true),
        (Some("licenses"), "license") => {
            if let (Some(entry), Some(license)) = (entry.as_mut(), license.take()) {
                entry.licenses.push(license);
            }
        }
        (Some("matchLicenses"), "license") => {
            if let (Some(entry), Some(license)) = (entry.as_mut(), license.take()) {
                entry.match_licenses.get_or_insert_with(Vec::new).push(license);
            }
        }
        (Some("dependency"), _) => {
            let value = field.take().unwrap_or_default();
            if let Some(entry) = entry.as_mut() {
                match name {
                    "groupId" => entry.group_id = value.trim().to_owned(),
                    "artifactId" => entry.artifact_id = value.trim().to_owned(),
                    "version" => entry.version = Some(value.trim().to_owned()),
                    _ => {}
                }
            }
        }
        (Some("license"), _) => {
            let value = field.take().unwrap_or_default();
            if let Some(license) = license.as_mut() {
                match name {
                    "name" => append(&mut license.name, &value),
                    "url" => append(&mut license.url, &value),
                    "distribution" => append(&mut license.distribution, &value),
                    "comments" => append(&mut license.comments, &value),
                    "file" => append(&mut license.file, &value),
                    _ => {}
                }
            }
        }
        (Some("downloaderMessages"), "downloaderMessage") => {
            let value = field.take().unwrap_or_default();
            if let Some(entry) = entry.as_mut() {
                entry.messages.push(value);
            }
        }
        _ => {}
    }

    Ok(false)
}

fn text_element<W: std::io::Write>(w: &mut Writer<W>, name: &str, value: &str) -> anyhow::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(value)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn comment<W: std::io::Write>(w: &mut Writer<W>, text: &str) -> anyhow::Result<()> {
    // `--` is not allowed inside comments
    let text = format!(" {} ", text.replace("--", "- -"));
    w.write_event(Event::Comment(BytesText::from_escaped(text)))?;
    Ok(())
}

fn license_element<W: std::io::Write>(
    w: &mut Writer<W>,
    license: &LicenseEntry,
    escape: Option<&Regex>,
) -> anyhow::Result<()> {
    w.write_event(Event::Start(BytesStart::new("license")))?;

    for (name, value) in [
        ("name", &license.name),
        ("url", &license.url),
        ("distribution", &license.distribution),
        ("file", &license.file),
        ("comments", &license.comments),
    ] {
        let Some(value) = value else {
            continue;
        };

        match escape {
            Some(whitespace) => text_element(w, name, &pattern_of(value, whitespace))?,
            None => text_element(w, name, value)?,
        }
    }

    w.write_event(Event::End(BytesEnd::new("license")))?;
    Ok(())
}

/// Turns literal text into a regular expression matching it, where any run
/// of two or more whitespace characters matches any run of whitespace
fn pattern_of(text: &str, whitespace: &Regex) -> String {
    whitespace
        .split(text)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+")
}

/// Writes the dependencies as a license summary. Dependencies with
/// diagnostic messages get a `matchLicenses` block matching their current
/// licenses, so that the file can be edited and reused as license matchers.
pub fn write<'d>(
    deps: impl IntoIterator<Item = &'d Dependency>,
    write_versions: bool,
) -> anyhow::Result<String> {
    let whitespace = Regex::new(r"\s{2,}")?;
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
    w.write_event(Event::Start(BytesStart::new("licenseSummary")))?;
    w.write_event(Event::Start(BytesStart::new("dependencies")))?;

    for dep in deps {
        w.write_event(Event::Start(BytesStart::new("dependency")))?;
        text_element(&mut w, "groupId", &dep.id.group_id)?;
        text_element(&mut w, "artifactId", &dep.id.artifact_id)?;

        if write_versions {
            text_element(&mut w, "version", &dep.id.version)?;
        }

        if !dep.messages.is_empty() {
            if !write_versions {
                comment(&mut w, &format!("version {}", dep.id.version))?;
            }

            comment(
                &mut w,
                "Remove the matchLicenses block to match any license of this dependency",
            )?;
            w.write_event(Event::Start(BytesStart::new("matchLicenses")))?;
            if dep.licenses.is_empty() {
                comment(&mut w, "No license information available.")?;
            }
            for license in &dep.licenses {
                license_element(&mut w, license, Some(&whitespace))?;
            }
            w.write_event(Event::End(BytesEnd::new("matchLicenses")))?;
        }

        w.write_event(Event::Start(BytesStart::new("licenses")))?;
        if dep.licenses.is_empty() {
            comment(&mut w, "No license information available.")?;
        }
        for license in &dep.licenses {
            license_element(&mut w, license, None)?;
        }
        w.write_event(Event::End(BytesEnd::new("licenses")))?;

        if !dep.messages.is_empty() {
            w.write_event(Event::Start(BytesStart::new("downloaderMessages")))?;
            for message in &dep.messages {
                text_element(&mut w, "downloaderMessage", message)?;
            }
            w.write_event(Event::End(BytesEnd::new("downloaderMessages")))?;
        }

        w.write_event(Event::End(BytesEnd::new("dependency")))?;
    }

    w.write_event(Event::End(BytesEnd::new("dependencies")))?;
    w.write_event(Event::End(BytesEnd::new("licenseSummary")))?;

    let mut xml = String::from_utf8(w.into_inner()).context("license summary is not utf-8")?;
    xml.push('\n');
    Ok(xml)
}
