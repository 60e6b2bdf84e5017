use anyhow::{Context as _, anyhow, bail};
use handlebars::Handlebars;
use mvn_about::{
    generate::{ThirdPartyReport, generate},
    licenses::{
        self, LicenseMap, UNKNOWN_LICENSE, fetch, properties::Properties,
        repository::LocalRepository, resolution,
    },
};
use std::path::{Path, PathBuf};

#[derive(clap::Parser, Debug)]
pub struct Args {
    /// The dependency graph of each module of the build
    #[clap(short, long, default_value = "dependencies.json")]
    pub graph: Vec<PathBuf>,
    /// The name of the template to use when rendering. If only passing a
    /// single template file to `templates` this is not used.
    #[clap(short, long)]
    name: Option<String>,
    /// The template or template directory to use. Must either be a .hbs or
    /// have at least one .hbs file in it
    #[clap(short, long)]
    templates: Option<PathBuf>,
    /// Outputs the report as JSON instead of rendering it
    #[clap(long, conflicts_with = "templates")]
    json: bool,
    /// A file to write the generated output to.
    #[clap(short = 'o', long = "output-file")]
    output_file: Option<PathBuf>,
    /// Fails if any dependency is left without a license, in addition to
    /// the `fail-on-missing` configuration
    #[clap(long)]
    fail_on_missing: bool,
    /// Fails if any dependency uses a license that is not allowed, in
    /// addition to the `fail-on-blacklist` configuration
    #[clap(long)]
    fail_on_blacklist: bool,
}

fn load_templates(
    templates: &Path,
    name: Option<&str>,
) -> anyhow::Result<(Handlebars<'static>, String)> {
    use handlebars::*;

    if !templates.exists() {
        bail!("template(s) path {} does not exist", templates.display());
    }

    let mut reg = Handlebars::new();

    reg.register_helper(
        "json",
        Box::new(
            |h: &Helper<'_>,
             _r: &Handlebars<'_>,
             _: &Context,
             _rc: &mut RenderContext<'_, '_>,
             out: &mut dyn Output|
             -> HelperResult {
                let param = h
                    .param(0)
                    .ok_or_else(|| RenderErrorReason::ParamNotFoundForIndex("json", 0))?;

                out.write(
                    &serde_json::to_string_pretty(param.value())
                        .map_err(RenderErrorReason::from)?,
                )?;
                Ok(())
            },
        ),
    );

    if templates.is_dir() {
        reg.register_templates_directory(templates, DirectorySourceOptions::default())?;

        if reg.get_templates().is_empty() {
            bail!(
                "template path {} did not contain any hbs files",
                templates.display()
            );
        }

        let name = name.context(
            "specified a directory for templates, but did not provide the name of the template to use",
        )?;

        Ok((reg, name.to_owned()))
    } else {
        // Ignore the extension, if the user says they want to use a specific file, that's on them
        reg.register_template_file("tmpl", templates)?;

        Ok((reg, "tmpl".to_owned()))
    }
}

/// The header of the regenerated missing file
fn missing_file_header(map: &LicenseMap<'_>) -> String {
    const RULE: &str =
        "-------------------------------------------------------------------------------";

    let mut header = String::from("Generated by mvn-about\n");

    let used: Vec<_> = map.keys().filter(|k| *k != UNKNOWN_LICENSE).collect();
    if !used.is_empty() {
        header.push_str(RULE);
        header.push_str("\nAlready used licenses in project :\n");
        for license in used {
            header.push_str(" - ");
            header.push_str(license);
            header.push('\n');
        }
    }

    header.push_str(RULE);
    header.push_str("\nPlease fill the missing licenses for dependencies :\n");
    header
}

fn write_missing_file(
    fetcher: &fetch::Fetcher,
    location: &str,
    map: &LicenseMap<'_>,
    mapping: &Properties,
) -> anyhow::Result<()> {
    let Some(path) = fetcher.local_path(location)? else {
        log::debug!("missing file '{location}' is not a local file, not regenerating it");
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("unable to create directory '{}'", parent.display()))?;
    }

    log::info!("regenerating missing license file '{}'", path.display());
    std::fs::write(&path, mapping.write(Some(&missing_file_header(map))))
        .with_context(|| format!("unable to write missing file '{}'", path.display()))
}

fn write_output(output_file: Option<&Path>, output: &str) -> anyhow::Result<()> {
    match output_file {
        None => println!("{output}"),
        Some(path) if path == Path::new("-") => println!("{output}"),
        Some(path) => {
            std::fs::write(path, output).map_err(|err| {
                anyhow!("output file {} could not be written: {err}", path.display())
            })?;
        }
    }

    Ok(())
}

pub fn cmd(args: Args, ctx: crate::Context) -> anyhow::Result<()> {
    let templates = args
        .templates
        .as_deref()
        .map(|templates| load_templates(templates, args.name.as_deref()))
        .transpose()?;

    let crate::Context { cfg, fetcher } = &ctx;
    let inventory = ctx.gather(&args.graph)?;
    let deps = &inventory.dependencies;

    let mut map = inventory.license_map();

    if let Some(location) = &cfg.override_file {
        match fetcher.fetch(location)? {
            Some(contents) => {
                let overrides = Properties::parse(&contents);
                resolution::override_licenses(&mut map, deps, &overrides, location);
            }
            None => log::warn!("override file '{location}' does not exist"),
        }
    }

    let had_unknown = map.unknown_dependencies().is_some();

    let loaded = resolution::load_mapping(
        fetcher,
        cfg.missing_file.as_deref(),
        cfg.missing_file_url.as_deref(),
    )?;

    let repository = if cfg.use_repository_missing_files {
        cfg.local_repository()
            .map(|repository| LocalRepository::new(fetcher.root().join(repository)))
    } else {
        None
    };

    let mut resolver = resolution::UnsafeResolver::new()
        .with_license_databases(inventory.license_databases.iter().cloned());
    if let Some(repository) = &repository {
        resolver = resolver.with_descriptors(repository);
    }

    let mapping = resolver.resolve(&mut map, deps, loaded.clone())?;

    licenses::merge_licenses(&mut map, &cfg.license_merges)?;

    if let Some(location) = &cfg.missing_file {
        if had_unknown || mapping != loaded {
            write_missing_file(fetcher, location, &map, &mapping)?;
        } else {
            log::info!("missing file '{location}' is up-to-date");
        }
    }

    let unknown = map.unknown_dependencies().map_or(0, |bucket| bucket.len());
    if let Some(bucket) = map.unknown_dependencies() {
        log::warn!("there are {} dependencies with no license:", bucket.len());
        for dep in bucket {
            log::warn!(" - {dep}");
        }
    }

    let violations = licenses::check_policy(&map, &cfg.included_licenses, &cfg.excluded_licenses);
    for violation in &violations {
        let deps = violation
            .dependencies
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        log::warn!("license '{}' is not allowed, used by: {deps}", violation.license);
    }

    let report: ThirdPartyReport<'_> = generate(&map, &inventory.failed);

    let output = if let Some((registry, template)) = &templates {
        registry.render(template, &report)?
    } else if args.json {
        serde_json::to_string_pretty(&report)?
    } else {
        report.to_text()
    };

    write_output(args.output_file.as_deref(), &output)?;

    if unknown > 0 && (args.fail_on_missing || cfg.fail_on_missing) {
        bail!(
            "there are {unknown} dependencies with no license, please fill the missing file{}",
            cfg.missing_file
                .as_deref()
                .map(|mf| format!(" '{mf}'"))
                .unwrap_or_default()
        );
    }

    if !violations.is_empty() && (args.fail_on_blacklist || cfg.fail_on_blacklist) {
        bail!(
            "{} license(s) are not allowed: {}",
            violations.len(),
            violations
                .iter()
                .map(|v| v.license.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    Ok(())
}
