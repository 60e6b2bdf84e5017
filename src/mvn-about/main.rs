#![warn(clippy::all)]
#![warn(rust_2018_idioms)]

use anyhow::{Context as _, Error, anyhow};
use clap::Parser;
use mvn_about::licenses::{
    self, Gatherer, Inventory, config::Config, fetch::Fetcher, filter::ArtifactFilters,
    graph::DependencyGraph, loader::ArtifactCache, matchers::LicenseMatchers,
};
use std::path::{Path, PathBuf};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod generate;
mod init;
mod licenses_xml;

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Resolves the licenses of every dependency and outputs a listing of
    /// all licenses and the dependencies that use them
    Generate(generate::Args),
    /// Writes a license summary of the dependencies, which can be edited
    /// and used as a license matcher file
    LicensesXml(licenses_xml::Args),
    /// Writes a default configuration and template
    Init(init::Args),
}

fn parse_level(s: &str) -> Result<log::LevelFilter, Error> {
    s.parse::<log::LevelFilter>()
        .map_err(|e| anyhow!("failed to parse level '{s}': {e}"))
}

#[derive(clap::Parser, Debug)]
#[clap(author, version, about)]
struct Opts {
    /// The log level for messages, only log messages at or above
    /// the level will be emitted.
    #[clap(
        short = 'L',
        long = "log-level",
        global = true,
        default_value = "warn",
        value_parser = parse_level,
        long_help = "The log level for messages, only log messages at or above the level will be emitted.

Possible values:
* off
* error
* warn
* info
* debug
* trace"
    )]
    log_level: log::LevelFilter,
    /// The about.toml to use, by default the closest one above the
    /// dependency graph is used
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    /// Disallows any network access
    #[clap(long, global = true)]
    offline: bool,
    #[clap(subcommand)]
    cmd: Command,
}

fn timestamp() -> String {
    let now = time::OffsetDateTime::now_utc();
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        now.year(),
        u8::from(now.month()),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

fn setup_logger(level: log::LevelFilter) -> Result<(), fern::InitError> {
    use log::Level::*;
    use nu_ansi_term::Color::*;

    fern::Dispatch::new()
        .level(log::LevelFilter::Warn)
        .level_for("mvn_about", level)
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{date} [{level}] {message}\x1B[0m",
                date = timestamp(),
                level = match record.level() {
                    Error => Red.paint("ERROR"),
                    Warn => Yellow.paint("WARN"),
                    Info => Green.paint("INFO"),
                    Debug => Blue.paint("DEBUG"),
                    Trace => Purple.paint("TRACE"),
                },
            ));
        })
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn read_config(path: &Path) -> Result<Config, Error> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read config '{}'", path.display()))?;
    let cfg = toml::from_str(&contents)
        .with_context(|| format!("unable to parse config '{}'", path.display()))?;

    log::info!("loaded config from {}", path.display());
    Ok(cfg)
}

/// Returns the configuration and the directory relative locations in it are
/// resolved against
fn load_config(start: &Path) -> Result<(Config, PathBuf), Error> {
    let mut parent = Some(start);

    // Move up through the modules of a multi-module build, so that an
    // about.toml at the top of the build applies to every module
    while let Some(p) = parent {
        let about_toml = p.join("about.toml");

        if about_toml.exists() {
            return Ok((read_config(&about_toml)?, p.to_owned()));
        }

        if !p.join("pom.xml").exists() {
            break;
        }

        parent = p.parent();
    }

    log::info!("no 'about.toml' found, falling back to default configuration");
    Ok((Config::default(), start.to_owned()))
}

/// State shared by the subcommands that work on dependency graphs
pub struct Context {
    pub cfg: Config,
    pub fetcher: Fetcher,
}

impl Context {
    /// Loads the explicit configuration, or the one closest to the first graph
    fn load(config: Option<&Path>, graphs: &[PathBuf], offline: bool) -> Result<Self, Error> {
        let (cfg, root) = match config {
            Some(path) => {
                let root = path.parent().map(Path::to_owned).unwrap_or_default();
                (read_config(path)?, root)
            }
            None => {
                let graph = graphs.first().context("no dependency graph was specified")?;
                let graph = std::env::current_dir()
                    .map(|cd| cd.join(graph))
                    .context("unable to determine current directory")?;

                match graph.parent() {
                    Some(dir) => load_config(dir)?,
                    None => load_config(&graph)?,
                }
            }
        };

        Self::new(cfg, root, offline)
    }

    fn new(cfg: Config, root: PathBuf, offline: bool) -> Result<Self, Error> {
        let http_client = if offline || cfg.offline {
            log::debug!("running offline");
            None
        } else {
            Some(
                reqwest::blocking::Client::builder()
                    .build()
                    .context("failed to create http client")?,
            )
        };

        let fetcher = Fetcher::maybe_offline(http_client, root)
            .with_resource_dirs(&cfg.resource_dirs)
            .with_checksums(cfg.checksums.clone());

        Ok(Self { cfg, fetcher })
    }

    /// Loads every graph and gathers their dependencies
    pub fn gather(&self, graphs: &[PathBuf]) -> Result<Inventory, Error> {
        let graphs = graphs
            .iter()
            .map(|path| DependencyGraph::load(path))
            .collect::<Result<Vec<_>, _>>()?;

        let (filters, matchers) = rayon::join(
            || ArtifactFilters::from_config(&self.cfg, &self.fetcher),
            || LicenseMatchers::load(&self.fetcher, &self.cfg.license_matchers),
        );

        let filters = filters?;
        let matchers = matchers?;

        if !matchers.is_empty() {
            log::info!("loaded {} license matchers", matchers.len());
        }

        let cache = ArtifactCache::default();
        let inventory = Gatherer::new(&filters, &matchers, &licenses::graph::EmbeddedMetadata)
            .with_cache(cache.clone())
            .with_config(&self.cfg)
            .gather(&graphs);

        log::info!(
            "gathered {} dependencies from {} module(s), {} artifacts cached",
            inventory.dependencies.len(),
            graphs.len(),
            cache.len()
        );

        if !inventory.failed.is_empty() {
            log::warn!(
                "{} artifact(s) were skipped as their metadata could not be built",
                inventory.failed.len()
            );
        }

        Ok(inventory)
    }
}

fn real_main() -> Result<(), Error> {
    let args = Opts::parse();

    setup_logger(args.log_level)?;

    match args.cmd {
        Command::Generate(generate) => {
            let ctx = Context::load(args.config.as_deref(), &generate.graph, args.offline)?;
            generate::cmd(generate, ctx)
        }
        Command::LicensesXml(xml) => {
            let ctx = Context::load(args.config.as_deref(), &xml.graph, args.offline)?;
            licenses_xml::cmd(xml, ctx)
        }
        Command::Init(init) => {
            let cwd = std::env::current_dir().context("unable to determine current directory")?;
            init::cmd(init, &cwd)
        }
    }
}

fn main() {
    match real_main() {
        Ok(_) => {}
        Err(e) => {
            log::error!("{e:#}");
            std::process::exit(1);
        }
    }
}
