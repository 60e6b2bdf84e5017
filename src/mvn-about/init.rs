use anyhow::Context as _;
use std::{fs, path::Path};

static DEFAULT_CONFIG: &str = include_str!("../../resources/about.toml");
static DEFAULT_HBS: &str = include_str!("../../resources/third-party.hbs");

#[derive(clap::Parser, Debug)]
pub struct Args {
    /// Disables the handlebars generation
    #[clap(long)]
    no_handlebars: bool,
    /// Forces mvn-about to overwrite the local config file
    #[clap(long)]
    overwrite: bool,
}

fn write(path: &Path, contents: &str, overwrite: bool) -> anyhow::Result<()> {
    if path.exists() && !overwrite {
        log::info!("'{}' already exists, not overwriting it", path.display());
        return Ok(());
    }

    fs::write(path, contents).with_context(|| format!("unable to write '{}'", path.display()))
}

pub fn cmd(args: Args, root_path: &Path) -> anyhow::Result<()> {
    if !root_path.join("pom.xml").exists() {
        log::warn!(
            "'{}' does not contain a pom.xml, the configuration will only apply to graphs next to it",
            root_path.display()
        );
    }

    if !args.no_handlebars {
        write(&root_path.join("third-party.hbs"), DEFAULT_HBS, args.overwrite)?;
    }

    write(&root_path.join("about.toml"), DEFAULT_CONFIG, args.overwrite)
}
