use anyhow::Context as _;
use mvn_about::licenses::summary;
use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
pub struct Args {
    /// The dependency graph of each module of the build
    #[clap(short, long, default_value = "dependencies.json")]
    pub graph: Vec<PathBuf>,
    /// The license summary to write
    #[clap(short = 'o', long = "output-file", default_value = "licenses.xml")]
    output_file: PathBuf,
    /// Writes the version of each dependency, by default entries match
    /// every version of a dependency
    #[clap(long)]
    write_versions: bool,
}

pub fn cmd(args: Args, ctx: crate::Context) -> anyhow::Result<()> {
    let inventory = ctx.gather(&args.graph)?;

    let xml = summary::write(inventory.dependencies.values(), args.write_versions)?;

    if let Some(parent) = args.output_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("unable to create directory '{}'", parent.display()))?;
        }
    }

    std::fs::write(&args.output_file, xml).with_context(|| {
        format!(
            "license summary {} could not be written",
            args.output_file.display()
        )
    })?;

    log::info!(
        "wrote {} dependencies to '{}'",
        inventory.dependencies.len(),
        args.output_file.display()
    );

    Ok(())
}
