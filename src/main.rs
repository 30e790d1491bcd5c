use clap::Parser;
use rainfall_raster::cli::{logging, run, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli)?;
    Ok(())
}
