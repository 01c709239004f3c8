use anyhow::Context;
use clap::Parser;
use sgpmet_processor::cli::{run, Cli};
use sgpmet_processor::utils::logging;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_file.as_deref()).context("failed to initialize logging")?;
    run(cli).context("sgpmet-processor failed")
}
