use clap::Parser;
use color_eyre::Result;
use nifi_usage_analyzer::{
    init_errors,
    init_logging,
    App,
    Args,
    Config,
};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_errors()?;
    let args = Args::parse();
    let config = Config::new(&args)?;
    init_logging(config.verbose)?;
    config.validate()?;
    App::new(config, args.command).run().await
}
