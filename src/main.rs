use clap::Parser;
use color_eyre::Result;
use lobby_tracker::{
    init_errors,
    init_logging,
    App,
    Args,
};
use lobby_tracker_config::TrackerConfig;

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let args = Args::parse();
    init_logging(args.verbose)?;

    let config = TrackerConfig::new(args.config.clone())?;
    App::new(config).await?.run(args.command).await
}
