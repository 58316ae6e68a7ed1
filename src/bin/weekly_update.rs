use anyhow::{Context, Result};
use clap::Parser;
use unievent_lib::{
    build_aggregator, build_store,
    config::{check_window_days, AppConfig},
    init_tracing,
};

/// Ask the search-grounded model for this window's regional events and store them.
#[derive(Parser, Debug)]
#[command(name = "weekly-update", version)]
struct Args {
    /// Override the region named in the prompt
    #[arg(long)]
    region: Option<String>,

    /// Override the number of days covered, starting today
    #[arg(long)]
    days: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(region) = args.region {
        config.region = region;
    }
    if let Some(days) = args.days {
        config.window_days = check_window_days(days)?;
    }

    let store = build_store(&config)?;
    let aggregator = build_aggregator(&config, store)?;

    let report = aggregator.run().await.context("weekly update failed")?;
    println!("{}", report.message);
    for failure in &report.failures {
        println!("  failed: {} ({})", failure.title, failure.error);
    }
    Ok(())
}
