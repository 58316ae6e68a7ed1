use anyhow::{Context, Result};
use clap::Parser;
use unievent_lib::{build_pipeline, build_store, config::AppConfig, init_tracing};

/// Find a college's events page, extract its events and store them.
#[derive(Parser, Debug)]
#[command(name = "sync-college", version)]
struct Args {
    /// College to search for, e.g. "CBIT Hyderabad"
    college: String,

    /// Extract this page directly instead of searching
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let store = build_store(&config)?;
    let pipeline = build_pipeline(&config, store)?;

    let report = pipeline
        .ingest(&args.college, args.url.as_deref())
        .await
        .with_context(|| format!("scraping failed for {}", args.college))?;

    println!("{}", report.message);
    println!("Source: {}", report.source_url);
    println!("Total events inserted: {}", report.inserted_count);
    Ok(())
}
