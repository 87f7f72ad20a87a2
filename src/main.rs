use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use cmc_history::output::write_delimited;
use cmc_history::utils::Timer;
use cmc_history::{AppConfig, FetchFailure, FetchMode, HistoryError, Pipeline};

const USAGE: &str = "Usage: cmc-history <assets> <start_date> <end_date> [--concurrent]";
const ASSET_HINT: &str = "Did you use a valid CoinMarketCap currency?\n\
    It should be entered exactly as displayed on CoinMarketCap.com (case-insensitive), \
    with dashes in place of spaces.";

#[derive(Parser)]
#[command(
    name = "cmc-history",
    about = "Print CoinMarketCap USD price history as delimited text",
    version
)]
struct Cli {
    /// Asset name(s) as shown on CoinMarketCap, comma separated: bitcoin,ripple
    assets: String,

    /// First day to retrieve, yyyy-mm-dd
    start_date: String,

    /// Last day to retrieve, yyyy-mm-dd
    end_date: String,

    /// Fetch all assets concurrently
    #[arg(long)]
    concurrent: bool,

    /// Only keep these fields per asset, e.g. Close,Volume
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Directory for cached per-asset tables
    #[arg(long, env = "CMC_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Log per-asset progress while fetching
    #[arg(long)]
    progress: bool,

    /// Report failed assets instead of aborting the run
    #[arg(long)]
    keep_going: bool,

    /// Output field delimiter
    #[arg(long, default_value_t = ',')]
    delimiter: char,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

fn report_fetch_failure(f: &FetchFailure) {
    eprintln!("Error fetching price data for {} from {}", f.asset, f.url);
    eprintln!("{}", ASSET_HINT);
    eprintln!("Error message: {}", f.reason);
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "cmc_history=info,warn",
        1 => "cmc_history=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    if !cli.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character, got {:?}", cli.delimiter);
    }

    let mut config = AppConfig::load()?;
    if cli.concurrent {
        config.pipeline.mode = FetchMode::Concurrent;
    }
    if cli.progress {
        config.pipeline.show_progress = true;
    }
    if cli.keep_going {
        config.pipeline.fail_fast = false;
    }
    if cli.cache_dir.is_some() {
        config.cache.dir = cli.cache_dir.clone();
    }

    let assets: Vec<&str> = cli.assets.split(',').collect();

    let report = {
        let _t = Timer::start("history export");
        let pipeline = Pipeline::new(config)?;
        match pipeline
            .get_data_for(&assets, cli.start_date.as_str(), cli.end_date.as_str(), &cli.fields)
            .await
        {
            Ok(report) => report,
            Err(e @ HistoryError::InvalidRange { .. }) => {
                eprintln!("{}", e);
                eprintln!("{}", USAGE);
                process::exit(1);
            }
            Err(HistoryError::FetchFailure(f)) => {
                report_fetch_failure(&f);
                process::exit(1);
            }
            Err(e) => return Err(e.into()),
        }
    };

    write_delimited(&report.table, cli.delimiter as u8, std::io::stdout().lock())?;

    for f in &report.failures {
        warn!("{} skipped", f.asset);
        report_fetch_failure(f);
    }

    Ok(())
}
