use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use harpoon::cache::NoCache;
use harpoon::config::Config;
use harpoon::health::PipelineCounters;
use harpoon::producer::{Producer, ERR_MARKET_ACTIVITY};
use harpoon::schema::FILE_MARKET_ACTIVITY;

#[derive(Parser, Debug)]
#[command(
    name = "market_activity",
    version,
    about = "One-shot market activity scan (writes market-activity.json)"
)]
struct Args {
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).context("load config")?;
    std::fs::create_dir_all(&cfg.run.data_dir).context("create data_dir")?;

    let counters = PipelineCounters::default();
    let producer = Producer::new(&cfg, &NoCache, &counters)?;

    match producer.run_market_activity().await {
        Ok(kept) => {
            info!(kept, "market_activity done");
            Ok(())
        }
        Err(e) => {
            producer.write_error(FILE_MARKET_ACTIVITY, ERR_MARKET_ACTIVITY, &e);
            Err(anyhow::Error::new(e).context("market activity view"))
        }
    }
}
