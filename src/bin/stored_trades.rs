use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use harpoon::cache::NoCache;
use harpoon::config::Config;
use harpoon::health::PipelineCounters;
use harpoon::producer::{Producer, ERR_STORED_TRADES};
use harpoon::schema::FILE_STORED_TRADES;

#[derive(Parser, Debug)]
#[command(
    name = "stored_trades",
    version,
    about = "One-shot fetch from the stored trades table (writes trades.json)"
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

    match producer.run_stored_trades().await {
        Ok(kept) => {
            info!(kept, "stored_trades done");
            Ok(())
        }
        Err(e) => {
            producer.write_error(FILE_STORED_TRADES, ERR_STORED_TRADES, &e);
            Err(anyhow::Error::new(e).context("stored trades view"))
        }
    }
}
