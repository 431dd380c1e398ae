use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use harpoon::cache::NoCache;
use harpoon::config::Config;
use harpoon::health::PipelineCounters;
use harpoon::producer::{Producer, ERR_MARKET_PULSE};
use harpoon::rank::MarketRank;
use harpoon::schema::FILE_MARKET_PULSE;

#[derive(Parser, Debug)]
#[command(
    name = "market_pulse",
    version,
    about = "One-shot market panel from stored snapshots (writes market-pulse.json)"
)]
struct Args {
    #[arg(long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Panel mode. Default: volume.
    #[arg(long, value_enum)]
    filter: Option<FilterArg>,

    /// Volume floor override. The competitive mode keeps its own floor.
    #[arg(long)]
    min_volume: Option<f64>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FilterArg {
    Volume,
    Competitive,
    Volatile,
}

impl From<FilterArg> for MarketRank {
    fn from(v: FilterArg) -> Self {
        match v {
            FilterArg::Volume => MarketRank::Volume,
            FilterArg::Competitive => MarketRank::Competitive,
            FilterArg::Volatile => MarketRank::Volatile,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = Config::load(&args.config).context("load config")?;
    std::fs::create_dir_all(&cfg.run.data_dir).context("create data_dir")?;

    let rank = args.filter.map(Into::into).unwrap_or(MarketRank::Volume);

    let counters = PipelineCounters::default();
    let producer = Producer::new(&cfg, &NoCache, &counters)?;

    match producer.run_market_pulse(rank, args.min_volume).await {
        Ok(kept) => {
            info!(mode = rank.as_str(), kept, "market_pulse done");
            Ok(())
        }
        Err(e) => {
            producer.write_error(FILE_MARKET_PULSE, ERR_MARKET_PULSE, &e);
            Err(anyhow::Error::new(e).context("market pulse view"))
        }
    }
}
