use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context as _;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use harpoon::cache::MemoryCache;
use harpoon::clock::now_ms;
use harpoon::config::Config;
use harpoon::health::PipelineCounters;
use harpoon::producer::Producer;
use harpoon::run_meta::{env_git_sha, RunMeta};
use harpoon::{schema, sink};

#[derive(Parser, Debug)]
#[command(
    name = "harpoon",
    version,
    about = "Whale trade pipeline daemon (fetch, filter, publish JSON artifacts)"
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

    let start_ms = now_ms();
    let meta = RunMeta {
        run_id: schema::make_run_id(start_ms),
        schema_version: schema::SCHEMA_VERSION.to_string(),
        pkg_version: env!("CARGO_PKG_VERSION").to_string(),
        git_sha: env_git_sha(),
        pid: std::process::id(),
        start_ts_unix_ms: start_ms,
        config_path: args.config.display().to_string(),
        data_dir: cfg.run.data_dir.display().to_string(),
    };
    meta.write_to_dir(&cfg.run.data_dir)
        .context("write run_meta.json")?;
    schema::write_schema_version_json(&cfg.run.data_dir, schema::SCHEMA_VERSION, start_ms)
        .context("write schema_version.json")?;

    let counters = PipelineCounters::default();
    let cache = MemoryCache::new();
    let producer = Producer::new(&cfg, &cache, &counters)?;

    info!(
        run_id = %meta.run_id,
        data_dir = %cfg.run.data_dir.display(),
        poll_interval_ms = cfg.run.poll_interval_ms,
        "daemon started"
    );

    tokio::select! {
        _ = run_loop(&cfg, &producer, &counters) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received; shutting down");
        }
    }

    info!("done");
    Ok(())
}

/// Cycles never overlap. The interval waits out the remainder when a
/// cycle finishes early and fires immediately after an overrun.
async fn run_loop(cfg: &Config, producer: &Producer<'_>, counters: &PipelineCounters) {
    let mut tick = tokio::time::interval(Duration::from_millis(cfg.run.poll_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tick.tick().await;

        counters.set_last_cycle_start_ms(now_ms());
        let ok_views = producer.run_cycle().await;
        if ok_views > 0 {
            counters.set_last_success_ms(now_ms());
        }
        counters.inc_cycles_completed(1);

        let snap = counters.snapshot();
        let health_path = cfg.run.data_dir.join(schema::FILE_HEALTH);
        if let Err(e) = sink::write_json_atomic(&health_path, &snap) {
            counters.inc_persist_failures(1);
            warn!(error = %e, "health write failed");
        }
        info!(
            ok_views,
            records_fetched = snap.records_fetched,
            records_kept = snap.records_kept,
            malformed_records = snap.malformed_records,
            sub_query_failures = snap.sub_query_failures,
            persist_failures = snap.persist_failures,
            "cycle complete"
        );
    }
}
