use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;

pub const SCHEMA_VERSION: &str = "v1.0.0";

pub const FILE_WHALE_TRADES: &str = "whale-trades.json";
pub const FILE_MARKET_ACTIVITY: &str = "market-activity.json";
pub const FILE_STORED_TRADES: &str = "trades.json";
pub const FILE_MARKET_PULSE: &str = "market-pulse.json";
pub const FILE_ONCHAIN_TRADES: &str = "onchain-trades.json";
pub const FILE_KALSHI_TRADES: &str = "kalshi-whale-trades.json";
pub const FILE_TOP_MARKETS: &str = "top-markets.json";
pub const FILE_HEALTH: &str = "health.json";
pub const FILE_RUN_META_JSON: &str = "run_meta.json";
pub const FILE_SCHEMA_VERSION: &str = "schema_version.json";

#[derive(Debug, Serialize)]
struct SchemaVersionFile {
    schema_version: String,
    generated_at_unix_ms: u64,
    files: BTreeMap<String, String>,
}

/// Manifest of every artifact this build can emit, so a consumer can
/// tell a layout change from a data change.
pub fn write_schema_version_json(
    data_dir: &Path,
    schema_version: &str,
    generated_at_unix_ms: u64,
) -> anyhow::Result<()> {
    let mut files = BTreeMap::new();
    for name in [
        FILE_WHALE_TRADES,
        FILE_MARKET_ACTIVITY,
        FILE_STORED_TRADES,
        FILE_MARKET_PULSE,
        FILE_ONCHAIN_TRADES,
        FILE_KALSHI_TRADES,
        FILE_TOP_MARKETS,
        FILE_HEALTH,
    ] {
        files.insert(name.to_string(), "v1".to_string());
    }

    let payload = SchemaVersionFile {
        schema_version: schema_version.to_string(),
        generated_at_unix_ms,
        files,
    };

    let out_path = data_dir.join(FILE_SCHEMA_VERSION);
    let json = serde_json::to_vec_pretty(&payload).context("serialize schema_version.json")?;
    std::fs::write(&out_path, json).with_context(|| format!("write {}", out_path.display()))?;
    Ok(())
}

pub fn make_run_id(start_unix_ms: u64) -> String {
    format!("run_{start_unix_ms}")
}
