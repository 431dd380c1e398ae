//! PostgREST reads for the pre-screened trade corpus and market snapshots.
//!
//! An empty `stored.base_url` means the deployment has no database; both
//! fetches then fail as `SourceUnavailable` and the producers surface
//! that as a source failure rather than an empty dataset.

use serde_json::Value;

use crate::config::Config;
use crate::error::{classify_http, classify_status, PipeError};

fn api_key(cfg: &Config) -> Result<String, PipeError> {
    if cfg.stored.base_url.trim().is_empty() {
        return Err(PipeError::SourceUnavailable(
            "stored source not configured (stored.base_url empty)".to_string(),
        ));
    }
    std::env::var(&cfg.stored.api_key_env).map_err(|_| {
        PipeError::SourceUnavailable(format!(
            "missing api key env var {}",
            cfg.stored.api_key_env
        ))
    })
}

async fn fetch_rows(
    client: &reqwest::Client,
    cfg: &Config,
    table: &str,
    order: &str,
    what: &str,
) -> Result<Vec<Value>, PipeError> {
    let key = api_key(cfg)?;
    let url = format!(
        "{}/rest/v1/{table}",
        cfg.stored.base_url.trim_end_matches('/')
    );
    let limit = cfg.stored.limit.to_string();

    let resp = client
        .get(url)
        .query(&[("select", "*"), ("order", order), ("limit", limit.as_str())])
        .header("apikey", &key)
        .header("Authorization", format!("Bearer {key}"))
        .send()
        .await
        .map_err(|e| classify_http(&e, what))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(classify_status(status, what));
    }

    resp.json::<Vec<Value>>()
        .await
        .map_err(|e| PipeError::MalformedResponse(format!("{what}: {e}")))
}

/// Stored whale trades, largest first.
pub async fn whale_trade_rows(
    client: &reqwest::Client,
    cfg: &Config,
) -> Result<Vec<Value>, PipeError> {
    fetch_rows(
        client,
        cfg,
        &cfg.stored.trades_table,
        "size.desc",
        "stored trades",
    )
    .await
}

/// Market snapshots, newest first. Rows repeat per market across
/// snapshot times; dedup happens downstream.
pub async fn snapshot_rows(
    client: &reqwest::Client,
    cfg: &Config,
) -> Result<Vec<Value>, PipeError> {
    fetch_rows(
        client,
        cfg,
        &cfg.stored.snapshots_table,
        "snapshot_time.desc",
        "stored snapshots",
    )
    .await
}
