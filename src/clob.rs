//! Polymarket CLOB public trade queries.

use serde_json::Value;

use crate::config::Config;
use crate::error::{classify_http, classify_status, PipeError};

/// Public fills for one market since `start_ts` (unix seconds).
///
/// The caller loops markets and treats each failure as a sub-query
/// failure, so this returns per-market rather than batching.
pub async fn market_trades(
    client: &reqwest::Client,
    cfg: &Config,
    condition_id: &str,
    start_ts_secs: u64,
) -> Result<Vec<Value>, PipeError> {
    let what = "clob trades";
    let url = format!("{}/trades", cfg.polymarket.clob_base.trim_end_matches('/'));
    let start_ts = start_ts_secs.to_string();

    let resp = client
        .get(url)
        .query(&[("market", condition_id), ("start_ts", start_ts.as_str())])
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
