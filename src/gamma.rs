//! Gamma catalog fetches shared across producers.
//!
//! Every producer that needs market metadata goes through here: the
//! politics pool feeding the CLOB scan, the wide open-market pool feeding
//! the activity scan, token-id resolution and the volume ranking, and
//! per-market enrichment lookups. Rows parse leniently; a row missing its
//! id is skipped, everything else defaults.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::cache::Cache;
use crate::config::Config;
use crate::error::{classify_http, classify_status, PipeError};
use crate::health::PipelineCounters;
use crate::json_util::{f64_list, get_f64, get_str, get_str_any, str_list};

#[derive(Clone, Debug)]
pub struct GammaMarketRow {
    pub gamma_id: String,
    /// Only set when the catalog carries it; the CLOB scan requires it.
    pub condition_id: String,
    pub question: String,
    pub slug: Option<String>,
    pub image: Option<String>,
    pub outcomes: Vec<String>,
    pub outcome_prices: Vec<f64>,
    pub clob_token_ids: Vec<String>,
    pub volume24hr: f64,
    pub volume7d: f64,
    pub volume_total: f64,
    pub liquidity: f64,
    pub last_trade_price: Option<f64>,
    pub one_hour_price_change: Option<f64>,
    pub one_day_price_change: Option<f64>,
    pub has_politics_tag: bool,
    pub active: bool,
    pub closed: bool,
}

/// The catalog serializes `tags` inconsistently (strings, objects, or a
/// stringified blob), so the politics check matches the serialized form.
fn politics_tagged(v: &Value) -> bool {
    match v.get("tags") {
        Some(tags) => tags.to_string().to_lowercase().contains("politics"),
        None => false,
    }
}

pub fn parse_market_row(v: &Value) -> Option<GammaMarketRow> {
    let gamma_id = get_str(v, "id")?;

    let outcomes = {
        let parsed = str_list(v, "outcomes");
        if parsed.is_empty() {
            vec!["Yes".to_string(), "No".to_string()]
        } else {
            parsed
        }
    };

    Some(GammaMarketRow {
        gamma_id,
        condition_id: get_str_any(v, &["conditionId", "condition_id"]).unwrap_or_default(),
        question: get_str(v, "question").unwrap_or_default(),
        slug: get_str(v, "slug"),
        image: get_str_any(v, &["image", "icon"]),
        outcomes,
        outcome_prices: f64_list(v, "outcomePrices"),
        clob_token_ids: str_list(v, "clobTokenIds"),
        volume24hr: get_f64(v, "volume24hr").unwrap_or(0.0),
        volume7d: get_f64(v, "volume7d")
            .or_else(|| get_f64(v, "volume1wk"))
            .unwrap_or(0.0),
        volume_total: get_f64(v, "volume").unwrap_or(0.0),
        liquidity: get_f64(v, "liquidity").unwrap_or(0.0),
        last_trade_price: get_f64(v, "lastTradePrice"),
        one_hour_price_change: get_f64(v, "oneHourPriceChange"),
        one_day_price_change: get_f64(v, "oneDayPriceChange"),
        has_politics_tag: politics_tagged(v),
        active: v.get("active").and_then(Value::as_bool).unwrap_or(false),
        closed: v.get("closed").and_then(Value::as_bool).unwrap_or(false),
    })
}

async fn fetch_markets_raw(
    client: &reqwest::Client,
    cfg: &Config,
    query: &[(&str, String)],
    what: &str,
) -> Result<Vec<Value>, PipeError> {
    let url = format!(
        "{}/markets",
        cfg.polymarket.gamma_base.trim_end_matches('/')
    );
    let resp = client
        .get(url)
        .query(query)
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

/// Politics pool for the CLOB whale scan. Order is the catalog's own;
/// the scan takes the first `top_markets` rows that carry a condition id.
pub async fn politics_markets(
    client: &reqwest::Client,
    cfg: &Config,
) -> Result<Vec<GammaMarketRow>, PipeError> {
    let raw = fetch_markets_raw(
        client,
        cfg,
        &[
            ("tag", "Politics".to_string()),
            ("active", "true".to_string()),
            ("closed", "false".to_string()),
            ("limit", cfg.polymarket.market_list_limit.to_string()),
        ],
        "gamma politics markets",
    )
    .await?;
    Ok(raw.iter().filter_map(parse_market_row).collect())
}

/// Wide open-market pool, uncached.
pub async fn open_markets(
    client: &reqwest::Client,
    cfg: &Config,
    limit: usize,
) -> Result<Vec<GammaMarketRow>, PipeError> {
    let raw = fetch_markets_raw(
        client,
        cfg,
        &[
            ("closed", "false".to_string()),
            ("limit", limit.to_string()),
        ],
        "gamma open markets",
    )
    .await?;
    Ok(raw.iter().filter_map(parse_market_row).collect())
}

/// Wide open-market pool with a short-TTL cache so producers sharing one
/// daemon cycle hit the catalog once.
pub async fn open_markets_cached(
    client: &reqwest::Client,
    cfg: &Config,
    cache: &dyn Cache,
    counters: &PipelineCounters,
    limit: usize,
) -> Result<Vec<GammaMarketRow>, PipeError> {
    let key = format!("gamma:open:{limit}");
    if let Some(v) = cache.get(&key) {
        if let Some(rows) = v.as_array() {
            counters.inc_cache_hits(1);
            return Ok(rows.iter().filter_map(parse_market_row).collect());
        }
    }
    counters.inc_cache_misses(1);

    let raw = fetch_markets_raw(
        client,
        cfg,
        &[
            ("closed", "false".to_string()),
            ("limit", limit.to_string()),
        ],
        "gamma open markets",
    )
    .await?;
    cache.put(
        &key,
        Value::Array(raw.clone()),
        Duration::from_millis(cfg.cache.market_pool_ttl_ms),
    );
    Ok(raw.iter().filter_map(parse_market_row).collect())
}

async fn fetch_market_raw(
    client: &reqwest::Client,
    cfg: &Config,
    market_id: &str,
) -> Option<Value> {
    let url = format!(
        "{}/markets/{market_id}",
        cfg.polymarket.gamma_base.trim_end_matches('/')
    );
    let resp = match client.get(url).send().await {
        Ok(resp) => resp,
        Err(e) => {
            debug!(market_id, error = %e, "gamma market lookup failed");
            return None;
        }
    };
    if !resp.status().is_success() {
        debug!(market_id, status = %resp.status(), "gamma market lookup non-success");
        return None;
    }
    match resp.json().await {
        Ok(v) => Some(v),
        Err(e) => {
            debug!(market_id, error = %e, "gamma market lookup decode failed");
            None
        }
    }
}

/// Best-effort single-market lookup for slug/image enrichment. Any
/// failure degrades to None; enrichment never fails a cycle.
pub async fn market_by_id_cached(
    client: &reqwest::Client,
    cfg: &Config,
    cache: &dyn Cache,
    counters: &PipelineCounters,
    market_id: &str,
) -> Option<GammaMarketRow> {
    let key = format!("gamma:market:{market_id}");
    if let Some(v) = cache.get(&key) {
        counters.inc_cache_hits(1);
        return parse_market_row(&v);
    }
    counters.inc_cache_misses(1);

    let row = fetch_market_raw(client, cfg, market_id).await?;
    let parsed = parse_market_row(&row);
    if parsed.is_some() {
        cache.put(
            &key,
            row,
            Duration::from_millis(cfg.cache.enrichment_ttl_ms),
        );
    }
    parsed
}

/// Index outcome token ids back to their market row. Ids are the decimal
/// strings the on-chain decoder produces.
pub fn token_index(rows: &[GammaMarketRow]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        for token_id in &row.clob_token_ids {
            map.entry(token_id.clone()).or_insert(i);
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_row_with_stringified_lists() {
        let v = json!({
            "id": "516710",
            "conditionId": "0xabc",
            "question": "Will the incumbent win?",
            "slug": "incumbent-win",
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": "[\"0.62\", \"0.38\"]",
            "clobTokenIds": "[\"111\", \"222\"]",
            "volume24hr": "125000.5",
            "lastTradePrice": 0.62,
            "oneHourPriceChange": -0.013,
            "tags": [{"id": 2, "label": "Politics", "slug": "politics"}],
            "active": true,
            "closed": false,
        });
        let row = parse_market_row(&v).expect("parse");
        assert_eq!(row.gamma_id, "516710");
        assert_eq!(row.condition_id, "0xabc");
        assert_eq!(row.outcomes, vec!["Yes".to_string(), "No".to_string()]);
        assert_eq!(row.outcome_prices, vec![0.62, 0.38]);
        assert_eq!(row.clob_token_ids, vec!["111".to_string(), "222".to_string()]);
        assert_eq!(row.volume24hr, 125000.5);
        assert_eq!(row.one_hour_price_change, Some(-0.013));
        assert!(row.has_politics_tag);
        assert!(row.active);
    }

    #[test]
    fn snake_case_condition_id_is_accepted() {
        let v = json!({"id": "1", "condition_id": "0xdef"});
        let row = parse_market_row(&v).expect("parse");
        assert_eq!(row.condition_id, "0xdef");
    }

    #[test]
    fn missing_outcomes_default_to_binary() {
        let v = json!({"id": "1"});
        let row = parse_market_row(&v).expect("parse");
        assert_eq!(row.outcomes, vec!["Yes".to_string(), "No".to_string()]);
        assert!(row.outcome_prices.is_empty());
        assert!(!row.has_politics_tag);
    }

    #[test]
    fn rows_without_id_are_skipped() {
        assert!(parse_market_row(&json!({"question": "orphan"})).is_none());
    }

    #[test]
    fn politics_tag_matches_plain_string_form() {
        let v = json!({"id": "1", "tags": ["Politics", "US"]});
        assert!(parse_market_row(&v).expect("parse").has_politics_tag);
    }

    #[test]
    fn token_index_maps_first_occurrence() {
        let rows = vec![
            GammaMarketRow {
                clob_token_ids: vec!["111".to_string(), "222".to_string()],
                ..blank_row("a")
            },
            GammaMarketRow {
                clob_token_ids: vec!["222".to_string(), "333".to_string()],
                ..blank_row("b")
            },
        ];
        let map = token_index(&rows);
        assert_eq!(map.get("111"), Some(&0));
        assert_eq!(map.get("222"), Some(&0));
        assert_eq!(map.get("333"), Some(&1));
    }

    fn blank_row(id: &str) -> GammaMarketRow {
        GammaMarketRow {
            gamma_id: id.to_string(),
            condition_id: String::new(),
            question: String::new(),
            slug: None,
            image: None,
            outcomes: Vec::new(),
            outcome_prices: Vec::new(),
            clob_token_ids: Vec::new(),
            volume24hr: 0.0,
            volume7d: 0.0,
            volume_total: 0.0,
            liquidity: 0.0,
            last_trade_price: None,
            one_hour_price_change: None,
            one_day_price_change: None,
            has_politics_tag: false,
            active: false,
            closed: false,
        }
    }
}
