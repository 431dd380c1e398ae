//! Kalshi REST fetches.
//!
//! Trade history pages through an opaque cursor under the configured
//! ceiling. A page failure after the first keeps the partial result for
//! that market; a failed first page fails the market so the caller can
//! count it as a sub-query failure.

use serde_json::Value;
use tracing::warn;

use crate::config::Config;
use crate::error::{classify_http, classify_status, PipeError};
use crate::json_util::{get_f64, get_str};
use crate::paging::CursorPager;

#[derive(Clone, Debug)]
pub struct KalshiMarket {
    pub ticker: String,
    pub title: Option<String>,
    pub volume_24h: f64,
}

pub fn parse_market(v: &Value) -> Option<KalshiMarket> {
    let ticker = get_str(v, "ticker")?;
    Some(KalshiMarket {
        ticker,
        title: get_str(v, "title").or_else(|| get_str(v, "subtitle")),
        volume_24h: get_f64(v, "volume_24h").unwrap_or(0.0),
    })
}

/// Open markets, unsorted. The producer ranks by 24h volume.
pub async fn open_markets(
    client: &reqwest::Client,
    cfg: &Config,
) -> Result<Vec<KalshiMarket>, PipeError> {
    let what = "kalshi markets";
    let url = format!("{}/markets", cfg.kalshi.api_base.trim_end_matches('/'));
    let limit = cfg.kalshi.market_limit.to_string();

    let resp = client
        .get(url)
        .query(&[("status", "open"), ("limit", limit.as_str())])
        .send()
        .await
        .map_err(|e| classify_http(&e, what))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(classify_status(status, what));
    }

    let payload: Value = resp
        .json()
        .await
        .map_err(|e| PipeError::MalformedResponse(format!("{what}: {e}")))?;

    let rows = payload
        .get("markets")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            PipeError::MalformedResponse("kalshi markets: missing markets array".to_string())
        })?;
    Ok(rows.iter().filter_map(parse_market).collect())
}

async fn market_trades_page(
    client: &reqwest::Client,
    cfg: &Config,
    ticker: &str,
    min_ts_secs: u64,
    cursor: Option<&str>,
) -> Result<(Vec<Value>, Option<String>), PipeError> {
    let what = "kalshi trades";
    let url = format!(
        "{}/markets/trades",
        cfg.kalshi.api_base.trim_end_matches('/')
    );

    let mut query: Vec<(&str, String)> = vec![
        ("ticker", ticker.to_string()),
        ("min_ts", min_ts_secs.to_string()),
        ("limit", cfg.kalshi.trade_page_limit.to_string()),
    ];
    if let Some(c) = cursor {
        query.push(("cursor", c.to_string()));
    }

    let resp = client
        .get(url)
        .query(&query)
        .send()
        .await
        .map_err(|e| classify_http(&e, what))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(classify_status(status, what));
    }

    let payload: Value = resp
        .json()
        .await
        .map_err(|e| PipeError::MalformedResponse(format!("{what}: {e}")))?;

    let rows = payload
        .get("trades")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    Ok((rows, get_str(&payload, "cursor")))
}

/// All trade pages for one market within the window and page ceiling.
pub async fn market_trades(
    client: &reqwest::Client,
    cfg: &Config,
    ticker: &str,
    min_ts_secs: u64,
) -> Result<Vec<Value>, PipeError> {
    let mut pager = CursorPager::new(cfg.kalshi.max_pages);
    let mut out = Vec::new();

    while pager.should_fetch() {
        match market_trades_page(client, cfg, ticker, min_ts_secs, pager.cursor()).await {
            Ok((rows, next)) => {
                out.extend(rows);
                pager.record_page(next);
            }
            Err(e) if pager.pages_fetched() == 0 => return Err(e),
            Err(e) => {
                warn!(ticker, error = %e, "kalshi paging stopped early, keeping partial pages");
                break;
            }
        }
    }

    if pager.hit_ceiling() {
        warn!(
            ticker,
            pages = pager.pages_fetched(),
            "kalshi trade paging hit page ceiling"
        );
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_market_with_subtitle_fallback() {
        let v = json!({"ticker": "PRES-2028", "subtitle": "Presidential winner", "volume_24h": 52000.0});
        let m = parse_market(&v).expect("parse");
        assert_eq!(m.ticker, "PRES-2028");
        assert_eq!(m.title.as_deref(), Some("Presidential winner"));
        assert_eq!(m.volume_24h, 52000.0);
    }

    #[test]
    fn market_without_ticker_is_skipped() {
        assert!(parse_market(&json!({"title": "orphan"})).is_none());
    }

    #[test]
    fn missing_volume_defaults_to_zero() {
        let m = parse_market(&json!({"ticker": "T"})).expect("parse");
        assert_eq!(m.volume_24h, 0.0);
        assert_eq!(m.title, None);
    }
}
