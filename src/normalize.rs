//! Per-source normalization into the canonical records.
//!
//! Every fetcher output passes through exactly one function here before
//! classification. The conventions are frozen: prices are fractions of
//! 1.0, timestamps are unix ms, dollar values come from the source when
//! it supplies one. A record missing its identity fields is
//! `MalformedRecord` and gets counted, never silently invented.

use serde_json::Value;

use crate::chain::LogEntry;
use crate::clock::{now_ms, parse_rfc3339_ms};
use crate::decode::OrderFill;
use crate::error::PipeError;
use crate::gamma::GammaMarketRow;
use crate::json_util::{get_f64, get_str, get_str_any, get_u64, normalize_ts_ms};
use crate::kalshi::KalshiMarket;
use crate::types::{
    MarketSnapshot, Side, SourceSystem, TradeRecord, DEFAULT_OUTCOME, UNKNOWN_MARKET,
    UNKNOWN_TRADER,
};

fn clamp_price(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// Rows from the stored trades table. Arbitrary columns may be missing;
/// only identity is mandatory.
pub fn stored_trade(row: &Value) -> Result<TradeRecord, PipeError> {
    let id = get_str_any(row, &["id", "trade_id"])
        .ok_or_else(|| PipeError::MalformedRecord("stored trade without id".to_string()))?;
    let market_id = get_str(row, "market_id").ok_or_else(|| {
        PipeError::MalformedRecord(format!("stored trade {id} without market_id"))
    })?;

    let market_title = non_empty(
        row.get("platform_data")
            .and_then(|pd| get_str(pd, "title")),
    )
    .or_else(|| non_empty(get_str(row, "market_question")))
    .unwrap_or_else(|| UNKNOWN_MARKET.to_string());

    let side = get_str(row, "side")
        .and_then(|s| s.parse::<Side>().ok())
        .unwrap_or(Side::Buy);

    let dollar_value = get_f64(row, "size").unwrap_or(0.0).max(0.0);

    let timestamp_ms = get_u64(row, "timestamp")
        .map(normalize_ts_ms)
        .or_else(|| {
            get_str_any(row, &["timestamp", "created_at"])
                .and_then(|s| parse_rfc3339_ms(&s))
        })
        .unwrap_or_else(now_ms);

    let trader = non_empty(get_str(row, "trader_wallet"))
        .or_else(|| non_empty(get_str(row, "taker_address")))
        .unwrap_or_else(|| UNKNOWN_TRADER.to_string());

    Ok(TradeRecord {
        id,
        market_id,
        market_title,
        side,
        outcome: non_empty(get_str(row, "outcome")).unwrap_or_else(|| DEFAULT_OUTCOME.to_string()),
        price: clamp_price(get_f64(row, "price").unwrap_or(0.5)),
        size_units: dollar_value,
        dollar_value,
        timestamp_ms,
        trader,
        source: SourceSystem::Stored,
        tx_hash: non_empty(get_str_any(row, &["tx_hash", "transaction_hash"])),
        block_number: None,
        link: None,
    })
}

/// CLOB fills arrive with string-typed size and price; dollar value is
/// their product.
pub fn clob_trade(trade: &Value, market: &GammaMarketRow) -> Result<TradeRecord, PipeError> {
    let id = get_str(trade, "id")
        .ok_or_else(|| PipeError::MalformedRecord("clob trade without id".to_string()))?;
    let size = get_f64(trade, "size")
        .ok_or_else(|| PipeError::MalformedRecord(format!("clob trade {id} without size")))?;
    let price = get_f64(trade, "price")
        .ok_or_else(|| PipeError::MalformedRecord(format!("clob trade {id} without price")))?;

    let timestamp_ms = get_u64(trade, "timestamp")
        .map(normalize_ts_ms)
        .unwrap_or_else(now_ms);

    Ok(TradeRecord {
        id,
        market_id: market.condition_id.clone(),
        market_title: non_empty(Some(market.question.clone()))
            .unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        side: get_str(trade, "side")
            .and_then(|s| s.parse::<Side>().ok())
            .unwrap_or(Side::Buy),
        outcome: non_empty(get_str(trade, "outcome"))
            .unwrap_or_else(|| DEFAULT_OUTCOME.to_string()),
        price: clamp_price(price),
        size_units: size.max(0.0),
        dollar_value: (size * price).max(0.0),
        timestamp_ms,
        trader: non_empty(get_str(trade, "maker_address"))
            .unwrap_or_else(|| UNKNOWN_TRADER.to_string()),
        source: SourceSystem::Clob,
        tx_hash: None,
        block_number: None,
        link: None,
    })
}

/// Market-level activity expressed as a pseudo-trade: the notional is
/// the market's rounded 24h volume, the side follows the price drift.
pub fn activity_trade(row: &GammaMarketRow, observed_ms: u64) -> TradeRecord {
    let one_hour = row.one_hour_price_change.unwrap_or(0.0);
    let one_day = row.one_day_price_change.unwrap_or(0.0);
    let price_up = one_day > 0.0 || one_hour > 0.0;

    let outcome = if price_up || row.outcomes.len() < 2 {
        row.outcomes
            .first()
            .cloned()
            .unwrap_or_else(|| "Yes".to_string())
    } else {
        row.outcomes[1].clone()
    };

    let price = row
        .last_trade_price
        .or_else(|| row.outcome_prices.first().copied())
        .unwrap_or(0.5);

    let dollar_value = row.volume24hr.round().max(0.0);

    TradeRecord {
        id: format!("{}-{observed_ms}", row.gamma_id),
        market_id: row.gamma_id.clone(),
        market_title: non_empty(Some(row.question.clone()))
            .unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        side: if price_up { Side::Buy } else { Side::Sell },
        outcome,
        price: clamp_price(price),
        size_units: dollar_value,
        dollar_value,
        timestamp_ms: observed_ms,
        trader: UNKNOWN_TRADER.to_string(),
        source: SourceSystem::MarketActivity,
        tx_hash: None,
        block_number: None,
        link: row
            .slug
            .as_ref()
            .map(|slug| format!("https://polymarket.com/event/{slug}")),
    }
}

/// Kalshi trades settle at $1, so contract count times the taker-side
/// dollar price is the trade value, rounded to cents.
pub fn kalshi_trade(trade: &Value, market: &KalshiMarket) -> Result<TradeRecord, PipeError> {
    let id = get_str(trade, "trade_id")
        .ok_or_else(|| PipeError::MalformedRecord("kalshi trade without trade_id".to_string()))?;

    let taker_side = get_str(trade, "taker_side").unwrap_or_default();
    let price = if taker_side.eq_ignore_ascii_case("no") {
        get_f64(trade, "no_price_dollars").unwrap_or(0.0)
    } else {
        get_f64(trade, "yes_price_dollars").unwrap_or(0.0)
    };
    let count = get_f64(trade, "count").unwrap_or(0.0);
    let dollar_value = ((count * price * 100.0).round() / 100.0).max(0.0);

    let timestamp_ms = get_str(trade, "created_time")
        .and_then(|s| parse_rfc3339_ms(&s))
        .unwrap_or_else(now_ms);

    let outcome = if taker_side.is_empty() {
        DEFAULT_OUTCOME.to_string()
    } else {
        taker_side.to_uppercase()
    };

    Ok(TradeRecord {
        id,
        market_id: get_str(trade, "ticker").unwrap_or_else(|| market.ticker.clone()),
        market_title: market
            .title
            .clone()
            .unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        side: Side::Buy,
        outcome,
        price: clamp_price(price),
        size_units: count.max(0.0),
        dollar_value,
        timestamp_ms,
        trader: UNKNOWN_TRADER.to_string(),
        source: SourceSystem::Kalshi,
        tx_hash: None,
        block_number: None,
        link: None,
    })
}

/// A decoded fill becomes a trade once the token map has had a chance to
/// name the market. Unresolved fills keep flowing with placeholders.
pub fn onchain_trade(
    fill: &OrderFill,
    log: &LogEntry,
    market: Option<&GammaMarketRow>,
    timestamp_ms: u64,
) -> TradeRecord {
    let notional = fill.notional().max(0.0);

    // The non-collateral leg counts outcome tokens.
    let token_units = if fill.maker_asset_id != "0" {
        fill.maker_amount
    } else {
        fill.taker_amount
    };
    let smaller = fill.maker_amount.min(fill.taker_amount);
    let price = if notional > 0.0 {
        clamp_price(smaller / notional)
    } else {
        0.0
    };

    TradeRecord {
        id: format!("{}-{}", log.transaction_hash, log.log_index),
        market_id: market
            .map(|m| m.gamma_id.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        market_title: market
            .map(|m| m.question.clone())
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        side: Side::Buy,
        outcome: DEFAULT_OUTCOME.to_string(),
        price,
        size_units: token_units.max(0.0),
        dollar_value: (notional * 100.0).round() / 100.0,
        timestamp_ms,
        trader: fill.taker.clone(),
        source: SourceSystem::OnChain,
        tx_hash: Some(log.transaction_hash.clone()),
        block_number: Some(log.block_number),
        link: Some(format!(
            "https://polygonscan.com/tx/{}",
            log.transaction_hash
        )),
    }
}

/// Snapshot rows from the stored snapshots table.
pub fn market_snapshot(row: &Value) -> Result<MarketSnapshot, PipeError> {
    let market_id = get_str(row, "market_id")
        .ok_or_else(|| PipeError::MalformedRecord("snapshot without market_id".to_string()))?;

    let observed_at_ms = get_str(row, "snapshot_time")
        .and_then(|s| parse_rfc3339_ms(&s))
        .or_else(|| get_u64(row, "snapshot_time").map(normalize_ts_ms))
        .unwrap_or_else(now_ms);

    Ok(MarketSnapshot {
        market_id,
        event_id: non_empty(get_str(row, "event_id")),
        question: non_empty(get_str(row, "market_question"))
            .unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        yes_price: clamp_price(get_f64(row, "yes_price").unwrap_or(0.0)),
        no_price: clamp_price(get_f64(row, "no_price").unwrap_or(0.0)),
        volume_24h: get_f64(row, "volume_24h").unwrap_or(0.0).max(0.0),
        price_change_1h: get_f64(row, "price_change_1h").unwrap_or(0.0),
        observed_at_ms,
        slug: None,
        image: None,
    })
}

/// Gamma catalog rows viewed as snapshots, for the volume ranking.
pub fn gamma_snapshot(row: &GammaMarketRow, observed_ms: u64) -> MarketSnapshot {
    let yes_price = row
        .outcome_prices
        .first()
        .copied()
        .or(row.last_trade_price)
        .unwrap_or(0.0);
    let no_price = row
        .outcome_prices
        .get(1)
        .copied()
        .unwrap_or_else(|| 1.0 - clamp_price(yes_price));

    MarketSnapshot {
        market_id: row.gamma_id.clone(),
        event_id: None,
        question: non_empty(Some(row.question.clone()))
            .unwrap_or_else(|| UNKNOWN_MARKET.to_string()),
        yes_price: clamp_price(yes_price),
        no_price: clamp_price(no_price),
        volume_24h: row.volume24hr.max(0.0),
        price_change_1h: row.one_hour_price_change.unwrap_or(0.0),
        observed_at_ms: observed_ms,
        slug: row.slug.clone(),
        image: row.image.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn politics_row() -> GammaMarketRow {
        let v = json!({
            "id": "516710",
            "conditionId": "0xaaa",
            "question": "Will the incumbent win?",
            "slug": "incumbent-win",
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": "[\"0.62\", \"0.38\"]",
            "volume24hr": 125000.4,
            "lastTradePrice": 0.62,
            "oneHourPriceChange": -0.02,
            "oneDayPriceChange": -0.05,
        });
        crate::gamma::parse_market_row(&v).expect("row")
    }

    #[test]
    fn stored_trade_prefers_platform_title() {
        let row = json!({
            "id": "t-1",
            "market_id": "m-1",
            "market_question": "fallback question",
            "platform_data": {"title": "Platform Title"},
            "size": "25000",
            "side": "sell",
            "trader_wallet": "0xwallet",
            "timestamp": 1_756_080_000u64,
        });
        let rec = stored_trade(&row).expect("normalize");
        assert_eq!(rec.market_title, "Platform Title");
        assert_eq!(rec.side, Side::Sell);
        assert_eq!(rec.dollar_value, 25000.0);
        assert_eq!(rec.trader, "0xwallet");
        assert_eq!(rec.timestamp_ms, 1_756_080_000_000);
        assert_eq!(rec.source, SourceSystem::Stored);
    }

    #[test]
    fn stored_trade_defaults_without_optional_fields() {
        let row = json!({"id": "t-2", "market_id": "m-2"});
        let rec = stored_trade(&row).expect("normalize");
        assert_eq!(rec.market_title, UNKNOWN_MARKET);
        assert_eq!(rec.trader, UNKNOWN_TRADER);
        assert_eq!(rec.outcome, DEFAULT_OUTCOME);
        assert_eq!(rec.side, Side::Buy);
        assert_eq!(rec.dollar_value, 0.0);
    }

    #[test]
    fn stored_trade_without_identity_is_malformed() {
        let err = stored_trade(&json!({"market_id": "m"})).unwrap_err();
        assert!(matches!(err, PipeError::MalformedRecord(_)));
        let err = stored_trade(&json!({"id": "t"})).unwrap_err();
        assert!(matches!(err, PipeError::MalformedRecord(_)));
    }

    #[test]
    fn clob_trade_multiplies_string_size_and_price() {
        let market = politics_row();
        let trade = json!({
            "id": "c-1",
            "side": "BUY",
            "size": "20000",
            "price": "0.62",
            "timestamp": 1_756_080_000u64,
            "outcome": "Yes",
            "maker_address": "0xmaker",
        });
        let rec = clob_trade(&trade, &market).expect("normalize");
        assert_eq!(rec.market_id, "0xaaa");
        assert_eq!(rec.market_title, "Will the incumbent win?");
        assert!((rec.dollar_value - 12_400.0).abs() < 1e-6);
        assert_eq!(rec.size_units, 20000.0);
        assert_eq!(rec.trader, "0xmaker");
        assert_eq!(rec.timestamp_ms, 1_756_080_000_000);
    }

    #[test]
    fn clob_trade_without_numbers_is_malformed() {
        let market = politics_row();
        let err = clob_trade(&json!({"id": "c-2", "price": "0.5"}), &market).unwrap_err();
        assert!(matches!(err, PipeError::MalformedRecord(_)));
    }

    #[test]
    fn activity_trade_follows_price_drift_down() {
        let row = politics_row();
        let rec = activity_trade(&row, 1_756_080_000_000);
        assert_eq!(rec.id, "516710-1756080000000");
        assert_eq!(rec.side, Side::Sell);
        assert_eq!(rec.outcome, "No");
        assert_eq!(rec.dollar_value, 125000.0);
        assert_eq!(rec.price, 0.62);
        assert_eq!(
            rec.link.as_deref(),
            Some("https://polymarket.com/event/incumbent-win")
        );
        assert_eq!(rec.source, SourceSystem::MarketActivity);
    }

    #[test]
    fn activity_trade_buy_keeps_first_outcome() {
        let mut row = politics_row();
        row.one_hour_price_change = Some(0.03);
        let rec = activity_trade(&row, 1_756_080_000_000);
        assert_eq!(rec.side, Side::Buy);
        assert_eq!(rec.outcome, "Yes");
    }

    #[test]
    fn kalshi_trade_uses_taker_side_dollar_price() {
        let market = KalshiMarket {
            ticker: "PRES-2028".to_string(),
            title: Some("Presidential winner".to_string()),
            volume_24h: 50_000.0,
        };
        let trade = json!({
            "trade_id": "k-1",
            "ticker": "PRES-2028",
            "count": 700,
            "taker_side": "no",
            "yes_price_dollars": "0.65",
            "no_price_dollars": "0.35",
            "created_time": "2026-08-25T00:00:00Z",
        });
        let rec = kalshi_trade(&trade, &market).expect("normalize");
        assert_eq!(rec.outcome, "NO");
        assert_eq!(rec.side, Side::Buy);
        assert!((rec.dollar_value - 245.0).abs() < 1e-9);
        assert_eq!(rec.size_units, 700.0);
        assert_eq!(rec.price, 0.35);
        assert_eq!(rec.timestamp_ms, 1_787_616_000_000);
        assert_eq!(rec.market_title, "Presidential winner");
    }

    #[test]
    fn onchain_trade_resolves_market_and_links() {
        let fill = OrderFill {
            maker: "0xMaker".to_string(),
            taker: "0xTaker".to_string(),
            maker_asset_id: "111".to_string(),
            taker_asset_id: "0".to_string(),
            maker_amount: 40_000.0,
            taker_amount: 25_000.0,
            fee: 0.0,
        };
        let log = LogEntry {
            topics: Vec::new(),
            data: String::new(),
            block_number: 68_000_000,
            transaction_hash: "0xhash".to_string(),
            log_index: 3,
        };
        let market = politics_row();

        let rec = onchain_trade(&fill, &log, Some(&market), 1_756_080_000_000);
        assert_eq!(rec.id, "0xhash-3");
        assert_eq!(rec.market_id, "516710");
        assert_eq!(rec.dollar_value, 40_000.0);
        assert_eq!(rec.size_units, 40_000.0);
        assert!((rec.price - 0.625).abs() < 1e-9);
        assert_eq!(rec.trader, "0xTaker");
        assert_eq!(rec.block_number, Some(68_000_000));
        assert_eq!(
            rec.link.as_deref(),
            Some("https://polygonscan.com/tx/0xhash")
        );
    }

    #[test]
    fn onchain_trade_without_market_uses_placeholders() {
        let fill = OrderFill {
            maker: "0xMaker".to_string(),
            taker: "0xTaker".to_string(),
            maker_asset_id: "0".to_string(),
            taker_asset_id: "999".to_string(),
            maker_amount: 150.0,
            taker_amount: 300.0,
            fee: 0.0,
        };
        let log = LogEntry {
            topics: Vec::new(),
            data: String::new(),
            block_number: 1,
            transaction_hash: "0xh".to_string(),
            log_index: 0,
        };
        let rec = onchain_trade(&fill, &log, None, 0);
        assert_eq!(rec.market_id, "unknown");
        assert_eq!(rec.market_title, UNKNOWN_MARKET);
        assert_eq!(rec.dollar_value, 300.0);
        assert_eq!(rec.size_units, 300.0);
        assert!((rec.price - 0.5).abs() < 1e-9);
    }

    #[test]
    fn snapshot_parses_postgrest_row() {
        let row = json!({
            "market_id": "516710",
            "event_id": "9001",
            "market_question": "Will the incumbent win?",
            "yes_price": 0.62,
            "no_price": 0.38,
            "volume_24h": 2_400_000.0,
            "price_change_1h": -0.021,
            "snapshot_time": "2026-08-25T00:00:00+00:00",
        });
        let snap = market_snapshot(&row).expect("normalize");
        assert_eq!(snap.market_id, "516710");
        assert_eq!(snap.event_id.as_deref(), Some("9001"));
        assert_eq!(snap.observed_at_ms, 1_787_616_000_000);
        assert_eq!(snap.price_change_1h, -0.021);
    }

    #[test]
    fn snapshot_missing_price_change_reads_as_zero() {
        let row = json!({
            "market_id": "m",
            "yes_price": 0.5,
            "no_price": 0.5,
            "volume_24h": 1_200_000.0,
            "snapshot_time": "2026-08-25T00:00:00Z",
        });
        let snap = market_snapshot(&row).expect("normalize");
        assert_eq!(snap.price_change_1h, 0.0);
        assert_eq!(snap.question, UNKNOWN_MARKET);
    }

    #[test]
    fn gamma_snapshot_carries_slug_and_image() {
        let row = politics_row();
        let snap = gamma_snapshot(&row, 5);
        assert_eq!(snap.market_id, "516710");
        assert_eq!(snap.yes_price, 0.62);
        assert_eq!(snap.no_price, 0.38);
        assert_eq!(snap.slug.as_deref(), Some("incumbent-win"));
        assert_eq!(snap.observed_at_ms, 5);
    }
}
