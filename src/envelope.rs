//! Presentation layer.
//!
//! Every artifact shares one envelope: a `trades` or `markets` list,
//! `count`, `lastUpdated`, and optional `summary`/`note` blocks. Record
//! fields use the canonical names regardless of what the upstream
//! called them, so consumers parse one shape. Percent rendering
//! happens only here; everything upstream stays in fractions.

use serde::Serialize;

use crate::aggregate::{MarketSummary, TradeSummary};
use crate::clock::iso8601_utc_ms;
use crate::gamma::GammaMarketRow;
use crate::types::{MarketSnapshot, TradeRecord};

/// Fraction to percent, one decimal place.
pub fn percent_1dp(p: f64) -> f64 {
    (p * 1000.0).round() / 10.0
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeOut {
    pub id: String,
    pub market_id: String,
    pub market_title: String,
    pub side: &'static str,
    pub outcome: String,
    pub price: f64,
    pub size_units: f64,
    pub dollar_value: f64,
    pub timestamp: u64,
    pub trader: String,
    pub source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl From<&TradeRecord> for TradeOut {
    fn from(rec: &TradeRecord) -> Self {
        Self {
            id: rec.id.clone(),
            market_id: rec.market_id.clone(),
            market_title: rec.market_title.clone(),
            side: rec.side.as_str(),
            outcome: rec.outcome.clone(),
            price: rec.price,
            size_units: rec.size_units,
            dollar_value: rec.dollar_value,
            timestamp: rec.timestamp_ms,
            trader: rec.trader.clone(),
            source: rec.source.as_str(),
            tx_hash: rec.tx_hash.clone(),
            block_number: rec.block_number,
            link: rec.link.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeSummaryOut {
    pub total_volume: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_trade_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_markets: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unique_traders: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_trade: Option<TradeOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub largest_activity: Option<TradeOut>,
}

impl TradeSummaryOut {
    /// Full statistics for individual-trade views.
    pub fn trades(summary: &TradeSummary) -> Self {
        Self {
            total_volume: summary.total_volume,
            average_trade_size: Some(summary.average_trade_size),
            unique_markets: Some(summary.unique_markets),
            unique_traders: Some(summary.unique_traders),
            largest_trade: summary.largest.as_ref().map(TradeOut::from),
            largest_activity: None,
        }
    }

    /// The activity view reports volume and its head entry only; the
    /// other statistics are meaningless for market-level pseudo-trades.
    pub fn activity(summary: &TradeSummary) -> Self {
        Self {
            total_volume: summary.total_volume,
            average_trade_size: None,
            unique_markets: None,
            unique_traders: None,
            largest_trade: None,
            largest_activity: summary.largest.as_ref().map(TradeOut::from),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRangeOut {
    pub from: u64,
    pub to: u64,
    pub blocks_scanned: u64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRangeOut {
    pub from: String,
    pub to: String,
}

impl TimeRangeOut {
    pub fn from_ms(from_ms: u64, to_ms: u64) -> Self {
        Self {
            from: iso8601_utc_ms(from_ms),
            to: iso8601_utc_ms(to_ms),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesEnvelope {
    pub trades: Vec<TradeOut>,
    pub count: usize,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_range: Option<BlockRangeOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRangeOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<TradeSummaryOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// "No data" marker. An empty list with a message is not an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TradesEnvelope {
    pub fn new(records: &[TradeRecord], now_ms: u64) -> Self {
        Self {
            trades: records.iter().map(TradeOut::from).collect(),
            count: records.len(),
            last_updated: iso8601_utc_ms(now_ms),
            block_range: None,
            time_range: None,
            summary: None,
            note: None,
            message: None,
        }
    }
}

/// Pulse panel row. Prices and the 1h change are percent, one decimal.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseMarketOut {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    pub title: String,
    pub yes_price: f64,
    pub no_price: f64,
    pub volume: f64,
    pub last_updated: String,
    pub polymarket_url: String,
    pub image_url: String,
    pub price_change_1h: f64,
}

impl From<&MarketSnapshot> for PulseMarketOut {
    fn from(snap: &MarketSnapshot) -> Self {
        Self {
            id: snap.market_id.clone(),
            event_id: snap.event_id.clone(),
            title: snap.question.clone(),
            yes_price: percent_1dp(snap.yes_price),
            no_price: percent_1dp(snap.no_price),
            volume: snap.volume_24h,
            last_updated: iso8601_utc_ms(snap.observed_at_ms),
            polymarket_url: snap
                .slug
                .as_ref()
                .map(|slug| format!("https://polymarket.com/market/{slug}"))
                .unwrap_or_else(|| "#".to_string()),
            image_url: snap.image.clone().unwrap_or_default(),
            price_change_1h: percent_1dp(snap.price_change_1h),
        }
    }
}

/// Volume-leaderboard row, straight off the catalog.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMarketOut {
    pub id: String,
    pub question: String,
    pub slug: String,
    pub volume24hr: f64,
    pub volume7d: f64,
    pub volume_total: f64,
    pub liquidity: f64,
    pub outcomes: Vec<String>,
    pub outcome_prices: Vec<f64>,
    pub price_change_24hr: f64,
    pub market_url: String,
    pub active: bool,
    pub closed: bool,
}

impl From<&GammaMarketRow> for CatalogMarketOut {
    fn from(row: &GammaMarketRow) -> Self {
        let slug = row.slug.clone().unwrap_or_default();
        Self {
            id: row.gamma_id.clone(),
            question: row.question.clone(),
            market_url: format!("https://polymarket.com/event/{slug}"),
            slug,
            volume24hr: row.volume24hr,
            volume7d: row.volume7d,
            volume_total: row.volume_total,
            liquidity: row.liquidity,
            outcomes: row.outcomes.clone(),
            outcome_prices: row.outcome_prices.clone(),
            price_change_24hr: row.one_day_price_change.unwrap_or(0.0),
            active: row.active,
            closed: row.closed,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSummaryOut {
    pub total_volume_24hr: f64,
    pub avg_volume_24hr: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_market: Option<CatalogMarketOut>,
}

impl From<&MarketSummary> for MarketSummaryOut {
    fn from(summary: &MarketSummary) -> Self {
        Self {
            total_volume_24hr: summary.total_volume_24h,
            avg_volume_24hr: summary.avg_volume_24h,
            top_market: summary.top.as_ref().map(CatalogMarketOut::from),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketsEnvelope<M: Serialize> {
    pub markets: Vec<M>,
    pub count: usize,
    pub last_updated: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<MarketSummaryOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl<M: Serialize> MarketsEnvelope<M> {
    pub fn new(markets: Vec<M>, now_ms: u64) -> Self {
        Self {
            count: markets.len(),
            markets,
            last_updated: iso8601_utc_ms(now_ms),
            summary: None,
            note: None,
        }
    }
}

/// Failure artifact. Upstream/database failure writes this instead of
/// a data envelope; an empty result set never does.
#[derive(Clone, Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}
