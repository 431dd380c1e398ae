//! Post-rank summaries.
//!
//! Summaries are computed over the final ranked-and-capped set, never
//! the raw batch. The "largest" element is found by its own
//! max-by-dollar scan so it stays correct when a view displays some
//! other order.

use std::collections::HashSet;

use crate::gamma::GammaMarketRow;
use crate::types::{TradeRecord, UNKNOWN_TRADER};

#[derive(Clone, Debug)]
pub struct TradeSummary {
    pub total_volume: f64,
    /// 0 when the set is empty.
    pub average_trade_size: f64,
    pub unique_markets: usize,
    /// Placeholder traders do not count.
    pub unique_traders: usize,
    pub largest: Option<TradeRecord>,
}

pub fn summarize_trades(trades: &[TradeRecord]) -> TradeSummary {
    let total_volume: f64 = trades.iter().map(|t| t.dollar_value).sum();
    let average_trade_size = if trades.is_empty() {
        0.0
    } else {
        total_volume / trades.len() as f64
    };

    let unique_markets = trades
        .iter()
        .map(|t| t.market_id.as_str())
        .collect::<HashSet<_>>()
        .len();
    let unique_traders = trades
        .iter()
        .map(|t| t.trader.as_str())
        .filter(|t| !t.is_empty() && *t != UNKNOWN_TRADER)
        .collect::<HashSet<_>>()
        .len();

    let mut largest: Option<&TradeRecord> = None;
    for t in trades {
        match largest {
            Some(cur) if t.dollar_value <= cur.dollar_value => {}
            _ => largest = Some(t),
        }
    }

    TradeSummary {
        total_volume,
        average_trade_size,
        unique_markets,
        unique_traders,
        largest: largest.cloned(),
    }
}

#[derive(Clone, Debug)]
pub struct MarketSummary {
    pub total_volume_24h: f64,
    /// 0 when the set is empty.
    pub avg_volume_24h: f64,
    pub top: Option<GammaMarketRow>,
}

/// Leaderboard summary over the final catalog rows.
pub fn summarize_catalog(rows: &[GammaMarketRow]) -> MarketSummary {
    let total_volume_24h: f64 = rows.iter().map(|r| r.volume24hr).sum();
    let avg_volume_24h = if rows.is_empty() {
        0.0
    } else {
        total_volume_24h / rows.len() as f64
    };

    let mut top: Option<&GammaMarketRow> = None;
    for r in rows {
        match top {
            Some(cur) if r.volume24hr <= cur.volume24hr => {}
            _ => top = Some(r),
        }
    }

    MarketSummary {
        total_volume_24h,
        avg_volume_24h,
        top: top.cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Side, SourceSystem};
    use assert_approx_eq::assert_approx_eq;

    fn trade(id: &str, market: &str, trader: &str, dollar: f64) -> TradeRecord {
        TradeRecord {
            id: id.to_string(),
            market_id: market.to_string(),
            market_title: "q".to_string(),
            side: Side::Buy,
            outcome: "YES".to_string(),
            price: 0.5,
            size_units: dollar,
            dollar_value: dollar,
            timestamp_ms: 0,
            trader: trader.to_string(),
            source: SourceSystem::Stored,
            tx_hash: None,
            block_number: None,
            link: None,
        }
    }

    #[test]
    fn empty_set_summarizes_to_zeros() {
        let s = summarize_trades(&[]);
        assert_eq!(s.total_volume, 0.0);
        assert_eq!(s.average_trade_size, 0.0);
        assert_eq!(s.unique_markets, 0);
        assert_eq!(s.unique_traders, 0);
        assert!(s.largest.is_none());
    }

    #[test]
    fn distinct_counts_skip_placeholder_traders() {
        let trades = vec![
            trade("a", "m1", "0xalpha", 10_000.0),
            trade("b", "m1", "0xbeta", 30_000.0),
            trade("c", "m2", UNKNOWN_TRADER, 20_000.0),
            trade("d", "m2", "0xalpha", 40_000.0),
        ];
        let s = summarize_trades(&trades);
        assert_approx_eq!(s.total_volume, 100_000.0);
        assert_approx_eq!(s.average_trade_size, 25_000.0);
        assert_eq!(s.unique_markets, 2);
        assert_eq!(s.unique_traders, 2);
    }

    #[test]
    fn largest_is_found_regardless_of_display_order() {
        // Recency-ordered input; the max scan must still find "mid".
        let trades = vec![
            trade("newest", "m", "t", 5_000.0),
            trade("mid", "m", "t", 90_000.0),
            trade("oldest", "m", "t", 50_000.0),
        ];
        let s = summarize_trades(&trades);
        assert_eq!(s.largest.as_ref().map(|t| t.id.as_str()), Some("mid"));
    }

    #[test]
    fn largest_tie_keeps_first_fetched() {
        let trades = vec![
            trade("first", "m", "t", 10_000.0),
            trade("second", "m", "t", 10_000.0),
        ];
        let s = summarize_trades(&trades);
        assert_eq!(s.largest.as_ref().map(|t| t.id.as_str()), Some("first"));
    }

    #[test]
    fn catalog_summary_totals_and_top() {
        let row = |id: &str, vol: f64| {
            crate::gamma::parse_market_row(&serde_json::json!({
                "id": id,
                "question": "q",
                "volume24hr": vol,
            }))
            .expect("row")
        };
        let s = summarize_catalog(&[row("a", 1_000.0), row("b", 4_000.0), row("c", 250.0)]);
        assert_approx_eq!(s.total_volume_24h, 5_250.0);
        assert_approx_eq!(s.avg_volume_24h, 1_750.0);
        assert_eq!(s.top.as_ref().map(|m| m.gamma_id.as_str()), Some("b"));

        let empty = summarize_catalog(&[]);
        assert_eq!(empty.avg_volume_24h, 0.0);
        assert!(empty.top.is_none());
    }
}
