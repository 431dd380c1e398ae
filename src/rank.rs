//! Ranking and capping.
//!
//! Per-market fetch order is not deterministic, so every view
//! re-establishes order here: a stable sort keyed by the selected mode,
//! ties left in fetch order, and the result cap applied strictly after
//! the full sort.

use crate::classify::competitiveness;
use crate::types::{MarketSnapshot, TradeRecord};

/// Orders for trade views.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TradeRank {
    /// Descending timestamp.
    Recency,
    /// Descending dollar value.
    Size,
    /// Ascending implied probability; surfaces long-shot conviction.
    Impact,
}

impl TradeRank {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeRank::Recency => "recency",
            TradeRank::Size => "size",
            TradeRank::Impact => "impact",
        }
    }
}

impl std::str::FromStr for TradeRank {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "recency" => TradeRank::Recency,
            "impact" => TradeRank::Impact,
            _ => TradeRank::Size,
        })
    }
}

/// Orders for market views. Also the `filter` values the pulse view
/// accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarketRank {
    /// Descending 24h volume.
    Volume,
    /// Ascending distance from even odds.
    Competitive,
    /// Descending absolute 1h price change.
    Volatile,
}

impl MarketRank {
    pub fn as_str(self) -> &'static str {
        match self {
            MarketRank::Volume => "volume",
            MarketRank::Competitive => "competitive",
            MarketRank::Volatile => "volatile",
        }
    }
}

impl std::str::FromStr for MarketRank {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "competitive" => MarketRank::Competitive,
            "volatile" => MarketRank::Volatile,
            _ => MarketRank::Volume,
        })
    }
}

pub fn rank_trades(trades: &mut Vec<TradeRecord>, rank: TradeRank, cap: usize) {
    match rank {
        TradeRank::Recency => trades.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms)),
        TradeRank::Size => trades.sort_by(|a, b| cmp_f64_desc(a.dollar_value, b.dollar_value)),
        TradeRank::Impact => trades.sort_by(|a, b| cmp_f64_asc(a.price, b.price)),
    }
    apply_cap(trades, cap);
}

pub fn rank_markets(snaps: &mut Vec<MarketSnapshot>, rank: MarketRank, cap: usize) {
    match rank {
        MarketRank::Volume => snaps.sort_by(|a, b| cmp_f64_desc(a.volume_24h, b.volume_24h)),
        MarketRank::Competitive => {
            snaps.sort_by(|a, b| cmp_f64_asc(competitiveness(a), competitiveness(b)))
        }
        MarketRank::Volatile => snaps.sort_by(|a, b| {
            cmp_f64_desc(a.price_change_1h.abs(), b.price_change_1h.abs())
        }),
    }
    apply_cap(snaps, cap);
}

// 0 means uncapped.
pub(crate) fn apply_cap<T>(items: &mut Vec<T>, cap: usize) {
    if cap > 0 && items.len() > cap {
        items.truncate(cap);
    }
}

pub(crate) fn cmp_f64_desc(a: f64, b: f64) -> std::cmp::Ordering {
    b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal)
}

pub(crate) fn cmp_f64_asc(a: f64, b: f64) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    use crate::types::{Side, SourceSystem};

    fn trade(id: &str, dollar: f64, price: f64, ts: u64) -> TradeRecord {
        TradeRecord {
            id: id.to_string(),
            market_id: "m".to_string(),
            market_title: "q".to_string(),
            side: Side::Buy,
            outcome: "YES".to_string(),
            price,
            size_units: dollar,
            dollar_value: dollar,
            timestamp_ms: ts,
            trader: "UNKNOWN".to_string(),
            source: SourceSystem::Clob,
            tx_hash: None,
            block_number: None,
            link: None,
        }
    }

    fn snap(id: &str, yes: f64, volume: f64, change: f64) -> MarketSnapshot {
        MarketSnapshot {
            market_id: id.to_string(),
            event_id: None,
            question: "q".to_string(),
            yes_price: yes,
            no_price: 1.0 - yes,
            volume_24h: volume,
            price_change_1h: change,
            observed_at_ms: 0,
            slug: None,
            image: None,
        }
    }

    fn ids(trades: &[TradeRecord]) -> Vec<&str> {
        trades.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn size_rank_caps_after_full_sort() {
        let mut trades = vec![
            trade("a", 12_000.0, 0.5, 1),
            trade("b", 90_000.0, 0.5, 2),
            trade("c", 45_000.0, 0.5, 3),
        ];
        rank_trades(&mut trades, TradeRank::Size, 2);
        assert_eq!(ids(&trades), vec!["b", "c"]);
    }

    #[test]
    fn equal_keys_keep_fetch_order() {
        let mut trades = vec![
            trade("first", 10_000.0, 0.5, 7),
            trade("second", 10_000.0, 0.5, 7),
            trade("third", 10_000.0, 0.5, 7),
        ];
        rank_trades(&mut trades, TradeRank::Size, 0);
        assert_eq!(ids(&trades), vec!["first", "second", "third"]);
    }

    #[test]
    fn recency_and_impact_orders() {
        let mut trades = vec![
            trade("old", 1.0, 0.9, 100),
            trade("new", 2.0, 0.1, 300),
            trade("mid", 3.0, 0.5, 200),
        ];
        rank_trades(&mut trades, TradeRank::Recency, 0);
        assert_eq!(ids(&trades), vec!["new", "mid", "old"]);

        rank_trades(&mut trades, TradeRank::Impact, 0);
        assert_eq!(ids(&trades), vec!["new", "mid", "old"]);
    }

    #[test]
    fn market_modes_use_their_keys() {
        let base = vec![
            snap("lopsided", 0.93, 500.0, 0.002),
            snap("coin_flip", 0.51, 100.0, -0.04),
            snap("busy", 0.70, 9_000.0, 0.01),
        ];

        let mut by_volume = base.clone();
        rank_markets(&mut by_volume, MarketRank::Volume, 0);
        assert_eq!(by_volume[0].market_id, "busy");

        let mut by_edge = base.clone();
        rank_markets(&mut by_edge, MarketRank::Competitive, 0);
        assert_eq!(by_edge[0].market_id, "coin_flip");

        let mut by_move = base;
        rank_markets(&mut by_move, MarketRank::Volatile, 1);
        assert_eq!(by_move.len(), 1);
        assert_eq!(by_move[0].market_id, "coin_flip");
    }

    #[test]
    fn cap_zero_keeps_everything() {
        let mut trades = vec![trade("a", 1.0, 0.5, 1), trade("b", 2.0, 0.5, 2)];
        rank_trades(&mut trades, TradeRank::Size, 0);
        assert_eq!(trades.len(), 2);
    }

    #[test]
    fn mode_strings_round_trip_with_fallback() {
        assert_eq!(MarketRank::from_str("competitive").unwrap(), MarketRank::Competitive);
        assert_eq!(MarketRank::from_str("VOLATILE").unwrap(), MarketRank::Volatile);
        assert_eq!(MarketRank::from_str("anything").unwrap(), MarketRank::Volume);
        assert_eq!(TradeRank::from_str("impact").unwrap(), TradeRank::Impact);
        assert_eq!(TradeRank::from_str("junk").unwrap(), TradeRank::Size);
    }
}
