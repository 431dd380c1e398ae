//! Whale, volatility and content classification.
//!
//! Classification is policy over already-normalized records. Thresholds
//! are per-source configuration, not one global constant; the sports
//! denylist is a substring heuristic carried over from the stored-trade
//! screen and applied to every whale-trade view.

use crate::config::ThresholdConfig;
use crate::gamma::GammaMarketRow;
use crate::types::{MarketSnapshot, SourceSystem, TradeRecord};

/// Question keywords that admit a market into the politics pool even
/// without a catalog tag.
pub const POLITICS_KEYWORDS: &[&str] = &[
    "trump",
    "harris",
    "kamala",
    "election",
    "president",
    "senate",
    "congress",
    "democrat",
    "republican",
    "biden",
    "elon",
    "musk",
];

pub fn whale_threshold(thresholds: &ThresholdConfig, source: SourceSystem) -> f64 {
    match source {
        SourceSystem::Stored => thresholds.stored,
        SourceSystem::MarketActivity => thresholds.activity,
        SourceSystem::Clob => thresholds.clob,
        SourceSystem::OnChain => thresholds.onchain,
        SourceSystem::Kalshi => thresholds.kalshi,
    }
}

/// "Team A VS. Team B" titles are sports bets, not questions.
pub fn is_sports_title(title: &str) -> bool {
    title.to_uppercase().contains("VS.")
}

pub fn is_politics_market(row: &GammaMarketRow) -> bool {
    if row.has_politics_tag {
        return true;
    }
    let question = row.question.to_lowercase();
    POLITICS_KEYWORDS.iter().any(|k| question.contains(k))
}

/// Pool admission for the activity scan: politics, or busy enough to
/// watch regardless of topic.
pub fn is_activity_candidate(row: &GammaMarketRow, thresholds: &ThresholdConfig) -> bool {
    is_politics_market(row) || row.volume24hr > thresholds.activity_candidate_volume
}

/// A candidate qualifies when its 24h volume clears the bar or either
/// price change does.
pub fn qualifies_as_activity(row: &GammaMarketRow, thresholds: &ThresholdConfig) -> bool {
    row.volume24hr >= thresholds.activity
        || row.one_hour_price_change.unwrap_or(0.0).abs() >= thresholds.volatility
        || row.one_day_price_change.unwrap_or(0.0).abs() >= thresholds.volatility
}

pub fn is_volatile(snap: &MarketSnapshot, volatility: f64) -> bool {
    snap.price_change_1h.abs() >= volatility
}

/// Distance of the YES percent from 50. Smaller means closer to a coin
/// flip.
pub fn competitiveness(snap: &MarketSnapshot) -> f64 {
    (snap.yes_price * 100.0 - 50.0).abs()
}

/// Outcome of the whale filter over one batch.
#[derive(Debug, Default)]
pub struct FilterOutcome {
    pub kept: Vec<TradeRecord>,
    pub below_threshold: usize,
    pub sports_filtered: usize,
}

/// Threshold plus content filter for the whale-trade views. The sports
/// denylist runs first so a filtered title never counts toward any
/// summary.
pub fn filter_whale_trades(
    records: Vec<TradeRecord>,
    thresholds: &ThresholdConfig,
) -> FilterOutcome {
    let mut out = FilterOutcome::default();
    for rec in records {
        if is_sports_title(&rec.market_title) {
            out.sports_filtered += 1;
            continue;
        }
        if rec.dollar_value < whale_threshold(thresholds, rec.source) {
            out.below_threshold += 1;
            continue;
        }
        out.kept.push(rec);
    }
    out
}
