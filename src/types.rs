//! Canonical record shapes (frozen):
//! - `price` and snapshot prices are **probability fractions in [0, 1]**.
//!   Cent prices and percent values are converted at the source boundary;
//!   percent rendering happens only in the presentation layer.
//! - `dollar_value` is the notional in USD. When an upstream supplies a
//!   dollar amount directly, that value is authoritative over `size * price`.
//! - Timestamps are unix ms from the source clock. No cross-source
//!   synchronization is assumed.

use crate::error::PipeError;

pub const UNKNOWN_MARKET: &str = "Unknown Market";
pub const UNKNOWN_TRADER: &str = "UNKNOWN";
pub const DEFAULT_OUTCOME: &str = "YES";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::str::FromStr for Side {
    type Err = PipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(PipeError::MalformedRecord(format!("bad side {other:?}"))),
        }
    }
}

/// Provenance tag. Used for labels and per-source thresholds, never for
/// business logic branches inside the pipeline stages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SourceSystem {
    Stored,
    MarketActivity,
    Clob,
    OnChain,
    Kalshi,
}

impl SourceSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceSystem::Stored => "stored",
            SourceSystem::MarketActivity => "market_activity",
            SourceSystem::Clob => "clob",
            SourceSystem::OnChain => "onchain",
            SourceSystem::Kalshi => "kalshi",
        }
    }
}

/// One normalized trade, from any source.
#[derive(Clone, Debug)]
pub struct TradeRecord {
    pub id: String,
    pub market_id: String,
    /// Never empty; defaults to [`UNKNOWN_MARKET`].
    pub market_title: String,
    pub side: Side,
    /// "YES"/"NO" or a named outcome; defaults to [`DEFAULT_OUTCOME`].
    pub outcome: String,
    /// Implied probability fraction in [0, 1].
    pub price: f64,
    pub size_units: f64,
    /// Notional USD, always >= 0. Primary sort/filter key.
    pub dollar_value: f64,
    pub timestamp_ms: u64,
    /// Wallet or username; defaults to [`UNKNOWN_TRADER`].
    pub trader: String,
    pub source: SourceSystem,
    /// On-chain provenance, empty for off-chain sources.
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    /// Link for manual verification (polygonscan / polymarket).
    pub link: Option<String>,
}

/// Point-in-time observation of one market's aggregate state.
#[derive(Clone, Debug)]
pub struct MarketSnapshot {
    pub market_id: String,
    pub event_id: Option<String>,
    pub question: String,
    /// Fractions in [0, 1]; need not sum to 1.
    pub yes_price: f64,
    pub no_price: f64,
    pub volume_24h: f64,
    /// Signed fraction; 0 when the source omits it.
    pub price_change_1h: f64,
    pub observed_at_ms: u64,
    pub slug: Option<String>,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr as _;

    #[test]
    fn side_round_trip() {
        assert_eq!(Side::from_str("BUY").unwrap(), Side::Buy);
        assert_eq!(Side::from_str("sell").unwrap(), Side::Sell);
        assert_eq!(Side::Buy.as_str(), "BUY");
        assert_eq!(Side::Sell.as_str(), "SELL");
        assert!(Side::from_str("HOLD").is_err());
    }

    #[test]
    fn source_labels_are_stable() {
        assert_eq!(SourceSystem::Stored.as_str(), "stored");
        assert_eq!(SourceSystem::MarketActivity.as_str(), "market_activity");
        assert_eq!(SourceSystem::Clob.as_str(), "clob");
        assert_eq!(SourceSystem::OnChain.as_str(), "onchain");
        assert_eq!(SourceSystem::Kalshi.as_str(), "kalshi");
    }
}
