//! Snapshot deduplication.
//!
//! The snapshots table accumulates one row per market per poll, newest
//! first. Views want exactly one row per market: the latest observation,
//! with ties resolved in favor of the earlier fetch position.

use std::collections::HashMap;

use crate::types::MarketSnapshot;

/// Keep the latest snapshot per `market_id`. Output preserves the
/// first-occurrence order of market ids, so a pre-sorted input stays
/// sorted.
pub fn latest_per_market(snaps: Vec<MarketSnapshot>) -> Vec<MarketSnapshot> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<MarketSnapshot> = Vec::new();
    for snap in snaps {
        match index.get(&snap.market_id) {
            Some(&i) => {
                if snap.observed_at_ms > kept[i].observed_at_ms {
                    kept[i] = snap;
                }
            }
            None => {
                index.insert(snap.market_id.clone(), kept.len());
                kept.push(snap);
            }
        }
    }
    kept
}
