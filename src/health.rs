use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::clock::now_ms;

/// Shared across producers within a daemon cycle. Counters are cumulative
/// for the lifetime of the process.
#[derive(Default)]
pub struct PipelineCounters {
    records_fetched: AtomicU64,
    records_kept: AtomicU64,
    records_filtered: AtomicU64,
    malformed_records: AtomicU64,
    decode_failures: AtomicU64,
    unrecognized_events: AtomicU64,
    sub_query_failures: AtomicU64,
    persist_failures: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cycles_completed: AtomicU64,
    last_cycle_start_ms: AtomicU64,
    last_success_ms: AtomicU64,
}

impl PipelineCounters {
    pub fn inc_records_fetched(&self, n: u64) {
        self.records_fetched.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_records_kept(&self, n: u64) {
        self.records_kept.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_records_filtered(&self, n: u64) {
        self.records_filtered.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_malformed_records(&self, n: u64) {
        self.malformed_records.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_decode_failures(&self, n: u64) {
        self.decode_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_unrecognized_events(&self, n: u64) {
        self.unrecognized_events.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_sub_query_failures(&self, n: u64) {
        self.sub_query_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_persist_failures(&self, n: u64) {
        self.persist_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_cache_hits(&self, n: u64) {
        self.cache_hits.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_cache_misses(&self, n: u64) {
        self.cache_misses.fetch_add(n, Ordering::Relaxed);
    }

    pub fn inc_cycles_completed(&self, n: u64) {
        self.cycles_completed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn set_last_cycle_start_ms(&self, ts_ms: u64) {
        self.last_cycle_start_ms.store(ts_ms, Ordering::Relaxed);
    }

    pub fn set_last_success_ms(&self, ts_ms: u64) {
        self.last_success_ms.store(ts_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            ts_ms: now_ms(),
            records_fetched: self.records_fetched.load(Ordering::Relaxed),
            records_kept: self.records_kept.load(Ordering::Relaxed),
            records_filtered: self.records_filtered.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            unrecognized_events: self.unrecognized_events.load(Ordering::Relaxed),
            sub_query_failures: self.sub_query_failures.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            last_cycle_start_ms: self.last_cycle_start_ms.load(Ordering::Relaxed),
            last_success_ms: self.last_success_ms.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub ts_ms: u64,
    pub records_fetched: u64,
    pub records_kept: u64,
    pub records_filtered: u64,
    pub malformed_records: u64,
    pub decode_failures: u64,
    pub unrecognized_events: u64,
    pub sub_query_failures: u64,
    pub persist_failures: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cycles_completed: u64,
    pub last_cycle_start_ms: u64,
    pub last_success_ms: u64,
}
