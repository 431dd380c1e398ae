//! Whale-trade aggregation pipeline for prediction markets.
//!
//! Pulls trades and market state from Polymarket (stored tables, gamma
//! catalog, CLOB history, Polygon logs) and Kalshi, normalizes them into
//! one record shape, filters to whale size, ranks, and writes JSON
//! artifacts that a static frontend reads directly.

pub mod aggregate;
pub mod cache;
pub mod chain;
pub mod classify;
pub mod clob;
pub mod clock;
pub mod config;
pub mod decode;
pub mod dedup;
pub mod envelope;
pub mod error;
pub mod eth;
pub mod gamma;
pub mod health;
pub mod http;
pub mod json_util;
pub mod kalshi;
pub mod normalize;
pub mod paging;
pub mod producer;
pub mod rank;
pub mod run_meta;
pub mod schema;
pub mod sink;
pub mod stored;
pub mod types;
