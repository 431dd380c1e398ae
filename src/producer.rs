//! View producers.
//!
//! One function per durable artifact, each running the whole pipeline
//! for its source: fetch, normalize, classify, dedup where it applies,
//! rank, summarize, persist. Record-level failures are counted and
//! skipped; a whole-source failure aborts only that view and
//! propagates, and the caller writes the structured error artifact in
//! its place. A persist failure never fails the run that computed the
//! result.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{summarize_catalog, summarize_trades};
use crate::cache::Cache;
use crate::chain::{BlockTimestampCache, RpcClient};
use crate::classify;
use crate::clock::now_ms;
use crate::config::Config;
use crate::decode;
use crate::dedup;
use crate::envelope::{
    BlockRangeOut, CatalogMarketOut, ErrorEnvelope, MarketSummaryOut, MarketsEnvelope,
    PulseMarketOut, TimeRangeOut, TradeSummaryOut, TradesEnvelope,
};
use crate::error::PipeError;
use crate::gamma::{self, GammaMarketRow};
use crate::health::PipelineCounters;
use crate::http;
use crate::kalshi;
use crate::normalize;
use crate::rank::{apply_cap, cmp_f64_desc, rank_markets, rank_trades, MarketRank, TradeRank};
use crate::types::MarketSnapshot;
use crate::{clob, schema, sink, stored};

pub const ERR_WHALE_TRADES: &str = "Failed to fetch whale trades";
pub const ERR_MARKET_ACTIVITY: &str = "Failed to fetch market activity";
pub const ERR_STORED_TRADES: &str = "Failed to fetch trades from database";
pub const ERR_MARKET_PULSE: &str = "Database error";
pub const ERR_ONCHAIN_TRADES: &str = "Failed to fetch on-chain trades";
pub const ERR_KALSHI_TRADES: &str = "Failed to fetch Kalshi trades";
pub const ERR_TOP_MARKETS: &str = "Failed to fetch top markets";

const ACTIVITY_NOTE: &str = "Markets with high 24h volume or significant price changes, \
     expressed as market-level activity rather than individual trades. \
     Use the link to verify on Polymarket.";
const STORED_NOTE: &str =
    "Whale trades from the stored trades table. Rows arrive pre-screened upstream.";
const ONCHAIN_NOTE: &str =
    "On-chain fills from the Polygon exchange contract. Verify any trade via its link.";
const KALSHI_NOTE: &str =
    "Individual trades from the Kalshi API. Each trade shows its exact dollar amount and taker side.";

pub struct Producer<'a> {
    cfg: &'a Config,
    client: reqwest::Client,
    cache: &'a dyn Cache,
    counters: &'a PipelineCounters,
}

impl<'a> Producer<'a> {
    pub fn new(
        cfg: &'a Config,
        cache: &'a dyn Cache,
        counters: &'a PipelineCounters,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            cfg,
            client: http::build_client(&cfg.http)?,
            cache,
            counters,
        })
    }

    fn persist<T: Serialize>(&self, file: &str, payload: &T) {
        let path = self.cfg.run.data_dir.join(file);
        if let Err(e) = sink::write_json_atomic(&path, payload) {
            self.counters.inc_persist_failures(1);
            warn!(file, error = %e, "artifact write failed");
        }
    }

    /// The on-disk stand-in for a 500 response. Readers fall back to
    /// their cached copy and show a degraded connection state.
    pub fn write_error(&self, file: &str, error: &str, cause: &PipeError) {
        self.persist(file, &ErrorEnvelope::with_details(error, cause.to_string()));
    }

    async fn pace(&self) {
        let delay = self.cfg.run.source_delay_ms;
        if delay > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(delay)).await;
        }
    }

    /// Individual CLOB fills across the politics pool, filtered to
    /// whale size.
    pub async fn run_whale_trades(&self) -> Result<usize, PipeError> {
        let markets = gamma::politics_markets(&self.client, self.cfg).await?;
        let window_start_secs =
            (now_ms() / 1000).saturating_sub(self.cfg.polymarket.trade_window_hours * 3600);

        let mut records = Vec::new();
        let mut scanned = 0usize;
        for market in markets
            .iter()
            .filter(|m| !m.condition_id.is_empty())
            .take(self.cfg.polymarket.top_markets)
        {
            if scanned > 0 {
                self.pace().await;
            }
            scanned += 1;

            let rows = match clob::market_trades(
                &self.client,
                self.cfg,
                &market.condition_id,
                window_start_secs,
            )
            .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    self.counters.inc_sub_query_failures(1);
                    warn!(market = %market.condition_id, error = %e, "clob trades fetch failed");
                    continue;
                }
            };
            self.counters.inc_records_fetched(rows.len() as u64);
            for row in &rows {
                match normalize::clob_trade(row, market) {
                    Ok(rec) => records.push(rec),
                    Err(e) => {
                        self.counters.inc_malformed_records(1);
                        debug!(error = %e, "skipping malformed clob trade");
                    }
                }
            }
        }

        let outcome = classify::filter_whale_trades(records, &self.cfg.thresholds);
        self.counters
            .inc_records_filtered((outcome.below_threshold + outcome.sports_filtered) as u64);
        let mut kept = outcome.kept;
        rank_trades(&mut kept, TradeRank::Size, self.cfg.caps.whale_trades);
        self.counters.inc_records_kept(kept.len() as u64);

        let mut env = TradesEnvelope::new(&kept, now_ms());
        env.summary = Some(TradeSummaryOut::trades(&summarize_trades(&kept)));
        self.persist(schema::FILE_WHALE_TRADES, &env);

        info!(
            markets = scanned,
            kept = kept.len(),
            below_threshold = outcome.below_threshold,
            sports_filtered = outcome.sports_filtered,
            "whale trades view written"
        );
        Ok(kept.len())
    }

    /// Market-level pseudo-trades from the catalog: politics or
    /// high-volume markets whose volume or price moves qualify.
    pub async fn run_market_activity(&self) -> Result<usize, PipeError> {
        let pool = gamma::open_markets_cached(
            &self.client,
            self.cfg,
            self.cache,
            self.counters,
            self.cfg.polymarket.activity_pool_limit,
        )
        .await?;
        self.counters.inc_records_fetched(pool.len() as u64);

        let observed = now_ms();
        let mut records = Vec::new();
        let mut candidates = 0usize;
        for row in &pool {
            if !classify::is_activity_candidate(row, &self.cfg.thresholds) {
                continue;
            }
            candidates += 1;
            if classify::qualifies_as_activity(row, &self.cfg.thresholds) {
                records.push(normalize::activity_trade(row, observed));
            } else {
                self.counters.inc_records_filtered(1);
            }
        }

        rank_trades(&mut records, TradeRank::Size, self.cfg.caps.activity);
        self.counters.inc_records_kept(records.len() as u64);

        let mut env = TradesEnvelope::new(&records, observed);
        env.summary = Some(TradeSummaryOut::activity(&summarize_trades(&records)));
        env.note = Some(ACTIVITY_NOTE.to_string());
        self.persist(schema::FILE_MARKET_ACTIVITY, &env);

        info!(
            pool = pool.len(),
            candidates,
            kept = records.len(),
            "market activity view written"
        );
        Ok(records.len())
    }

    /// Pre-screened whale trades from the stored trades table.
    pub async fn run_stored_trades(&self) -> Result<usize, PipeError> {
        let rows = stored::whale_trade_rows(&self.client, self.cfg).await?;
        self.counters.inc_records_fetched(rows.len() as u64);

        if rows.is_empty() {
            let mut env = TradesEnvelope::new(&[], now_ms());
            env.message = Some("No trades found in database".to_string());
            self.persist(schema::FILE_STORED_TRADES, &env);
            info!("stored trades view written empty");
            return Ok(0);
        }

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match normalize::stored_trade(row) {
                Ok(rec) => records.push(rec),
                Err(e) => {
                    self.counters.inc_malformed_records(1);
                    debug!(error = %e, "skipping malformed stored trade");
                }
            }
        }

        let outcome = classify::filter_whale_trades(records, &self.cfg.thresholds);
        self.counters
            .inc_records_filtered((outcome.below_threshold + outcome.sports_filtered) as u64);
        let mut kept = outcome.kept;
        rank_trades(&mut kept, TradeRank::Size, self.cfg.caps.stored);
        self.counters.inc_records_kept(kept.len() as u64);

        let mut env = TradesEnvelope::new(&kept, now_ms());
        env.summary = Some(TradeSummaryOut::trades(&summarize_trades(&kept)));
        env.note = Some(STORED_NOTE.to_string());
        self.persist(schema::FILE_STORED_TRADES, &env);

        info!(
            kept = kept.len(),
            sports_filtered = outcome.sports_filtered,
            "stored trades view written"
        );
        Ok(kept.len())
    }

    /// Panel of deduplicated market snapshots, in the selected order,
    /// enriched with catalog slugs and images.
    pub async fn run_market_pulse(
        &self,
        rank: MarketRank,
        min_volume: Option<f64>,
    ) -> Result<usize, PipeError> {
        let rows = stored::snapshot_rows(&self.client, self.cfg).await?;
        self.counters.inc_records_fetched(rows.len() as u64);

        let mut snaps = Vec::with_capacity(rows.len());
        for row in &rows {
            match normalize::market_snapshot(row) {
                Ok(s) => snaps.push(s),
                Err(e) => {
                    self.counters.inc_malformed_records(1);
                    debug!(error = %e, "skipping malformed snapshot");
                }
            }
        }

        let unique = dedup::latest_per_market(snaps);

        // The competitive view keeps its own fixed floor regardless of
        // any override.
        let volume_floor = match rank {
            MarketRank::Competitive => self.cfg.pulse.competitive_min_volume,
            _ => min_volume.unwrap_or(self.cfg.pulse.min_volume),
        };
        let before = unique.len();
        let mut kept: Vec<MarketSnapshot> = unique
            .into_iter()
            .filter(|s| s.volume_24h >= volume_floor)
            .filter(|s| {
                rank != MarketRank::Volatile
                    || classify::is_volatile(s, self.cfg.thresholds.volatility)
            })
            .collect();
        self.counters
            .inc_records_filtered((before - kept.len()) as u64);

        rank_markets(&mut kept, rank, self.cfg.caps.market_panel);
        self.counters.inc_records_kept(kept.len() as u64);

        for snap in &mut kept {
            match gamma::market_by_id_cached(
                &self.client,
                self.cfg,
                self.cache,
                self.counters,
                &snap.market_id,
            )
            .await
            {
                Some(row) => {
                    snap.slug = row.slug;
                    snap.image = row.image;
                }
                None => self.counters.inc_sub_query_failures(1),
            }
        }

        let out: Vec<PulseMarketOut> = kept.iter().map(PulseMarketOut::from).collect();
        let env = MarketsEnvelope::new(out, now_ms());
        self.persist(schema::FILE_MARKET_PULSE, &env);

        info!(
            mode = rank.as_str(),
            kept = kept.len(),
            "market pulse view written"
        );
        Ok(kept.len())
    }

    /// Fills decoded straight from exchange contract logs. Markets
    /// resolve through the catalog token map when they can; unresolved
    /// fills are kept with placeholders.
    pub async fn run_onchain_trades(&self) -> Result<usize, PipeError> {
        let rpc = RpcClient::new(self.client.clone(), &self.cfg.chain);
        let head = rpc.latest_block_number().await?;
        let from = head.saturating_sub(self.cfg.chain.block_window);

        let mut logs = rpc
            .logs_by_topic(
                &self.cfg.chain.exchange_address,
                &self.cfg.chain.order_filled_topic,
                from,
                head,
            )
            .await?;
        logs.truncate(self.cfg.chain.max_logs);
        self.counters.inc_records_fetched(logs.len() as u64);

        // The token map is enrichment. A catalog failure degrades to
        // unresolved markets instead of dropping chain data.
        let pool = match gamma::open_markets_cached(
            &self.client,
            self.cfg,
            self.cache,
            self.counters,
            self.cfg.polymarket.wide_pool_limit,
        )
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                self.counters.inc_sub_query_failures(1);
                warn!(error = %e, "token map unavailable, markets will be unresolved");
                Vec::new()
            }
        };
        let tokens = gamma::token_index(&pool);

        let mut ts_cache = BlockTimestampCache::new();
        let mut records = Vec::new();
        for log in &logs {
            let fill = match decode::decode_order_filled(
                &log.topics,
                &log.data,
                &self.cfg.chain.order_filled_topic,
            ) {
                Ok(fill) => fill,
                Err(PipeError::UnrecognizedEvent) => {
                    self.counters.inc_unrecognized_events(1);
                    debug!(tx = %log.transaction_hash, "skipping foreign event");
                    continue;
                }
                Err(e) => {
                    self.counters.inc_decode_failures(1);
                    warn!(tx = %log.transaction_hash, error = %e, "log decode failed");
                    continue;
                }
            };

            let market = tokens
                .get(&fill.maker_asset_id)
                .or_else(|| tokens.get(&fill.taker_asset_id))
                .and_then(|i| pool.get(*i));
            let ts = ts_cache.timestamp_ms(&rpc, log.block_number).await;
            records.push(normalize::onchain_trade(&fill, log, market, ts));
        }

        let outcome = classify::filter_whale_trades(records, &self.cfg.thresholds);
        self.counters
            .inc_records_filtered((outcome.below_threshold + outcome.sports_filtered) as u64);
        let mut kept = outcome.kept;
        rank_trades(&mut kept, TradeRank::Size, self.cfg.caps.onchain);
        self.counters.inc_records_kept(kept.len() as u64);

        let mut env = TradesEnvelope::new(&kept, now_ms());
        env.block_range = Some(BlockRangeOut {
            from,
            to: head,
            blocks_scanned: head - from,
        });
        env.summary = Some(TradeSummaryOut::trades(&summarize_trades(&kept)));
        env.note = Some(ONCHAIN_NOTE.to_string());
        self.persist(schema::FILE_ONCHAIN_TRADES, &env);

        info!(
            from_block = from,
            to_block = head,
            logs = logs.len(),
            kept = kept.len(),
            "onchain trades view written"
        );
        Ok(kept.len())
    }

    /// Individual Kalshi trades across its busiest markets.
    pub async fn run_kalshi_trades(&self) -> Result<usize, PipeError> {
        let mut markets = kalshi::open_markets(&self.client, self.cfg).await?;
        markets.retain(|m| m.volume_24h > 0.0);
        markets.sort_by(|a, b| cmp_f64_desc(a.volume_24h, b.volume_24h));
        markets.truncate(self.cfg.kalshi.top_markets);

        let now = now_ms();
        let window_start_secs =
            (now / 1000).saturating_sub(self.cfg.kalshi.trade_window_hours * 3600);

        let mut records = Vec::new();
        for (i, market) in markets.iter().enumerate() {
            if i > 0 {
                self.pace().await;
            }
            let rows = match kalshi::market_trades(
                &self.client,
                self.cfg,
                &market.ticker,
                window_start_secs,
            )
            .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    self.counters.inc_sub_query_failures(1);
                    warn!(ticker = %market.ticker, error = %e, "kalshi trades fetch failed");
                    continue;
                }
            };
            self.counters.inc_records_fetched(rows.len() as u64);
            for row in &rows {
                match normalize::kalshi_trade(row, market) {
                    Ok(rec) => records.push(rec),
                    Err(e) => {
                        self.counters.inc_malformed_records(1);
                        debug!(error = %e, "skipping malformed kalshi trade");
                    }
                }
            }
        }

        let outcome = classify::filter_whale_trades(records, &self.cfg.thresholds);
        self.counters
            .inc_records_filtered((outcome.below_threshold + outcome.sports_filtered) as u64);
        let mut kept = outcome.kept;
        rank_trades(&mut kept, TradeRank::Size, self.cfg.caps.kalshi);
        self.counters.inc_records_kept(kept.len() as u64);

        let mut env = TradesEnvelope::new(&kept, now);
        env.time_range = Some(TimeRangeOut::from_ms(window_start_secs * 1000, now));
        env.summary = Some(TradeSummaryOut::trades(&summarize_trades(&kept)));
        env.note = Some(KALSHI_NOTE.to_string());
        self.persist(schema::FILE_KALSHI_TRADES, &env);

        info!(
            markets = markets.len(),
            kept = kept.len(),
            "kalshi trades view written"
        );
        Ok(kept.len())
    }

    /// Volume leaderboard straight off the catalog.
    pub async fn run_top_markets(&self) -> Result<usize, PipeError> {
        let pool = gamma::open_markets_cached(
            &self.client,
            self.cfg,
            self.cache,
            self.counters,
            self.cfg.polymarket.wide_pool_limit,
        )
        .await?;
        self.counters.inc_records_fetched(pool.len() as u64);

        let mut rows: Vec<GammaMarketRow> =
            pool.into_iter().filter(|r| r.volume24hr > 0.0).collect();
        rows.sort_by(|a, b| cmp_f64_desc(a.volume24hr, b.volume24hr));
        apply_cap(&mut rows, self.cfg.caps.top_markets);
        self.counters.inc_records_kept(rows.len() as u64);

        let summary = summarize_catalog(&rows);
        let out: Vec<CatalogMarketOut> = rows.iter().map(CatalogMarketOut::from).collect();
        let mut env = MarketsEnvelope::new(out, now_ms());
        env.summary = Some(MarketSummaryOut::from(&summary));
        self.persist(schema::FILE_TOP_MARKETS, &env);

        info!(kept = rows.len(), "top markets view written");
        Ok(rows.len())
    }

    /// One full daemon cycle, every view in sequence. A failing view
    /// gets its error artifact and the cycle moves on; the return value
    /// is how many views produced data.
    pub async fn run_cycle(&self) -> usize {
        let mut ok = 0usize;

        match self.run_whale_trades().await {
            Ok(_) => ok += 1,
            Err(e) => self.fail_view("whale_trades", schema::FILE_WHALE_TRADES, ERR_WHALE_TRADES, &e),
        }
        self.pace().await;

        match self.run_market_activity().await {
            Ok(_) => ok += 1,
            Err(e) => self.fail_view(
                "market_activity",
                schema::FILE_MARKET_ACTIVITY,
                ERR_MARKET_ACTIVITY,
                &e,
            ),
        }
        self.pace().await;

        if self.cfg.stored.base_url.trim().is_empty() {
            debug!("stored source not configured, skipping stored views");
        } else {
            match self.run_stored_trades().await {
                Ok(_) => ok += 1,
                Err(e) => self.fail_view(
                    "stored_trades",
                    schema::FILE_STORED_TRADES,
                    ERR_STORED_TRADES,
                    &e,
                ),
            }
            self.pace().await;

            match self.run_market_pulse(MarketRank::Volume, None).await {
                Ok(_) => ok += 1,
                Err(e) => self.fail_view(
                    "market_pulse",
                    schema::FILE_MARKET_PULSE,
                    ERR_MARKET_PULSE,
                    &e,
                ),
            }
            self.pace().await;
        }

        match self.run_onchain_trades().await {
            Ok(_) => ok += 1,
            Err(e) => self.fail_view(
                "onchain_trades",
                schema::FILE_ONCHAIN_TRADES,
                ERR_ONCHAIN_TRADES,
                &e,
            ),
        }
        self.pace().await;

        match self.run_kalshi_trades().await {
            Ok(_) => ok += 1,
            Err(e) => self.fail_view(
                "kalshi_trades",
                schema::FILE_KALSHI_TRADES,
                ERR_KALSHI_TRADES,
                &e,
            ),
        }
        self.pace().await;

        match self.run_top_markets().await {
            Ok(_) => ok += 1,
            Err(e) => {
                self.fail_view("top_markets", schema::FILE_TOP_MARKETS, ERR_TOP_MARKETS, &e)
            }
        }

        ok
    }

    fn fail_view(&self, view: &str, file: &str, error: &str, e: &PipeError) {
        warn!(view, error = %e, "view failed");
        self.write_error(file, error, e);
    }
}
