use serde::Deserialize;
use std::path::PathBuf;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub polymarket: PolymarketConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub kalshi: KalshiConfig,
    #[serde(default)]
    pub stored: StoredConfig,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub caps: CapConfig,
    #[serde(default)]
    pub pulse: PulseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            run: RunConfig::default(),
            http: HttpConfig::default(),
            polymarket: PolymarketConfig::default(),
            chain: ChainConfig::default(),
            kalshi: KalshiConfig::default(),
            stored: StoredConfig::default(),
            thresholds: ThresholdConfig::default(),
            caps: CapConfig::default(),
            pulse: PulseConfig::default(),
            cache: CacheConfig::default(),
            schema_version: default_schema_version(),
        }
    }
}

impl Config {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context as _;
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).context("parse config")?;
        cfg.validate().context("validate config")?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.run.poll_interval_ms == 0 {
            anyhow::bail!("invalid run.poll_interval_ms=0 (must be > 0)");
        }
        if self.http.timeout_ms == 0 {
            anyhow::bail!("invalid http.timeout_ms=0 (must be > 0)");
        }
        if self.http.connect_timeout_ms == 0 {
            anyhow::bail!("invalid http.connect_timeout_ms=0 (must be > 0)");
        }
        if self.chain.block_window == 0 {
            anyhow::bail!("invalid chain.block_window=0 (must be > 0)");
        }
        if self.chain.max_logs == 0 {
            anyhow::bail!("invalid chain.max_logs=0 (must be > 0)");
        }
        if !is_hex_with_len(&self.chain.exchange_address, 40) {
            anyhow::bail!(
                "invalid chain.exchange_address {:?} (need 0x + 40 hex chars)",
                self.chain.exchange_address
            );
        }
        if !is_hex_with_len(&self.chain.order_filled_topic, 64) {
            anyhow::bail!(
                "invalid chain.order_filled_topic {:?} (need 0x + 64 hex chars)",
                self.chain.order_filled_topic
            );
        }
        if self.kalshi.max_pages == 0 {
            anyhow::bail!("invalid kalshi.max_pages=0 (must be > 0)");
        }
        if self.kalshi.trade_page_limit == 0 {
            anyhow::bail!("invalid kalshi.trade_page_limit=0 (must be > 0)");
        }
        if self.polymarket.trade_window_hours == 0 {
            anyhow::bail!("invalid polymarket.trade_window_hours=0 (must be > 0)");
        }

        fn check_nonneg(name: &str, v: f64) -> anyhow::Result<()> {
            if !v.is_finite() || v < 0.0 {
                anyhow::bail!("{name} must be finite and >= 0, got {v}");
            }
            Ok(())
        }

        check_nonneg("thresholds.clob", self.thresholds.clob)?;
        check_nonneg("thresholds.activity", self.thresholds.activity)?;
        check_nonneg("thresholds.kalshi", self.thresholds.kalshi)?;
        check_nonneg("thresholds.onchain", self.thresholds.onchain)?;
        check_nonneg("thresholds.stored", self.thresholds.stored)?;
        check_nonneg(
            "thresholds.activity_candidate_volume",
            self.thresholds.activity_candidate_volume,
        )?;
        check_nonneg("pulse.min_volume", self.pulse.min_volume)?;
        check_nonneg(
            "pulse.competitive_min_volume",
            self.pulse.competitive_min_volume,
        )?;

        if !self.thresholds.volatility.is_finite()
            || !(0.0..=1.0).contains(&self.thresholds.volatility)
        {
            anyhow::bail!(
                "thresholds.volatility must be a fraction in [0,1], got {}",
                self.thresholds.volatility
            );
        }

        Ok(())
    }
}

fn is_hex_with_len(s: &str, hex_len: usize) -> bool {
    match s.strip_prefix("0x") {
        Some(rest) => rest.len() == hex_len && rest.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Daemon cycle interval (ms). Cycles never overlap; the next tick waits
    /// for the previous cycle to finish.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Pause between consecutive sub-queries against the same upstream (ms).
    #[serde(default = "default_source_delay_ms")]
    pub source_delay_ms: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            poll_interval_ms: default_poll_interval_ms(),
            source_delay_ms: default_source_delay_ms(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_poll_interval_ms() -> u64 {
    60_000
}

fn default_source_delay_ms() -> u64 {
    100
}

#[derive(Clone, Debug, Deserialize)]
pub struct HttpConfig {
    /// Default timeout applied to all HTTP requests (ms).
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// TCP connect timeout for HTTP requests (ms).
    #[serde(default = "default_http_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
            connect_timeout_ms: default_http_connect_timeout_ms(),
        }
    }
}

fn default_http_timeout_ms() -> u64 {
    10_000
}

fn default_http_connect_timeout_ms() -> u64 {
    3_000
}

#[derive(Clone, Debug, Deserialize)]
pub struct PolymarketConfig {
    #[serde(default = "default_gamma_base")]
    pub gamma_base: String,
    /// Public trade-data API serving CLOB fills.
    #[serde(default = "default_clob_base")]
    pub clob_base: String,
    /// Gamma pool size for the politics market list feeding the CLOB scan.
    #[serde(default = "default_market_list_limit")]
    pub market_list_limit: usize,
    /// How many of those markets actually get a per-market trades query.
    #[serde(default = "default_top_markets")]
    pub top_markets: usize,
    /// Time window for per-market trade queries (hours).
    #[serde(default = "default_trade_window_hours")]
    pub trade_window_hours: u64,
    /// Gamma pool size for the market-activity scan.
    #[serde(default = "default_activity_pool_limit")]
    pub activity_pool_limit: usize,
    /// Gamma pool size for the token-id map and the volume ranking.
    #[serde(default = "default_wide_pool_limit")]
    pub wide_pool_limit: usize,
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            gamma_base: default_gamma_base(),
            clob_base: default_clob_base(),
            market_list_limit: default_market_list_limit(),
            top_markets: default_top_markets(),
            trade_window_hours: default_trade_window_hours(),
            activity_pool_limit: default_activity_pool_limit(),
            wide_pool_limit: default_wide_pool_limit(),
        }
    }
}

fn default_gamma_base() -> String {
    "https://gamma-api.polymarket.com".to_string()
}

fn default_clob_base() -> String {
    "https://data-api.polymarket.com".to_string()
}

fn default_market_list_limit() -> usize {
    50
}

fn default_top_markets() -> usize {
    20
}

fn default_trade_window_hours() -> u64 {
    24
}

fn default_activity_pool_limit() -> usize {
    300
}

fn default_wide_pool_limit() -> usize {
    500
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChainConfig {
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// CTF Exchange contract emitting `OrderFilled`.
    #[serde(default = "default_exchange_address")]
    pub exchange_address: String,
    #[serde(default = "default_order_filled_topic")]
    pub order_filled_topic: String,
    /// How many blocks back from the head each cycle scans.
    #[serde(default = "default_block_window")]
    pub block_window: u64,
    /// Decode at most this many logs per cycle (scan ceiling, distinct from
    /// the post-rank cap).
    #[serde(default = "default_max_logs")]
    pub max_logs: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            exchange_address: default_exchange_address(),
            order_filled_topic: default_order_filled_topic(),
            block_window: default_block_window(),
            max_logs: default_max_logs(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://polygon-rpc.com".to_string()
}

fn default_exchange_address() -> String {
    "0x4bFb41d5B3570DeFd03C39a9A4D8dE6Bd8B8982E".to_string()
}

fn default_order_filled_topic() -> String {
    crate::decode::ORDER_FILLED_TOPIC.to_string()
}

fn default_block_window() -> u64 {
    50
}

fn default_max_logs() -> usize {
    100
}

#[derive(Clone, Debug, Deserialize)]
pub struct KalshiConfig {
    #[serde(default = "default_kalshi_base")]
    pub api_base: String,
    /// Open-market pool size per cycle.
    #[serde(default = "default_kalshi_market_limit")]
    pub market_limit: usize,
    /// How many top-volume markets get a trades query.
    #[serde(default = "default_kalshi_top_markets")]
    pub top_markets: usize,
    #[serde(default = "default_kalshi_trade_page_limit")]
    pub trade_page_limit: usize,
    /// Hard page-count ceiling per market for cursor pagination.
    #[serde(default = "default_kalshi_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_kalshi_window_hours")]
    pub trade_window_hours: u64,
}

impl Default for KalshiConfig {
    fn default() -> Self {
        Self {
            api_base: default_kalshi_base(),
            market_limit: default_kalshi_market_limit(),
            top_markets: default_kalshi_top_markets(),
            trade_page_limit: default_kalshi_trade_page_limit(),
            max_pages: default_kalshi_max_pages(),
            trade_window_hours: default_kalshi_window_hours(),
        }
    }
}

fn default_kalshi_base() -> String {
    "https://api.elections.kalshi.com/trade-api/v2".to_string()
}

fn default_kalshi_market_limit() -> usize {
    1000
}

fn default_kalshi_top_markets() -> usize {
    20
}

fn default_kalshi_trade_page_limit() -> usize {
    1000
}

fn default_kalshi_max_pages() -> usize {
    10
}

fn default_kalshi_window_hours() -> u64 {
    24
}

#[derive(Clone, Debug, Deserialize)]
pub struct StoredConfig {
    /// PostgREST base URL. Empty disables the stored producers.
    #[serde(default)]
    pub base_url: String,
    /// Env var holding the API key; the key itself never lives in the file.
    #[serde(default = "default_stored_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_trades_table")]
    pub trades_table: String,
    #[serde(default = "default_snapshots_table")]
    pub snapshots_table: String,
    #[serde(default = "default_stored_limit")]
    pub limit: usize,
}

impl Default for StoredConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key_env: default_stored_api_key_env(),
            trades_table: default_trades_table(),
            snapshots_table: default_snapshots_table(),
            limit: default_stored_limit(),
        }
    }
}

fn default_stored_api_key_env() -> String {
    "SUPABASE_ANON_KEY".to_string()
}

fn default_trades_table() -> String {
    "trades".to_string()
}

fn default_snapshots_table() -> String {
    "active_week_data".to_string()
}

fn default_stored_limit() -> usize {
    1000
}

/// Whale thresholds are per-source policy, not one business constant.
#[derive(Clone, Debug, Deserialize)]
pub struct ThresholdConfig {
    #[serde(default = "default_threshold_clob")]
    pub clob: f64,
    #[serde(default = "default_threshold_activity")]
    pub activity: f64,
    #[serde(default = "default_threshold_kalshi")]
    pub kalshi: f64,
    #[serde(default = "default_threshold_onchain")]
    pub onchain: f64,
    /// The stored table arrives pre-screened upstream.
    #[serde(default)]
    pub stored: f64,
    /// Fraction; 0.01 = 1% move in 1h.
    #[serde(default = "default_threshold_volatility")]
    pub volatility: f64,
    /// Non-politics markets still qualify as activity candidates above this
    /// 24h volume.
    #[serde(default = "default_activity_candidate_volume")]
    pub activity_candidate_volume: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            clob: default_threshold_clob(),
            activity: default_threshold_activity(),
            kalshi: default_threshold_kalshi(),
            onchain: default_threshold_onchain(),
            stored: 0.0,
            volatility: default_threshold_volatility(),
            activity_candidate_volume: default_activity_candidate_volume(),
        }
    }
}

fn default_threshold_clob() -> f64 {
    10_000.0
}

fn default_threshold_activity() -> f64 {
    5_000.0
}

fn default_threshold_kalshi() -> f64 {
    100.0
}

fn default_threshold_onchain() -> f64 {
    100.0
}

fn default_threshold_volatility() -> f64 {
    0.01
}

fn default_activity_candidate_volume() -> f64 {
    10_000.0
}

/// Post-rank caps. 0 means uncapped. Caps apply strictly after ranking.
#[derive(Clone, Debug, Deserialize)]
pub struct CapConfig {
    #[serde(default = "default_cap_whale_trades")]
    pub whale_trades: usize,
    #[serde(default = "default_cap_activity")]
    pub activity: usize,
    #[serde(default)]
    pub stored: usize,
    #[serde(default = "default_cap_market_panel")]
    pub market_panel: usize,
    #[serde(default = "default_cap_onchain")]
    pub onchain: usize,
    #[serde(default = "default_cap_kalshi")]
    pub kalshi: usize,
    #[serde(default = "default_cap_top_markets")]
    pub top_markets: usize,
}

impl Default for CapConfig {
    fn default() -> Self {
        Self {
            whale_trades: default_cap_whale_trades(),
            activity: default_cap_activity(),
            stored: 0,
            market_panel: default_cap_market_panel(),
            onchain: default_cap_onchain(),
            kalshi: default_cap_kalshi(),
            top_markets: default_cap_top_markets(),
        }
    }
}

fn default_cap_whale_trades() -> usize {
    50
}

fn default_cap_activity() -> usize {
    50
}

fn default_cap_market_panel() -> usize {
    6
}

fn default_cap_onchain() -> usize {
    100
}

fn default_cap_kalshi() -> usize {
    100
}

fn default_cap_top_markets() -> usize {
    10
}

#[derive(Clone, Debug, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_pulse_min_volume")]
    pub min_volume: f64,
    /// The competitive view admits thinner markets.
    #[serde(default = "default_pulse_competitive_min_volume")]
    pub competitive_min_volume: f64,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            min_volume: default_pulse_min_volume(),
            competitive_min_volume: default_pulse_competitive_min_volume(),
        }
    }
}

fn default_pulse_min_volume() -> f64 {
    1_000_000.0
}

fn default_pulse_competitive_min_volume() -> f64 {
    500_000.0
}

#[derive(Clone, Debug, Deserialize)]
pub struct CacheConfig {
    /// TTL for gamma slug/image enrichment lookups (ms).
    #[serde(default = "default_enrichment_ttl_ms")]
    pub enrichment_ttl_ms: u64,
    /// TTL for gamma market pools reused across producers in one daemon
    /// cycle (ms).
    #[serde(default = "default_market_pool_ttl_ms")]
    pub market_pool_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enrichment_ttl_ms: default_enrichment_ttl_ms(),
            market_pool_ttl_ms: default_market_pool_ttl_ms(),
        }
    }
}

fn default_enrichment_ttl_ms() -> u64 {
    600_000
}

fn default_market_pool_ttl_ms() -> u64 {
    30_000
}

fn default_schema_version() -> String {
    crate::schema::SCHEMA_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_working_defaults() {
        let cfg: Config = toml::from_str("").expect("parse empty config");
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.thresholds.clob, 10_000.0);
        assert_eq!(cfg.thresholds.kalshi, 100.0);
        assert_eq!(cfg.caps.whale_trades, 50);
        assert_eq!(cfg.caps.market_panel, 6);
        assert_eq!(cfg.chain.block_window, 50);
        assert_eq!(cfg.kalshi.max_pages, 10);
        assert!(cfg.stored.base_url.is_empty());
    }

    #[test]
    fn rejects_bad_exchange_address() {
        let mut cfg = Config::default();
        cfg.chain.exchange_address = "not-an-address".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_page_ceiling() {
        let cfg: Config = toml::from_str("[kalshi]\nmax_pages = 0\n").expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_volatility_out_of_range() {
        let cfg: Config = toml::from_str("[thresholds]\nvolatility = 1.5\n").expect("parse");
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn per_source_thresholds_are_overridable() {
        let cfg: Config =
            toml::from_str("[thresholds]\nclob = 25000.0\nkalshi = 500.0\n").expect("parse");
        cfg.validate().expect("validate");
        assert_eq!(cfg.thresholds.clob, 25_000.0);
        assert_eq!(cfg.thresholds.kalshi, 500.0);
        assert_eq!(cfg.thresholds.activity, 5_000.0);
    }
}
