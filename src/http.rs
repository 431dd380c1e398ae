use std::time::Duration;

use anyhow::Context as _;

use crate::config::HttpConfig;

/// One client per process, shared across producers. All upstreams get the
/// same UA and timeout policy.
pub fn build_client(cfg: &HttpConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("harpoon/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_millis(cfg.connect_timeout_ms))
        .timeout(Duration::from_millis(cfg.timeout_ms))
        .build()
        .context("build http client")
}
