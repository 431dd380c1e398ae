//! Minimal JSON-RPC plumbing for the Polygon log scan.
//!
//! Only the three calls the scan needs: head block, `eth_getLogs` over a
//! topic filter, and block timestamps. RPC-level errors map onto the
//! pipeline error taxonomy; a failed timestamp lookup degrades to the
//! wall clock instead of failing the cycle.

use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::warn;

use crate::clock::now_ms;
use crate::config::ChainConfig;
use crate::error::{classify_http, classify_status, PipeError};
use crate::eth::{hex_u64, parse_hex_u64};
use crate::json_util::get_str;

/// One raw entry from `eth_getLogs`, hex fields still encoded.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub topics: Vec<String>,
    pub data: String,
    pub block_number: u64,
    pub transaction_hash: String,
    pub log_index: u64,
}

pub struct RpcClient {
    client: reqwest::Client,
    url: String,
}

impl RpcClient {
    pub fn new(client: reqwest::Client, cfg: &ChainConfig) -> Self {
        Self {
            client,
            url: cfg.rpc_url.clone(),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, PipeError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| classify_http(&e, method))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(classify_status(status, method));
        }

        let payload: Value = resp
            .json()
            .await
            .map_err(|e| PipeError::MalformedResponse(format!("{method}: {e}")))?;
        if let Some(err) = payload.get("error") {
            return Err(PipeError::MalformedResponse(format!(
                "{method}: rpc error {err}"
            )));
        }
        payload
            .get("result")
            .cloned()
            .ok_or_else(|| PipeError::MalformedResponse(format!("{method}: missing result")))
    }

    pub async fn latest_block_number(&self) -> Result<u64, PipeError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let hex = result.as_str().ok_or_else(|| {
            PipeError::MalformedResponse("eth_blockNumber: non-string result".to_string())
        })?;
        parse_hex_u64(hex)
            .map_err(|e| PipeError::MalformedResponse(format!("eth_blockNumber: {e:#}")))
    }

    pub async fn logs_by_topic(
        &self,
        address: &str,
        topic0: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<LogEntry>, PipeError> {
        let params = json!([{
            "address": address,
            "topics": [topic0],
            "fromBlock": hex_u64(from_block),
            "toBlock": hex_u64(to_block),
        }]);
        let result = self.call("eth_getLogs", params).await?;
        let rows = result.as_array().ok_or_else(|| {
            PipeError::MalformedResponse("eth_getLogs: non-array result".to_string())
        })?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            match parse_log_entry(row) {
                Some(entry) => out.push(entry),
                None => warn!(log = %row, "skipping malformed log entry"),
            }
        }
        Ok(out)
    }

    /// Block timestamp in unix ms. Lookup failure degrades to None.
    pub async fn block_timestamp_ms(&self, block_number: u64) -> Option<u64> {
        let params = json!([hex_u64(block_number), false]);
        match self.call("eth_getBlockByNumber", params).await {
            Ok(result) => {
                let ts_hex = get_str(&result, "timestamp")?;
                parse_hex_u64(&ts_hex).ok().map(|secs| secs * 1000)
            }
            Err(e) => {
                warn!(block = block_number, error = %e, "block timestamp lookup failed");
                None
            }
        }
    }
}

fn parse_log_entry(row: &Value) -> Option<LogEntry> {
    let topics = row
        .get("topics")?
        .as_array()?
        .iter()
        .map(|t| t.as_str().map(|s| s.to_string()))
        .collect::<Option<Vec<String>>>()?;
    let data = get_str(row, "data")?;
    let block_number = parse_hex_u64(&get_str(row, "blockNumber")?).ok()?;
    let transaction_hash = get_str(row, "transactionHash")?;
    let log_index = get_str(row, "logIndex")
        .and_then(|s| parse_hex_u64(&s).ok())
        .unwrap_or(0);
    Some(LogEntry {
        topics,
        data,
        block_number,
        transaction_hash,
        log_index,
    })
}

/// Per-cycle memo for block timestamps. Fills cluster in a handful of
/// blocks, so one lookup usually covers many logs.
#[derive(Default)]
pub struct BlockTimestampCache {
    inner: HashMap<u64, u64>,
}

impl BlockTimestampCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn timestamp_ms(&mut self, rpc: &RpcClient, block_number: u64) -> u64 {
        if let Some(ts) = self.inner.get(&block_number) {
            return *ts;
        }
        let ts = rpc
            .block_timestamp_ms(block_number)
            .await
            .unwrap_or_else(now_ms);
        self.inner.insert(block_number, ts);
        ts
    }
}
