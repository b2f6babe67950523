//! JSON-RPC transport layer with retry, backoff, and endpoint fallback.

use crate::config::ChainConfig;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Ethereum log entry as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
}

/// Parse a 0x-prefixed hex quantity.
pub fn parse_quantity(hex_str: &str) -> Result<u64> {
    u64::from_str_radix(hex_str.trim_start_matches("0x"), 16).map_err(|e| Error::Rpc {
        message: format!("failed to parse quantity {hex_str:?}: {e}"),
        code: None,
    })
}

/// Whether a provider error is asking for a narrower block range.
pub fn is_range_error(err: &Error) -> bool {
    match err {
        Error::Rpc { message, code } => {
            let msg = message.to_ascii_lowercase();
            *code == Some(-32005)
                || msg.contains("block range")
                || msg.contains("range is too")
                || msg.contains("too many results")
                || msg.contains("log response size")
        }
        _ => false,
    }
}

/// A single RPC endpoint with its own timeout and retry budget.
pub struct RpcTransport {
    url: String,
    http_client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl RpcTransport {
    pub fn new(url: String, timeout: Duration, max_retries: u32, retry_delay: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            url,
            http_client,
            max_retries,
            retry_delay,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call, retrying transient transport failures with
    /// exponential backoff. Provider-level errors are not retried; they are
    /// deterministic and surface as `Error::Rpc`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let mut attempt = 0u32;
        loop {
            match self.call_once(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(err @ Error::Rpc { .. }) => return Err(err),
                Err(err) => {
                    if attempt >= self.max_retries {
                        return Err(err);
                    }
                    let delay = self.retry_delay * 2u32.saturating_pow(attempt);
                    debug!(
                        url = %self.url,
                        method,
                        attempt,
                        error = %err,
                        "transient RPC failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn call_once<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await?;

        // Rate limits and gateway errors are retryable transport failures
        if let Err(err) = response.error_for_status_ref() {
            return Err(Error::Http(err));
        }

        let body: JsonRpcResponse<T> = response.json().await?;

        if let Some(err) = body.error {
            return Err(Error::Rpc {
                message: err.message,
                code: Some(err.code),
            });
        }

        body.result.ok_or_else(|| Error::Rpc {
            message: format!("empty result for {method}"),
            code: None,
        })
    }

    /// Round-trip latency of an `eth_blockNumber` probe; None if unhealthy.
    pub async fn probe(&self) -> Option<Duration> {
        let started = Instant::now();
        match self
            .call_once::<String>("eth_blockNumber", serde_json::json!([]))
            .await
        {
            Ok(_) => Some(started.elapsed()),
            Err(_) => None,
        }
    }
}

/// Primary + fallback endpoints behind one call surface. A periodic ranking
/// probes both and routes to the healthier transport; a call that fails on
/// the active endpoint is tried once more on the other before giving up.
pub struct FallbackClient {
    transports: Vec<RpcTransport>,
    active: AtomicUsize,
}

impl FallbackClient {
    pub fn from_config(config: &ChainConfig) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let retry_delay = Duration::from_millis(config.retry_delay_ms);

        let mut transports = vec![RpcTransport::new(
            config.rpc_url.clone(),
            timeout,
            config.max_retries,
            retry_delay,
        )];
        if let Some(fallback) = &config.fallback_rpc_url {
            transports.push(RpcTransport::new(
                fallback.clone(),
                timeout,
                config.max_retries,
                retry_delay,
            ));
        }

        Self {
            transports,
            active: AtomicUsize::new(0),
        }
    }

    /// Call through the active transport, failing over once to the other
    /// endpoint on transport exhaustion.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T> {
        let active = self.active.load(Ordering::Relaxed) % self.transports.len();
        let mut last_err = None;

        for offset in 0..self.transports.len() {
            let idx = (active + offset) % self.transports.len();
            match self.transports[idx].call(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(err @ Error::Rpc { .. }) => return Err(err),
                Err(err) => {
                    warn!(
                        url = %self.transports[idx].url(),
                        method,
                        error = %err,
                        "transport exhausted retries"
                    );
                    last_err = Some(err);
                }
            }
        }

        Err(Error::ChainUnreachable(
            last_err
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no transports configured".to_string()),
        ))
    }

    /// Probe every transport once and route to the fastest healthy one.
    pub async fn rank_once(&self) {
        let mut best: Option<(usize, Duration)> = None;
        for (idx, transport) in self.transports.iter().enumerate() {
            if let Some(latency) = transport.probe().await {
                if best.map(|(_, b)| latency < b).unwrap_or(true) {
                    best = Some((idx, latency));
                }
            }
        }
        if let Some((idx, latency)) = best {
            let previous = self.active.swap(idx, Ordering::Relaxed);
            if previous != idx {
                debug!(
                    url = %self.transports[idx].url(),
                    latency_ms = latency.as_millis() as u64,
                    "switched active RPC transport"
                );
            }
        }
    }

    /// Spawn the periodic ranking loop.
    pub fn spawn_ranking(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The immediate first tick would race startup traffic
            ticker.tick().await;
            loop {
                ticker.tick().await;
                client.rank_once().await;
            }
        })
    }

    /// Index of the currently active transport (exposed for tests).
    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Relaxed) % self.transports.len()
    }
}
