//! Typed chain reads: balances, nonce, chunked transfer scans, Basename
//! reverse lookup, and the agent registry bit.

use crate::chain::rpc::{is_range_error, parse_quantity, FallbackClient, LogEntry};
use crate::config::{ChainConfig, BLOCKS_PER_DAY};
use crate::{Error, Result};
use alloy_primitives::{keccak256, Address, B256, U256};
use alloy_sol_types::{sol, SolCall};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

sol! {
    function balanceOf(address account) external view returns (uint256);
    function resolver(bytes32 node) external view returns (address);
    function name(bytes32 node) external view returns (string);
    function isRegistered(address agent) external view returns (bool);
}

/// keccak256("Transfer(address,address,uint256)")
const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

/// Chunk size never narrows below this many blocks.
const MIN_LOG_CHUNK: u64 = 50;

/// USDC uses six decimals.
const USDC_SCALE: u32 = 6;

/// Streaming aggregate over a wallet's USDC transfer logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferStats {
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub in_30d: Decimal,
    pub out_30d: Decimal,
    pub in_7d: Decimal,
    pub out_7d: Decimal,
    pub first_block: Option<u64>,
    pub last_block: Option<u64>,
    pub count: u64,
}

impl TransferStats {
    fn merge(&mut self, other: TransferStats) {
        self.total_in += other.total_in;
        self.total_out += other.total_out;
        self.in_30d += other.in_30d;
        self.out_30d += other.out_30d;
        self.in_7d += other.in_7d;
        self.out_7d += other.out_7d;
        self.first_block = match (self.first_block, other.first_block) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.last_block = match (self.last_block, other.last_block) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self.count += other.count;
    }
}

/// Point-in-time chain facts for one wallet, fetched as a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainFacts {
    pub usdc_balance: Decimal,
    pub eth_balance_wei: Decimal,
    pub nonce: u64,
    pub stats: TransferStats,
    pub has_basename: bool,
    pub in_agent_registry: bool,
    pub tip_block: u64,
    pub wallet_age_days: f64,
}

/// Reader over the fallback RPC client. Every operation is idempotent;
/// transient transport errors are retried inside the transport layer.
pub struct ChainReader {
    client: Arc<FallbackClient>,
    config: ChainConfig,
    usdc: Address,
    name_registry: Address,
    agent_registry: Address,
}

impl ChainReader {
    pub fn new(client: Arc<FallbackClient>, config: ChainConfig) -> Result<Self> {
        let usdc = parse_addr(&config.usdc_address)?;
        let name_registry = parse_addr(&config.name_registry_address)?;
        let agent_registry = parse_addr(&config.agent_registry_address)?;
        Ok(Self {
            client,
            config,
            usdc,
            name_registry,
            agent_registry,
        })
    }

    /// Current chain tip.
    pub async fn block_number(&self) -> Result<u64> {
        let hex: String = self
            .client
            .call("eth_blockNumber", serde_json::json!([]))
            .await?;
        parse_quantity(&hex)
    }

    /// ERC-20 balance of `wallet` on `token`, in whole-token units.
    pub async fn balance(&self, token: Address, wallet: Address) -> Result<Decimal> {
        let data = balanceOfCall { account: wallet }.abi_encode();
        let raw = self.eth_call(token, data).await?;
        let value = decode_u256(&raw)?;
        Ok(u256_to_decimal(value, USDC_SCALE))
    }

    /// USDC balance of `wallet` on the configured token contract.
    pub async fn usdc_balance(&self, wallet: Address) -> Result<Decimal> {
        self.balance(self.usdc, wallet).await
    }

    /// Native balance in wei.
    pub async fn eth_balance(&self, wallet: Address) -> Result<Decimal> {
        let hex: String = self
            .client
            .call(
                "eth_getBalance",
                serde_json::json!([format_addr(wallet), "latest"]),
            )
            .await?;
        let value = U256::from_str_radix(hex.trim_start_matches("0x"), 16).map_err(|e| {
            Error::Rpc {
                message: format!("failed to parse balance {hex:?}: {e}"),
                code: None,
            }
        })?;
        Ok(u256_to_decimal(value, 0))
    }

    /// Outgoing transaction count.
    pub async fn nonce(&self, wallet: Address) -> Result<u64> {
        let hex: String = self
            .client
            .call(
                "eth_getTransactionCount",
                serde_json::json!([format_addr(wallet), "latest"]),
            )
            .await?;
        parse_quantity(&hex)
    }

    /// Wallet age from its first observed block, floored at zero.
    pub fn wallet_age_days(first_block: Option<u64>, tip_block: u64) -> f64 {
        match first_block {
            Some(first) if tip_block > first => {
                (tip_block - first) as f64 / BLOCKS_PER_DAY as f64
            }
            _ => 0.0,
        }
    }

    /// ENS-style reverse lookup: registry -> resolver -> name(node).
    pub async fn has_name(&self, wallet: Address) -> Result<bool> {
        let node = reverse_node(wallet);

        let data = resolverCall { node }.abi_encode();
        let raw = self.eth_call(self.name_registry, data).await?;
        let resolver_addr = decode_address(&raw)?;
        if resolver_addr == Address::ZERO {
            return Ok(false);
        }

        let data = nameCall { node }.abi_encode();
        let raw = self.eth_call(resolver_addr, data).await?;
        match nameCall::abi_decode_returns(&raw) {
            Ok(name) => Ok(!name.is_empty()),
            // A resolver without name support reads as no Basename
            Err(_) => Ok(false),
        }
    }

    /// Registry membership bit; the zero registry address disables the check.
    pub async fn is_in_agent_registry(&self, wallet: Address) -> Result<bool> {
        if self.agent_registry == Address::ZERO {
            return Ok(false);
        }
        let data = isRegisteredCall { agent: wallet }.abi_encode();
        let raw = self.eth_call(self.agent_registry, data).await?;
        isRegisteredCall::abi_decode_returns(&raw).map_err(|e| Error::Rpc {
            message: format!("failed to decode registry response: {e}"),
            code: None,
        })
    }

    /// Scan the wallet's USDC transfers over the configured window with
    /// bounded parallel chunking and streaming aggregation. Either every
    /// chunk succeeds or the whole operation fails; partial windows are
    /// never returned.
    #[instrument(skip(self), fields(wallet = %format_addr(wallet)))]
    pub async fn transfer_stats(
        &self,
        wallet: Address,
        window_days: u64,
        tip_block: u64,
    ) -> Result<TransferStats> {
        let window_blocks = window_days.saturating_mul(BLOCKS_PER_DAY);
        let start_block = tip_block.saturating_sub(window_blocks);
        let cutoff_30d = tip_block.saturating_sub(30 * BLOCKS_PER_DAY);
        let cutoff_7d = tip_block.saturating_sub(7 * BLOCKS_PER_DAY);

        let mut stats = TransferStats::default();
        let mut chunk_size = self.config.log_chunk_size.max(MIN_LOG_CHUNK);
        let mut next = start_block;

        while next <= tip_block {
            // Fan out up to log_parallel_batch ranges at the current size
            let mut ranges = Vec::with_capacity(self.config.log_parallel_batch);
            let mut cursor = next;
            while ranges.len() < self.config.log_parallel_batch && cursor <= tip_block {
                let end = cursor.saturating_add(chunk_size - 1).min(tip_block);
                ranges.push((cursor, end));
                cursor = match end.checked_add(1) {
                    Some(c) => c,
                    None => break,
                };
            }

            let futures = ranges
                .iter()
                .map(|&(from, to)| self.scan_chunk(wallet, from, to, cutoff_30d, cutoff_7d));
            let results = futures_util::future::join_all(futures).await;

            if results.iter().any(|r| r.as_ref().is_err_and(is_range_error)) {
                if chunk_size <= MIN_LOG_CHUNK {
                    return Err(Error::ChainUnreachable(
                        "provider rejected the minimum log chunk size".to_string(),
                    ));
                }
                chunk_size = (chunk_size / 2).max(MIN_LOG_CHUNK);
                warn!(chunk_size, "provider asked for a narrower range, halving chunk");
                continue;
            }

            // Any other failure fails the whole window
            for result in results {
                stats.merge(result?);
            }

            next = cursor;
            // Grow back toward the configured default after a clean batch
            chunk_size = chunk_size.saturating_mul(2).min(self.config.log_chunk_size);
        }

        debug!(
            count = stats.count,
            first_block = ?stats.first_block,
            last_block = ?stats.last_block,
            "transfer scan complete"
        );
        Ok(stats)
    }

    /// Fetch every chain fact for a wallet concurrently. The whole
    /// operation runs under a hard deadline; pass `deadline` to override
    /// the configured one.
    pub async fn fetch_wallet_facts(
        &self,
        wallet: Address,
        deadline: Option<Duration>,
    ) -> Result<ChainFacts> {
        let limit =
            deadline.unwrap_or(Duration::from_secs(self.config.scan_deadline_secs.max(1)));
        tokio::time::timeout(limit, self.fetch_wallet_facts_inner(wallet))
            .await
            .map_err(|_| Error::Timeout(limit.as_millis() as u64))?
    }

    async fn fetch_wallet_facts_inner(&self, wallet: Address) -> Result<ChainFacts> {
        let tip_block = self.block_number().await?;

        let (usdc_balance, eth_balance_wei, nonce, stats, has_basename, in_agent_registry) =
            tokio::try_join!(
                self.balance(self.usdc, wallet),
                self.eth_balance(wallet),
                self.nonce(wallet),
                self.transfer_stats(wallet, self.config.window_days, tip_block),
                self.has_name(wallet),
                self.is_in_agent_registry(wallet),
            )?;

        let wallet_age_days = Self::wallet_age_days(stats.first_block, tip_block);

        Ok(ChainFacts {
            usdc_balance,
            eth_balance_wei,
            nonce,
            stats,
            has_basename,
            in_agent_registry,
            tip_block,
            wallet_age_days,
        })
    }

    /// One chunk: both directions of Transfer logs, folded into a partial
    /// aggregate. Individual log entries are dropped with the chunk.
    async fn scan_chunk(
        &self,
        wallet: Address,
        from_block: u64,
        to_block: u64,
        cutoff_30d: u64,
        cutoff_7d: u64,
    ) -> Result<TransferStats> {
        let wallet_topic = address_topic(wallet);

        let outgoing = self
            .get_logs(
                from_block,
                to_block,
                serde_json::json!([TRANSFER_TOPIC, wallet_topic]),
            )
            .await?;
        let incoming = self
            .get_logs(
                from_block,
                to_block,
                serde_json::json!([TRANSFER_TOPIC, serde_json::Value::Null, wallet_topic]),
            )
            .await?;

        let mut stats = TransferStats::default();
        for log in &outgoing {
            let (block, amount) = parse_transfer(log)?;
            stats.total_out += amount;
            if block >= cutoff_30d {
                stats.out_30d += amount;
            }
            if block >= cutoff_7d {
                stats.out_7d += amount;
            }
            track_span(&mut stats, block);
        }
        for log in &incoming {
            let (block, amount) = parse_transfer(log)?;
            // Self-transfers already counted on the outgoing side
            if log.topics.get(1) == log.topics.get(2) {
                continue;
            }
            stats.total_in += amount;
            if block >= cutoff_30d {
                stats.in_30d += amount;
            }
            if block >= cutoff_7d {
                stats.in_7d += amount;
            }
            track_span(&mut stats, block);
        }

        Ok(stats)
    }

    async fn get_logs(
        &self,
        from_block: u64,
        to_block: u64,
        topics: serde_json::Value,
    ) -> Result<Vec<LogEntry>> {
        let params = serde_json::json!([{
            "address": format_addr(self.usdc),
            "fromBlock": format!("0x{from_block:x}"),
            "toBlock": format!("0x{to_block:x}"),
            "topics": topics,
        }]);
        self.client.call("eth_getLogs", params).await
    }

    async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        let params = serde_json::json!([{
            "to": format_addr(to),
            "data": format!("0x{}", hex::encode(&data)),
        }, "latest"]);
        let hex_result: String = self.client.call("eth_call", params).await?;
        hex::decode(hex_result.trim_start_matches("0x")).map_err(|e| Error::Rpc {
            message: format!("invalid eth_call response encoding: {e}"),
            code: None,
        })
    }
}

fn track_span(stats: &mut TransferStats, block: u64) {
    stats.count += 1;
    stats.first_block = Some(stats.first_block.map_or(block, |b| b.min(block)));
    stats.last_block = Some(stats.last_block.map_or(block, |b| b.max(block)));
}

fn parse_transfer(log: &LogEntry) -> Result<(u64, Decimal)> {
    let block = parse_quantity(&log.block_number)?;
    let raw = hex::decode(log.data.trim_start_matches("0x")).map_err(|e| Error::Rpc {
        message: format!("invalid log data encoding: {e}"),
        code: None,
    })?;
    let amount = if raw.is_empty() {
        Decimal::ZERO
    } else {
        u256_to_decimal(U256::from_be_slice(&raw), USDC_SCALE)
    };
    Ok((block, amount))
}

fn parse_addr(raw: &str) -> Result<Address> {
    raw.parse()
        .map_err(|_| Error::InvalidWallet(raw.to_string()))
}

fn format_addr(addr: Address) -> String {
    format!("0x{}", hex::encode(addr.as_slice()))
}

/// Pad an address to a 32-byte topic.
fn address_topic(addr: Address) -> String {
    format!("0x{:0>64}", hex::encode(addr.as_slice()))
}

fn decode_u256(raw: &[u8]) -> Result<U256> {
    if raw.is_empty() {
        return Ok(U256::ZERO);
    }
    balanceOfCall::abi_decode_returns(raw).map_err(|e| Error::Rpc {
        message: format!("failed to decode uint256 response: {e}"),
        code: None,
    })
}

fn decode_address(raw: &[u8]) -> Result<Address> {
    if raw.is_empty() {
        return Ok(Address::ZERO);
    }
    resolverCall::abi_decode_returns(raw).map_err(|e| Error::Rpc {
        message: format!("failed to decode address response: {e}"),
        code: None,
    })
}

/// Convert a token amount to a whole-unit Decimal with the given scale.
/// Amounts beyond Decimal's mantissa saturate at the maximum.
fn u256_to_decimal(value: U256, scale: u32) -> Decimal {
    let clamped = i128::try_from(value).unwrap_or(i128::MAX);
    Decimal::try_from_i128_with_scale(clamped, scale).unwrap_or(Decimal::MAX)
}

/// ENS namehash of `<hex-addr>.addr.reverse`.
fn reverse_node(wallet: Address) -> B256 {
    let name = format!("{}.addr.reverse", hex::encode(wallet.as_slice()));
    namehash(&name)
}

fn namehash(name: &str) -> B256 {
    let mut node = B256::ZERO;
    if name.is_empty() {
        return node;
    }
    for label in name.rsplit('.') {
        let label_hash = keccak256(label.as_bytes());
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(node.as_slice());
        buf[32..].copy_from_slice(label_hash.as_slice());
        node = keccak256(buf);
    }
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namehash_known_vectors() {
        // Empty name is the zero node
        assert_eq!(namehash(""), B256::ZERO);
        // Well-known ENS vector
        assert_eq!(
            hex::encode(namehash("eth").as_slice()),
            "93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae"
        );
        assert_eq!(
            hex::encode(namehash("foo.eth").as_slice()),
            "de9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f"
        );
    }

    #[test]
    fn test_wallet_age_days() {
        assert_eq!(ChainReader::wallet_age_days(None, 1_000_000), 0.0);
        // First block after tip floors at zero
        assert_eq!(ChainReader::wallet_age_days(Some(2_000_000), 1_000_000), 0.0);
        let age = ChainReader::wallet_age_days(Some(0), BLOCKS_PER_DAY * 30);
        assert!((age - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_address_topic_padding() {
        let addr: Address = "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913".parse().unwrap();
        let topic = address_topic(addr);
        assert_eq!(topic.len(), 66);
        assert!(topic.starts_with("0x000000000000000000000000833589fc"));
    }

    #[test]
    fn test_u256_to_decimal_scaling() {
        // 1.5 USDC in base units
        let value = U256::from(1_500_000u64);
        assert_eq!(u256_to_decimal(value, USDC_SCALE), Decimal::new(1_500_000, 6));
    }

    #[test]
    fn test_transfer_stats_merge() {
        let mut a = TransferStats {
            total_in: Decimal::new(100, 0),
            count: 2,
            first_block: Some(10),
            last_block: Some(20),
            ..Default::default()
        };
        let b = TransferStats {
            total_out: Decimal::new(50, 0),
            count: 1,
            first_block: Some(5),
            last_block: Some(15),
            ..Default::default()
        };
        a.merge(b);
        assert_eq!(a.count, 3);
        assert_eq!(a.first_block, Some(5));
        assert_eq!(a.last_block, Some(20));
        assert_eq!(a.total_in, Decimal::new(100, 0));
        assert_eq!(a.total_out, Decimal::new(50, 0));
    }

    #[test]
    fn test_parse_transfer_amount() {
        let log = LogEntry {
            address: "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913".to_string(),
            topics: vec![TRANSFER_TOPIC.to_string()],
            // 2_500_000 base units = 2.5 USDC
            data: format!("0x{:064x}", 2_500_000u64),
            block_number: "0x100".to_string(),
            transaction_hash: "0xabc".to_string(),
        };
        let (block, amount) = parse_transfer(&log).unwrap();
        assert_eq!(block, 256);
        assert_eq!(amount, Decimal::new(2_500_000, 6));
    }
}
