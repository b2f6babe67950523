//! Configuration management for the BaseScore system.

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Version string written with every persisted score.
pub const MODEL_VERSION: &str = "2.1.0";

/// Base produces a block every two seconds.
pub const BLOCKS_PER_DAY: u64 = 43_200;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub chain: ChainConfig,
    pub scoring: ScoringConfig,
    pub adaptive: AdaptiveConfig,
    pub dampening: DampeningConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// RPC endpoints and scan tuning for the chain reader.
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub fallback_rpc_url: Option<String>,
    /// USDC token contract on Base.
    pub usdc_address: String,
    /// ENS-style registry used for Basename reverse lookups.
    pub name_registry_address: String,
    /// Agent registry contract; the zero address disables the check.
    pub agent_registry_address: String,
    /// Per-transport request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Hard deadline for a full wallet-facts fetch, in seconds.
    pub scan_deadline_secs: u64,
    /// Retries per transport before failing over.
    pub max_retries: u32,
    /// Initial backoff between retries in milliseconds.
    pub retry_delay_ms: u64,
    /// How often the transport ranking re-measures endpoints, in seconds.
    pub rank_interval_secs: u64,
    pub window_days: u64,
    pub log_chunk_size: u64,
    pub log_parallel_batch: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://mainnet.base.org".to_string(),
            fallback_rpc_url: None,
            usdc_address: "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913".to_string(),
            name_registry_address: "0xb94704422c2a1e396835a571837aa5ae53285a95".to_string(),
            agent_registry_address: "0x0000000000000000000000000000000000000000".to_string(),
            request_timeout_secs: 30,
            scan_deadline_secs: 120,
            max_retries: 2,
            retry_delay_ms: 500,
            rank_interval_secs: 15,
            window_days: 14,
            log_chunk_size: 2_000,
            log_parallel_batch: 5,
        }
    }
}

/// Orchestrator cache and concurrency limits.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Base score TTL in milliseconds; the effective TTL scales with confidence.
    pub ttl_ms: u64,
    pub max_concurrent_scans: usize,
    pub max_queue: usize,
    /// Delay between wallets during batch refreshes, in milliseconds.
    pub rate_limit_delay_ms: u64,
    pub free_daily_limit: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 3_600_000,
            max_concurrent_scans: 1,
            max_queue: 50,
            rate_limit_delay_ms: 200,
            free_daily_limit: 10,
        }
    }
}

impl ScoringConfig {
    /// Minimum effective TTL (15 minutes).
    pub const MIN_TTL_MS: u64 = 900_000;
    /// Maximum effective TTL (4 hours).
    pub const MAX_TTL_MS: u64 = 14_400_000;

    /// TTL scaled by confidence: 1 hour at confidence 0.5, clamped to
    /// [15 min, 4 h].
    pub fn ttl_for_confidence(&self, confidence: f64) -> u64 {
        let scaled = self.ttl_ms as f64 * (0.25 + 1.5 * confidence.clamp(0.0, 1.0));
        (scaled as u64).clamp(Self::MIN_TTL_MS, Self::MAX_TTL_MS)
    }
}

/// Tuning for outcome-driven weight learning and breakpoint maturity shifts.
#[derive(Debug, Clone, Deserialize)]
pub struct AdaptiveConfig {
    pub min_outcomes: usize,
    pub min_negative: usize,
    pub max_shift_per_run: f64,
    pub max_total_drift: f64,
    pub maturity_baseline: f64,
    pub maturity_ceiling: f64,
    pub max_shift_ratio: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            min_outcomes: 50,
            min_negative: 5,
            max_shift_per_run: 0.02,
            max_total_drift: 0.05,
            maturity_baseline: 25.0,
            maturity_ceiling: 65.0,
            max_shift_ratio: 0.3,
        }
    }
}

/// Bounds for confidence-weighted score dampening.
#[derive(Debug, Clone, Deserialize)]
pub struct DampeningConfig {
    /// Maximum per-refresh delta at confidence 0.
    pub max_delta_low_conf: f64,
    /// Maximum per-refresh delta at confidence 1.
    pub max_delta_high_conf: f64,
}

impl Default for DampeningConfig {
    fn default() -> Self {
        Self {
            max_delta_low_conf: 30.0,
            max_delta_high_conf: 8.0,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let chain_defaults = ChainConfig::default();
        let scoring_defaults = ScoringConfig::default();
        let adaptive_defaults = AdaptiveConfig::default();
        let dampening_defaults = DampeningConfig::default();

        Ok(Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| Error::Config {
                    message: "DATABASE_URL environment variable not set".to_string(),
                })?,
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5),
            },
            chain: ChainConfig {
                rpc_url: env::var("BASE_RPC_URL").unwrap_or(chain_defaults.rpc_url),
                fallback_rpc_url: env::var("BASE_FALLBACK_RPC_URL").ok(),
                usdc_address: env::var("USDC_ADDRESS").unwrap_or(chain_defaults.usdc_address),
                name_registry_address: env::var("NAME_REGISTRY_ADDRESS")
                    .unwrap_or(chain_defaults.name_registry_address),
                agent_registry_address: env::var("AGENT_REGISTRY_ADDRESS")
                    .unwrap_or(chain_defaults.agent_registry_address),
                request_timeout_secs: env_parse(
                    "RPC_TIMEOUT_SECS",
                    chain_defaults.request_timeout_secs,
                ),
                scan_deadline_secs: env_parse(
                    "SCAN_DEADLINE_SECS",
                    chain_defaults.scan_deadline_secs,
                ),
                max_retries: env_parse("RPC_MAX_RETRIES", chain_defaults.max_retries),
                retry_delay_ms: env_parse("RPC_RETRY_DELAY_MS", chain_defaults.retry_delay_ms),
                rank_interval_secs: env_parse(
                    "RPC_RANK_INTERVAL_SECS",
                    chain_defaults.rank_interval_secs,
                ),
                window_days: env_parse("WINDOW_DAYS", chain_defaults.window_days),
                log_chunk_size: env_parse("LOG_CHUNK_SIZE", chain_defaults.log_chunk_size),
                log_parallel_batch: env_parse(
                    "LOG_PARALLEL_BATCH",
                    chain_defaults.log_parallel_batch,
                ),
            },
            scoring: ScoringConfig {
                ttl_ms: env_parse("TTL_MS", scoring_defaults.ttl_ms),
                max_concurrent_scans: env_parse(
                    "MAX_CONCURRENT_SCANS",
                    scoring_defaults.max_concurrent_scans,
                ),
                max_queue: env_parse("MAX_QUEUE", scoring_defaults.max_queue),
                rate_limit_delay_ms: env_parse(
                    "RATE_LIMIT_DELAY_MS",
                    scoring_defaults.rate_limit_delay_ms,
                ),
                free_daily_limit: env_parse("FREE_DAILY_LIMIT", scoring_defaults.free_daily_limit),
            },
            adaptive: AdaptiveConfig {
                min_outcomes: env_parse("MIN_OUTCOMES", adaptive_defaults.min_outcomes),
                min_negative: env_parse("MIN_NEGATIVE", adaptive_defaults.min_negative),
                max_shift_per_run: env_parse(
                    "MAX_SHIFT_PER_RUN",
                    adaptive_defaults.max_shift_per_run,
                ),
                max_total_drift: env_parse("MAX_TOTAL_DRIFT", adaptive_defaults.max_total_drift),
                maturity_baseline: env_parse(
                    "MATURITY_BASELINE",
                    adaptive_defaults.maturity_baseline,
                ),
                maturity_ceiling: env_parse(
                    "MATURITY_CEILING",
                    adaptive_defaults.maturity_ceiling,
                ),
                max_shift_ratio: env_parse("MAX_SHIFT_RATIO", adaptive_defaults.max_shift_ratio),
            },
            dampening: DampeningConfig {
                max_delta_low_conf: env_parse(
                    "MAX_DELTA_LOW_CONF",
                    dampening_defaults.max_delta_low_conf,
                ),
                max_delta_high_conf: env_parse(
                    "MAX_DELTA_HIGH_CONF",
                    dampening_defaults.max_delta_high_conf,
                ),
            },
        })
    }

    /// Load configuration for testing (with defaults).
    pub fn test_config() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/basescore_test".to_string(),
                max_connections: 2,
            },
            chain: ChainConfig::default(),
            scoring: ScoringConfig::default(),
            adaptive: AdaptiveConfig::default(),
            dampening: DampeningConfig::default(),
        }
    }
}
