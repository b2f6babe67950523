//! Hourly refresh: snapshot balances, rebuild wallet aggregates, rescore
//! expired wallets, and record the hourly economy row.

use crate::stats::JobStats;
use anyhow::Result;
use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use score_core::chain::ChainReader;
use score_core::db::scores::ScoreRepository;
use score_core::db::snapshots::SnapshotRepository;
use score_core::db::transfers::TransferRepository;
use score_core::db::wallets::WalletRepository;
use score_core::types::{BalanceTrend, WalletAddress, WalletIndexRow, WalletSnapshot};
use score_engine::{ScoreOptions, ScoreOrchestrator};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time;
use tracing::{debug, error, info, warn};

const JOB_NAME: &str = "hourly_refresh";

#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub batch_size: i64,
    /// Delay between wallets, keeping RPC pressure bounded.
    pub delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
            batch_size: 50,
            delay_ms: 200,
        }
    }
}

pub struct HourlyRefresh {
    orchestrator: Arc<ScoreOrchestrator>,
    reader: Arc<ChainReader>,
    scores: ScoreRepository,
    snapshots: SnapshotRepository,
    transfers: TransferRepository,
    wallets: WalletRepository,
    stats: JobStats,
    config: RefreshConfig,
}

impl HourlyRefresh {
    pub fn new(
        pool: PgPool,
        orchestrator: Arc<ScoreOrchestrator>,
        reader: Arc<ChainReader>,
        stats: JobStats,
        config: RefreshConfig,
    ) -> Self {
        Self {
            orchestrator,
            reader,
            scores: ScoreRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool.clone()),
            transfers: TransferRepository::new(pool.clone()),
            wallets: WalletRepository::new(pool),
            stats,
            config,
        }
    }

    /// Run the hourly loop. Errors are swallowed and counted; the loop
    /// never exits.
    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.config.interval_secs,
            batch_size = self.config.batch_size,
            "starting hourly refresh job"
        );
        let mut ticker = time::interval(time::Duration::from_secs(self.config.interval_secs));
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once().await {
                error!(error = %e, "refresh batch failed");
                self.stats.record_error(JOB_NAME, &e.to_string()).await;
            }
            self.stats.record_run(JOB_NAME).await;
        }
    }

    /// One refresh batch.
    pub async fn run_once(&self) -> Result<()> {
        let expired = self.scores.expired_wallets(self.config.batch_size).await?;
        if expired.is_empty() {
            debug!("no expired wallets to refresh");
        } else {
            info!(count = expired.len(), "refreshing expired wallets");
        }

        for wallet in &expired {
            if let Err(e) = self.refresh_wallet(wallet).await {
                warn!(wallet = %wallet, error = %e, "wallet refresh failed");
                self.stats.record_error(JOB_NAME, &e.to_string()).await;
            }
            time::sleep(time::Duration::from_millis(self.config.delay_ms)).await;
        }

        // Hourly ecosystem aggregate, written after the batch
        let economy = self.wallets.economy_snapshot().await?;
        self.wallets.insert_economy_metrics(&economy).await?;

        Ok(())
    }

    async fn refresh_wallet(&self, wallet: &str) -> Result<()> {
        let address = WalletAddress::parse(wallet)?;
        let now = Utc::now();

        // Fresh balances for the snapshot and trend bin
        let parsed = address.to_address();
        let usdc = self.reader.usdc_balance(parsed).await?;
        let eth = self.reader.eth_balance(parsed).await?;

        // Rebuild the aggregate row, binning trend against the week-old
        // snapshot
        let aggregates = self.transfers.index_aggregates(address.as_str()).await?;
        let week_old = self
            .snapshots
            .at_or_before(address.as_str(), now - Duration::days(7))
            .await?;
        let trend = match week_old {
            Some(old) if old.usdc_balance > rust_decimal::Decimal::ZERO => {
                let ratio = (usdc / old.usdc_balance).to_f64().unwrap_or(1.0);
                BalanceTrend::from_ratio(ratio)
            }
            _ => BalanceTrend::Stable,
        };

        // Snapshot and index land together
        self.wallets
            .record_snapshot_and_index(
                &WalletSnapshot {
                    wallet: address.as_str().to_string(),
                    usdc_balance: usdc,
                    eth_balance_wei: eth,
                    snapped_at: now,
                },
                &WalletIndexRow {
                    wallet: address.as_str().to_string(),
                    first_seen: aggregates.first_seen,
                    last_seen: aggregates.last_seen,
                    total_tx_count: aggregates.total_tx_count,
                    total_volume: aggregates.total_volume,
                    unique_partners: aggregates.unique_partners,
                    tx_count_24h: aggregates.tx_count_24h,
                    tx_count_7d: aggregates.tx_count_7d,
                    tx_count_30d: aggregates.tx_count_30d,
                    volume_24h: aggregates.volume_24h,
                    volume_7d: aggregates.volume_7d,
                    volume_30d: aggregates.volume_30d,
                    trend,
                },
            )
            .await?;

        // Full rescore through the shared pipeline
        self.orchestrator
            .compute_or_get_score(
                address.as_str(),
                ScoreOptions {
                    force_refresh: true,
                    stale_ok: false,
                    ..Default::default()
                },
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_defaults() {
        let config = RefreshConfig::default();
        assert_eq!(config.interval_secs, 3_600);
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.delay_ms, 200);
    }
}
