//! Anomaly detector: score jumps, fresh fraud reports, balance
//! freefalls, and newly sybil-flagged wallets.

use crate::stats::JobStats;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use score_core::db::fraud::FraudReportRepository;
use score_core::db::scores::ScoreRepository;
use score_core::db::snapshots::SnapshotRepository;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time;
use tracing::{error, info, warn};

const JOB_NAME: &str = "anomaly_detector";

/// History score changes larger than this are anomalous.
const SCORE_JUMP_THRESHOLD: i32 = 10;

#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    pub interval_secs: u64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15 * 60,
        }
    }
}

/// An anomaly surfaced by the sweep, published for subscribers (webhook
/// delivery is an external collaborator).
#[derive(Debug, Clone)]
pub enum AnomalyEvent {
    ScoreJump {
        wallet: String,
        from: u32,
        to: u32,
        at: DateTime<Utc>,
    },
    FraudReported {
        wallet: String,
        at: DateTime<Utc>,
    },
    BalanceFreefall {
        wallet: String,
        balance: Decimal,
        previous_balance: Decimal,
        at: DateTime<Utc>,
    },
    SybilFlagged {
        wallet: String,
    },
}

pub struct AnomalyDetector {
    scores: ScoreRepository,
    fraud_reports: FraudReportRepository,
    snapshots: SnapshotRepository,
    events: broadcast::Sender<AnomalyEvent>,
    stats: JobStats,
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(pool: PgPool, stats: JobStats, config: AnomalyConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            scores: ScoreRepository::new(pool.clone()),
            fraud_reports: FraudReportRepository::new(pool.clone()),
            snapshots: SnapshotRepository::new(pool),
            events,
            stats,
            config,
        }
    }

    /// Subscribe to anomaly events.
    pub fn subscribe(&self) -> broadcast::Receiver<AnomalyEvent> {
        self.events.subscribe()
    }

    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.config.interval_secs,
            "starting anomaly detector job"
        );
        let mut ticker = time::interval(time::Duration::from_secs(self.config.interval_secs));
        loop {
            ticker.tick().await;
            let since = Utc::now() - Duration::seconds(self.config.interval_secs as i64);
            if let Err(e) = self.run_once(since).await {
                error!(error = %e, "anomaly sweep failed");
                self.stats.record_error(JOB_NAME, &e.to_string()).await;
            }
            self.stats.record_run(JOB_NAME).await;
        }
    }

    /// One sweep over everything that changed since `since`.
    pub async fn run_once(&self, since: DateTime<Utc>) -> Result<usize> {
        let mut detected = 0usize;

        for jump in self.scores.score_jumps_since(since, SCORE_JUMP_THRESHOLD).await? {
            warn!(
                wallet = %jump.wallet,
                from = jump.previous_score,
                to = jump.score,
                "anomalous score jump"
            );
            let _ = self.events.send(AnomalyEvent::ScoreJump {
                wallet: jump.wallet,
                from: jump.previous_score,
                to: jump.score,
                at: jump.calculated_at,
            });
            detected += 1;
        }

        for report in self.fraud_reports.recent(since).await? {
            warn!(wallet = %report.wallet, "new fraud report");
            let _ = self.events.send(AnomalyEvent::FraudReported {
                wallet: report.wallet,
                at: report.created_at,
            });
            detected += 1;
        }

        for freefall in self.snapshots.balance_freefalls(since).await? {
            warn!(
                wallet = %freefall.wallet,
                balance = %freefall.balance,
                previous = %freefall.previous_balance,
                "balance freefall"
            );
            let _ = self.events.send(AnomalyEvent::BalanceFreefall {
                wallet: freefall.wallet,
                balance: freefall.balance,
                previous_balance: freefall.previous_balance,
                at: freefall.snapped_at,
            });
            detected += 1;
        }

        for wallet in self.scores.newly_sybil_flagged(since).await? {
            warn!(wallet = %wallet, "wallet newly sybil-flagged");
            let _ = self.events.send(AnomalyEvent::SybilFlagged { wallet });
            detected += 1;
        }

        Ok(detected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anomaly_defaults() {
        let config = AnomalyConfig::default();
        assert_eq!(config.interval_secs, 900);
    }
}
