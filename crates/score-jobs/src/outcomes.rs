//! Outcome matcher: labels past paid lookups with what happened next.
//!
//! A fraud report against the target overrides any transaction evidence.
//! Otherwise the first subsequent transfer between requester and target
//! decides the label, and a lookup whose 30-day observation window passed
//! with neither is labeled no_activity. Outcome rows key on the query-log
//! id, so re-runs are no-ops.

use crate::stats::JobStats;
use anyhow::Result;
use chrono::{Duration, Utc};
use score_core::db::fraud::FraudReportRepository;
use score_core::db::queries::QueryLogRepository;
use score_core::db::scores::ScoreRepository;
use score_core::db::transfers::TransferRepository;
use score_core::types::{OutcomeLabel, QueryLogEntry, ScoreOutcome, WalletAddress};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time;
use tracing::{debug, error, info};
use uuid::Uuid;

const JOB_NAME: &str = "outcome_matcher";

/// Observation window for a lookup before it resolves to no_activity.
const OBSERVATION_DAYS: i64 = 30;

/// Lookups older than this are left alone entirely.
const SCAN_WINDOW_DAYS: i64 = 60;

const BATCH_LIMIT: i64 = 500;

/// Cooperative yield cadence so health checks stay responsive mid-batch.
const YIELD_EVERY: usize = 25;

#[derive(Debug, Clone)]
pub struct OutcomeMatcherConfig {
    pub interval_secs: u64,
}

impl Default for OutcomeMatcherConfig {
    fn default() -> Self {
        Self {
            interval_secs: 6 * 3_600,
        }
    }
}

pub struct OutcomeMatcher {
    queries: QueryLogRepository,
    transfers: TransferRepository,
    fraud_reports: FraudReportRepository,
    scores: ScoreRepository,
    outcomes: score_core::db::outcomes::OutcomeRepository,
    stats: JobStats,
    config: OutcomeMatcherConfig,
}

impl OutcomeMatcher {
    pub fn new(pool: PgPool, stats: JobStats, config: OutcomeMatcherConfig) -> Self {
        Self {
            queries: QueryLogRepository::new(pool.clone()),
            transfers: TransferRepository::new(pool.clone()),
            fraud_reports: FraudReportRepository::new(pool.clone()),
            scores: ScoreRepository::new(pool.clone()),
            outcomes: score_core::db::outcomes::OutcomeRepository::new(pool),
            stats,
            config,
        }
    }

    pub async fn run(self: Arc<Self>) {
        info!(
            interval_secs = self.config.interval_secs,
            "starting outcome matcher job"
        );
        let mut ticker = time::interval(time::Duration::from_secs(self.config.interval_secs));
        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(matched) => {
                    if matched > 0 {
                        info!(matched, "labeled outcomes");
                    }
                }
                Err(e) => {
                    error!(error = %e, "outcome matching failed");
                    self.stats.record_error(JOB_NAME, &e.to_string()).await;
                }
            }
            self.stats.record_run(JOB_NAME).await;
        }
    }

    /// One matching pass; returns how many outcome rows were written.
    pub async fn run_once(&self) -> Result<u64> {
        let now = Utc::now();
        let scan_start = now - Duration::days(SCAN_WINDOW_DAYS);
        let pending = self.queries.pending_paid_queries(scan_start, BATCH_LIMIT).await?;

        let mut written = 0u64;
        for (i, query) in pending.iter().enumerate() {
            if i > 0 && i % YIELD_EVERY == 0 {
                tokio::task::yield_now().await;
            }

            match self.label_for(query).await? {
                Some(label) => {
                    if self.write_outcome(query, label).await? {
                        written += 1;
                    }
                }
                None => {
                    debug!(query_id = %query.id, "lookup still inside observation window");
                }
            }
        }

        Ok(written)
    }

    /// Decide the label for one lookup, or None while it is still
    /// observable.
    async fn label_for(&self, query: &QueryLogEntry) -> Result<Option<OutcomeLabel>> {
        let now = Utc::now();

        // Fraud overrides transactions
        if self
            .fraud_reports
            .exists_after(&query.wallet, query.queried_at)
            .await?
        {
            return Ok(Some(OutcomeLabel::FraudReport));
        }

        if let Some(requester) = &query.requester {
            let count = self
                .transfers
                .count_between_pair(requester, &query.wallet, query.queried_at)
                .await?;
            if count >= 2 {
                return Ok(Some(OutcomeLabel::MultipleSuccessfulTx));
            }
            if count == 1 {
                return Ok(Some(OutcomeLabel::SuccessfulTx));
            }
        }

        if query.queried_at < now - Duration::days(OBSERVATION_DAYS) {
            return Ok(Some(OutcomeLabel::NoActivity));
        }

        Ok(None)
    }

    async fn write_outcome(&self, query: &QueryLogEntry, label: OutcomeLabel) -> Result<bool> {
        // Dimension values as served: read from the wallet's current score
        // row (the closest snapshot to query time the store keeps)
        let record = match WalletAddress::parse(&query.wallet) {
            Ok(wallet) => self.scores.get(&wallet).await?,
            Err(_) => None,
        };

        let outcome = ScoreOutcome {
            id: Uuid::new_v4(),
            query_id: query.id,
            wallet: query.wallet.clone(),
            requester: query.requester.clone(),
            label,
            score: record.as_ref().map(|r| r.score).unwrap_or(0),
            confidence: record.as_ref().map(|r| r.confidence).unwrap_or(0.0),
            dimensions: record.as_ref().map(|r| r.dimensions),
            created_at: Utc::now(),
        };

        Ok(self.outcomes.insert_if_new(&outcome).await?)
    }
}
