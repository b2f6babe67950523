//! In-memory run statistics shared by the background jobs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One job's counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobRecord {
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

/// Shared stats registry. Jobs record outcomes; a health collaborator
/// reads the snapshot.
#[derive(Debug, Clone, Default)]
pub struct JobStats {
    records: Arc<RwLock<HashMap<String, JobRecord>>>,
}

impl JobStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_run(&self, job: &str) {
        let mut records = self.records.write().await;
        let record = records.entry(job.to_string()).or_default();
        record.last_run = Some(Utc::now());
        record.run_count += 1;
    }

    pub async fn record_error(&self, job: &str, error: &str) {
        let mut records = self.records.write().await;
        let record = records.entry(job.to_string()).or_default();
        record.error_count += 1;
        record.last_error = Some(error.to_string());
    }

    pub async fn snapshot(&self) -> HashMap<String, JobRecord> {
        self.records.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_counters_accumulate() {
        let stats = JobStats::new();
        stats.record_run("refresh").await;
        stats.record_run("refresh").await;
        stats.record_error("refresh", "db down").await;

        let snapshot = stats.snapshot().await;
        let record = &snapshot["refresh"];
        assert_eq!(record.run_count, 2);
        assert_eq!(record.error_count, 1);
        assert_eq!(record.last_error.as_deref(), Some("db down"));
        assert!(record.last_run.is_some());
    }

    #[tokio::test]
    async fn test_jobs_tracked_independently() {
        let stats = JobStats::new();
        stats.record_run("refresh").await;
        stats.record_error("anomaly", "boom").await;

        let snapshot = stats.snapshot().await;
        assert_eq!(snapshot["refresh"].error_count, 0);
        assert_eq!(snapshot["anomaly"].run_count, 0);
        assert_eq!(snapshot["anomaly"].error_count, 1);
    }
}
