//! Repository for fraud reports.

use crate::types::FraudReport;
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

pub struct FraudReportRepository {
    pool: PgPool,
}

impl FraudReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, report: &FraudReport) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fraud_reports (id, wallet, reporter, reason, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(report.id)
        .bind(&report.wallet)
        .bind(&report.reporter)
        .bind(&report.reason)
        .bind(report.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Total reports filed against a wallet.
    pub async fn count_for(&self, wallet: &str) -> Result<i64> {
        let row: (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM fraud_reports WHERE wallet = $1"#)
                .bind(wallet)
                .fetch_one(&self.pool)
                .await?;

        Ok(row.0)
    }

    /// Whether any report against `wallet` was filed after `after`.
    pub async fn exists_after(&self, wallet: &str, after: DateTime<Utc>) -> Result<bool> {
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM fraud_reports WHERE wallet = $1 AND created_at > $2
            )
            "#,
        )
        .bind(wallet)
        .bind(after)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Reports filed since `since`, newest first.
    pub async fn recent(&self, since: DateTime<Utc>) -> Result<Vec<FraudReport>> {
        let rows = sqlx::query(
            r#"
            SELECT id, wallet, reporter, reason, created_at
            FROM fraud_reports
            WHERE created_at >= $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| FraudReport {
                id: r.get("id"),
                wallet: r.get("wallet"),
                reporter: r.get("reporter"),
                reason: r.get("reason"),
                created_at: r.get("created_at"),
            })
            .collect())
    }
}
