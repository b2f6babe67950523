//! Repository for the query log.

use crate::types::QueryLogEntry;
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

pub struct QueryLogRepository {
    pool: PgPool,
}

impl QueryLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn log(&self, entry: &QueryLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO query_log (id, requester, wallet, endpoint, paid, queried_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.requester)
        .bind(&entry.wallet)
        .bind(&entry.endpoint)
        .bind(entry.paid)
        .bind(entry.queried_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count lookups for a wallet since `since`, excluding one entry (the
    /// in-flight request logging itself).
    pub async fn count_since_excluding(
        &self,
        wallet: &str,
        since: DateTime<Utc>,
        exclude: Uuid,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM query_log
            WHERE wallet = $1 AND queried_at >= $2 AND id <> $3
            "#,
        )
        .bind(wallet)
        .bind(since)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Paid lookups in [window_start, matured_before) that have no outcome
    /// row yet, oldest first.
    pub async fn pending_paid_queries(
        &self,
        window_start: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<QueryLogEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT q.id, q.requester, q.wallet, q.endpoint, q.paid, q.queried_at
            FROM query_log q
            LEFT JOIN score_outcomes o ON o.query_id = q.id
            WHERE q.paid = TRUE
              AND q.queried_at >= $1
              AND o.id IS NULL
            ORDER BY q.queried_at ASC
            LIMIT $2
            "#,
        )
        .bind(window_start)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| QueryLogEntry {
                id: r.get("id"),
                requester: r.get("requester"),
                wallet: r.get("wallet"),
                endpoint: r.get("endpoint"),
                paid: r.get("paid"),
                queried_at: r.get("queried_at"),
            })
            .collect())
    }
}
