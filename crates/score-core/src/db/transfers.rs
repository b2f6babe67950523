//! Repository for the indexed transfer table.

use crate::types::TransferRecord;
use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

/// Directed volume between a wallet and one partner over a window.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PairFlow {
    pub partner: String,
    pub sent: Decimal,
    pub received: Decimal,
}

/// Windowed aggregates for rebuilding a wallet's index row.
#[derive(Debug, Clone, Default)]
pub struct IndexAggregates {
    pub total_tx_count: i64,
    pub total_volume: Decimal,
    pub unique_partners: i64,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub tx_count_24h: i64,
    pub tx_count_7d: i64,
    pub tx_count_30d: i64,
    pub volume_24h: Decimal,
    pub volume_7d: Decimal,
    pub volume_30d: Decimal,
}

/// Repository over `raw_transfers`. The table is written by the chain
/// indexer collaborator; the scoring core only reads, except for the
/// idempotent batch insert used by tests and backfills.
pub struct TransferRepository {
    pool: PgPool,
}

impl TransferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert transfers, ignoring duplicates by tx_hash.
    pub async fn insert_batch(&self, transfers: &[TransferRecord]) -> Result<u64> {
        let mut inserted = 0u64;
        let mut tx = self.pool.begin().await?;
        for t in transfers {
            let result = sqlx::query(
                r#"
                INSERT INTO raw_transfers (tx_hash, block_number, from_address, to_address, amount, transferred_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (tx_hash) DO NOTHING
                "#,
            )
            .bind(&t.tx_hash)
            .bind(t.block_number as i64)
            .bind(&t.from_address)
            .bind(&t.to_address)
            .bind(t.amount)
            .bind(t.transferred_at)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Count of transfers touching the wallet in [from, to).
    pub async fn tx_count_between(
        &self,
        wallet: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM raw_transfers
            WHERE (from_address = $1 OR to_address = $1)
              AND transferred_at >= $2 AND transferred_at < $3
            "#,
        )
        .bind(wallet)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// The most recent transfer timestamps for a wallet, oldest first.
    pub async fn recent_timestamps(&self, wallet: &str, limit: i64) -> Result<Vec<DateTime<Utc>>> {
        let rows: Vec<(DateTime<Utc>,)> = sqlx::query_as(
            r#"
            SELECT transferred_at FROM (
                SELECT transferred_at FROM raw_transfers
                WHERE from_address = $1 OR to_address = $1
                ORDER BY transferred_at DESC
                LIMIT $2
            ) recent
            ORDER BY transferred_at ASC
            "#,
        )
        .bind(wallet)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(t,)| t).collect())
    }

    /// Sender of the wallet's earliest inbound transfer.
    pub async fn earliest_inbound_sender(&self, wallet: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT from_address FROM raw_transfers
            WHERE to_address = $1
            ORDER BY transferred_at ASC, block_number ASC
            LIMIT 1
            "#,
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(s,)| s))
    }

    /// Per-partner sent/received volumes since `since`. Feeds the
    /// wash-trading ratio.
    pub async fn pair_flows_since(
        &self,
        wallet: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PairFlow>> {
        let rows = sqlx::query(
            r#"
            SELECT partner,
                   COALESCE(SUM(CASE WHEN direction = 'out' THEN amount END), 0) AS sent,
                   COALESCE(SUM(CASE WHEN direction = 'in' THEN amount END), 0) AS received
            FROM (
                SELECT to_address AS partner, amount, 'out' AS direction
                FROM raw_transfers
                WHERE from_address = $1 AND transferred_at >= $2
                UNION ALL
                SELECT from_address AS partner, amount, 'in' AS direction
                FROM raw_transfers
                WHERE to_address = $1 AND transferred_at >= $2
            ) flows
            GROUP BY partner
            "#,
        )
        .bind(wallet)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| PairFlow {
                partner: r.get("partner"),
                sent: r.get("sent"),
                received: r.get("received"),
            })
            .collect())
    }

    /// Full windowed aggregates for one wallet, computed in two passes:
    /// totals plus windows, then the distinct-partner count.
    pub async fn index_aggregates(&self, wallet: &str) -> Result<IndexAggregates> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS total_tx_count,
                   COALESCE(SUM(amount), 0) AS total_volume,
                   MIN(transferred_at) AS first_seen,
                   MAX(transferred_at) AS last_seen,
                   COUNT(*) FILTER (WHERE transferred_at >= NOW() - INTERVAL '24 hours') AS tx_count_24h,
                   COUNT(*) FILTER (WHERE transferred_at >= NOW() - INTERVAL '7 days') AS tx_count_7d,
                   COUNT(*) FILTER (WHERE transferred_at >= NOW() - INTERVAL '30 days') AS tx_count_30d,
                   COALESCE(SUM(amount) FILTER (WHERE transferred_at >= NOW() - INTERVAL '24 hours'), 0) AS volume_24h,
                   COALESCE(SUM(amount) FILTER (WHERE transferred_at >= NOW() - INTERVAL '7 days'), 0) AS volume_7d,
                   COALESCE(SUM(amount) FILTER (WHERE transferred_at >= NOW() - INTERVAL '30 days'), 0) AS volume_30d
            FROM raw_transfers
            WHERE from_address = $1 OR to_address = $1
            "#,
        )
        .bind(wallet)
        .fetch_one(&self.pool)
        .await?;

        let partners: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(DISTINCT partner) FROM (
                SELECT to_address AS partner FROM raw_transfers WHERE from_address = $1
                UNION
                SELECT from_address AS partner FROM raw_transfers WHERE to_address = $1
            ) p
            "#,
        )
        .bind(wallet)
        .fetch_one(&self.pool)
        .await?;

        Ok(IndexAggregates {
            total_tx_count: row.get("total_tx_count"),
            total_volume: row.get("total_volume"),
            unique_partners: partners.0,
            first_seen: row.get("first_seen"),
            last_seen: row.get("last_seen"),
            tx_count_24h: row.get("tx_count_24h"),
            tx_count_7d: row.get("tx_count_7d"),
            tx_count_30d: row.get("tx_count_30d"),
            volume_24h: row.get("volume_24h"),
            volume_7d: row.get("volume_7d"),
            volume_30d: row.get("volume_30d"),
        })
    }

    /// Count of transfers between two wallets (either direction) after `after`.
    pub async fn count_between_pair(
        &self,
        a: &str,
        b: &str,
        after: DateTime<Utc>,
    ) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM raw_transfers
            WHERE ((from_address = $1 AND to_address = $2)
                OR (from_address = $2 AND to_address = $1))
              AND transferred_at > $3
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(after)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
