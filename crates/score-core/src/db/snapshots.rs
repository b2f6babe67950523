//! Repository for periodic balance snapshots.

use crate::types::WalletSnapshot;
use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

pub struct SnapshotRepository {
    pool: PgPool,
}

impl SnapshotRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, snapshot: &WalletSnapshot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO wallet_snapshots (wallet, usdc_balance, eth_balance_wei, snapped_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&snapshot.wallet)
        .bind(snapshot.usdc_balance)
        .bind(snapshot.eth_balance_wei)
        .bind(snapshot.snapped_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Average USDC balance over the last 24 hours of snapshots.
    pub async fn avg_usdc_24h(&self, wallet: &str) -> Result<Option<Decimal>> {
        let row: (Option<Decimal>,) = sqlx::query_as(
            r#"
            SELECT AVG(usdc_balance) FROM wallet_snapshots
            WHERE wallet = $1 AND snapped_at >= NOW() - INTERVAL '24 hours'
            "#,
        )
        .bind(wallet)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Most recent snapshot for a wallet.
    pub async fn latest(&self, wallet: &str) -> Result<Option<WalletSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT wallet, usdc_balance, eth_balance_wei, snapped_at
            FROM wallet_snapshots
            WHERE wallet = $1
            ORDER BY snapped_at DESC
            LIMIT 1
            "#,
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| snapshot_from_row(&r)))
    }

    /// Most recent snapshot at or before `cutoff` (e.g. the 7-day-old
    /// sample used for trend binning).
    pub async fn at_or_before(
        &self,
        wallet: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<WalletSnapshot>> {
        let row = sqlx::query(
            r#"
            SELECT wallet, usdc_balance, eth_balance_wei, snapped_at
            FROM wallet_snapshots
            WHERE wallet = $1 AND snapped_at <= $2
            ORDER BY snapped_at DESC
            LIMIT 1
            "#,
        )
        .bind(wallet)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| snapshot_from_row(&r)))
    }

    /// Wallets whose balance dropped below half of the prior snapshot,
    /// among snapshots taken since `since`.
    pub async fn balance_freefalls(&self, since: DateTime<Utc>) -> Result<Vec<BalanceFreefall>> {
        let rows = sqlx::query(
            r#"
            SELECT wallet, usdc_balance, prev_balance, snapped_at
            FROM (
                SELECT wallet, usdc_balance, snapped_at,
                       LAG(usdc_balance) OVER (PARTITION BY wallet ORDER BY snapped_at) AS prev_balance
                FROM wallet_snapshots
            ) deltas
            WHERE snapped_at >= $1
              AND prev_balance IS NOT NULL
              AND prev_balance > 0
              AND usdc_balance < prev_balance * 0.5
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| BalanceFreefall {
                wallet: r.get("wallet"),
                balance: r.get("usdc_balance"),
                previous_balance: r.get("prev_balance"),
                snapped_at: r.get("snapped_at"),
            })
            .collect())
    }
}

/// A balance collapse flagged by the anomaly sweep.
#[derive(Debug, Clone)]
pub struct BalanceFreefall {
    pub wallet: String,
    pub balance: Decimal,
    pub previous_balance: Decimal,
    pub snapped_at: DateTime<Utc>,
}

fn snapshot_from_row(r: &sqlx::postgres::PgRow) -> WalletSnapshot {
    WalletSnapshot {
        wallet: r.get("wallet"),
        usdc_balance: r.get("usdc_balance"),
        eth_balance_wei: r.get("eth_balance_wei"),
        snapped_at: r.get("snapped_at"),
    }
}
