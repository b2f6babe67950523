//! Repository for per-wallet aggregates, profiles, and economy metrics.

use crate::types::{BalanceTrend, EconomyMetrics, WalletIndexRow, WalletProfile, WalletSnapshot};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

pub struct WalletRepository {
    pool: PgPool,
}

impl WalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the aggregate row for a wallet.
    pub async fn index(&self, wallet: &str) -> Result<Option<WalletIndexRow>> {
        let row = sqlx::query(
            r#"
            SELECT wallet, first_seen, last_seen, total_tx_count, total_volume,
                   unique_partners, tx_count_24h, tx_count_7d, tx_count_30d,
                   volume_24h, volume_7d, volume_30d, trend
            FROM wallet_index
            WHERE wallet = $1
            "#,
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| index_from_row(&r)))
    }

    /// Record a fresh balance snapshot and the rebuilt aggregate row in
    /// one transaction.
    pub async fn record_snapshot_and_index(
        &self,
        snapshot: &WalletSnapshot,
        row: &WalletIndexRow,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

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
        .execute(&mut *tx)
        .await?;

        Self::upsert_index_query(row).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Upsert the aggregate row.
    pub async fn upsert_index(&self, row: &WalletIndexRow) -> Result<()> {
        Self::upsert_index_query(row).execute(&self.pool).await?;
        Ok(())
    }

    fn upsert_index_query(
        row: &WalletIndexRow,
    ) -> sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments> {
        sqlx::query(
            r#"
            INSERT INTO wallet_index (
                wallet, first_seen, last_seen, total_tx_count, total_volume,
                unique_partners, tx_count_24h, tx_count_7d, tx_count_30d,
                volume_24h, volume_7d, volume_30d, trend, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, NOW())
            ON CONFLICT (wallet) DO UPDATE SET
                first_seen = LEAST(wallet_index.first_seen, EXCLUDED.first_seen),
                last_seen = GREATEST(wallet_index.last_seen, EXCLUDED.last_seen),
                total_tx_count = EXCLUDED.total_tx_count,
                total_volume = EXCLUDED.total_volume,
                unique_partners = EXCLUDED.unique_partners,
                tx_count_24h = EXCLUDED.tx_count_24h,
                tx_count_7d = EXCLUDED.tx_count_7d,
                tx_count_30d = EXCLUDED.tx_count_30d,
                volume_24h = EXCLUDED.volume_24h,
                volume_7d = EXCLUDED.volume_7d,
                volume_30d = EXCLUDED.volume_30d,
                trend = EXCLUDED.trend,
                updated_at = NOW()
            "#,
        )
        .bind(&row.wallet)
        .bind(row.first_seen)
        .bind(row.last_seen)
        .bind(row.total_tx_count)
        .bind(row.total_volume)
        .bind(row.unique_partners)
        .bind(row.tx_count_24h)
        .bind(row.tx_count_7d)
        .bind(row.tx_count_30d)
        .bind(row.volume_24h)
        .bind(row.volume_7d)
        .bind(row.volume_30d)
        .bind(row.trend.as_str())
    }

    /// First-seen timestamp for a wallet, if indexed.
    pub async fn first_seen(&self, wallet: &str) -> Result<Option<DateTime<Utc>>> {
        let row: Option<(Option<DateTime<Utc>>,)> = sqlx::query_as(
            r#"SELECT first_seen FROM wallet_index WHERE wallet = $1"#,
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(t,)| t))
    }

    /// Identity/capability attestations; a missing row reads as zeros.
    pub async fn profile(&self, wallet: &str) -> Result<Option<WalletProfile>> {
        let row = sqlx::query(
            r#"
            SELECT wallet, self_registered, github_verified, github_stars,
                   github_pushed_at, domains_owned, replication_count,
                   service_count, total_revenue, rating_count
            FROM wallet_profiles
            WHERE wallet = $1
            "#,
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| WalletProfile {
            wallet: r.get("wallet"),
            self_registered: r.get("self_registered"),
            github_verified: r.get("github_verified"),
            github_stars: r.get("github_stars"),
            github_pushed_at: r.get("github_pushed_at"),
            domains_owned: r.get("domains_owned"),
            replication_count: r.get("replication_count"),
            service_count: r.get("service_count"),
            total_revenue: r.get("total_revenue"),
            rating_count: r.get("rating_count"),
        }))
    }

    /// Append the hourly economy aggregate row.
    pub async fn insert_economy_metrics(&self, metrics: &EconomyMetrics) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO economy_metrics (
                wallet_count, scored_wallet_count, median_score, total_volume_24h, recorded_at
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(metrics.wallet_count)
        .bind(metrics.scored_wallet_count)
        .bind(metrics.median_score)
        .bind(metrics.total_volume_24h)
        .bind(metrics.recorded_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Ecosystem-wide aggregates for the hourly economy row.
    pub async fn economy_snapshot(&self) -> Result<EconomyMetrics> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM wallet_index) AS wallet_count,
                (SELECT COUNT(*) FROM scores) AS scored_wallet_count,
                (SELECT PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY score::float8) FROM scores) AS median_score,
                (SELECT COALESCE(SUM(volume_24h), 0) FROM wallet_index) AS total_volume_24h
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(EconomyMetrics {
            wallet_count: row.get("wallet_count"),
            scored_wallet_count: row.get("scored_wallet_count"),
            median_score: row.get("median_score"),
            total_volume_24h: row.get("total_volume_24h"),
            recorded_at: Utc::now(),
        })
    }
}

fn index_from_row(r: &sqlx::postgres::PgRow) -> WalletIndexRow {
    WalletIndexRow {
        wallet: r.get("wallet"),
        first_seen: r.get("first_seen"),
        last_seen: r.get("last_seen"),
        total_tx_count: r.get("total_tx_count"),
        total_volume: r.get("total_volume"),
        unique_partners: r.get("unique_partners"),
        tx_count_24h: r.get("tx_count_24h"),
        tx_count_7d: r.get("tx_count_7d"),
        tx_count_30d: r.get("tx_count_30d"),
        volume_24h: r.get("volume_24h"),
        volume_7d: r.get("volume_7d"),
        volume_30d: r.get("volume_30d"),
        trend: match r.get::<String, _>("trend").as_str() {
            "rising" => BalanceTrend::Rising,
            "declining" => BalanceTrend::Declining,
            "freefall" => BalanceTrend::Freefall,
            _ => BalanceTrend::Stable,
        },
    }
}
