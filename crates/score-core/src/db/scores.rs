//! Repository for score rows and the append-only history.

use crate::types::{
    DimensionScores, Recommendation, ScoreHistoryEntry, ScoreRecord, Tier, WalletAddress,
};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Repository for the `scores` and `score_history` tables. The scoring
/// orchestrator is the only writer.
pub struct ScoreRepository {
    pool: PgPool,
}

impl ScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the current cached score for a wallet.
    pub async fn get(&self, wallet: &WalletAddress) -> Result<Option<ScoreRecord>> {
        let row = sqlx::query(
            r#"
            SELECT wallet, score, reliability, viability, identity, capability, behavior,
                   tier, confidence, recommendation, model_version, sybil_flag,
                   sybil_indicators, gaming_indicators, integrity_multiplier, raw_inputs,
                   calculated_at, expires_at
            FROM scores
            WHERE wallet = $1
            "#,
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| record_from_row(&r)))
    }

    /// Upsert the score row and append the history entry in one transaction.
    pub async fn upsert_with_history(&self, record: &ScoreRecord) -> Result<()> {
        let sybil_json = serde_json::to_value(&record.sybil_indicators)?;
        let gaming_json = serde_json::to_value(&record.gaming_indicators)?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO scores (
                wallet, score, reliability, viability, identity, capability, behavior,
                tier, confidence, recommendation, model_version, sybil_flag,
                sybil_indicators, gaming_indicators, integrity_multiplier, raw_inputs,
                calculated_at, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ON CONFLICT (wallet) DO UPDATE SET
                score = EXCLUDED.score,
                reliability = EXCLUDED.reliability,
                viability = EXCLUDED.viability,
                identity = EXCLUDED.identity,
                capability = EXCLUDED.capability,
                behavior = EXCLUDED.behavior,
                tier = EXCLUDED.tier,
                confidence = EXCLUDED.confidence,
                recommendation = EXCLUDED.recommendation,
                model_version = EXCLUDED.model_version,
                sybil_flag = EXCLUDED.sybil_flag,
                sybil_indicators = EXCLUDED.sybil_indicators,
                gaming_indicators = EXCLUDED.gaming_indicators,
                integrity_multiplier = EXCLUDED.integrity_multiplier,
                raw_inputs = EXCLUDED.raw_inputs,
                calculated_at = EXCLUDED.calculated_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(record.wallet.as_str())
        .bind(record.score as i32)
        .bind(record.dimensions.reliability as i32)
        .bind(record.dimensions.viability as i32)
        .bind(record.dimensions.identity as i32)
        .bind(record.dimensions.capability as i32)
        .bind(record.dimensions.behavior as i32)
        .bind(record.tier.as_str())
        .bind(record.confidence)
        .bind(record.recommendation.as_str())
        .bind(&record.model_version)
        .bind(record.sybil_flag)
        .bind(&sybil_json)
        .bind(&gaming_json)
        .bind(record.integrity_multiplier)
        .bind(&record.raw_inputs)
        .bind(record.calculated_at)
        .bind(record.expires_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO score_history (wallet, score, confidence, model_version, calculated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.wallet.as_str())
        .bind(record.score as i32)
        .bind(record.confidence)
        .bind(&record.model_version)
        .bind(record.calculated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Most recent history entries for a wallet, oldest first.
    pub async fn history(&self, wallet: &WalletAddress, limit: i64) -> Result<Vec<ScoreHistoryEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT wallet, score, confidence, model_version, calculated_at
            FROM (
                SELECT wallet, score, confidence, model_version, calculated_at
                FROM score_history
                WHERE wallet = $1
                ORDER BY calculated_at DESC
                LIMIT $2
            ) recent
            ORDER BY calculated_at ASC
            "#,
        )
        .bind(wallet.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| {
                Ok(ScoreHistoryEntry {
                    wallet: WalletAddress::parse(r.get::<String, _>("wallet").as_str())?,
                    score: r.get::<i32, _>("score") as u32,
                    confidence: r.get("confidence"),
                    model_version: r.get("model_version"),
                    calculated_at: r.get("calculated_at"),
                })
            })
            .collect()
    }

    /// Wallets whose cached score has expired, oldest expiry first.
    pub async fn expired_wallets(&self, limit: i64) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT wallet FROM scores
            WHERE expires_at <= NOW()
            ORDER BY expires_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(w,)| w).collect())
    }

    /// Median composite score across all cached rows.
    pub async fn median_score(&self) -> Result<Option<f64>> {
        let row: (Option<f64>,) = sqlx::query_as(
            r#"
            SELECT PERCENTILE_CONT(0.5) WITHIN GROUP (ORDER BY score::float8)
            FROM scores
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Score changes larger than `threshold` since `since`, comparing each
    /// history row against the one before it.
    pub async fn score_jumps_since(
        &self,
        since: DateTime<Utc>,
        threshold: i32,
    ) -> Result<Vec<ScoreJump>> {
        let rows = sqlx::query(
            r#"
            SELECT wallet, score, prev_score, calculated_at
            FROM (
                SELECT wallet, score, calculated_at,
                       LAG(score) OVER (PARTITION BY wallet ORDER BY calculated_at) AS prev_score
                FROM score_history
            ) deltas
            WHERE calculated_at >= $1
              AND prev_score IS NOT NULL
              AND ABS(score - prev_score) > $2
            ORDER BY calculated_at DESC
            "#,
        )
        .bind(since)
        .bind(threshold)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| ScoreJump {
                wallet: r.get("wallet"),
                score: r.get::<i32, _>("score") as u32,
                previous_score: r.get::<i32, _>("prev_score") as u32,
                calculated_at: r.get("calculated_at"),
            })
            .collect())
    }

    /// Wallets first flagged as sybil at or after `since`.
    pub async fn newly_sybil_flagged(&self, since: DateTime<Utc>) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT wallet FROM scores
            WHERE sybil_flag = TRUE AND calculated_at >= $1
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(w,)| w).collect())
    }
}

/// A score change flagged by the anomaly sweep.
#[derive(Debug, Clone)]
pub struct ScoreJump {
    pub wallet: String,
    pub score: u32,
    pub previous_score: u32,
    pub calculated_at: DateTime<Utc>,
}

fn record_from_row(r: &sqlx::postgres::PgRow) -> ScoreRecord {
    let sybil_json: serde_json::Value = r.get("sybil_indicators");
    let gaming_json: serde_json::Value = r.get("gaming_indicators");
    let wallet: String = r.get("wallet");

    ScoreRecord {
        // Stored addresses were validated on the way in
        wallet: WalletAddress::parse(&wallet).expect("stored wallet address is valid"),
        score: r.get::<i32, _>("score") as u32,
        dimensions: DimensionScores {
            reliability: r.get::<i32, _>("reliability") as u32,
            viability: r.get::<i32, _>("viability") as u32,
            identity: r.get::<i32, _>("identity") as u32,
            capability: r.get::<i32, _>("capability") as u32,
            behavior: r.get::<i32, _>("behavior") as u32,
        },
        tier: match r.get::<String, _>("tier").as_str() {
            "Elite" => Tier::Elite,
            "Trusted" => Tier::Trusted,
            "Established" => Tier::Established,
            "Emerging" => Tier::Emerging,
            _ => Tier::Unverified,
        },
        confidence: r.get("confidence"),
        recommendation: match r.get::<String, _>("recommendation").as_str() {
            "flagged_for_review" => Recommendation::FlaggedForReview,
            "high_risk" => Recommendation::HighRisk,
            "proceed_with_caution" => Recommendation::ProceedWithCaution,
            "proceed" => Recommendation::Proceed,
            _ => Recommendation::InsufficientHistory,
        },
        model_version: r.get("model_version"),
        sybil_flag: r.get("sybil_flag"),
        sybil_indicators: serde_json::from_value(sybil_json).unwrap_or_default(),
        gaming_indicators: serde_json::from_value(gaming_json).unwrap_or_default(),
        integrity_multiplier: r.get("integrity_multiplier"),
        raw_inputs: r.get("raw_inputs"),
        calculated_at: r.get("calculated_at"),
        expires_at: r.get("expires_at"),
    }
}
