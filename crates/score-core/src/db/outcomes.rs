//! Repository for labeled score outcomes.

use crate::types::{DimensionScores, OutcomeLabel, OutcomeSample, ScoreOutcome};
use crate::Result;
use sqlx::{PgPool, Row};

pub struct OutcomeRepository {
    pool: PgPool,
}

impl OutcomeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an outcome row; a duplicate query_id is a no-op. Returns
    /// whether a row was written.
    pub async fn insert_if_new(&self, outcome: &ScoreOutcome) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO score_outcomes (
                id, query_id, wallet, requester, outcome, score, confidence,
                reliability, viability, identity, capability, behavior, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (query_id) DO NOTHING
            "#,
        )
        .bind(outcome.id)
        .bind(outcome.query_id)
        .bind(&outcome.wallet)
        .bind(&outcome.requester)
        .bind(outcome.label.as_str())
        .bind(outcome.score as i32)
        .bind(outcome.confidence)
        .bind(outcome.dimensions.map(|d| d.reliability as i32))
        .bind(outcome.dimensions.map(|d| d.viability as i32))
        .bind(outcome.dimensions.map(|d| d.identity as i32))
        .bind(outcome.dimensions.map(|d| d.capability as i32))
        .bind(outcome.dimensions.map(|d| d.behavior as i32))
        .bind(outcome.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Labeled samples with complete dimension values, newest first.
    pub async fn samples(&self, limit: i64) -> Result<Vec<OutcomeSample>> {
        let rows = sqlx::query(
            r#"
            SELECT outcome, reliability, viability, identity, capability, behavior
            FROM score_outcomes
            WHERE reliability IS NOT NULL
              AND viability IS NOT NULL
              AND identity IS NOT NULL
              AND capability IS NOT NULL
              AND behavior IS NOT NULL
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .filter_map(|r| {
                let label = OutcomeLabel::from_str(r.get::<String, _>("outcome").as_str())?;
                Some(OutcomeSample {
                    label,
                    dimensions: DimensionScores {
                        reliability: r.get::<i32, _>("reliability") as u32,
                        viability: r.get::<i32, _>("viability") as u32,
                        identity: r.get::<i32, _>("identity") as u32,
                        capability: r.get::<i32, _>("capability") as u32,
                        behavior: r.get::<i32, _>("behavior") as u32,
                    },
                })
            })
            .collect())
    }
}
