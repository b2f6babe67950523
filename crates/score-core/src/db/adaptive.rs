//! Repository for persisted adaptive state.

use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

/// Well-known state row holding the current dimension weights.
pub const WEIGHTS_STATE: &str = "dimension_weights";

/// Persisted adaptive state: JSON weights plus learning counters.
#[derive(Debug, Clone)]
pub struct AdaptiveStateRow {
    pub state_name: String,
    pub weights: serde_json::Value,
    pub breakpoint_offsets: serde_json::Value,
    pub sample_size: i32,
    pub positive_count: i32,
    pub negative_count: i32,
    pub updated_at: DateTime<Utc>,
}

pub struct AdaptiveStateRepository {
    pool: PgPool,
}

impl AdaptiveStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, state_name: &str) -> Result<Option<AdaptiveStateRow>> {
        let row = sqlx::query(
            r#"
            SELECT state_name, weights, breakpoint_offsets, sample_size,
                   positive_count, negative_count, updated_at
            FROM adaptive_state
            WHERE state_name = $1
            "#,
        )
        .bind(state_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| AdaptiveStateRow {
            state_name: r.get("state_name"),
            weights: r.get("weights"),
            breakpoint_offsets: r.get("breakpoint_offsets"),
            sample_size: r.get("sample_size"),
            positive_count: r.get("positive_count"),
            negative_count: r.get("negative_count"),
            updated_at: r.get("updated_at"),
        }))
    }

    pub async fn put(&self, state: &AdaptiveStateRow) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO adaptive_state (
                state_name, weights, breakpoint_offsets, sample_size,
                positive_count, negative_count, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (state_name) DO UPDATE SET
                weights = EXCLUDED.weights,
                breakpoint_offsets = EXCLUDED.breakpoint_offsets,
                sample_size = EXCLUDED.sample_size,
                positive_count = EXCLUDED.positive_count,
                negative_count = EXCLUDED.negative_count,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&state.state_name)
        .bind(&state.weights)
        .bind(&state.breakpoint_offsets)
        .bind(state.sample_size)
        .bind(state.positive_count)
        .bind(state.negative_count)
        .bind(state.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
