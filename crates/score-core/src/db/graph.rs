//! Repository for the canonical-pair relationship graph.

use crate::types::{PartnerEdge, RelationshipEdge};
use crate::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

/// Repository over `relationship_graph`. Pairs are stored once with
/// `wallet_a < wallet_b`; reads union both directions.
pub struct RelationshipRepository {
    pool: PgPool,
}

impl RelationshipRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a directed transfer from `sender` to `recipient`, creating or
    /// updating the canonical edge.
    pub async fn record_transfer(
        &self,
        sender: &str,
        recipient: &str,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<()> {
        let (a, b) = RelationshipEdge::canonical_pair(sender, recipient);
        let a_to_b = if sender == a { amount } else { Decimal::ZERO };
        let b_to_a = if sender == a { Decimal::ZERO } else { amount };

        sqlx::query(
            r#"
            INSERT INTO relationship_graph (
                wallet_a, wallet_b, volume_a_to_b, volume_b_to_a, tx_count,
                first_interaction, last_interaction
            )
            VALUES ($1, $2, $3, $4, 1, $5, $5)
            ON CONFLICT (wallet_a, wallet_b) DO UPDATE SET
                volume_a_to_b = relationship_graph.volume_a_to_b + EXCLUDED.volume_a_to_b,
                volume_b_to_a = relationship_graph.volume_b_to_a + EXCLUDED.volume_b_to_a,
                tx_count = relationship_graph.tx_count + 1,
                first_interaction = LEAST(relationship_graph.first_interaction, EXCLUDED.first_interaction),
                last_interaction = GREATEST(relationship_graph.last_interaction, EXCLUDED.last_interaction)
            "#,
        )
        .bind(&a)
        .bind(&b)
        .bind(a_to_b)
        .bind(b_to_a)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All partnerships for a wallet, viewed from the wallet's side,
    /// highest combined volume first.
    pub async fn partners(&self, wallet: &str) -> Result<Vec<PartnerEdge>> {
        let rows = sqlx::query(
            r#"
            SELECT partner, volume_out, volume_in, tx_count, first_interaction
            FROM (
                SELECT wallet_b AS partner, volume_a_to_b AS volume_out,
                       volume_b_to_a AS volume_in, tx_count, first_interaction
                FROM relationship_graph
                WHERE wallet_a = $1
                UNION ALL
                SELECT wallet_a AS partner, volume_b_to_a AS volume_out,
                       volume_a_to_b AS volume_in, tx_count, first_interaction
                FROM relationship_graph
                WHERE wallet_b = $1
            ) edges
            ORDER BY volume_out + volume_in DESC
            "#,
        )
        .bind(wallet)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| PartnerEdge {
                partner: r.get("partner"),
                volume_out: r.get("volume_out"),
                volume_in: r.get("volume_in"),
                tx_count: r.get("tx_count"),
                first_interaction: r.get("first_interaction"),
            })
            .collect())
    }

    /// Whether a relationship row exists between two wallets.
    pub async fn pair_exists(&self, a: &str, b: &str) -> Result<bool> {
        let (a, b) = RelationshipEdge::canonical_pair(a, b);
        let row: (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM relationship_graph WHERE wallet_a = $1 AND wallet_b = $2
            )
            "#,
        )
        .bind(&a)
        .bind(&b)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Count of relationship rows whose endpoints are both in `wallets`.
    /// Feeds the tight-cluster check over a wallet's top partners.
    pub async fn edges_among(&self, wallets: &[String]) -> Result<i64> {
        if wallets.len() < 2 {
            return Ok(0);
        }
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM relationship_graph
            WHERE wallet_a = ANY($1) AND wallet_b = ANY($1)
            "#,
        )
        .bind(wallets)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Number of distinct partners for a wallet.
    pub async fn partner_count(&self, wallet: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM relationship_graph
            WHERE wallet_a = $1 OR wallet_b = $1
            "#,
        )
        .bind(wallet)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}
