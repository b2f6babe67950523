//! Store-side rows: transfers, aggregates, relationships, snapshots, profiles.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An indexed USDC transfer event (written by the chain-indexer collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRecord {
    pub tx_hash: String,
    pub block_number: u64,
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
    pub transferred_at: DateTime<Utc>,
}

/// Per-wallet aggregates maintained by the indexer and the refresh job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletIndexRow {
    pub wallet: String,
    pub first_seen: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub total_tx_count: i64,
    pub total_volume: Decimal,
    pub unique_partners: i64,
    pub tx_count_24h: i64,
    pub tx_count_7d: i64,
    pub tx_count_30d: i64,
    pub volume_24h: Decimal,
    pub volume_7d: Decimal,
    pub volume_30d: Decimal,
    pub trend: BalanceTrend,
}

/// 7-day balance trend bin from snapshot comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceTrend {
    Rising,
    Stable,
    Declining,
    Freefall,
}

impl BalanceTrend {
    /// Bin the ratio of current balance vs the 7-day-old snapshot.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.5 {
            BalanceTrend::Freefall
        } else if ratio < 0.9 {
            BalanceTrend::Declining
        } else if ratio > 1.1 {
            BalanceTrend::Rising
        } else {
            BalanceTrend::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BalanceTrend::Rising => "rising",
            BalanceTrend::Stable => "stable",
            BalanceTrend::Declining => "declining",
            BalanceTrend::Freefall => "freefall",
        }
    }
}

/// One undirected edge of the relationship graph. The pair is stored once
/// with `wallet_a < wallet_b`; directed volumes keep both flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub wallet_a: String,
    pub wallet_b: String,
    pub volume_a_to_b: Decimal,
    pub volume_b_to_a: Decimal,
    pub tx_count: i64,
    pub first_interaction: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
}

impl RelationshipEdge {
    /// Canonical ordering for an undirected pair.
    pub fn canonical_pair(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }
}

/// A wallet's relationship with one partner, viewed from the wallet's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartnerEdge {
    pub partner: String,
    /// Volume the wallet sent to the partner.
    pub volume_out: Decimal,
    /// Volume the wallet received from the partner.
    pub volume_in: Decimal,
    pub tx_count: i64,
    pub first_interaction: DateTime<Utc>,
}

impl PartnerEdge {
    pub fn total_volume(&self) -> Decimal {
        self.volume_out + self.volume_in
    }
}

/// Periodic balance sample for trend and gaming detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub wallet: String,
    pub usdc_balance: Decimal,
    pub eth_balance_wei: Decimal,
    pub snapped_at: DateTime<Utc>,
}

/// Identity and capability attestations maintained by external collaborators.
/// A missing row reads as all-zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletProfile {
    pub wallet: String,
    pub self_registered: bool,
    pub github_verified: bool,
    pub github_stars: i32,
    pub github_pushed_at: Option<DateTime<Utc>>,
    pub domains_owned: i32,
    pub replication_count: i32,
    pub service_count: i32,
    pub total_revenue: Decimal,
    pub rating_count: i32,
}

/// One paid or free score lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLogEntry {
    pub id: Uuid,
    pub requester: Option<String>,
    pub wallet: String,
    pub endpoint: String,
    pub paid: bool,
    pub queried_at: DateTime<Utc>,
}

/// A fraud report filed against a wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudReport {
    pub id: Uuid,
    pub wallet: String,
    pub reporter: Option<String>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Hourly ecosystem aggregate written after each refresh batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomyMetrics {
    pub wallet_count: i64,
    pub scored_wallet_count: i64,
    pub median_score: Option<f64>,
    pub total_volume_24h: Decimal,
    pub recorded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_pair_ordering() {
        let (a, b) = RelationshipEdge::canonical_pair("0xbb", "0xaa");
        assert_eq!(a, "0xaa");
        assert_eq!(b, "0xbb");
        // Already ordered pairs pass through
        let (a, b) = RelationshipEdge::canonical_pair("0xaa", "0xbb");
        assert_eq!((a.as_str(), b.as_str()), ("0xaa", "0xbb"));
    }

    #[test]
    fn test_trend_bins() {
        assert_eq!(BalanceTrend::from_ratio(0.3), BalanceTrend::Freefall);
        assert_eq!(BalanceTrend::from_ratio(0.7), BalanceTrend::Declining);
        assert_eq!(BalanceTrend::from_ratio(1.0), BalanceTrend::Stable);
        assert_eq!(BalanceTrend::from_ratio(1.5), BalanceTrend::Rising);
        // Boundary values fall on the stable side
        assert_eq!(BalanceTrend::from_ratio(0.9), BalanceTrend::Stable);
        assert_eq!(BalanceTrend::from_ratio(1.1), BalanceTrend::Stable);
    }
}
