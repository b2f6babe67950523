//! The point-in-time fact snapshot the pipeline scores from.
//!
//! Chain facts and store aggregates are fetched once, joined into a
//! [`WalletFacts`], and every downstream stage works from that frozen view.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use score_core::chain::ChainFacts;
use score_core::types::{BalanceTrend, PartnerEdge, WalletProfile};
use serde::{Deserialize, Serialize};

/// Aggregates read from the local store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreAggregates {
    pub total_tx_count: i64,
    pub unique_partners: i64,
    pub first_seen: Option<DateTime<Utc>>,
    pub trend: Option<BalanceTrend>,
    pub partners: Vec<PartnerEdge>,
    /// Recent transfer timestamps, oldest first.
    pub recent_timestamps: Vec<DateTime<Utc>>,
    pub tx_count_last_hour: i64,
    pub tx_count_24h: i64,
    pub tx_count_7d: i64,
    /// Transfers in the hour window ending one hour ago, spanning back 24 h.
    pub tx_count_burst_window: i64,
    pub avg_balance_24h: Option<Decimal>,
    /// Lookups for this wallet in the last hour, excluding the current one.
    pub lookups_last_hour: i64,
    /// Lookups for this wallet in the last 30 days, excluding the current one.
    pub prior_query_count: i64,
    pub earliest_inbound_sender: Option<String>,
    /// First-seen timestamp of the wallet's top-volume partner.
    pub top_partner_first_seen: Option<DateTime<Utc>>,
    /// Relationship rows that exist among the wallet's top-5 partners.
    pub cluster_edge_count_top5: i64,
    /// Per-partner (sent, received) flows over the last 7 days.
    pub pair_flows_7d: Vec<(String, Decimal, Decimal)>,
    pub profile: WalletProfile,
    pub fraud_report_count: i64,
    /// Set when any aggregate query failed and was degraded to empty;
    /// confidence is capped while this is set.
    pub degraded: bool,
}

/// Everything the calculators and fraud engine see for one wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFacts {
    pub wallet: String,
    pub chain: ChainFacts,
    pub store: StoreAggregates,
    pub fetched_at: DateTime<Utc>,
}

impl WalletFacts {
    /// Transaction count backing reliability and confidence: the larger of
    /// the scan-window count and the indexer's running total.
    pub fn effective_tx_count(&self) -> u64 {
        (self.store.total_tx_count.max(0) as u64).max(self.chain.stats.count)
    }

    /// Hours since the last observed transfer, by block distance.
    pub fn hours_since_last_transfer(&self) -> Option<f64> {
        self.chain.stats.last_block.map(|last| {
            let blocks = self.chain.tip_block.saturating_sub(last);
            blocks as f64 / score_core::config::BLOCKS_PER_DAY as f64 * 24.0
        })
    }
}
