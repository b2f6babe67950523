//! Sybil detection over the relationship graph.

use super::DimensionCaps;
use crate::facts::WalletFacts;
use chrono::Duration;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sybil pattern tags. The order indicators are pushed matches the rule
/// order and is preserved into persisted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SybilIndicator {
    ClosedLoopTrading,
    SymmetricTransactions,
    CoordinatedCreation,
    SinglePartner,
    VolumeWithoutDiversity,
    FundedByTopPartner,
    TightCluster,
}

impl SybilIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SybilIndicator::ClosedLoopTrading => "closed_loop_trading",
            SybilIndicator::SymmetricTransactions => "symmetric_transactions",
            SybilIndicator::CoordinatedCreation => "coordinated_creation",
            SybilIndicator::SinglePartner => "single_partner",
            SybilIndicator::VolumeWithoutDiversity => "volume_without_diversity",
            SybilIndicator::FundedByTopPartner => "funded_by_top_partner",
            SybilIndicator::TightCluster => "tight_cluster",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SybilReport {
    pub flag: bool,
    pub indicators: Vec<SybilIndicator>,
    pub caps: DimensionCaps,
}

pub fn detect(facts: &WalletFacts) -> SybilReport {
    let mut indicators = Vec::new();
    let mut caps = DimensionCaps::default();

    let partners = &facts.store.partners;
    let tx_count = facts.store.total_tx_count;

    let total_volume: Decimal = partners.iter().map(|p| p.total_volume()).sum();

    // Top-3 partners carrying >90% of volume across >=3 partners
    if partners.len() >= 3 && total_volume > Decimal::ZERO {
        let top3: Decimal = partners.iter().take(3).map(|p| p.total_volume()).sum();
        let share = (top3 / total_volume).to_f64().unwrap_or(0.0);
        if share > 0.9 {
            indicators.push(SybilIndicator::ClosedLoopTrading);
            caps.cap_reliability(40);
        }
    }

    // Majority of partnerships with near-equal two-way volume
    if !partners.is_empty() {
        let symmetric = partners
            .iter()
            .filter(|p| {
                if p.volume_out == Decimal::ZERO || p.volume_in == Decimal::ZERO {
                    return false;
                }
                let max = p.volume_out.max(p.volume_in);
                let diff = (p.volume_out - p.volume_in).abs();
                (diff / max).to_f64().unwrap_or(1.0) < 0.10
            })
            .count();
        if symmetric as f64 / partners.len() as f64 > 0.5 {
            indicators.push(SybilIndicator::SymmetricTransactions);
            caps.cap_reliability(30);
        }
    }

    // Wallet and its top partner created within 24h of each other
    if let (Some(wallet_seen), Some(partner_seen)) =
        (facts.store.first_seen, facts.store.top_partner_first_seen)
    {
        if (wallet_seen - partner_seen).abs() <= Duration::hours(24) {
            indicators.push(SybilIndicator::CoordinatedCreation);
            caps.cap_identity(50);
        }
    }

    // Meaningful activity funneled through exactly one partner
    if partners.len() == 1 && tx_count >= 5 {
        indicators.push(SybilIndicator::SinglePartner);
        caps.cap_reliability(35);
    }

    // High volume without partner diversity
    if tx_count > 50 && partners.len() < 5 {
        indicators.push(SybilIndicator::VolumeWithoutDiversity);
        caps.cap_reliability(45);
    }

    // Seed funding from the top-volume partner
    if let (Some(funder), Some(top)) = (
        facts.store.earliest_inbound_sender.as_deref(),
        partners.first(),
    ) {
        if funder == top.partner {
            indicators.push(SybilIndicator::FundedByTopPartner);
            caps.cap_identity(40);
            caps.cap_reliability(35);
        }
    }

    // Top partners densely connected to each other
    let cluster = partners.len().min(5);
    if cluster >= 2 {
        let possible_pairs = (cluster * (cluster - 1) / 2) as f64;
        if facts.store.cluster_edge_count_top5 as f64 / possible_pairs > 0.5 {
            indicators.push(SybilIndicator::TightCluster);
            caps.cap_reliability(30);
            caps.cap_identity(40);
        }
    }

    SybilReport {
        flag: !indicators.is_empty(),
        indicators,
        caps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::StoreAggregates;
    use chrono::{TimeZone, Utc};
    use score_core::chain::{ChainFacts, TransferStats};
    use score_core::types::PartnerEdge;

    fn partner(name: &str, out: i64, inc: i64) -> PartnerEdge {
        PartnerEdge {
            partner: name.to_string(),
            volume_out: Decimal::new(out, 0),
            volume_in: Decimal::new(inc, 0),
            tx_count: 10,
            first_interaction: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn facts_with_store(store: StoreAggregates) -> WalletFacts {
        WalletFacts {
            wallet: "0x0000000000000000000000000000000000000001".to_string(),
            chain: ChainFacts {
                usdc_balance: Decimal::ZERO,
                eth_balance_wei: Decimal::ZERO,
                nonce: 0,
                stats: TransferStats::default(),
                has_basename: false,
                in_agent_registry: false,
                tip_block: 1_000_000,
                wallet_age_days: 10.0,
            },
            store,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_clean_wallet_has_no_indicators() {
        let store = StoreAggregates {
            partners: vec![
                partner("0xa", 1000, 50),
                partner("0xb", 800, 0),
                partner("0xc", 600, 20),
                partner("0xd", 400, 0),
                partner("0xe", 900, 10),
                partner("0xf", 700, 30),
            ],
            total_tx_count: 40,
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(!report.flag);
        assert!(report.indicators.is_empty());
        assert_eq!(report.caps, DimensionCaps::default());
    }

    #[test]
    fn test_closed_loop_trading() {
        // Three partners hold all the volume
        let store = StoreAggregates {
            partners: vec![
                partner("0xa", 5000, 0),
                partner("0xb", 4000, 0),
                partner("0xc", 3000, 0),
            ],
            total_tx_count: 30,
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(report
            .indicators
            .contains(&SybilIndicator::ClosedLoopTrading));
        assert_eq!(report.caps.reliability, Some(40));
    }

    #[test]
    fn test_symmetric_transactions() {
        let store = StoreAggregates {
            partners: vec![
                partner("0xa", 1000, 980),
                partner("0xb", 500, 510),
                partner("0xc", 200, 0),
            ],
            total_tx_count: 20,
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(report
            .indicators
            .contains(&SybilIndicator::SymmetricTransactions));
        // Symmetric cap (30) wins over the closed-loop cap (40)
        assert_eq!(report.caps.reliability, Some(30));
    }

    #[test]
    fn test_coordinated_creation() {
        let wallet_seen = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let store = StoreAggregates {
            partners: vec![partner("0xa", 100, 0)],
            total_tx_count: 3,
            first_seen: Some(wallet_seen),
            top_partner_first_seen: Some(wallet_seen + Duration::hours(5)),
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(report
            .indicators
            .contains(&SybilIndicator::CoordinatedCreation));
        assert_eq!(report.caps.identity, Some(50));
    }

    #[test]
    fn test_single_partner_requires_activity() {
        let mut store = StoreAggregates {
            partners: vec![partner("0xa", 100, 0)],
            total_tx_count: 4,
            ..Default::default()
        };
        // Below the activity floor no indicator fires
        let report = detect(&facts_with_store(store.clone()));
        assert!(!report.indicators.contains(&SybilIndicator::SinglePartner));

        store.total_tx_count = 5;
        let report = detect(&facts_with_store(store));
        assert!(report.indicators.contains(&SybilIndicator::SinglePartner));
        assert_eq!(report.caps.reliability, Some(35));
    }

    #[test]
    fn test_volume_without_diversity() {
        let store = StoreAggregates {
            partners: vec![partner("0xa", 1000, 0), partner("0xb", 900, 0)],
            total_tx_count: 60,
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(report
            .indicators
            .contains(&SybilIndicator::VolumeWithoutDiversity));
    }

    #[test]
    fn test_funded_by_top_partner() {
        let store = StoreAggregates {
            partners: vec![partner("0xtop", 5000, 100), partner("0xb", 10, 0)],
            total_tx_count: 10,
            earliest_inbound_sender: Some("0xtop".to_string()),
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(report
            .indicators
            .contains(&SybilIndicator::FundedByTopPartner));
        assert_eq!(report.caps.identity, Some(40));
        assert_eq!(report.caps.reliability, Some(35));
    }

    #[test]
    fn test_tight_cluster() {
        // 5 partners, 10 possible pairs, 6 connected
        let store = StoreAggregates {
            partners: vec![
                partner("0xa", 100, 0),
                partner("0xb", 90, 0),
                partner("0xc", 80, 0),
                partner("0xd", 70, 0),
                partner("0xe", 60, 0),
            ],
            cluster_edge_count_top5: 6,
            total_tx_count: 20,
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(report.indicators.contains(&SybilIndicator::TightCluster));
        assert_eq!(report.caps.reliability, Some(30));
        assert_eq!(report.caps.identity, Some(40));
    }

    #[test]
    fn test_indicators_accumulate() {
        // Single partner with symmetric round-trips, funded by that partner
        let store = StoreAggregates {
            partners: vec![partner("0xa", 1000, 1000)],
            total_tx_count: 12,
            earliest_inbound_sender: Some("0xa".to_string()),
            ..Default::default()
        };
        let report = detect(&facts_with_store(store));
        assert!(report.flag);
        assert!(report
            .indicators
            .contains(&SybilIndicator::SymmetricTransactions));
        assert!(report.indicators.contains(&SybilIndicator::SinglePartner));
        assert!(report
            .indicators
            .contains(&SybilIndicator::FundedByTopPartner));
        // Minimum reliability cap across 30/35/35
        assert_eq!(report.caps.reliability, Some(30));
    }
}
