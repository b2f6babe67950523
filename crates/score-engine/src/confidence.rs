//! Confidence, data-availability labels, and the improvement path.

use crate::breakpoints::Curve;
use crate::facts::WalletFacts;
use score_core::types::DataAvailability;
use serde::{Deserialize, Serialize};

const WEIGHT_TX_COUNT: f64 = 0.25;
const WEIGHT_WALLET_AGE: f64 = 0.25;
const WEIGHT_PARTNERS: f64 = 0.20;
const WEIGHT_RATINGS: f64 = 0.15;
const WEIGHT_QUERIES: f64 = 0.15;

/// Confidence never rises above this while any aggregate was degraded.
const DEGRADED_CEILING: f64 = 0.5;

/// Improvement steps stop being offered at this confidence.
const IMPROVEMENT_CUTOFF: f64 = 0.70;
const IMPROVEMENT_CAP: usize = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub confidence: f64,
    pub availability: DataAvailability,
    pub improvement_path: Vec<String>,
}

fn tx_count_signal() -> Curve {
    Curve::new(&[(0.0, 0.0), (10.0, 0.4), (50.0, 0.7), (200.0, 1.0)])
}

fn wallet_age_signal() -> Curve {
    Curve::new(&[(0.0, 0.0), (7.0, 0.3), (30.0, 0.6), (180.0, 1.0)])
}

fn partners_signal() -> Curve {
    Curve::new(&[(0.0, 0.0), (3.0, 0.4), (10.0, 0.7), (25.0, 1.0)])
}

fn ratings_signal() -> Curve {
    Curve::new(&[(0.0, 0.0), (5.0, 0.5), (20.0, 1.0)])
}

fn queries_signal() -> Curve {
    Curve::new(&[(0.0, 0.0), (5.0, 0.5), (25.0, 1.0)])
}

/// Compute the confidence value, availability labels, and improvement path
/// from one fact snapshot.
pub fn compute(facts: &WalletFacts) -> ConfidenceReport {
    let tx_count = facts.effective_tx_count() as f64;
    let age_days = facts.chain.wallet_age_days;
    let partners = facts.store.unique_partners.max(0) as f64;
    let ratings = facts.store.profile.rating_count.max(0) as f64;
    let queries = facts.store.prior_query_count.max(0) as f64;

    let mut confidence = tx_count_signal().interpolate(tx_count) * WEIGHT_TX_COUNT
        + wallet_age_signal().interpolate(age_days) * WEIGHT_WALLET_AGE
        + partners_signal().interpolate(partners) * WEIGHT_PARTNERS
        + ratings_signal().interpolate(ratings) * WEIGHT_RATINGS
        + queries_signal().interpolate(queries) * WEIGHT_QUERIES;

    if facts.store.degraded {
        confidence = confidence.min(DEGRADED_CEILING);
    }
    let confidence = (confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0;

    let availability = availability_labels(facts);
    let improvement_path = improvement_path(facts, confidence);

    ConfidenceReport {
        confidence,
        availability,
        improvement_path,
    }
}

fn availability_labels(facts: &WalletFacts) -> DataAvailability {
    let tx_count = facts.effective_tx_count();
    let transaction_history = match tx_count {
        0 => "none",
        1..=9 => "limited",
        10..=49 => "moderate",
        _ => "extensive",
    };

    let age = facts.chain.wallet_age_days;
    let wallet_age = if age < 7.0 {
        "new"
    } else if age < 30.0 {
        "recent"
    } else if age < 180.0 {
        "established"
    } else {
        "mature"
    };

    let volume = facts.chain.stats.total_in + facts.chain.stats.total_out;
    let economic_data = if volume == rust_decimal::Decimal::ZERO {
        "none"
    } else if volume < rust_decimal::Decimal::new(1000, 0) {
        "limited"
    } else {
        "rich"
    };

    let identity_signals = [
        facts.chain.has_basename,
        facts.store.profile.github_verified,
        facts.chain.in_agent_registry,
    ]
    .iter()
    .filter(|&&s| s)
    .count();
    let identity_data = match identity_signals {
        0 => "none",
        1 => "partial",
        _ => "strong",
    };

    let community = facts.store.profile.rating_count.max(0) as i64 + facts.store.unique_partners;
    let community_data = if community == 0 {
        "none"
    } else if community < 5 {
        "limited"
    } else {
        "active"
    };

    DataAvailability {
        transaction_history: transaction_history.to_string(),
        wallet_age: wallet_age.to_string(),
        economic_data: economic_data.to_string(),
        identity_data: identity_data.to_string(),
        community_data: community_data.to_string(),
    }
}

/// Concrete next steps in priority order, capped at four; empty once
/// confidence is adequate.
fn improvement_path(facts: &WalletFacts, confidence: f64) -> Vec<String> {
    if confidence >= IMPROVEMENT_CUTOFF {
        return Vec::new();
    }

    let mut steps = Vec::new();
    if facts.effective_tx_count() < 10 {
        steps.push("Complete 10+ transactions".to_string());
    }
    if facts.chain.wallet_age_days < 30.0 {
        steps.push("Maintain consistent activity for 30+ days".to_string());
    }
    if facts.store.unique_partners < 5 {
        steps.push("Transact with more unique counterparties".to_string());
    }
    if !facts.chain.has_basename {
        steps.push("Register a Basename for your address".to_string());
    }
    if !facts.store.profile.github_verified {
        steps.push("Verify a GitHub account".to_string());
    }
    if facts.store.profile.rating_count < 5 {
        steps.push("Collect ratings from counterparties".to_string());
    }

    steps.truncate(IMPROVEMENT_CAP);
    steps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::StoreAggregates;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use score_core::chain::{ChainFacts, TransferStats};
    use score_core::types::WalletProfile;

    fn empty_facts() -> WalletFacts {
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
                wallet_age_days: 0.0,
            },
            store: StoreAggregates::default(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_unknown_wallet_zero_confidence() {
        let report = compute(&empty_facts());
        assert_eq!(report.confidence, 0.0);
        assert_eq!(report.availability.transaction_history, "none");
        assert_eq!(report.availability.wallet_age, "new");
        assert!(!report.improvement_path.is_empty());
        assert!(report
            .improvement_path
            .contains(&"Complete 10+ transactions".to_string()));
    }

    #[test]
    fn test_improvement_path_capped_at_four() {
        let report = compute(&empty_facts());
        assert!(report.improvement_path.len() <= 4);
        assert_eq!(report.improvement_path.len(), 4);
    }

    #[test]
    fn test_established_wallet_confidence() {
        let mut facts = empty_facts();
        facts.chain.stats.count = 250;
        facts.chain.wallet_age_days = 365.0;
        facts.store.unique_partners = 30;
        facts.store.prior_query_count = 40;
        facts.store.profile = WalletProfile {
            rating_count: 25,
            ..Default::default()
        };

        let report = compute(&facts);
        // Every signal saturates
        assert_eq!(report.confidence, 1.0);
        assert!(report.improvement_path.is_empty());
    }

    #[test]
    fn test_degraded_aggregates_cap_confidence() {
        let mut facts = empty_facts();
        facts.chain.stats.count = 250;
        facts.chain.wallet_age_days = 365.0;
        facts.store.unique_partners = 30;
        facts.store.prior_query_count = 40;
        facts.store.profile = WalletProfile {
            rating_count: 25,
            ..Default::default()
        };
        facts.store.degraded = true;

        let report = compute(&facts);
        assert!(report.confidence <= 0.5);
    }

    #[test]
    fn test_confidence_rounded_two_decimals() {
        let mut facts = empty_facts();
        facts.chain.stats.count = 25;
        facts.chain.wallet_age_days = 15.0;
        let report = compute(&facts);
        let scaled = report.confidence * 100.0;
        assert!((scaled - scaled.round()).abs() < 1e-9);
    }

    #[test]
    fn test_availability_bins() {
        let mut facts = empty_facts();
        facts.chain.stats.count = 30;
        facts.chain.wallet_age_days = 60.0;
        facts.chain.stats.total_in = Decimal::new(2000, 0);
        facts.chain.has_basename = true;
        facts.store.profile.github_verified = true;
        facts.store.unique_partners = 8;

        let report = compute(&facts);
        assert_eq!(report.availability.transaction_history, "moderate");
        assert_eq!(report.availability.wallet_age, "established");
        assert_eq!(report.availability.economic_data, "rich");
        assert_eq!(report.availability.identity_data, "strong");
        assert_eq!(report.availability.community_data, "active");
    }
}
