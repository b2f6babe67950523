//! Capability: observed services, revenue, domains, and replications.

use super::{clamp_score, DimensionData, DimensionResult};
use crate::breakpoints::step_above;
use crate::facts::WalletFacts;
use rust_decimal::prelude::ToPrimitive;

const REVENUE_STEPS: [(f64, u32); 3] = [(500.0, 30), (50.0, 20), (1.0, 10)];

pub fn score(facts: &WalletFacts) -> DimensionResult {
    let profile = &facts.store.profile;

    let service_points = match profile.service_count {
        i32::MIN..=0 => 0,
        1 => 15,
        2..=3 => 25,
        _ => 30,
    };

    let revenue = profile.total_revenue.to_f64().unwrap_or(0.0);
    let revenue_points = step_above(revenue, &REVENUE_STEPS);

    let domain_points = match profile.domains_owned {
        i32::MIN..=0 => 0,
        1 => 10,
        _ => 20,
    };

    let replication_points = match profile.replication_count {
        i32::MIN..=0 => 0,
        1 => 10,
        _ => 20,
    };

    let total = service_points + revenue_points + domain_points + replication_points;

    DimensionResult {
        score: clamp_score(total as i64),
        data: DimensionData::Capability {
            service_points,
            revenue_points,
            domain_points,
            replication_points,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::StoreAggregates;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use score_core::chain::{ChainFacts, TransferStats};
    use score_core::types::WalletProfile;

    fn facts(profile: WalletProfile) -> WalletFacts {
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
            store: StoreAggregates {
                profile,
                ..Default::default()
            },
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_absent_profile_scores_zero() {
        let result = score(&facts(WalletProfile::default()));
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_service_buckets() {
        for (count, expected) in [(0, 0), (1, 15), (2, 25), (3, 25), (4, 30), (10, 30)] {
            let profile = WalletProfile {
                service_count: count,
                ..Default::default()
            };
            let result = score(&facts(profile));
            let DimensionData::Capability { service_points, .. } = result.data else {
                panic!("wrong dimension data variant");
            };
            assert_eq!(service_points, expected, "service_count {count}");
        }
    }

    #[test]
    fn test_established_operator() {
        let profile = WalletProfile {
            service_count: 4,
            total_revenue: Decimal::new(1200, 0),
            domains_owned: 2,
            replication_count: 3,
            ..Default::default()
        };
        let result = score(&facts(profile));
        // 30 + 30 + 20 + 20
        assert_eq!(result.score, 100);
    }
}
