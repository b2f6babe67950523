//! Identity: registrations, Basename, GitHub attestations, wallet age.

use super::{clamp_score, DimensionData, DimensionResult};
use crate::facts::WalletFacts;
use chrono::{Duration, Utc};

pub fn score(facts: &WalletFacts) -> DimensionResult {
    let profile = &facts.store.profile;

    let registration_points = if profile.self_registered { 10 } else { 0 };
    let basename_points = if facts.chain.has_basename { 15 } else { 0 };

    let mut github_points = 0;
    if profile.github_verified {
        github_points += 20;
        if profile.github_stars >= 5 {
            github_points += 5;
        } else if profile.github_stars >= 1 {
            github_points += 3;
        }
        if let Some(pushed_at) = profile.github_pushed_at {
            let now = Utc::now();
            if pushed_at >= now - Duration::days(30) {
                github_points += 10;
            } else if pushed_at >= now - Duration::days(90) {
                github_points += 5;
            }
        }
    }

    let registry_points = if facts.chain.in_agent_registry { 20 } else { 0 };

    let age = facts.chain.wallet_age_days;
    let age_points = if age > 180.0 {
        25
    } else if age > 90.0 {
        20
    } else if age > 30.0 {
        15
    } else if age > 7.0 {
        8
    } else {
        2
    };

    let total =
        registration_points + basename_points + github_points + registry_points + age_points;

    DimensionResult {
        score: clamp_score(total as i64),
        data: DimensionData::Identity {
            registration_points,
            basename_points,
            github_points,
            registry_points,
            age_points,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::StoreAggregates;
    use rust_decimal::Decimal;
    use score_core::chain::{ChainFacts, TransferStats};
    use score_core::types::WalletProfile;

    fn facts(profile: WalletProfile, has_basename: bool, age_days: f64) -> WalletFacts {
        WalletFacts {
            wallet: "0x0000000000000000000000000000000000000001".to_string(),
            chain: ChainFacts {
                usdc_balance: Decimal::ZERO,
                eth_balance_wei: Decimal::ZERO,
                nonce: 0,
                stats: TransferStats::default(),
                has_basename,
                in_agent_registry: false,
                tip_block: 1_000_000,
                wallet_age_days: age_days,
            },
            store: StoreAggregates {
                profile,
                ..Default::default()
            },
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_anonymous_new_wallet_floor() {
        let result = score(&facts(WalletProfile::default(), false, 0.0));
        // Only the age floor applies
        assert_eq!(result.score, 2);
    }

    #[test]
    fn test_github_attestation_stack() {
        let profile = WalletProfile {
            github_verified: true,
            github_stars: 12,
            github_pushed_at: Some(Utc::now() - Duration::days(5)),
            ..Default::default()
        };
        let result = score(&facts(profile, false, 0.0));
        let DimensionData::Identity { github_points, .. } = result.data else {
            panic!("wrong dimension data variant");
        };
        // 20 verified + 5 stars + 10 recent push
        assert_eq!(github_points, 35);
    }

    #[test]
    fn test_stars_without_verification_do_not_count() {
        let profile = WalletProfile {
            github_verified: false,
            github_stars: 50,
            ..Default::default()
        };
        let result = score(&facts(profile, false, 0.0));
        let DimensionData::Identity { github_points, .. } = result.data else {
            panic!("wrong dimension data variant");
        };
        assert_eq!(github_points, 0);
    }

    #[test]
    fn test_age_steps() {
        for (age, expected) in [(200.0, 25), (120.0, 20), (45.0, 15), (10.0, 8), (3.0, 2)] {
            let result = score(&facts(WalletProfile::default(), false, age));
            let DimensionData::Identity { age_points, .. } = result.data else {
                panic!("wrong dimension data variant");
            };
            assert_eq!(age_points, expected, "age {age}");
        }
    }

    #[test]
    fn test_fully_attested_wallet() {
        let profile = WalletProfile {
            self_registered: true,
            github_verified: true,
            github_stars: 10,
            github_pushed_at: Some(Utc::now() - Duration::days(10)),
            ..Default::default()
        };
        let mut f = facts(profile, true, 365.0);
        f.chain.in_agent_registry = true;
        let result = score(&f);
        // 10 + 15 + 35 + 20 + 25
        assert_eq!(result.score, 100);
    }
}
