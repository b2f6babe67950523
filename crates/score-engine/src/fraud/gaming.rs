//! Gaming detection: velocity spikes, balance dressing, wash trading.

use crate::facts::WalletFacts;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamingIndicator {
    VelocitySpike,
    DepositAndScore,
    BurstAndStop,
    BalanceWindowDressing,
    WashTrading,
}

impl GamingIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamingIndicator::VelocitySpike => "velocity_spike",
            GamingIndicator::DepositAndScore => "deposit_and_score",
            GamingIndicator::BurstAndStop => "burst_and_stop",
            GamingIndicator::BalanceWindowDressing => "balance_window_dressing",
            GamingIndicator::WashTrading => "wash_trading",
        }
    }
}

/// Point penalties produced by the gaming rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamingPenalties {
    pub composite: u32,
    pub reliability: u32,
    pub viability: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GamingReport {
    pub indicators: Vec<GamingIndicator>,
    pub penalties: GamingPenalties,
    /// Substitute the 24 h average balance for the instantaneous balance
    /// in viability.
    pub use_avg_balance: bool,
    /// Wash ratio for diagnostics, when computed.
    pub wash_ratio: Option<f64>,
}

pub fn detect(facts: &WalletFacts) -> GamingReport {
    let mut indicators = Vec::new();
    let mut penalties = GamingPenalties::default();
    let mut use_avg_balance = false;

    let store = &facts.store;

    // Daily rate an order of magnitude over the weekly baseline
    if store.tx_count_7d > 0 {
        let weekly_rate = store.tx_count_7d as f64 / 7.0;
        if store.tx_count_24h as f64 > 10.0 * weekly_rate {
            indicators.push(GamingIndicator::VelocitySpike);
            penalties.composite += 10;
        }
    }

    // Balance inflated against the 24h average; a recent lookup makes it
    // deposit-and-score, otherwise plain window dressing. The two rules
    // share the balance condition and never stack.
    if let Some(avg) = store.avg_balance_24h {
        if avg > Decimal::ZERO && facts.chain.usdc_balance > avg * Decimal::from(5) {
            use_avg_balance = true;
            if store.lookups_last_hour > 0 {
                indicators.push(GamingIndicator::DepositAndScore);
                penalties.viability += 5;
            } else {
                indicators.push(GamingIndicator::BalanceWindowDressing);
                penalties.viability += 10;
            }
        }
    }

    // Burst of activity that stopped an hour ago
    if store.tx_count_last_hour == 0 && store.tx_count_burst_window > 20 {
        indicators.push(GamingIndicator::BurstAndStop);
        penalties.reliability += 8;
    }

    // Round-trip volume share over the last 7 days: the overlapped
    // (min-direction) volume against the directed volume. A perfect
    // round-trip reads as ratio 1.0.
    let mut wash_ratio = None;
    let total: Decimal = store
        .pair_flows_7d
        .iter()
        .map(|(_, sent, received)| (*sent).max(*received))
        .sum();
    if total > Decimal::ZERO {
        let overlap: Decimal = store
            .pair_flows_7d
            .iter()
            .map(|(_, sent, received)| (*sent).min(*received))
            .sum();
        let ratio = (overlap / total).to_f64().unwrap_or(0.0);
        wash_ratio = Some(ratio);
        if ratio > 0.40 {
            indicators.push(GamingIndicator::WashTrading);
            // 8 points at ratio 0.4, scaling to 15 at 0.8
            let scaled = 8.0 + ((ratio - 0.4) / 0.4).clamp(0.0, 1.0) * 7.0;
            penalties.reliability += scaled.round() as u32;
            penalties.composite += 5;
        }
    }

    GamingReport {
        indicators,
        penalties,
        use_avg_balance,
        wash_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::StoreAggregates;
    use chrono::Utc;
    use score_core::chain::{ChainFacts, TransferStats};

    fn facts(store: StoreAggregates, usdc_balance: Decimal) -> WalletFacts {
        WalletFacts {
            wallet: "0x0000000000000000000000000000000000000001".to_string(),
            chain: ChainFacts {
                usdc_balance,
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
    fn test_quiet_wallet_is_clean() {
        let report = detect(&facts(StoreAggregates::default(), Decimal::ZERO));
        assert!(report.indicators.is_empty());
        assert_eq!(report.penalties, GamingPenalties::default());
        assert!(!report.use_avg_balance);
    }

    #[test]
    fn test_velocity_spike() {
        let store = StoreAggregates {
            tx_count_24h: 50,
            tx_count_7d: 21, // weekly rate 3/day, spike threshold 30
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::ZERO));
        assert!(report.indicators.contains(&GamingIndicator::VelocitySpike));
        assert_eq!(report.penalties.composite, 10);
    }

    #[test]
    fn test_steady_high_volume_is_not_a_spike() {
        let store = StoreAggregates {
            tx_count_24h: 100,
            tx_count_7d: 700,
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::ZERO));
        assert!(!report.indicators.contains(&GamingIndicator::VelocitySpike));
    }

    #[test]
    fn test_deposit_and_score_with_recent_lookup() {
        let store = StoreAggregates {
            avg_balance_24h: Some(Decimal::new(100, 0)),
            lookups_last_hour: 1,
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::new(600, 0)));
        assert!(report
            .indicators
            .contains(&GamingIndicator::DepositAndScore));
        // The same balance condition must not double-count
        assert!(!report
            .indicators
            .contains(&GamingIndicator::BalanceWindowDressing));
        assert_eq!(report.penalties.viability, 5);
        assert!(report.use_avg_balance);
    }

    #[test]
    fn test_window_dressing_without_lookup() {
        let store = StoreAggregates {
            avg_balance_24h: Some(Decimal::new(100, 0)),
            lookups_last_hour: 0,
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::new(600, 0)));
        assert!(report
            .indicators
            .contains(&GamingIndicator::BalanceWindowDressing));
        assert_eq!(report.penalties.viability, 10);
        assert!(report.use_avg_balance);
    }

    #[test]
    fn test_balance_within_range_is_clean() {
        let store = StoreAggregates {
            avg_balance_24h: Some(Decimal::new(100, 0)),
            lookups_last_hour: 3,
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::new(400, 0)));
        assert!(report.indicators.is_empty());
    }

    #[test]
    fn test_burst_and_stop() {
        let store = StoreAggregates {
            tx_count_last_hour: 0,
            tx_count_burst_window: 25,
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::ZERO));
        assert!(report.indicators.contains(&GamingIndicator::BurstAndStop));
        assert_eq!(report.penalties.reliability, 8);
    }

    #[test]
    fn test_wash_trading_scaling() {
        // Perfect round-trips read as ratio 1.0 and earn the full penalty
        let store = StoreAggregates {
            pair_flows_7d: vec![("0xa".to_string(), Decimal::new(1000, 0), Decimal::new(1000, 0))],
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::ZERO));
        assert!(report.indicators.contains(&GamingIndicator::WashTrading));
        let ratio = report.wash_ratio.unwrap();
        assert!((ratio - 1.0).abs() < 1e-9);
        assert_eq!(report.penalties.reliability, 15);
        assert_eq!(report.penalties.composite, 5);
    }

    #[test]
    fn test_wash_trading_partial_overlap() {
        // Half the sent volume comes back: ratio 0.5, penalty scales between
        let store = StoreAggregates {
            pair_flows_7d: vec![("0xa".to_string(), Decimal::new(1000, 0), Decimal::new(500, 0))],
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::ZERO));
        let ratio = report.wash_ratio.unwrap();
        assert!((ratio - 0.5).abs() < 1e-9);
        // 8 + (0.1/0.4)*7 rounds to 10
        assert_eq!(report.penalties.reliability, 10);
    }

    #[test]
    fn test_one_way_flow_is_not_wash_trading() {
        let store = StoreAggregates {
            pair_flows_7d: vec![("0xa".to_string(), Decimal::new(1000, 0), Decimal::ZERO)],
            ..Default::default()
        };
        let report = detect(&facts(store, Decimal::ZERO));
        assert!(!report.indicators.contains(&GamingIndicator::WashTrading));
        assert_eq!(report.wash_ratio, Some(0.0));
    }
}
