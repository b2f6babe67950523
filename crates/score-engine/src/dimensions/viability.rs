//! Viability: balances, flow ratio, age, and balance trend.

use super::{clamp_score, DimensionData, DimensionResult};
use crate::breakpoints::{step_above, Curve};
use crate::facts::WalletFacts;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use score_core::types::BalanceTrend;

const WEI_PER_ETH: f64 = 1e18;

const USDC_STEPS: [(f64, u32); 4] = [(100.0, 25), (50.0, 20), (10.0, 15), (1.0, 5)];

/// Score viability. `usdc_balance` is the effective balance: the
/// instantaneous read, or the 24 h average when the gaming detector set
/// the override. `age_curve` is the (possibly maturity-adapted) age curve.
pub fn score(facts: &WalletFacts, usdc_balance: Decimal, used_avg_balance: bool, age_curve: &Curve) -> DimensionResult {
    let eth = facts.chain.eth_balance_wei.to_f64().unwrap_or(0.0) / WEI_PER_ETH;
    let eth_points = if eth >= 0.1 {
        15
    } else if eth >= 0.01 {
        10
    } else if eth >= 0.001 {
        5
    } else if eth > 0.0 {
        2
    } else {
        0
    };

    let usdc = usdc_balance.to_f64().unwrap_or(0.0);
    let usdc_points = step_above(usdc, &USDC_STEPS);

    let inflow = facts.chain.stats.in_30d;
    let outflow = facts.chain.stats.out_30d;
    let flow_points = if outflow > Decimal::ZERO {
        let ratio = (inflow / outflow).to_f64().unwrap_or(0.0);
        if ratio > 2.0 {
            30
        } else if ratio > 1.5 {
            25
        } else if ratio > 1.0 {
            15
        } else {
            5
        }
    } else if inflow > Decimal::ZERO {
        30
    } else {
        0
    };

    let age_points = age_curve.interpolate(facts.chain.wallet_age_days).round() as u32;

    let trend_points = match facts.store.trend {
        Some(BalanceTrend::Rising) => 15,
        Some(BalanceTrend::Stable) => 10,
        Some(BalanceTrend::Declining) => 5,
        Some(BalanceTrend::Freefall) | None => 0,
    };

    // Drained-to-zero wallets with outflow history read as distressed
    let zero_balance_penalty =
        if usdc_balance == Decimal::ZERO && facts.chain.stats.total_out > Decimal::ZERO {
            15
        } else {
            0
        };

    let total = (eth_points + usdc_points + flow_points + age_points + trend_points) as i64
        - zero_balance_penalty as i64;

    DimensionResult {
        score: clamp_score(total),
        data: DimensionData::Viability {
            eth_points,
            usdc_points,
            flow_points,
            age_points,
            trend_points,
            zero_balance_penalty,
            used_avg_balance,
        },
    }
}
