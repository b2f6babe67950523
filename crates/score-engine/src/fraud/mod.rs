//! Fraud engine: sybil and gaming analysis over the fact snapshot.
//!
//! Both analyzers are pure; every store read they depend on is part of the
//! [`WalletFacts`](crate::facts::WalletFacts) assembled by the orchestrator.

pub mod gaming;
pub mod sybil;

use crate::facts::WalletFacts;
use serde::{Deserialize, Serialize};

pub use gaming::{GamingIndicator, GamingPenalties, GamingReport};
pub use sybil::{SybilIndicator, SybilReport};

/// Minimum dimension caps accumulated from sybil indicators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionCaps {
    pub reliability: Option<u32>,
    pub identity: Option<u32>,
}

impl DimensionCaps {
    pub fn cap_reliability(&mut self, cap: u32) {
        self.reliability = Some(self.reliability.map_or(cap, |c| c.min(cap)));
    }

    pub fn cap_identity(&mut self, cap: u32) {
        self.identity = Some(self.identity.map_or(cap, |c| c.min(cap)));
    }

    pub fn apply(&self, reliability: u32, identity: u32) -> (u32, u32) {
        (
            self.reliability.map_or(reliability, |c| reliability.min(c)),
            self.identity.map_or(identity, |c| identity.min(c)),
        )
    }
}

/// Combined output of both detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAnalysis {
    pub sybil: SybilReport,
    pub gaming: GamingReport,
}

/// Run sybil detection, then gaming detection, over one fact snapshot.
pub fn analyze(facts: &WalletFacts) -> FraudAnalysis {
    let sybil = sybil::detect(facts);
    let gaming = gaming::detect(facts);
    FraudAnalysis { sybil, gaming }
}
