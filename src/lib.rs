//! BaseScore: composite on-chain reputation scoring for wallets on Base.
//!
//! This root crate re-exports the workspace members for integration
//! tests. For actual functionality, use the individual crates directly:
//!
//! - `score-core`: domain types, configuration, store repositories, chain reader
//! - `score-engine`: the scoring pipeline and orchestrator
//! - `score-jobs`: background refresh, outcome matching, anomaly detection

pub use score_core as core;
pub use score_engine as engine;
