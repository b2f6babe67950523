//! Background jobs for BaseScore.
//!
//! Each job owns an interval loop that swallows its own errors and
//! records run statistics; the process never crashes on a bad batch.

pub mod anomaly;
pub mod outcomes;
pub mod refresh;
pub mod stats;

pub use anomaly::{AnomalyConfig, AnomalyDetector, AnomalyEvent};
pub use outcomes::{OutcomeMatcher, OutcomeMatcherConfig};
pub use refresh::{HourlyRefresh, RefreshConfig};
pub use stats::{JobRecord, JobStats};
