//! Shared types, error taxonomy, configuration, and instrumentation for the
//! CodeRisk pipeline. No I/O lives here except config loading.

pub mod config;
pub mod error;
pub mod instrumentation;
pub mod ownership;
pub mod types;

pub use config::CoreRiskConfig;
pub use error::{CoreRiskError, Result};
pub use instrumentation::{MetricRegistry, MetricStats, PhaseDurations};
pub use ownership::compute_transition;
pub use types::*;
