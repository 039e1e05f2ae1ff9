//! Deterministic graph/DB baseline metrics: structural coupling, temporal
//! co-change, test ratio, ownership, and incident history. Each submodule
//! separates the pure banding arithmetic from the store-backed fetch so the
//! thresholds are unit-testable without a live KG/RS connection.

pub mod aggregate;
pub mod cochange;
pub mod coupling;
pub mod incidents;
pub mod ownership;
pub mod test_ratio;

pub use aggregate::run;
