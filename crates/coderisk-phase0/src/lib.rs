//! Adaptive pre-analysis: fast, pure per-file classifiers that can
//! short-circuit a file as documentation-only or force-escalate it straight
//! to the agent, skipping the baseline-metrics phase entirely.

pub mod aggregate;
pub mod doc;
pub mod environment;
pub mod modification;
pub mod security;

pub use aggregate::classify;
