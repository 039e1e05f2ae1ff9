//! LLM provider abstraction for the Phase 2 investigation agent: a
//! transport-agnostic `LLMProvider` trait plus the message/tool-call
//! vocabulary every provider speaks, and two concrete transports gated
//! behind feature flags.

pub mod llm_provider;

#[cfg(feature = "anthropic")]
pub mod anthropic_provider;
#[cfg(feature = "openai-compatible")]
pub mod openai_compatible_provider;

pub use llm_provider::*;
