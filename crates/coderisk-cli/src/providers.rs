use anyhow::{bail, Result};
use coderisk_ai::LLMProvider;
use coderisk_core::CoreRiskConfig;
use secrecy::ExposeSecret;

/// Selects the LLM transport for the investigation agent. The core only
/// depends on the `LLMProvider` trait (spec.md §1); this is the one place
/// the CLI picks a concrete implementation, mirroring how `codegraph-ai`'s
/// own binaries choose a provider at startup rather than at compile time.
/// `CODERISK_LLM_BACKEND` selects between the two transports this crate
/// ships; it defaults to `anthropic`.
pub fn build_provider(config: &CoreRiskConfig) -> Result<Box<dyn LLMProvider>> {
    let api_key = config
        .llm_api_key
        .as_ref()
        .map(|k| k.expose_secret().to_string());

    let backend = std::env::var("CODERISK_LLM_BACKEND").unwrap_or_else(|_| "anthropic".to_string());

    match backend.as_str() {
        "anthropic" => {
            let Some(api_key) = api_key else {
                bail!("LLM_API_KEY must be set to use the Anthropic provider");
            };
            let cfg = coderisk_ai::anthropic_provider::AnthropicConfig {
                api_key,
                ..Default::default()
            };
            Ok(Box::new(coderisk_ai::anthropic_provider::AnthropicProvider::new(cfg)?))
        }
        "openai-compatible" => {
            let cfg = coderisk_ai::openai_compatible_provider::OpenAICompatibleConfig {
                api_key,
                ..Default::default()
            };
            Ok(Box::new(
                coderisk_ai::openai_compatible_provider::OpenAICompatibleProvider::new(cfg)?,
            ))
        }
        other => bail!("unknown CODERISK_LLM_BACKEND: {other}"),
    }
}
