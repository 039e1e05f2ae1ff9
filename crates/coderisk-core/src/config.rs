use secrecy::SecretString;
use serde::Deserialize;

/// Connection and budget configuration, layered the way
/// `codegraph-core::config` layers its settings: defaults, then a config
/// file, then environment variables (`KG_URI`, `KG_PASSWORD`, `RS_DSN`,
/// `LLM_API_KEY`). None of these are ever logged.
#[derive(Debug, Clone, Deserialize)]
pub struct CoreRiskConfig {
    #[serde(default)]
    pub kg_uri: String,
    #[serde(skip)]
    pub kg_password: Option<SecretString>,
    #[serde(default)]
    pub rs_dsn: String,
    #[serde(skip)]
    pub llm_api_key: Option<SecretString>,

    #[serde(default)]
    pub phase1: Phase1Config,
    #[serde(default)]
    pub agent: AgentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Phase1Config {
    pub cochange_window_days: u32,
    pub incident_window_days: u32,
    pub coupling_limit: u32,
}

impl Default for Phase1Config {
    fn default() -> Self {
        Self {
            cochange_window_days: 90,
            incident_window_days: 180,
            coupling_limit: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub max_hops: u32,
    pub max_tokens: u64,
    pub max_stalls: u32,
    pub full_pipeline_deadline_secs: u64,
    pub phase1_only_deadline_millis: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_hops: 5,
            max_tokens: 20_000,
            max_stalls: 2,
            full_pipeline_deadline_secs: 6,
            phase1_only_deadline_millis: 500,
        }
    }
}

impl CoreRiskConfig {
    /// Load configuration from `coderisk.toml` (if present) overlaid with
    /// environment variables, mirroring `codegraph-core::config`'s use of
    /// the `config` crate for layered sources.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_dotenv();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("coderisk").required(false))
            .add_source(
                config::Environment::with_prefix("CODERISK")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings = builder
            .build()
            .map_err(|e| crate::error::CoreRiskError::Config(e.to_string()))?;

        let mut this: CoreRiskConfig = settings
            .try_deserialize()
            .map_err(|e| crate::error::CoreRiskError::Config(e.to_string()))?;

        this.kg_password = std::env::var("KG_PASSWORD").ok().map(SecretString::from);
        this.llm_api_key = std::env::var("LLM_API_KEY").ok().map(SecretString::from);

        if let Ok(uri) = std::env::var("KG_URI") {
            this.kg_uri = uri;
        }
        if let Ok(dsn) = std::env::var("RS_DSN") {
            this.rs_dsn = dsn;
        }

        if this.kg_uri.is_empty() || this.rs_dsn.is_empty() {
            return Err(crate::error::CoreRiskError::Config(
                "KG_URI and RS_DSN must both be set".to_string(),
            ));
        }

        Ok(this)
    }

    /// Loads a `.env` file from the current directory, falling back to
    /// `~/.coderisk.env`, before the layered sources are read. Mirrors
    /// `codegraph-core::ConfigManager::load_dotenv`'s two-location lookup.
    /// Never treated as fatal — a missing or unreadable file just means the
    /// environment variables it would have set stay unset.
    fn load_dotenv() {
        use std::path::Path;

        if Path::new(".env").exists() {
            if let Err(e) = dotenv::from_filename(".env") {
                tracing::warn!(error = %e, "failed to load .env file");
            }
            return;
        }

        if let Some(home) = dirs::home_dir() {
            let home_env = home.join(".coderisk.env");
            if home_env.exists() {
                if let Err(e) = dotenv::from_path(&home_env) {
                    tracing::warn!(error = %e, "failed to load ~/.coderisk.env");
                }
            }
        }
    }
}
