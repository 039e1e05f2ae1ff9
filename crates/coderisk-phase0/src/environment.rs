use coderisk_core::RiskLevel;

const CONFIG_EXTENSIONS: &[&str] = &[
    "yaml", "yml", "json", "toml", "ini", "conf", "config", "properties", "xml", "env",
];

const CONFIG_BASENAMES: &[&str] = &[
    "dockerfile",
    "docker-compose",
    "makefile",
    "tsconfig",
    "webpack.config",
];

const CONFIG_ROOT_MARKERS: &[&str] = &["config/", "configs/", ".github/", "deploy/", "infra/"];

const PRODUCTION_PATTERNS: &[&str] = &["prod", "production"];
const STAGING_PATTERNS: &[&str] = &["stage", "staging"];
const TEST_PATTERNS: &[&str] = &["test", "testing", "qa"];
const DEVELOPMENT_PATTERNS: &[&str] = &["dev", "development", "local"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Staging,
    Test,
    Development,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentFinding {
    pub is_config_file: bool,
    pub environment: Option<Environment>,
    pub risk: RiskLevel,
    pub force_escalate: bool,
}

pub fn classify(path: &str) -> EnvironmentFinding {
    if !is_config_file(path) {
        return EnvironmentFinding {
            is_config_file: false,
            environment: None,
            risk: RiskLevel::Minimal,
            force_escalate: false,
        };
    }

    let env = classify_environment(path);
    let (risk, force_escalate) = match env {
        Environment::Production => (RiskLevel::Critical, true),
        Environment::Staging => (RiskLevel::High, true),
        Environment::Unknown => (RiskLevel::High, true),
        Environment::Test | Environment::Development => (RiskLevel::Low, false),
    };

    EnvironmentFinding {
        is_config_file: true,
        environment: Some(env),
        risk,
        force_escalate,
    }
}

fn is_config_file(path: &str) -> bool {
    let lower = path.to_lowercase();
    let file_name = lower.rsplit('/').next().unwrap_or(&lower);
    let stem = file_name.split('.').next().unwrap_or(file_name);

    // `.env`, `.env.production`, `.env.local`, ... are dotfiles named for
    // their own "env" extension rather than suffixed with one; a plain
    // rsplit('.') reads the environment-qualifier suffix as the extension
    // instead, so dotenv files get their own check ahead of it.
    if file_name == "env" || file_name.starts_with(".env") {
        return true;
    }
    if let Some(ext) = file_name.rsplit('.').next() {
        if file_name.contains('.') && CONFIG_EXTENSIONS.contains(&ext) {
            return true;
        }
    }
    if CONFIG_BASENAMES.iter().any(|b| stem.starts_with(b)) {
        return true;
    }
    CONFIG_ROOT_MARKERS.iter().any(|m| lower.contains(m))
}

/// Precedence order matters: production beats staging beats test beats
/// development, so a path like `config/test-production.yaml` reads as
/// production.
fn classify_environment(path: &str) -> Environment {
    let lower = path.to_lowercase();
    if PRODUCTION_PATTERNS.iter().any(|p| lower.contains(p)) {
        Environment::Production
    } else if STAGING_PATTERNS.iter().any(|p| lower.contains(p)) {
        Environment::Staging
    } else if TEST_PATTERNS.iter().any(|p| lower.contains(p)) {
        Environment::Test
    } else if DEVELOPMENT_PATTERNS.iter().any(|p| lower.contains(p)) {
        Environment::Development
    } else {
        Environment::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_env_file_is_critical_and_forced() {
        let finding = classify(".env.production");
        assert_eq!(finding.risk, RiskLevel::Critical);
        assert!(finding.force_escalate);
        assert_eq!(finding.environment, Some(Environment::Production));
    }

    #[test]
    fn staging_config_is_high_and_forced() {
        let finding = classify("config/staging.yaml");
        assert_eq!(finding.risk, RiskLevel::High);
        assert!(finding.force_escalate);
    }

    #[test]
    fn unknown_environment_config_is_high_safety_first() {
        let finding = classify("config/settings.yaml");
        assert_eq!(finding.risk, RiskLevel::High);
        assert!(finding.force_escalate);
    }

    #[test]
    fn dev_config_is_low_without_forced_escalation() {
        let finding = classify("config/development.yaml");
        assert_eq!(finding.risk, RiskLevel::Low);
        assert!(!finding.force_escalate);
    }

    #[test]
    fn non_config_file_is_not_flagged() {
        let finding = classify("src/main.rs");
        assert!(!finding.is_config_file);
        assert_eq!(finding.risk, RiskLevel::Minimal);
    }
}
