use crate::models::Deliverability;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub services: ServicesConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServicesConfig {
    /// Hard timeout applied to every external-service call. All three
    /// backends are third-party network calls with unbounded latency.
    pub request_timeout_seconds: u64,
    /// Feature flag: attempt LinkedIn verification at all.
    pub linkedin_verification: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub promotion_rule: PromotionRule,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// When a scored profile is promoted to the verified store automatically.
/// The original policy (`any_signal`) promotes on a single weak signal and
/// may over-promote, so it stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionRule {
    /// Domain match OR a deliverable verdict.
    AnySignal,
    /// Domain match AND a deliverable verdict.
    AllSignals,
    /// Never promote automatically; manual approval only.
    Disabled,
}

impl PromotionRule {
    pub fn satisfied_by(&self, domain_match: bool, deliverability: Deliverability) -> bool {
        let deliverable = deliverability == Deliverability::Deliverable;
        match self {
            PromotionRule::AnySignal => domain_match || deliverable,
            PromotionRule::AllSignals => domain_match && deliverable,
            PromotionRule::Disabled => false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            services: ServicesConfig {
                request_timeout_seconds: 30,
                linkedin_verification: true,
            },
            pipeline: PipelineConfig {
                promotion_rule: PromotionRule::AnySignal,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
            database: DatabaseConfig {
                path: "data/pipeline.db".to_string(),
            },
        }
    }
}

pub async fn load_config(path: &str) -> crate::error::Result<Config> {
    let content = tokio::fs::read_to_string(path).await?;
    let config: Config = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Credentials for one external HTTP backend.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub base_url: String,
    pub token: String,
}

impl ServiceEndpoint {
    /// Reads `<PREFIX>_API_URL` / `<PREFIX>_API_TOKEN` from the environment.
    /// Returns `None` when the backend is not configured; the caller decides
    /// the fallback (built-in backend or disabled feature).
    fn from_env(prefix: &str) -> Option<Self> {
        let base_url = std::env::var(format!("{prefix}_API_URL")).ok()?;
        let token = std::env::var(format!("{prefix}_API_TOKEN")).unwrap_or_default();
        Some(Self { base_url, token })
    }
}

/// Environment-sourced credentials for the three external services plus the
/// optional mail source. Loaded once in `main` after dotenv.
#[derive(Debug, Clone, Default)]
pub struct ServiceCredentials {
    pub extraction: Option<ServiceEndpoint>,
    pub profile_lookup: Option<ServiceEndpoint>,
    pub deliverability: Option<ServiceEndpoint>,
    pub gmail_access_token: Option<String>,
}

impl ServiceCredentials {
    pub fn from_env() -> Self {
        Self {
            extraction: ServiceEndpoint::from_env("EXTRACTION"),
            profile_lookup: ServiceEndpoint::from_env("PROFILE_LOOKUP"),
            deliverability: ServiceEndpoint::from_env("DELIVERABILITY"),
            gmail_access_token: std::env::var("GMAIL_ACCESS_TOKEN").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_rules() {
        let any = PromotionRule::AnySignal;
        assert!(any.satisfied_by(true, Deliverability::Undeliverable));
        assert!(any.satisfied_by(false, Deliverability::Deliverable));
        assert!(!any.satisfied_by(false, Deliverability::Risky));

        let all = PromotionRule::AllSignals;
        assert!(all.satisfied_by(true, Deliverability::Deliverable));
        assert!(!all.satisfied_by(true, Deliverability::Risky));

        assert!(!PromotionRule::Disabled.satisfied_by(true, Deliverability::Deliverable));
    }

    #[test]
    fn config_yaml_round_trip() {
        let yaml = r#"
services:
  request_timeout_seconds: 10
  linkedin_verification: false
pipeline:
  promotion_rule: all_signals
logging:
  level: debug
database:
  path: /tmp/test.db
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.services.request_timeout_seconds, 10);
        assert!(!config.services.linkedin_verification);
        assert_eq!(config.pipeline.promotion_rule, PromotionRule::AllSignals);
    }
}
