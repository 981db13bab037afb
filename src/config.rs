use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

use crate::record::DecodePolicy;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Bridge configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Gremlin server WebSocket endpoints, used round-robin
    #[validate(
        length(min = 1, message = "At least one Gremlin server URL is required"),
        custom(function = "validate_gremlin_urls")
    )]
    pub gremlin_urls: Vec<String>,

    /// What to do with object store columns that fail to decode
    pub decode_policy: DecodePolicy,

    /// Resources imported concurrently by a batch sync
    #[validate(range(
        min = 1,
        max = 256,
        message = "Sync concurrency must be between 1 and 256"
    ))]
    pub sync_concurrency: usize,

    /// Age in seconds after which a vertex not re-imported is reported stale
    #[validate(range(min = 1, message = "Stale threshold must be at least one second"))]
    pub stale_after_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            gremlin_urls: vec!["ws://localhost:8182/gremlin".to_string()],
            decode_policy: DecodePolicy::Strict,
            sync_concurrency: 16,
            stale_after_secs: 300,
        }
    }
}

impl BridgeConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let urls = env::var("CONTRAIL_GREMLIN_URLS")
            .unwrap_or_else(|_| "ws://localhost:8182/gremlin".to_string());
        let config = Self {
            gremlin_urls: split_urls(&urls),
            decode_policy: parse_env_var("CONTRAIL_GREMLIN_DECODE_POLICY", "strict")?,
            sync_concurrency: parse_env_var("CONTRAIL_GREMLIN_SYNC_CONCURRENCY", "16")?,
            stale_after_secs: parse_env_var("CONTRAIL_GREMLIN_STALE_AFTER_SECS", "300")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides and validate the result
    pub fn merge(mut self, cli: CliConfig) -> Result<Self, ConfigError> {
        if !cli.gremlin_urls.is_empty() {
            self.gremlin_urls = cli.gremlin_urls;
        }
        if let Some(policy) = cli.decode_policy {
            self.decode_policy = policy;
        }
        if let Some(concurrency) = cli.sync_concurrency {
            self.sync_concurrency = concurrency;
        }
        if let Some(secs) = cli.stale_after_secs {
            self.stale_after_secs = secs;
        }

        self.validate()?;
        Ok(self)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug, Default)]
pub struct CliConfig {
    pub gremlin_urls: Vec<String>,
    pub decode_policy: Option<DecodePolicy>,
    pub sync_concurrency: Option<usize>,
    pub stale_after_secs: Option<u64>,
}

fn split_urls(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

fn validate_gremlin_urls(urls: &[String]) -> Result<(), ValidationError> {
    for url in urls {
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            let mut error = ValidationError::new("gremlin_url_scheme");
            error.message = Some(format!("`{}` is not a ws:// or wss:// URL", url).into());
            return Err(error);
        }
    }
    Ok(())
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
