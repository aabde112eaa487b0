//! Runtime configuration.
//!
//! Loaded from YAML. Every section has defaults, so an empty file (or no
//! file at all) yields a working configuration that only lacks credentials.
//! Durations are written in human form: `2500ms`, `15s`, `1h`.
//!
//! ```yaml
//! server:
//!   bind: 0.0.0.0:8080
//! upstream:
//!   api_key: "..."            # or DATA_GO_KR_API_KEY
//!   service_key_encoded: true
//!   timeout: 2500ms
//! generator:
//!   provider: gemini          # or "disabled"
//!   model: gemini-1.5-flash
//! store:
//!   path: ./ecosort-store.json
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::providers::secrets::{ApiCredential, DATA_GO_KR_API_KEY_ENV, GEMINI_API_KEY_ENV};
use crate::providers::DEFAULT_GEMINI_BASE_URL;
use crate::resilience::{CircuitBreakerConfig, RetryPolicy};

/// Errors from loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level runtime configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub generator: GeneratorConfig,
    pub circuit_breaker: CircuitBreakerConfig,
    pub retry: RetryPolicy,
    pub cache: CacheConfig,
    pub rules: RulesConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Public data portal access.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_key: Option<ApiCredential>,
    /// The key was copied in its URL-encoded form and goes on the wire as is.
    pub service_key_encoded: bool,
    #[serde(deserialize_with = "duration_human::deserialize")]
    pub timeout: Duration,
    pub page_size: u32,
    pub classification_endpoint: String,
    pub collection_endpoint: String,
    /// No default; the region-rule gateway stays off unless set.
    pub region_rules_endpoint: Option<String>,
    pub holiday_endpoint: String,
    /// Local government fee list; the bundled fee table is used when unset.
    pub fee_endpoint: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            service_key_encoded: true,
            timeout: Duration::from_millis(2500),
            page_size: 10,
            classification_endpoint:
                "https://apis.data.go.kr/1482000/WasteRecyclingService/getRecycleList".to_string(),
            collection_endpoint:
                "https://apis.data.go.kr/1482000/WasteRecyclingService/getCollectionPointList"
                    .to_string(),
            region_rules_endpoint: None,
            holiday_endpoint:
                "https://apis.data.go.kr/B090041/openapi/service/SpcdeInfoService/getRestDeInfo"
                    .to_string(),
            fee_endpoint: None,
        }
    }
}

/// Generative provider settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `gemini` or `disabled`
    pub provider: String,
    pub api_key: Option<ApiCredential>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    #[serde(deserialize_with = "duration_human::deserialize")]
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.4,
            max_output_tokens: 1024,
            timeout: Duration::from_secs(15),
        }
    }
}

impl GeneratorConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Classification result cache.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_entries: u64,
    #[serde(deserialize_with = "duration_human::deserialize")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Local datasets. The bundled tables are used when a path is unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub path: Option<PathBuf>,
    pub fees_path: Option<PathBuf>,
}

/// Key-value store. In memory when `path` is unset.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

impl RuntimeConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: RuntimeConfig = if yaml.trim().is_empty() {
            RuntimeConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "upstream.timeout must be greater than zero".to_string(),
            ));
        }
        if self.generator.timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "generator.timeout must be greater than zero".to_string(),
            ));
        }
        if self.upstream.page_size == 0 {
            return Err(ConfigError::Invalid(
                "upstream.page_size must be at least 1".to_string(),
            ));
        }

        let endpoints = [
            ("upstream.classification_endpoint", Some(&self.upstream.classification_endpoint)),
            ("upstream.collection_endpoint", Some(&self.upstream.collection_endpoint)),
            ("upstream.region_rules_endpoint", self.upstream.region_rules_endpoint.as_ref()),
            ("upstream.holiday_endpoint", Some(&self.upstream.holiday_endpoint)),
            ("upstream.fee_endpoint", self.upstream.fee_endpoint.as_ref()),
            ("generator.base_url", Some(&self.generator.base_url)),
        ];
        for (field, url) in endpoints {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ConfigError::Invalid(format!(
                        "{} must start with http:// or https://",
                        field
                    )));
                }
            }
        }

        match self.generator.provider.as_str() {
            "gemini" | "disabled" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown generator.provider '{}' (expected 'gemini' or 'disabled')",
                    other
                )))
            }
        }

        Ok(())
    }

    /// Data portal key from config or `DATA_GO_KR_API_KEY`.
    pub fn data_credential(&self) -> Option<ApiCredential> {
        ApiCredential::from_config_or_env(
            self.upstream.api_key.as_ref(),
            DATA_GO_KR_API_KEY_ENV,
            "Data portal API key",
        )
    }

    /// Gemini key from config or `GOOGLE_GEMINI_API_KEY`.
    pub fn generator_credential(&self) -> Option<ApiCredential> {
        ApiCredential::from_config_or_env(
            self.generator.api_key.as_ref(),
            GEMINI_API_KEY_ENV,
            "Gemini API key",
        )
    }
}

/// `Duration` as a humantime string ("2500ms", "15s").
pub(crate) mod duration_human {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}
