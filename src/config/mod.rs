//! Configuration management for radium

use crate::llm::{DEFAULT_BASE_URL, DEFAULT_FALLBACK_MODEL, PLACEHOLDER_API_KEY, PROVIDER_NAME};
use crate::llm::ModelId;
use crate::mode::DEPLOY_PREFIX;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub radium: RadiumConfig,
    pub mode: ModeConfig,
    pub logging: LoggingConfig,
}

/// Inference server connection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RadiumConfig {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    /// Suggested by the error classifier when a call fails
    pub fallback_model: String,
    pub max_tokens: Option<u32>,
}

impl Default for RadiumConfig {
    fn default() -> Self {
        Self {
            name: PROVIDER_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model: ModelId::LLAMA_2_7B_CHAT.to_string(),
            fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
            max_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModeConfig {
    /// Paths starting with this prefix are in deploy mode
    pub deploy_prefix: String,
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self {
            deploy_prefix: DEPLOY_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log request and response bodies of every inference call
    pub log_http_traffic: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_http_traffic: true,
        }
    }
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "radium")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_fixed_endpoint() {
        let config = Config::default();
        assert_eq!(config.radium.name, "radium-llm");
        assert_eq!(
            config.radium.base_url,
            "http://llm-inference.radium.cloud:8001/v1"
        );
        assert_eq!(config.radium.api_key, "empty");
        assert_eq!(config.radium.model, "/models/meta-llama/Llama-2-7b-chat-hf");
        assert_eq!(config.radium.fallback_model, "chat-model");
        assert_eq!(config.mode.deploy_prefix, "/deploy");
        assert!(config.logging.log_http_traffic);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[radium]
base_url = "http://localhost:8001/v1"
fallback_model = "gpt-4o-mini"

[logging]
log_http_traffic = false
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.radium.base_url, "http://localhost:8001/v1");
        assert_eq!(config.radium.fallback_model, "gpt-4o-mini");
        assert_eq!(config.radium.api_key, "empty");
        assert_eq!(config.mode, ModeConfig::default());
        assert!(!config.logging.log_http_traffic);
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "radium = 3").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid config file"));
    }
}
