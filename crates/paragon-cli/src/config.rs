//! Configuration loading from TOML files

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use paragon_core::retry::DEFAULT_MAX_RETRIES;
use paragon_match::QUERY_MAX_LEN;

/// Global configuration for paragon
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub store: StoreConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(deserialize_with = "deserialize_env_var")]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: std::env::var("PARAGON_API_KEY").ok(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Record store location; defaults to the user cache directory.
    pub dir: Option<PathBuf>,
}

impl StoreConfig {
    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.dir {
            return Ok(dir.clone());
        }
        directories::ProjectDirs::from("", "", "paragon")
            .map(|dirs| dirs.cache_dir().join("store"))
            .context("cannot determine a store directory; set store.dir in the config")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Target length of one publication-regularity chunk, in years.
    pub chunk_size: u16,
    pub max_query_len: usize,
    pub max_retries: u32,
    /// Where to download the source reference table from.
    pub source_table_url: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 2,
            max_query_len: QUERY_MAX_LEN,
            max_retries: DEFAULT_MAX_RETRIES,
            source_table_url: String::new(),
        }
    }
}

/// Deserialize a string that may contain environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to environment variable value
fn expand_env_var(s: &str) -> Option<String> {
    if let Some(var_name) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        std::env::var(var_name).ok()
    } else {
        Some(s.to_string())
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./paragon.toml (current directory)
    /// 2. ~/.config/paragon/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("paragon.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "paragon") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.search.chunk_size, 2);
        assert_eq!(config.search.max_query_len, QUERY_MAX_LEN);
        assert!(config.api.base_url.is_empty());
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("TEST_PARAGON_VAR", "test_value");
        assert_eq!(
            expand_env_var("${TEST_PARAGON_VAR}"),
            Some("test_value".to_string())
        );
        std::env::remove_var("TEST_PARAGON_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[api]
base_url = "https://api.example.org/v1"
timeout_secs = 30

[store]
dir = "/tmp/paragon-store"

[search]
chunk_size = 3
source_table_url = "https://example.org/sources.json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.org/v1");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.store.dir, Some(PathBuf::from("/tmp/paragon-store")));
        assert_eq!(config.search.chunk_size, 3);
    }
}
