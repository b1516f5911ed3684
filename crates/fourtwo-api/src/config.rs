//! Server configuration: optional YAML file, then environment overrides
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::fs;

pub const CONFIG_ENV: &str = "FOURTWO_CONFIG";
pub const ADDR_ENV: &str = "FOURTWO_ADDR";
pub const LOG_ENV: &str = "FOURTWO_LOG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Listen address
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Fallback tracing filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_addr() -> String {
    "0.0.0.0:8787".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            log_level: default_log_level(),
        }
    }
}

impl ApiConfig {
    /// Defaults, then the file named by `FOURTWO_CONFIG`, then
    /// `FOURTWO_ADDR` / `FOURTWO_LOG`.
    pub fn load() -> Result<Self, ApiError> {
        let base = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let content = fs::read_to_string(&path)
                    .map_err(|source| ApiError::ConfigRead { path, source })?;
                Self::from_yaml(&content)?
            }
            Err(_) => Self::default(),
        };
        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_yaml(content: &str) -> Result<Self, ApiError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ADDR_ENV).filter(|v| !v.trim().is_empty()) {
            self.addr = addr;
        }
        if let Some(level) = lookup(LOG_ENV).filter(|v| !v.trim().is_empty()) {
            self.log_level = level;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_yaml("").unwrap();
        assert_eq!(config.addr, "0.0.0.0:8787");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = ApiConfig::from_yaml("addr: 127.0.0.1:9000\n").unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_env_overrides_file() {
        let config = ApiConfig::from_yaml("addr: 127.0.0.1:9000\nlog_level: warn\n")
            .unwrap()
            .with_overrides(|key| match key {
                ADDR_ENV => Some("127.0.0.1:7000".to_string()),
                LOG_ENV => Some("   ".to_string()),
                _ => None,
            });
        assert_eq!(config.addr, "127.0.0.1:7000");
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        assert!(matches!(
            ApiConfig::from_yaml("addr: [unterminated"),
            Err(ApiError::ConfigParse(_))
        ));
    }
}
