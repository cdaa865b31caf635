use std::path::{Path, PathBuf};
use serde::Deserialize;
use anyhow::{Context, Result};
use shared::protocol::DEFAULT_FIND_TIMEOUT_MS;
use shared::types::PublishEntry;

/// Where packages install the bundled `services/` registry; used when no path
/// is configured
pub const DEFAULT_REGISTRY_PATH: &str = "/usr/share/discoverable-services/services";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub publish: Vec<PublishEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Identifiers or tags browsed for once at startup
    #[serde(default)]
    pub find: Vec<String>,
}

fn default_registry_path() -> PathBuf {
    PathBuf::from(DEFAULT_REGISTRY_PATH)
}

fn default_timeout_ms() -> u64 {
    DEFAULT_FIND_TIMEOUT_MS
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            find: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.registry.path, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert_eq!(config.discovery.timeout_ms, 2000);
        assert!(config.discovery.find.is_empty());
        assert!(config.publish.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [registry]
            path = "/srv/services"

            [discovery]
            timeout_ms = 500
            find = ["ssh", "_http._tcp"]

            [[publish]]
            identifier = "ssh"
            name = "dev1"
            port = 22

            [[publish]]
            identifier = "resin-ssh"
            name = "dev2"
            host = "server1.local"
            txt = { version = "1" }
            "#,
        )
        .unwrap();

        assert_eq!(config.registry.path, PathBuf::from("/srv/services"));
        assert_eq!(config.discovery.timeout_ms, 500);
        assert_eq!(config.discovery.find, vec!["ssh", "_http._tcp"]);
        assert_eq!(config.publish.len(), 2);
        assert_eq!(config.publish[0].port, Some(22));
        assert_eq!(config.publish[1].port, None);
        assert_eq!(config.publish[1].host.as_deref(), Some("server1.local"));
        assert_eq!(config.publish[1].txt.get("version").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = Config::load("/nonexistent/discoverabled.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
