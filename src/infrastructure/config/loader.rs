use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Node uuid cannot be empty")]
    EmptyNodeUuid,

    #[error("Invalid wait_timeout_secs: {0}. Must be between 1 and 300")]
    InvalidWaitTimeout(u64),

    #[error("Invalid http port: 0")]
    InvalidHttpPort,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .helmsman/config.yaml (project config)
    /// 3. .helmsman/local.yaml (local overrides, optional)
    /// 4. Environment variables (HELMSMAN_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".helmsman/config.yaml"))
            .merge(Yaml::file(".helmsman/local.yaml"))
            .merge(Env::prefixed("HELMSMAN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.node.uuid.is_empty() {
            return Err(ConfigError::EmptyNodeUuid);
        }

        if config.registry.wait_timeout_secs == 0 || config.registry.wait_timeout_secs > 300 {
            return Err(ConfigError::InvalidWaitTimeout(
                config.registry.wait_timeout_secs,
            ));
        }

        if config.http.port == 0 {
            return Err(ConfigError::InvalidHttpPort);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(ConfigLoader::validate(&config).is_ok());
        assert_eq!(config.registry.wait_timeout_secs, 20);
        assert_eq!(config.http.port, 9100);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "node:\n  uuid: node-a\n  hostname: host-a\nregistry:\n  wait_timeout_secs: 5"
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.node.uuid, "node-a");
        assert_eq!(config.node.hostname, "host-a");
        assert_eq!(config.registry.wait_timeout_secs, 5);
        // Untouched sections keep their defaults.
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        use crate::domain::models::config::{LogConfig, NodeConfig, RegistryConfig};

        let config = Config {
            registry: RegistryConfig { wait_timeout_secs: 0 },
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidWaitTimeout(0))
        ));

        let config = Config {
            node: NodeConfig { uuid: String::new(), hostname: "h".to_string() },
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyNodeUuid)
        ));

        let config = Config {
            logging: LogConfig { level: "verbose".to_string(), ..LogConfig::default() },
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogLevel(_))
        ));

        let config = Config {
            logging: LogConfig { format: "xml".to_string(), ..LogConfig::default() },
            ..Config::default()
        };
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }
}
