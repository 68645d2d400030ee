//! Runtime configuration model.
//!
//! Loaded by `infrastructure::config::ConfigLoader` with hierarchical
//! merging (defaults, project YAML, local overrides, environment).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub registry: RegistryConfig,
    pub http: HttpConfig,
    pub logging: LogConfig,
}

/// Identity of the local node within the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Stable node uuid; generated fresh when not configured.
    pub uuid: String,
    pub hostname: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            uuid: Uuid::new_v4().to_string(),
            hostname: "127.0.0.1".to_string(),
        }
    }
}

/// Task registry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How long a long-poll waits before returning the current snapshot.
    pub wait_timeout_secs: u64,
}

impl RegistryConfig {
    pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 20;
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            wait_timeout_secs: Self::DEFAULT_WAIT_TIMEOUT_SECS,
        }
    }
}

/// HTTP status surface binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9100,
            enable_cors: false,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of: trace, debug, info, warn, error.
    pub level: String,
    /// One of: json, pretty.
    pub format: String,
    /// When set, logs additionally go to daily-rotated files here.
    pub log_dir: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            log_dir: None,
        }
    }
}
