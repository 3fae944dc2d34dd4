//! Configuration for the replication engine.
//!
//! Configuration is passed to the engine components at construction and
//! can be built programmatically, deserialized from JSON/YAML, or loaded
//! from the process environment (the deployment path: the service key
//! and API token are supplied via env vars and never appear on the
//! wire).
//!
//! # Quick Start
//!
//! ```rust
//! use repo_replicator::config::EngineConfig;
//!
//! let config = EngineConfig {
//!     ..EngineConfig::for_testing()
//! };
//! assert_eq!(config.registry.sqlite_path, ":memory:");
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! EngineConfig
//! ├── host: HostConfig          # Hosted-repo API (base URL, token, timeout)
//! ├── registry: RegistryConfig  # SQLite repository store
//! └── http: HttpConfig          # RPC endpoint bind address
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Maps to | Default |
//! |----------|---------|---------|
//! | `GITHUB_ACCESS_TOKEN` | `host.token` | required |
//! | `GITHUB_API_URL` | `host.api_url` | `https://api.github.com` |
//! | `HTTP_TIMEOUT` | `host.request_timeout` | `30s` |
//! | `REGISTRY_DB_PATH` | `registry.sqlite_path` | `repositories.db` |
//! | `BIND_ADDR` | `http.bind_addr` | `0.0.0.0:8787` |

use crate::error::{ReplicationError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The top-level config object for the replication service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Hosted-repo API client settings.
    #[serde(default)]
    pub host: HostConfig,

    /// Repository registry persistence settings.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub http: HttpConfig,
}

impl EngineConfig {
    /// Load configuration from the process environment.
    ///
    /// Fails with `Config` if the access token is absent — there is no
    /// unauthenticated mode against the hosted-repo API.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("GITHUB_ACCESS_TOKEN")
            .map_err(|_| ReplicationError::Config("GITHUB_ACCESS_TOKEN not set".to_string()))?;

        let mut config = Self {
            host: HostConfig {
                token,
                ..HostConfig::default()
            },
            ..Self::default()
        };

        if let Ok(url) = std::env::var("GITHUB_API_URL") {
            config.host.api_url = url;
        }
        if let Ok(timeout) = std::env::var("HTTP_TIMEOUT") {
            config.host.request_timeout = timeout;
        }
        if let Ok(path) = std::env::var("REGISTRY_DB_PATH") {
            config.registry.sqlite_path = path;
        }
        if let Ok(addr) = std::env::var("BIND_ADDR") {
            config.http.bind_addr = addr;
        }

        Ok(config)
    }

    /// Create a minimal config for testing (in-memory registry, dummy token).
    pub fn for_testing() -> Self {
        Self {
            host: HostConfig {
                token: "test-token".to_string(),
                ..HostConfig::default()
            },
            registry: RegistryConfig::in_memory(),
            http: HttpConfig::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HostConfig: hosted-repo API client
// ═══════════════════════════════════════════════════════════════════════════════

/// Hosted-repo API client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Base URL of the host's REST API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Access token sent as a bearer credential on every request.
    /// Loaded from `GITHUB_ACCESS_TOKEN`; never serialized back out.
    #[serde(default, skip_serializing)]
    pub token: String,

    /// Per-request timeout as a duration string (e.g. "30s").
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    /// User-Agent header. The host rejects requests without one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// How many recent commits to fetch when resolving a repository.
    #[serde(default = "default_commit_page_size")]
    pub commit_page_size: usize,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

fn default_user_agent() -> String {
    concat!("repo-replicator/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_commit_page_size() -> usize {
    5
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: String::new(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            commit_page_size: 5,
        }
    }
}

impl HostConfig {
    /// Parse the request_timeout string to a Duration.
    pub fn request_timeout_duration(&self) -> Duration {
        humantime::parse_duration(&self.request_timeout).unwrap_or(Duration::from_secs(30))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RegistryConfig: repository record persistence
// ═══════════════════════════════════════════════════════════════════════════════

/// Repository registry persistence configuration.
///
/// Records are stored in SQLite so the fleet survives service restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Path to SQLite database for repository records.
    pub sqlite_path: String,

    /// Whether to use WAL mode for SQLite (recommended).
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "repositories.db".to_string(),
            wal_mode: true,
        }
    }
}

impl RegistryConfig {
    /// Create an in-memory config for testing.
    pub fn in_memory() -> Self {
        Self {
            sqlite_path: ":memory:".to_string(),
            wal_mode: false,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HttpConfig: RPC endpoint
// ═══════════════════════════════════════════════════════════════════════════════

/// HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Socket address the RPC endpoint binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8787".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
