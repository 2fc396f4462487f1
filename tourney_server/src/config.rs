//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tourney::RetryPolicy;
use tourney::db::DatabaseConfig;

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Where settlement state lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// Process-local state, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND".to_string(),
                reason: format!("Unknown backend '{other}', expected 'postgres' or 'memory'"),
            }),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Postgres => write!(f, "postgres"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

/// Settlement retry configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementConfig {
    /// Attempts per operation, including the first
    pub max_attempts: u32,
    /// Initial backoff after a conflict
    pub backoff_ms: u64,
}

impl SettlementConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.backoff_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Values given on the command line, taking precedence over the environment
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub backend: Option<StorageBackend>,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Storage backend
    pub backend: StorageBackend,
    /// Database configuration (used by the postgres backend)
    pub database: DatabaseConfig,
    /// Insert the demo players at startup
    pub seed_demo_players: bool,
    pub settlement: SettlementConfig,
    /// Prometheus exporter address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `overrides` - Values from CLI args
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        Self::from_lookup(overrides, |key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup<F>(overrides: CliOverrides, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = match overrides.bind {
            Some(bind) => bind,
            None => parse_var(&lookup, "SERVER_BIND")?.unwrap_or_else(default_bind),
        };

        let backend = match overrides.backend {
            Some(backend) => backend,
            None => parse_var(&lookup, "STORAGE_BACKEND")?.unwrap_or(StorageBackend::Postgres),
        };

        let mut database = DatabaseConfig::from_lookup(&lookup);
        if let Some(url) = overrides.database_url {
            database.database_url = url;
        }

        let settlement = SettlementConfig {
            max_attempts: parse_or(&lookup, "SETTLEMENT_MAX_ATTEMPTS", 5),
            backoff_ms: parse_or(&lookup, "SETTLEMENT_BACKOFF_MS", 10),
        };

        Ok(ServerConfig {
            bind,
            backend,
            database,
            seed_demo_players: parse_or(&lookup, "SEED_DEMO_PLAYERS", false),
            settlement,
            metrics_bind: parse_var(&lookup, "METRICS_BIND")?,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Returns
    ///
    /// * `Result<(), ConfigError>` - Success or validation error
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settlement.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                var: "SETTLEMENT_MAX_ATTEMPTS".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }

        if self.backend == StorageBackend::Postgres && self.database.database_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                var: "DATABASE_URL".to_string(),
                hint: "Set a PostgreSQL URL or use STORAGE_BACKEND=memory".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: format!("Must differ from server bind address ({})", self.bind),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {var}\nHint: {hint}")]
    MissingRequired { var: String, hint: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Parse a variable that must be valid when present
fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var: key.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Helper to parse a variable with default fallback
fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)], overrides: CliOverrides) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(overrides, |k| vars.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[], CliOverrides::default()).unwrap();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.backend, StorageBackend::Postgres);
        assert!(!config.seed_demo_players);
        assert_eq!(config.settlement.max_attempts, 5);
        assert!(config.metrics_bind.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_cli_overrides_environment() {
        let overrides = CliOverrides {
            bind: Some("0.0.0.0:9000".parse().unwrap()),
            database_url: Some("postgres://cli/db".to_string()),
            backend: Some(StorageBackend::Memory),
        };
        let config = load(
            &[
                ("SERVER_BIND", "127.0.0.1:1"),
                ("DATABASE_URL", "postgres://env/db"),
                ("STORAGE_BACKEND", "postgres"),
            ],
            overrides,
        )
        .unwrap();

        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.database.database_url, "postgres://cli/db");
        assert_eq!(config.backend, StorageBackend::Memory);
    }

    #[test]
    fn test_invalid_bind_is_rejected() {
        let err = load(&[("SERVER_BIND", "not-an-address")], CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref var, .. } if var == "SERVER_BIND"));
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let err = load(&[("STORAGE_BACKEND", "redis")], CliOverrides::default()).unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn test_settlement_vars_build_retry_policy() {
        let config = load(
            &[
                ("SETTLEMENT_MAX_ATTEMPTS", "3"),
                ("SETTLEMENT_BACKOFF_MS", "25"),
                ("SEED_DEMO_PLAYERS", "true"),
            ],
            CliOverrides::default(),
        )
        .unwrap();

        let policy = config.settlement.retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(25));
        assert!(config.seed_demo_players);
    }

    #[test]
    fn test_validation_rejects_zero_attempts() {
        let config = load(&[("SETTLEMENT_MAX_ATTEMPTS", "0")], CliOverrides::default()).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_validation_rejects_metrics_on_server_port() {
        let config = load(
            &[
                ("SERVER_BIND", "127.0.0.1:7000"),
                ("METRICS_BIND", "127.0.0.1:7000"),
            ],
            CliOverrides::default(),
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingRequired {
            var: "DATABASE_URL".to_string(),
            hint: "Use memory".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("DATABASE_URL"));
        assert!(msg.contains("Use memory"));
    }
}
