//! Session configuration loaded from code or from environment variables.
//!
//! Environment variables:
//! - `CASSANDRA_CONTACT_POINTS` (required for [`FromEnv`]) - comma-separated `host:port` list
//! - `CASSANDRA_KEYSPACE`, `CASSANDRA_DATACENTER`, `CASSANDRA_USERNAME`, `CASSANDRA_PASSWORD`
//! - `CASSANDRA_CONNECT_TIMEOUT_SECS` (default: 10)
//! - `CASSANDRA_REQUEST_TIMEOUT_SECS` (default: 30)
//! - `HELENUS_CACHE_ENABLED` (default: true)
//! - `HELENUS_CACHE_MAX_CAPACITY` (default: 10000)
//! - `HELENUS_CACHE_TTL_SECS` (optional)
//! - `HELENUS_QUERY_TIMEOUT_MS` (optional)
//! - `HELENUS_SHOW_CQL` / `HELENUS_SHOW_VALUES` (default: false)

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Read an environment variable, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an environment variable that must be set
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Parse an environment variable, using `default` when it is unset
pub fn env_parse<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn env_parse_optional<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::ParseError {
                key: key.to_string(),
                details: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

/// Cluster connection settings handed to the driver
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CassandraConfig {
    /// Contact points, e.g. `["127.0.0.1:9042"]`
    pub contact_points: Vec<String>,

    /// Keyspace the session switches to after connecting
    pub keyspace: Option<String>,

    /// Local datacenter for DC-aware load balancing
    pub local_datacenter: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl CassandraConfig {
    pub fn new<S: Into<String>>(contact_points: Vec<S>) -> Self {
        Self {
            contact_points: contact_points.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.local_datacenter = Some(datacenter.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for CassandraConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["127.0.0.1:9042".to_string()],
            keyspace: None,
            local_datacenter: None,
            username: None,
            password: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl FromEnv for CassandraConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let contact_points: Vec<String> = env_required("CASSANDRA_CONTACT_POINTS")?
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if contact_points.is_empty() {
            return Err(ConfigError::ParseError {
                key: "CASSANDRA_CONTACT_POINTS".to_string(),
                details: "No valid contact points provided".to_string(),
            });
        }

        Ok(Self {
            contact_points,
            keyspace: env::var("CASSANDRA_KEYSPACE").ok(),
            local_datacenter: env::var("CASSANDRA_DATACENTER").ok(),
            username: env::var("CASSANDRA_USERNAME").ok(),
            password: env::var("CASSANDRA_PASSWORD").ok(),
            connect_timeout_secs: env_parse("CASSANDRA_CONNECT_TIMEOUT_SECS", 10)?,
            request_timeout_secs: env_parse("CASSANDRA_REQUEST_TIMEOUT_SECS", 30)?,
        })
    }
}

/// Session-level point-lookup cache settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false, no operation consults or populates the session cache
    pub enabled: bool,

    /// Maximum number of cached facet keys
    pub max_capacity: u64,

    /// Optional time-to-live for cached rows
    pub time_to_live: Option<Duration>,
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_time_to_live(mut self, ttl: Duration) -> Self {
        self.time_to_live = Some(ttl);
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_capacity: 10_000,
            time_to_live: None,
        }
    }
}

impl FromEnv for CacheConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            enabled: env_parse("HELENUS_CACHE_ENABLED", true)?,
            max_capacity: env_parse("HELENUS_CACHE_MAX_CAPACITY", 10_000)?,
            time_to_live: env_parse_optional::<u64>("HELENUS_CACHE_TTL_SECS")?
                .map(Duration::from_secs),
        })
    }
}

/// Everything a [`HelenusSession`](crate::HelenusSession) needs besides its executor
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub cassandra: CassandraConfig,
    pub cache: CacheConfig,

    /// Default execution timeout applied when an operation sets none
    pub query_timeout: Option<Duration>,

    /// Log every executed statement at info level
    pub show_cql: bool,

    /// Include bound values when logging statements
    pub show_values: bool,
}

impl SessionConfig {
    pub fn new(cassandra: CassandraConfig) -> Self {
        Self {
            cassandra,
            ..Self::default()
        }
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn show_cql(mut self, show: bool) -> Self {
        self.show_cql = show;
        self
    }

    pub fn show_values(mut self, show: bool) -> Self {
        self.show_values = show;
        self
    }
}

impl FromEnv for SessionConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cassandra: CassandraConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            query_timeout: env_parse_optional::<u64>("HELENUS_QUERY_TIMEOUT_MS")?
                .map(Duration::from_millis),
            show_cql: env_parse("HELENUS_SHOW_CQL", false)?,
            show_values: env_parse("HELENUS_SHOW_VALUES", false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cassandra_config_builder_pattern() {
        let config = CassandraConfig::new(vec!["10.0.0.1:9042"])
            .with_keyspace("helenus")
            .with_datacenter("dc1")
            .with_credentials("user", "pass")
            .with_connect_timeout(3);

        assert_eq!(config.contact_points, vec!["10.0.0.1:9042"]);
        assert_eq!(config.keyspace.as_deref(), Some("helenus"));
        assert_eq!(config.local_datacenter.as_deref(), Some("dc1"));
        assert_eq!(config.username.as_deref(), Some("user"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_cassandra_config_from_env() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("127.0.0.1:9042, 127.0.0.2:9042")),
                ("CASSANDRA_KEYSPACE", Some("testkeyspace")),
                ("CASSANDRA_REQUEST_TIMEOUT_SECS", Some("5")),
            ],
            || {
                let config = CassandraConfig::from_env().unwrap();
                assert_eq!(config.contact_points.len(), 2);
                assert_eq!(config.contact_points[1], "127.0.0.2:9042");
                assert_eq!(config.keyspace.as_deref(), Some("testkeyspace"));
                assert_eq!(config.request_timeout_secs, 5);
            },
        );
    }

    #[test]
    fn test_cassandra_config_from_env_missing() {
        temp_env::with_var_unset("CASSANDRA_CONTACT_POINTS", || {
            let err = CassandraConfig::from_env().unwrap_err();
            assert_eq!(
                err,
                ConfigError::MissingEnvVar("CASSANDRA_CONTACT_POINTS".to_string())
            );
        });
    }

    #[test]
    fn test_cassandra_config_from_env_blank_contact_points() {
        temp_env::with_var("CASSANDRA_CONTACT_POINTS", Some(" , "), || {
            let err = CassandraConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::ParseError { .. }));
        });
    }

    #[test]
    fn test_session_config_from_env() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("127.0.0.1:9042")),
                ("HELENUS_CACHE_ENABLED", Some("false")),
                ("HELENUS_CACHE_TTL_SECS", Some("60")),
                ("HELENUS_QUERY_TIMEOUT_MS", Some("250")),
                ("HELENUS_SHOW_CQL", Some("true")),
                ("HELENUS_SHOW_VALUES", None),
            ],
            || {
                let config = SessionConfig::from_env().unwrap();
                assert!(!config.cache.enabled);
                assert_eq!(config.cache.time_to_live, Some(Duration::from_secs(60)));
                assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));
                assert!(config.show_cql);
                assert!(!config.show_values);
            },
        );
    }

    #[test]
    fn test_cache_config_bad_capacity() {
        temp_env::with_var("HELENUS_CACHE_MAX_CAPACITY", Some("lots"), || {
            let err = CacheConfig::from_env().unwrap_err();
            match err {
                ConfigError::ParseError { key, .. } => {
                    assert_eq!(key, "HELENUS_CACHE_MAX_CAPACITY")
                }
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    fn test_env_or_default_without_value() {
        temp_env::with_var_unset("HELENUS_MISSING_VAR", || {
            assert_eq!(env_or_default("HELENUS_MISSING_VAR", "fallback"), "fallback");
        });
    }
}
