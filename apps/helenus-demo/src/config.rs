//! Configuration for the demo binary

use helenus::config::{ConfigError, env_or_default, env_parse};
use helenus::{FromEnv, SessionConfig};

#[derive(Debug, Clone)]
pub struct Config {
    /// Session settings; the keyspace defaults to [`Config::keyspace`]
    pub session: SessionConfig,

    /// Keyspace created by `schema` and used by every other command
    pub keyspace: String,

    /// Replication factor for `CREATE KEYSPACE`
    pub replication_factor: u32,

    /// Render Prometheus metrics after each command
    pub print_metrics: bool,
}

impl FromEnv for Config {
    fn from_env() -> Result<Self, ConfigError> {
        let keyspace = env_or_default("DEMO_KEYSPACE", "helenus_demo");
        let mut session = SessionConfig::from_env()?;
        if session.cassandra.keyspace.is_none() {
            session.cassandra.keyspace = Some(keyspace.clone());
        }

        Ok(Self {
            session,
            keyspace,
            replication_factor: env_parse("DEMO_REPLICATION_FACTOR", 1)?,
            print_metrics: env_parse("DEMO_PRINT_METRICS", false)?,
        })
    }
}

impl Config {
    /// Session settings without a keyspace, for creating it
    pub fn bootstrap_session(&self) -> SessionConfig {
        let mut session = self.session.clone();
        session.cassandra.keyspace = None;
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("127.0.0.1:9042")),
                ("CASSANDRA_KEYSPACE", None),
                ("DEMO_KEYSPACE", None),
                ("DEMO_REPLICATION_FACTOR", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.keyspace, "helenus_demo");
                assert_eq!(
                    config.session.cassandra.keyspace.as_deref(),
                    Some("helenus_demo")
                );
                assert_eq!(config.replication_factor, 1);
                assert!(config.bootstrap_session().cassandra.keyspace.is_none());
            },
        );
    }

    #[test]
    fn test_explicit_keyspace_wins() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("127.0.0.1:9042")),
                ("CASSANDRA_KEYSPACE", Some("shop")),
                ("DEMO_REPLICATION_FACTOR", Some("3")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.session.cassandra.keyspace.as_deref(), Some("shop"));
                assert_eq!(config.replication_factor, 3);
            },
        );
    }

    #[test]
    fn test_missing_contact_points() {
        temp_env::with_var_unset("CASSANDRA_CONTACT_POINTS", || {
            let err = Config::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingEnvVar(_)));
        });
    }
}
