//! ScyllaDB test infrastructure
//!
//! Provides a `TestCassandra` helper that starts a single-node ScyllaDB
//! container and creates the fixture schema in a fresh keyspace.

use helenus::driver::ExecutionOptions;
use helenus::query::BuiltStatement;
use helenus::{CassandraConfig, HelenusSession, SessionConfig, StatementExecutor};
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const KEYSPACE: &str = "helenus_test";

const SCHEMA: &[&str] = &[
    "CREATE KEYSPACE IF NOT EXISTS helenus_test WITH replication = \
     {'class': 'SimpleStrategy', 'replication_factor': 1}",
    "CREATE TABLE IF NOT EXISTS helenus_test.simple_users \
     (id int PRIMARY KEY, override_name text, age int)",
    "CREATE TABLE IF NOT EXISTS helenus_test.accounts \
     (id uuid PRIMARY KEY, email text, balance int, tags list<text>)",
    "CREATE INDEX IF NOT EXISTS ON helenus_test.accounts (email)",
    "CREATE TABLE IF NOT EXISTS helenus_test.posts \
     (author int, posted_at bigint, body text, PRIMARY KEY (author, posted_at)) \
     WITH CLUSTERING ORDER BY (posted_at DESC)",
];

/// Test cluster wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
///
/// # Example
///
/// ```no_run
/// use test_utils::TestCassandra;
///
/// # async fn example() {
/// let cassandra = TestCassandra::new().await;
/// let session = cassandra.session();
/// // Run operations against the `helenus_test` keyspace
/// # }
/// ```
pub struct TestCassandra {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    session: HelenusSession,
    pub contact_point: String,
}

impl TestCassandra {
    /// Start ScyllaDB and create the fixture tables
    pub async fn new() -> Self {
        Self::with_config(SessionConfig::default()).await
    }

    /// Like [`TestCassandra::new`], with custom session settings; the
    /// contact points and keyspace are always replaced.
    pub async fn with_config(mut config: SessionConfig) -> Self {
        let container = GenericImage::new("scylladb/scylla", "6.2")
            .with_exposed_port(9042.tcp())
            .with_wait_for(WaitFor::message_on_either_std(
                "Starting listening for CQL clients",
            ))
            .with_cmd([
                "--smp",
                "1",
                "--overprovisioned",
                "1",
                "--skip-wait-for-gossip-to-settle",
                "0",
            ])
            .start()
            .await
            .expect("Failed to start ScyllaDB container");

        let host_port = container
            .get_host_port_ipv4(9042)
            .await
            .expect("Failed to get ScyllaDB port");
        let contact_point = format!("127.0.0.1:{}", host_port);

        config.cassandra = CassandraConfig::new(vec![contact_point.clone()]);
        let bootstrap = HelenusSession::connect(config.clone())
            .await
            .expect("Failed to connect to ScyllaDB");
        for ddl in SCHEMA {
            run(&bootstrap, ddl).await;
        }

        config.cassandra = config.cassandra.with_keyspace(KEYSPACE);
        let session = HelenusSession::connect(config)
            .await
            .expect("Failed to open keyspace session");

        tracing::info!(port = host_port, "Test ScyllaDB ready (scylla 6.2)");

        Self {
            container,
            session,
            contact_point,
        }
    }

    /// Get a session handle (clones share the session cache)
    pub fn session(&self) -> HelenusSession {
        self.session.clone()
    }

    /// Remove every row of a fixture table
    pub async fn truncate(&self, table: &str) {
        run(&self.session, &format!("TRUNCATE {KEYSPACE}.{table}")).await;
        self.session.session_cache().clear();
    }
}

async fn run(session: &HelenusSession, cql: &str) {
    let statement = BuiltStatement {
        cql: cql.to_string(),
        values: Vec::new(),
        idempotent: true,
    };
    session
        .executor()
        .execute(statement, ExecutionOptions::default())
        .await
        .unwrap_or_else(|e| panic!("Failed to run {cql}: {e}"));
}

// Container is automatically cleaned up when TestCassandra is dropped
impl Drop for TestCassandra {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test ScyllaDB container");
    }
}
