use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::policies::load_balancing::DefaultPolicy;
use scylla::response::query_result::QueryResult;
use scylla::statement::unprepared::Statement;
use scylla::value::Row as DriverRow;
use tracing::{info, instrument};

use super::{ConnectBackoff, ExecutionOptions, StatementExecutor};
use crate::config::CassandraConfig;
use crate::error::{HelenusError, HelenusResult};
use crate::mapping::ResultSet;
use crate::query::BuiltStatement;

const HEALTH_QUERY: &str = "SELECT release_version FROM system.local";

/// [`StatementExecutor`] over a Scylla/Cassandra driver session
#[derive(Clone)]
pub struct ScyllaExecutor {
    session: Arc<Session>,
}

impl ScyllaExecutor {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }
}

#[async_trait]
impl StatementExecutor for ScyllaExecutor {
    async fn execute(
        &self,
        statement: BuiltStatement,
        options: ExecutionOptions,
    ) -> HelenusResult<ResultSet> {
        let mut query = Statement::new(statement.cql);
        if options.timeout.is_some() {
            query.set_request_timeout(options.timeout);
        }
        query.set_tracing(options.tracing);
        query.set_is_idempotent(options.idempotent);
        if let Some(consistency) = options.consistency {
            query.set_consistency(consistency);
        }

        let result = self.session.query_unpaged(query, statement.values).await?;
        into_result_set(result)
    }
}

fn into_result_set(result: QueryResult) -> HelenusResult<ResultSet> {
    if !result.is_rows() {
        return Ok(ResultSet::empty());
    }
    let rows = result
        .into_rows_result()
        .map_err(|e| HelenusError::Result(e.to_string()))?;
    let columns: Vec<String> = rows
        .column_specs()
        .iter()
        .map(|spec| spec.name().to_string())
        .collect();
    let values = rows
        .rows::<DriverRow>()
        .map_err(|e| HelenusError::Result(e.to_string()))?
        .map(|row| {
            row.map(|r| r.columns)
                .map_err(|e| HelenusError::Result(e.to_string()))
        })
        .collect::<HelenusResult<Vec<_>>>()?;
    Ok(ResultSet::new(columns, values))
}

/// Open a driver session from a [`CassandraConfig`] and verify it answers
#[instrument(skip(config), fields(contact_points = ?config.contact_points))]
pub async fn connect(config: &CassandraConfig) -> HelenusResult<Arc<Session>> {
    info!("Connecting to cluster");

    let mut profile =
        ExecutionProfile::builder().request_timeout(Some(config.request_timeout()));
    if let Some(datacenter) = &config.local_datacenter {
        profile = profile.load_balancing_policy(
            DefaultPolicy::builder()
                .prefer_datacenter(datacenter.clone())
                .build(),
        );
    }

    let mut builder = SessionBuilder::new()
        .known_nodes(&config.contact_points)
        .connection_timeout(config.connect_timeout())
        .default_execution_profile_handle(profile.build().into_handle());

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        builder = builder.user(username, password);
    }
    if let Some(keyspace) = &config.keyspace {
        builder = builder.use_keyspace(keyspace, true);
    }

    let session = builder.build().await?;
    session.query_unpaged(HEALTH_QUERY, &[]).await?;

    info!("Connected to cluster");
    Ok(Arc::new(session))
}

/// [`connect`] under a [`ConnectBackoff`]; `None` uses [`ConnectBackoff::default`]
pub async fn connect_with_retry(
    config: &CassandraConfig,
    backoff: Option<ConnectBackoff>,
) -> HelenusResult<Arc<Session>> {
    backoff.unwrap_or_default().run(|| connect(config)).await
}

/// Cluster health as seen from one session
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: u64,
    pub version: Option<String>,
}

pub async fn check_health(session: &Session) -> bool {
    session.query_unpaged(HEALTH_QUERY, &[]).await.is_ok()
}

pub async fn check_health_detailed(session: &Session) -> HealthStatus {
    let start = Instant::now();
    match session.query_unpaged(HEALTH_QUERY, &[]).await {
        Ok(result) => HealthStatus {
            healthy: true,
            message: None,
            response_time_ms: start.elapsed().as_millis() as u64,
            version: extract_version(result),
        },
        Err(e) => HealthStatus {
            healthy: false,
            message: Some(e.to_string()),
            response_time_ms: start.elapsed().as_millis() as u64,
            version: None,
        },
    }
}

fn extract_version(result: QueryResult) -> Option<String> {
    let rows_result = result.into_rows_result().ok()?;
    let mut rows = rows_result.rows::<(String,)>().ok()?;
    rows.next()?.ok().map(|(version,)| version)
}
