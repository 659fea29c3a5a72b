use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use scylla::statement::Consistency;
use tracing::{debug, info};

use crate::driver::ExecutionOptions;
use crate::error::HelenusResult;
use crate::mapping::ResultSet;
use crate::query::BuiltStatement;
use crate::session::HelenusSession;
use crate::uow::UnitOfWork;

/// Settings shared by every statement kind
#[derive(Clone, Debug)]
pub struct StatementOptions {
    pub(crate) enable_cache: bool,
    pub(crate) timeout: Option<Duration>,
    pub(crate) tracing: bool,
    pub(crate) show_values: bool,
    pub(crate) consistency: Option<Consistency>,
    pub(crate) idempotent: Option<bool>,
}

impl Default for StatementOptions {
    fn default() -> Self {
        Self {
            enable_cache: true,
            timeout: None,
            tracing: false,
            show_values: false,
            consistency: None,
            idempotent: None,
        }
    }
}

impl StatementOptions {
    pub fn cache_enabled(&self) -> bool {
        self.enable_cache
    }
}

/// A statement under construction
pub trait StatementOperation: Sized + Send + Sync + 'static {
    type Output: Send + 'static;

    fn options(&self) -> &StatementOptions;

    fn options_mut(&mut self) -> &mut StatementOptions;

    /// Build the CQL statement, surfacing any construction error recorded so far
    fn build_statement(&self) -> HelenusResult<BuiltStatement>;

    /// Skip cache lookups for this statement
    fn ignore_cache(mut self) -> Self {
        self.options_mut().enable_cache = false;
        self
    }

    fn query_timeout(mut self, timeout: Duration) -> Self {
        self.options_mut().timeout = Some(timeout);
        self
    }

    fn tracing(mut self) -> Self {
        self.options_mut().tracing = true;
        self
    }

    fn show_values(mut self) -> Self {
        self.options_mut().show_values = true;
        self
    }

    fn consistency(mut self, consistency: Consistency) -> Self {
        self.options_mut().consistency = Some(consistency);
        self
    }

    fn consistency_one(self) -> Self {
        self.consistency(Consistency::One)
    }

    fn consistency_quorum(self) -> Self {
        self.consistency(Consistency::Quorum)
    }

    fn consistency_all(self) -> Self {
        self.consistency(Consistency::All)
    }

    fn consistency_local_quorum(self) -> Self {
        self.consistency(Consistency::LocalQuorum)
    }

    fn idempotent(mut self, idempotent: bool) -> Self {
        self.options_mut().idempotent = Some(idempotent);
        self
    }

    /// Render the statement without executing it
    fn cql(&self) -> HelenusResult<String> {
        Ok(self.build_statement()?.cql)
    }
}

/// Execution entry points.
///
/// `spawn` runs exactly the `sync` algorithm on a tokio worker. Dropping the
/// returned future detaches the task; an in-flight statement still completes.
#[async_trait]
pub trait Executable: StatementOperation {
    async fn execute_in(&self, uow: Option<&UnitOfWork>) -> HelenusResult<Self::Output>;

    async fn sync(&self) -> HelenusResult<Self::Output> {
        self.execute_in(None).await
    }

    async fn sync_in(&self, uow: &UnitOfWork) -> HelenusResult<Self::Output> {
        self.execute_in(Some(uow)).await
    }

    fn spawn(self) -> BoxFuture<'static, HelenusResult<Self::Output>> {
        let task = tokio::spawn(async move { self.execute_in(None).await });
        async move { task.await? }.boxed()
    }

    fn spawn_in(self, uow: &UnitOfWork) -> BoxFuture<'static, HelenusResult<Self::Output>> {
        let uow = uow.clone();
        let task = tokio::spawn(async move { self.execute_in(Some(&uow)).await });
        async move { task.await? }.boxed()
    }
}

/// Send one statement to the cluster, accounting time and round trips
pub(crate) async fn execute_statement(
    session: &HelenusSession,
    statement: BuiltStatement,
    options: &StatementOptions,
    uow: Option<&UnitOfWork>,
    operation: &'static str,
) -> HelenusResult<ResultSet> {
    let config = session.config();
    if config.show_cql {
        if options.show_values || config.show_values {
            info!(operation, cql = %statement.with_values(), "Executing statement");
        } else {
            info!(operation, cql = %statement.cql, "Executing statement");
        }
    } else {
        debug!(operation, cql = %statement.cql, "Executing statement");
    }

    let execution = ExecutionOptions {
        timeout: options.timeout.or(config.query_timeout),
        tracing: options.tracing,
        idempotent: options.idempotent.unwrap_or(statement.idempotent),
        consistency: options.consistency,
    };

    let started = Instant::now();
    let result = session.executor().execute(statement, execution).await;
    let elapsed = started.elapsed();

    session.metrics().database_request(operation, elapsed);
    if let Some(uow) = uow {
        uow.record_cache_and_database_operation_count(0, 1);
        uow.add_database_time(elapsed);
    }
    result
}
