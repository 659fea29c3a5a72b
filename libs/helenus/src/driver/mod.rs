//! Statement execution seam between operations and the cluster driver.

mod cluster;
mod retry;

use std::time::Duration;

use async_trait::async_trait;
use scylla::statement::Consistency;

use crate::error::HelenusResult;
use crate::mapping::ResultSet;
use crate::query::BuiltStatement;

pub use cluster::{
    HealthStatus, ScyllaExecutor, check_health, check_health_detailed, connect,
    connect_with_retry,
};
pub use retry::ConnectBackoff;

/// Per-execution driver settings
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExecutionOptions {
    pub timeout: Option<Duration>,
    pub tracing: bool,
    pub idempotent: bool,
    pub consistency: Option<Consistency>,
}

/// Executes built statements. Errors are returned exactly as the driver reports them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    async fn execute(
        &self,
        statement: BuiltStatement,
        options: ExecutionOptions,
    ) -> HelenusResult<ResultSet>;
}
