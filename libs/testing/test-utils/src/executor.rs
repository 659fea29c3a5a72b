//! In-memory statement executor for driving operations without a cluster.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use helenus::{
    ExecutionOptions, HelenusResult, HelenusSession, ResultSet, SessionConfig, StatementExecutor,
};
use helenus::query::BuiltStatement;
use scylla::value::CqlValue;

#[derive(Default)]
struct State {
    responses: VecDeque<HelenusResult<ResultSet>>,
    executed: Vec<(BuiltStatement, ExecutionOptions)>,
}

/// Records every executed statement and replays queued responses in order.
///
/// When the queue is empty each statement answers with an empty result set.
///
/// # Example
///
/// ```ignore
/// let executor = RecordingExecutor::new();
/// executor.push_rows(&["override_name", "age"], vec![vec![text("alex"), int(34)]]);
/// let session = executor.session();
/// // ... run operations ...
/// assert_eq!(executor.round_trips(), 1);
/// ```
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    state: Arc<Mutex<State>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Session over this executor with default settings (cache enabled)
    pub fn session(&self) -> HelenusSession {
        self.session_with(SessionConfig::default())
    }

    pub fn session_with(&self, config: SessionConfig) -> HelenusSession {
        HelenusSession::builder(Arc::new(self.clone()))
            .config(config)
            .build()
    }

    pub fn push_result(&self, result: ResultSet) -> &Self {
        self.state().responses.push_back(Ok(result));
        self
    }

    pub fn push_rows(&self, columns: &[&str], rows: Vec<Vec<Option<CqlValue>>>) -> &Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.push_result(ResultSet::new(columns, rows))
    }

    /// Answer the next lightweight transaction with `[applied]`
    pub fn push_applied(&self, applied: bool) -> &Self {
        self.push_rows(&["[applied]"], vec![vec![Some(CqlValue::Boolean(applied))]])
    }

    pub fn push_error(&self, error: helenus::HelenusError) -> &Self {
        self.state().responses.push_back(Err(error));
        self
    }

    /// Number of statements sent so far
    pub fn round_trips(&self) -> usize {
        self.state().executed.len()
    }

    pub fn statements(&self) -> Vec<BuiltStatement> {
        self.state()
            .executed
            .iter()
            .map(|(statement, _)| statement.clone())
            .collect()
    }

    pub fn last_statement(&self) -> Option<BuiltStatement> {
        self.state()
            .executed
            .last()
            .map(|(statement, _)| statement.clone())
    }

    pub fn last_options(&self) -> Option<ExecutionOptions> {
        self.state()
            .executed
            .last()
            .map(|(_, options)| options.clone())
    }

    /// Forget executed statements and pending responses
    pub fn reset(&self) {
        let mut state = self.state();
        state.responses.clear();
        state.executed.clear();
    }
}

#[async_trait]
impl StatementExecutor for RecordingExecutor {
    async fn execute(
        &self,
        statement: BuiltStatement,
        options: ExecutionOptions,
    ) -> HelenusResult<ResultSet> {
        tracing::debug!(cql = %statement.cql, "Recording statement");
        let mut state = self.state();
        state.executed.push((statement, options));
        state
            .responses
            .pop_front()
            .unwrap_or_else(|| Ok(ResultSet::empty()))
    }
}

/// `Some(CqlValue::Text)` shorthand for queued rows
pub fn text(value: &str) -> Option<CqlValue> {
    Some(CqlValue::Text(value.to_string()))
}

/// `Some(CqlValue::Int)` shorthand for queued rows
pub fn int(value: i32) -> Option<CqlValue> {
    Some(CqlValue::Int(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use helenus::HelenusError;

    fn statement(cql: &str) -> BuiltStatement {
        BuiltStatement {
            cql: cql.to_string(),
            values: Vec::new(),
            idempotent: true,
        }
    }

    #[tokio::test]
    async fn test_replays_in_order_then_empty() {
        let executor = RecordingExecutor::new();
        executor
            .push_rows(&["age"], vec![vec![int(34)]])
            .push_error(HelenusError::Driver("timeout".into()));

        let first = executor
            .execute(statement("SELECT age FROM t"), ExecutionOptions::default())
            .await
            .unwrap();
        assert_eq!(first.len(), 1);

        let second = executor
            .execute(statement("SELECT age FROM t"), ExecutionOptions::default())
            .await;
        assert!(matches!(second, Err(HelenusError::Driver(_))));

        let third = executor
            .execute(statement("SELECT age FROM t"), ExecutionOptions::default())
            .await
            .unwrap();
        assert!(third.is_empty());

        assert_eq!(executor.round_trips(), 3);
        executor.reset();
        assert_eq!(executor.round_trips(), 0);
    }
}
