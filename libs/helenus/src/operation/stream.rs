use std::time::Instant;

use super::statement::{StatementOperation, execute_statement};
use crate::error::HelenusResult;
use crate::mapping::Row;
use crate::session::HelenusSession;
use crate::uow::UnitOfWork;

/// A statement whose rows are transformed into typed items
pub(crate) trait RowOperation: StatementOperation {
    type Item: Send + 'static;

    const OPERATION: &'static str;

    fn session(&self) -> &HelenusSession;

    fn transform(&self, row: &Row) -> HelenusResult<Self::Item>;
}

/// Multi-row read. Always goes to the cluster; the facet caches only serve
/// point lookups.
pub(crate) async fn run_stream<O: RowOperation>(
    op: &O,
    uow: Option<&UnitOfWork>,
) -> HelenusResult<Vec<O::Item>> {
    let started = Instant::now();
    let result = fetch(op, uow).await;
    op.session()
        .metrics()
        .request_completed(O::OPERATION, started.elapsed());
    result
}

async fn fetch<O: RowOperation>(
    op: &O,
    uow: Option<&UnitOfWork>,
) -> HelenusResult<Vec<O::Item>> {
    let statement = op.build_statement()?;
    let rows = execute_statement(op.session(), statement, op.options(), uow, O::OPERATION).await?;
    rows.rows().iter().map(|row| op.transform(row)).collect()
}
