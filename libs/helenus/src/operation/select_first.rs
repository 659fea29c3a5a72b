use async_trait::async_trait;

use super::filters::{FilterOperation, FilterSet};
use super::optional::{PointLookup, run_optional};
use super::select::SelectOperation;
use super::statement::{Executable, StatementOperation, StatementOptions};
use super::stream::RowOperation;
use crate::cache::{CacheKind, CacheManager};
use crate::error::HelenusResult;
use crate::mapping::Row;
use crate::query::BuiltStatement;
use crate::session::HelenusSession;
use crate::uow::UnitOfWork;

/// The first row of a [`SelectOperation`], resolved through the caches when
/// the filters bind a facet.
#[derive(Clone, Debug)]
pub struct SelectFirstOperation<T> {
    select: SelectOperation<T>,
}

impl<T: Send + 'static> SelectFirstOperation<T> {
    pub(crate) fn new(select: SelectOperation<T>) -> Self {
        Self { select }
    }

    pub fn map<U, F>(self, f: F) -> SelectFirstOperation<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        SelectFirstOperation::new(self.select.map(f))
    }
}

impl<T> FilterOperation for SelectFirstOperation<T> {
    fn filters_mut(&mut self) -> &mut FilterSet {
        self.select.filters_mut()
    }
}

impl<T: Send + 'static> StatementOperation for SelectFirstOperation<T> {
    type Output = Option<T>;

    fn options(&self) -> &StatementOptions {
        self.select.options()
    }

    fn options_mut(&mut self) -> &mut StatementOptions {
        self.select.options_mut()
    }

    fn build_statement(&self) -> HelenusResult<BuiltStatement> {
        self.select.build_statement()
    }
}

impl<T: Send + 'static> RowOperation for SelectFirstOperation<T> {
    type Item = T;

    const OPERATION: &'static str = "select_first";

    fn session(&self) -> &HelenusSession {
        self.select.session()
    }

    fn transform(&self, row: &Row) -> HelenusResult<T> {
        self.select.materialize(row)
    }
}

impl<T: Send + 'static> PointLookup for SelectFirstOperation<T> {
    fn cache_manager(&self) -> CacheManager {
        CacheManager::of(CacheKind::Fetch, self.select.entity().ok())
    }

    fn filters(&self) -> &FilterSet {
        self.select.filters()
    }

    fn covers(&self, row: &Row) -> bool {
        self.select
            .projection()
            .iter()
            .all(|node| row.contains(node.column_name().as_str()))
    }
}

#[async_trait]
impl<T: Send + 'static> Executable for SelectFirstOperation<T> {
    async fn execute_in(&self, uow: Option<&UnitOfWork>) -> HelenusResult<Option<T>> {
        run_optional(self, uow).await
    }
}
