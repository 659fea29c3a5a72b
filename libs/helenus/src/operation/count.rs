use async_trait::async_trait;

use super::filters::{FilterOperation, FilterSet};
use super::statement::{Executable, StatementOperation, StatementOptions};
use super::stream::{RowOperation, run_stream};
use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{Entity, EntityDescriptor, Row};
use crate::query::{BuiltStatement, Select};
use crate::session::HelenusSession;
use crate::uow::UnitOfWork;

const COUNT_COLUMN: &str = "count";

/// `SELECT count(*)` over the rows matching the filters. Never cached.
#[derive(Clone, Debug)]
pub struct CountOperation {
    session: HelenusSession,
    options: StatementOptions,
    filters: FilterSet,
    entity: Option<&'static EntityDescriptor>,
    allow_filtering: bool,
}

impl CountOperation {
    pub(crate) fn of<E: Entity>(session: HelenusSession) -> Self {
        Self::from_parts(
            session,
            StatementOptions::default(),
            FilterSet::default(),
            Some(E::descriptor()),
        )
    }

    pub(crate) fn from_parts(
        session: HelenusSession,
        options: StatementOptions,
        filters: FilterSet,
        entity: Option<&'static EntityDescriptor>,
    ) -> Self {
        Self {
            session,
            options,
            filters,
            entity,
            allow_filtering: false,
        }
    }

    pub fn allow_filtering(mut self) -> Self {
        self.allow_filtering = true;
        self
    }
}

impl FilterOperation for CountOperation {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }
}

impl StatementOperation for CountOperation {
    type Output = i64;

    fn options(&self) -> &StatementOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut StatementOptions {
        &mut self.options
    }

    fn build_statement(&self) -> HelenusResult<BuiltStatement> {
        self.filters.check()?;
        let entity = self
            .entity
            .or_else(|| self.filters.first_entity())
            .ok_or_else(|| HelenusError::mapping("no entity or table to count data"))?;
        self.filters.check_entity(entity)?;

        let mut select = Select::count(entity.table().to_cql());
        for clause in self.filters.where_clauses(self.session.value_preparer())? {
            select = select.where_clause(clause);
        }
        if self.allow_filtering {
            select = select.allow_filtering();
        }
        Ok(select.build())
    }
}

impl RowOperation for CountOperation {
    type Item = i64;

    const OPERATION: &'static str = "count";

    fn session(&self) -> &HelenusSession {
        &self.session
    }

    fn transform(&self, row: &Row) -> HelenusResult<i64> {
        row.get_by_column(COUNT_COLUMN)
    }
}

#[async_trait]
impl Executable for CountOperation {
    async fn execute_in(&self, uow: Option<&UnitOfWork>) -> HelenusResult<i64> {
        let counts = run_stream(self, uow).await?;
        Ok(counts.into_iter().next().unwrap_or_default())
    }
}
