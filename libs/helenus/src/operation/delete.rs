use std::time::Instant;

use async_trait::async_trait;
use tracing::warn;

use super::filters::{FilterOperation, FilterSet};
use super::statement::{Executable, StatementOperation, StatementOptions, execute_statement};
use crate::cache::{CacheKind, CacheManager};
use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{Entity, EntityDescriptor, ResultSet};
use crate::query::{self, BuiltStatement, Delete};
use crate::session::HelenusSession;
use crate::uow::{Lookup, UnitOfWork};

const OPERATION: &str = "delete";

/// A DELETE of the rows matching the filters; without filters the table is truncated.
///
/// Inside a unit of work every key the filters bind is recorded as deleted,
/// which masks the row for later reads in the same unit.
#[derive(Clone, Debug)]
pub struct DeleteOperation {
    session: HelenusSession,
    options: StatementOptions,
    filters: FilterSet,
    entity: &'static EntityDescriptor,
    if_exists: bool,
    timestamp: Option<i64>,
}

impl DeleteOperation {
    pub(crate) fn of<E: Entity>(session: HelenusSession) -> Self {
        Self {
            session,
            options: StatementOptions::default(),
            filters: FilterSet::default(),
            entity: E::descriptor(),
            if_exists: false,
            timestamp: None,
        }
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    /// Write timestamp in microseconds
    pub fn timestamp(mut self, micros: i64) -> Self {
        self.timestamp = Some(micros);
        self
    }

    pub fn is_truncate(&self) -> bool {
        self.filters.is_empty()
    }

    async fn apply(&self, uow: Option<&UnitOfWork>) -> HelenusResult<ResultSet> {
        let statement = self.build_statement()?;
        let result =
            execute_statement(&self.session, statement, &self.options, uow, OPERATION).await?;
        if result.was_applied() {
            self.evict(uow);
        }
        Ok(result)
    }

    fn evict(&self, uow: Option<&UnitOfWork>) {
        let manager = CacheManager::of(CacheKind::Delete, Some(self.entity));
        let cache = self.session.session_cache();
        let schema = self.entity.table().as_str();

        if self.is_truncate() {
            if let Some(uow) = uow {
                uow.cache_evict_schema(schema);
            }
            manager.evict_session(cache, &[]);
            return;
        }

        let keys = if self.filters.only_equalities() {
            let equalities = self.filters.equality_values(self.session.value_preparer());
            manager.keys(&manager.bind_facet_values(&equalities))
        } else {
            Vec::new()
        };

        match uow {
            Some(uow) if keys.is_empty() => uow.cache_evict_schema(schema),
            Some(uow) => {
                let mut all = keys.clone();
                match uow.cache_lookup(&keys) {
                    Lookup::Found(row) => all.extend(manager.keys(&manager.row_facets(&row))),
                    Lookup::Deleted | Lookup::Missing => {
                        if let Some(row) = manager.check_session(cache, &keys) {
                            all.extend(manager.keys(&manager.row_facets(&row)));
                        }
                    }
                }
                all.sort();
                all.dedup();
                uow.cache_delete(&all);
            }
            None => manager.evict_session(cache, &keys),
        }
    }
}

impl FilterOperation for DeleteOperation {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }
}

impl StatementOperation for DeleteOperation {
    type Output = ResultSet;

    fn options(&self) -> &StatementOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut StatementOptions {
        &mut self.options
    }

    fn build_statement(&self) -> HelenusResult<BuiltStatement> {
        self.filters.check()?;
        self.filters.check_entity(self.entity)?;
        if self.is_truncate() {
            let statement = query::truncate(self.entity.table().to_cql());
            if !self.filters.if_conditions().is_empty() {
                warn!(
                    conditions = ?self.filters.if_conditions(),
                    cql = %statement.cql,
                    "onlyIf conditions dropped from a delete without where filters"
                );
            }
            return Ok(statement);
        }
        if self.if_exists && !self.filters.if_conditions().is_empty() {
            return Err(HelenusError::mapping(
                "only_if and if_exists cannot be combined",
            ));
        }

        let preparer = self.session.value_preparer();
        let mut delete = Delete::new(self.entity.table().to_cql());
        for clause in self.filters.where_clauses(preparer)? {
            delete = delete.where_clause(clause);
        }
        for clause in self.filters.if_clauses(preparer)? {
            delete = delete.only_if(clause);
        }
        if self.if_exists {
            delete = delete.if_exists();
        }
        if let Some(timestamp) = self.timestamp {
            delete = delete.timestamp(timestamp);
        }
        Ok(delete.build())
    }
}

#[async_trait]
impl Executable for DeleteOperation {
    async fn execute_in(&self, uow: Option<&UnitOfWork>) -> HelenusResult<ResultSet> {
        let started = Instant::now();
        let result = self.apply(uow).await;
        self.session
            .metrics()
            .request_completed(OPERATION, started.elapsed());
        result
    }
}
