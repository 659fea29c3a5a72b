use std::sync::Arc;
use std::time::Instant;

use scylla::value::CqlValue;
use tracing::debug;

use super::filters::{FilterSet, row_matches};
use super::statement::{StatementOperation, execute_statement};
use super::stream::RowOperation;
use crate::cache::{CacheManager, MIN_FACETS_FOR_SESSION_CACHE};
use crate::error::HelenusResult;
use crate::mapping::{PropertyNode, Row};
use crate::metrics::CacheScope;
use crate::uow::{Lookup, UnitOfWork};

/// A single-row read that participates in the facet caches
pub(crate) trait PointLookup: RowOperation {
    fn cache_manager(&self) -> CacheManager;

    fn filters(&self) -> &FilterSet;

    /// Whether a cached row holds every column this read needs
    fn covers(&self, row: &Row) -> bool;
}

enum Resolution {
    Hit(Arc<Row>),
    Deleted,
    Miss { populate: bool },
}

struct LookupContext<'a, O> {
    op: &'a O,
    manager: CacheManager,
    keys: Vec<String>,
    equalities: Vec<(PropertyNode, CqlValue)>,
    session_cacheable: bool,
}

impl<O: PointLookup> LookupContext<'_, O> {
    fn accepts(&self, row: &Row) -> bool {
        self.op.covers(row) && row_matches(row, &self.equalities)
    }

    fn check_session(&self) -> Option<Arc<Row>> {
        self.manager
            .check_session(self.op.session().session_cache(), &self.keys)
            .filter(|row| self.accepts(row))
    }

    fn without_unit(&self) -> Resolution {
        let metrics = self.op.session().metrics();
        if !self.op.options().cache_enabled() || !self.session_cacheable || self.keys.is_empty() {
            return Resolution::Miss {
                populate: self.session_cacheable,
            };
        }
        match self.check_session() {
            Some(row) => {
                metrics.cache_hit(CacheScope::Session);
                debug!(keys = ?self.keys, "Session cache hit");
                Resolution::Hit(row)
            }
            None => {
                metrics.cache_miss(CacheScope::Session);
                Resolution::Miss { populate: true }
            }
        }
    }

    fn within_unit(&self, uow: &UnitOfWork) -> Resolution {
        if !self.op.options().cache_enabled() {
            return Resolution::Miss { populate: false };
        }
        if self.keys.is_empty() {
            return Resolution::Miss { populate: true };
        }

        let metrics = self.op.session().metrics();
        match uow.cache_lookup(&self.keys) {
            Lookup::Deleted => {
                metrics.cache_hit(CacheScope::UnitOfWork);
                uow.record_cache_and_database_operation_count(1, 0);
                debug!(uow = %uow.id(), keys = ?self.keys, "Row deleted in unit of work");
                return Resolution::Deleted;
            }
            Lookup::Found(row) if self.accepts(&row) => {
                metrics.cache_hit(CacheScope::UnitOfWork);
                uow.record_cache_and_database_operation_count(1, 0);
                debug!(uow = %uow.id(), keys = ?self.keys, "Unit of work cache hit");
                return Resolution::Hit(row);
            }
            Lookup::Found(_) | Lookup::Missing => metrics.cache_miss(CacheScope::UnitOfWork),
        }

        if !self.session_cacheable {
            return Resolution::Miss { populate: true };
        }
        match self.check_session() {
            Some(row) => {
                metrics.cache_hit(CacheScope::Session);
                uow.record_cache_and_database_operation_count(1, 0);
                debug!(uow = %uow.id(), keys = ?self.keys, "Session cache hit");
                let keys = self.manager.keys(&self.manager.row_facets(&row));
                uow.cache_update(&keys, Arc::clone(&row), false);
                Resolution::Hit(row)
            }
            None => {
                metrics.cache_miss(CacheScope::Session);
                uow.record_cache_and_database_operation_count(-1, 0);
                Resolution::Miss { populate: true }
            }
        }
    }

    /// Cache a freshly fetched row, completed with the equality filter values
    fn populate(&self, fetched: &Row, uow: Option<&UnitOfWork>) {
        let mut row = fetched.clone();
        for (node, value) in &self.equalities {
            let column = node.column_name().as_str();
            if !row.contains(column) {
                row.set(column, Some(value.clone()));
            }
        }

        let facets = self.manager.row_facets(&row);
        let keys = self.manager.keys(&facets);
        if keys.is_empty() {
            return;
        }

        match uow {
            Some(uow) => {
                let row = match uow.cache_lookup(&keys) {
                    Lookup::Found(existing) => merged(&existing, &row),
                    _ => row,
                };
                let promote = self.manager.entity().is_some_and(|e| e.is_cacheable())
                    && facets.len() >= MIN_FACETS_FOR_SESSION_CACHE;
                uow.cache_update(&keys, Arc::new(row), promote);
            }
            None => {
                let cache = self.op.session().session_cache();
                let row = match cache.get(&keys) {
                    Some(existing) => merged(&existing, &row),
                    None => row,
                };
                self.manager.update_session(cache, Arc::new(row));
            }
        }
    }
}

fn merged(existing: &Row, fresh: &Row) -> Row {
    let mut row = existing.clone();
    row.merge(fresh);
    row
}

/// Resolve a point lookup: unit of work cache, then session cache, then the cluster.
pub(crate) async fn run_optional<O: PointLookup>(
    op: &O,
    uow: Option<&UnitOfWork>,
) -> HelenusResult<Option<O::Item>> {
    let started = Instant::now();
    let result = resolve(op, uow).await;
    op.session()
        .metrics()
        .request_completed(O::OPERATION, started.elapsed());
    result
}

async fn resolve<O: PointLookup>(
    op: &O,
    uow: Option<&UnitOfWork>,
) -> HelenusResult<Option<O::Item>> {
    let statement = op.build_statement()?;
    let session = op.session();
    let manager = op.cache_manager();
    let filters = op.filters();

    let equalities = filters.equality_values(session.value_preparer());
    let keys = if filters.only_equalities() {
        manager.keys(&manager.bind_facet_values(&equalities))
    } else {
        Vec::new()
    };
    let context = LookupContext {
        op,
        manager,
        keys,
        equalities,
        session_cacheable: manager.is_session_cacheable(session.session_cache()),
    };

    let resolution = match uow {
        None => context.without_unit(),
        Some(uow) => {
            let lookup_started = Instant::now();
            let resolution = context.within_unit(uow);
            if op.options().cache_enabled() {
                uow.add_cache_lookup_time(lookup_started.elapsed());
            }
            resolution
        }
    };

    match resolution {
        Resolution::Deleted => Ok(None),
        Resolution::Hit(row) => op.transform(&row).map(Some),
        Resolution::Miss { populate } => {
            let result =
                execute_statement(session, statement, op.options(), uow, O::OPERATION).await?;
            let Some(row) = result.first() else {
                return Ok(None);
            };
            if populate {
                context.populate(row, uow);
            }
            op.transform(row).map(Some)
        }
    }
}
