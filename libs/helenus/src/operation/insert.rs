use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use scylla::value::CqlValue;

use super::statement::{Executable, StatementOperation, StatementOptions, execute_statement};
use crate::cache::{CacheKind, CacheManager, MIN_FACETS_FOR_SESSION_CACHE};
use crate::error::{HelenusError, HelenusResult, PendingError};
use crate::mapping::{
    ColumnValue, Entity, EntityDescriptor, Getter, PropertyNode, ResultSet, Row, entity_values,
};
use crate::query::{BuiltStatement, Insert};
use crate::session::HelenusSession;
use crate::uow::{Lookup, UnitOfWork};

const OPERATION: &str = "insert";

/// An INSERT of one row, built from an entity or column by column.
///
/// Null values of an entity are left out of the statement. An applied insert
/// populates the caches under the same facet rules as reads.
#[derive(Clone, Debug)]
pub struct InsertOperation {
    session: HelenusSession,
    options: StatementOptions,
    pending: PendingError,
    values: Vec<(PropertyNode, Option<CqlValue>)>,
    if_not_exists: bool,
    ttl: Option<i32>,
    timestamp: Option<i64>,
}

impl InsertOperation {
    pub(crate) fn new(session: HelenusSession) -> Self {
        Self {
            session,
            options: StatementOptions::default(),
            pending: PendingError::default(),
            values: Vec::new(),
            if_not_exists: false,
            ttl: None,
            timestamp: None,
        }
    }

    pub(crate) fn from_entity<E: Entity>(session: HelenusSession, entity: &E) -> Self {
        let mut op = Self::new(session);
        match entity_values(entity, op.session.value_preparer()) {
            Ok(values) => op.values = values.into_iter().filter(|(_, v)| v.is_some()).collect(),
            Err(e) => op.pending.record(e),
        }
        op
    }

    /// Bind one column; a later value for the same column replaces it
    pub fn value<V: ColumnValue>(mut self, getter: impl Getter<V>, value: V) -> Self {
        match getter.resolve() {
            Ok(node) => match value.try_to_cql() {
                Ok(cql) => {
                    let value = cql.map(|v| self.session.value_preparer().prepare(&node, v));
                    self.values.retain(|(n, _)| *n != node);
                    self.values.push((node, value));
                }
                Err(e) => self.pending.record(HelenusError::invalid_argument(format!(
                    "value for {node} is invalid: {e}"
                ))),
            },
            Err(e) => self.pending.record(e),
        }
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn ttl(mut self, seconds: i32) -> Self {
        self.ttl = Some(seconds);
        self
    }

    /// Write timestamp in microseconds
    pub fn timestamp(mut self, micros: i64) -> Self {
        self.timestamp = Some(micros);
        self
    }

    fn entity(&self) -> HelenusResult<&'static EntityDescriptor> {
        let mut nodes = self.values.iter().map(|(node, _)| *node);
        let entity = nodes
            .next()
            .map(|node| node.entity())
            .ok_or_else(|| HelenusError::mapping("no columns to insert"))?;
        if let Some(node) = nodes.find(|n| !n.entity().same_as(entity)) {
            return Err(HelenusError::mapping(format!(
                "you can insert columns only into a single entity {} or {}",
                entity,
                node.entity()
            )));
        }
        Ok(entity)
    }

    fn row(&self) -> Row {
        Row::from_pairs(
            self.values
                .iter()
                .map(|(node, value)| (node.column_name().as_str(), value.clone())),
        )
    }

    async fn apply(&self, uow: Option<&UnitOfWork>) -> HelenusResult<ResultSet> {
        let statement = self.build_statement()?;
        let result =
            execute_statement(&self.session, statement, &self.options, uow, OPERATION).await?;
        if result.was_applied() {
            self.write_through(uow)?;
        }
        Ok(result)
    }

    fn write_through(&self, uow: Option<&UnitOfWork>) -> HelenusResult<()> {
        let entity = self.entity()?;
        let manager = CacheManager::of(CacheKind::Update, Some(entity));
        let cache = self.session.session_cache();
        let inserted = self.row();
        let keys = manager.keys(&manager.row_facets(&inserted));
        if keys.is_empty() {
            return Ok(());
        }

        match uow {
            Some(uow) => {
                let mut row = match uow.cache_lookup(&keys) {
                    Lookup::Found(existing) => (*existing).clone(),
                    Lookup::Deleted | Lookup::Missing => Row::default(),
                };
                row.merge(&inserted);
                let facets = manager.row_facets(&row);
                let promote =
                    entity.is_cacheable() && facets.len() >= MIN_FACETS_FOR_SESSION_CACHE;
                uow.cache_update(&manager.keys(&facets), Arc::new(row), promote);
            }
            None if manager.is_session_cacheable(cache) => {
                let mut row = cache
                    .get(&keys)
                    .map(|existing| (*existing).clone())
                    .unwrap_or_default();
                row.merge(&inserted);
                manager.update_session(cache, Arc::new(row));
            }
            None => {}
        }
        Ok(())
    }
}

impl StatementOperation for InsertOperation {
    type Output = ResultSet;

    fn options(&self) -> &StatementOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut StatementOptions {
        &mut self.options
    }

    fn build_statement(&self) -> HelenusResult<BuiltStatement> {
        self.pending.check()?;
        let entity = self.entity()?;

        let mut insert = Insert::new(entity.table().to_cql());
        for (node, value) in &self.values {
            insert = insert.value(node.column_name().to_cql(), value.clone());
        }
        if self.if_not_exists {
            insert = insert.if_not_exists();
        }
        if let Some(ttl) = self.ttl {
            insert = insert.ttl(ttl);
        }
        if let Some(timestamp) = self.timestamp {
            insert = insert.timestamp(timestamp);
        }
        Ok(insert.build())
    }
}

#[async_trait]
impl Executable for InsertOperation {
    async fn execute_in(&self, uow: Option<&UnitOfWork>) -> HelenusResult<ResultSet> {
        let started = Instant::now();
        let result = self.apply(uow).await;
        self.session
            .metrics()
            .request_completed(OPERATION, started.elapsed());
        result
    }
}
