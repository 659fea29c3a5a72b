use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use scylla::value::CqlValue;
use tracing::debug;

use super::filters::{FilterOperation, FilterSet};
use super::statement::{Executable, StatementOperation, StatementOptions, execute_statement};
use crate::cache::{CacheKind, CacheManager, MIN_FACETS_FOR_SESSION_CACHE};
use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{ColumnValue, EntityDescriptor, Getter, PropertyNode, ResultSet, Row};
use crate::query::{Assignment, BuiltStatement, Update};
use crate::session::HelenusSession;
use crate::uow::{Lookup, UnitOfWork};

const OPERATION: &str = "update";

/// An UPDATE of one entity's columns.
///
/// When the cluster applies it, assigned values are written through to the
/// cached row; columns whose new value only the cluster knows are dropped.
#[derive(Clone, Debug)]
pub struct UpdateOperation {
    session: HelenusSession,
    options: StatementOptions,
    filters: FilterSet,
    assignments: Vec<(PropertyNode, Assignment)>,
    known: Vec<(PropertyNode, Option<CqlValue>)>,
    unknown: Vec<PropertyNode>,
    if_exists: bool,
    ttl: Option<i32>,
    timestamp: Option<i64>,
}

impl UpdateOperation {
    pub(crate) fn new(session: HelenusSession) -> Self {
        Self {
            session,
            options: StatementOptions::default(),
            filters: FilterSet::default(),
            assignments: Vec::new(),
            known: Vec::new(),
            unknown: Vec::new(),
            if_exists: false,
            ttl: None,
            timestamp: None,
        }
    }

    fn prepared(&self, node: &PropertyNode, value: Option<CqlValue>) -> Option<CqlValue> {
        value.map(|v| self.session.value_preparer().prepare(node, v))
    }

    /// CQL form of `value`; values without one are recorded as construction errors
    fn bound<V: ColumnValue>(&mut self, node: &PropertyNode, value: &V) -> Option<Option<CqlValue>> {
        match value.try_to_cql() {
            Ok(cql) => Some(self.prepared(node, cql)),
            Err(e) => {
                self.filters.record(HelenusError::invalid_argument(format!(
                    "value for {node} is invalid: {e}"
                )));
                None
            }
        }
    }

    fn resolve(&mut self, node: HelenusResult<PropertyNode>) -> Option<PropertyNode> {
        match node {
            Ok(node) => Some(node),
            Err(e) => {
                self.filters.record(e);
                None
            }
        }
    }

    /// Element of a collection mutation; null elements are rejected
    fn element<V: ColumnValue>(&mut self, node: &PropertyNode, value: V) -> Option<CqlValue> {
        let element = self.bound(node, &value)?;
        if element.is_none() {
            self.filters.record(HelenusError::invalid_argument(format!(
                "value for {node} is empty"
            )));
        }
        element
    }

    fn push_unknown(&mut self, node: PropertyNode, assignment: Assignment) {
        self.assignments.push((node, assignment));
        self.unknown.push(node);
    }

    pub fn set<V: ColumnValue>(mut self, getter: impl Getter<V>, value: V) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            let Some(value) = self.bound(&node, &value) else {
                return self;
            };
            self.assignments.push((
                node,
                Assignment::Set(node.column_name().to_cql(), value.clone()),
            ));
            self.known.push((node, value));
        }
        self
    }

    /// Add `delta` to a counter column
    pub fn increment(mut self, getter: impl Getter<i64>, delta: i64) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            self.push_unknown(node, Assignment::Increment(node.column_name().to_cql(), delta));
        }
        self
    }

    pub fn decrement(mut self, getter: impl Getter<i64>, delta: i64) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            self.push_unknown(node, Assignment::Decrement(node.column_name().to_cql(), delta));
        }
        self
    }

    pub fn append<V: ColumnValue>(mut self, getter: impl Getter<Vec<V>>, value: V) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            if let Some(element) = self.element(&node, value) {
                let list = CqlValue::List(vec![element]);
                self.push_unknown(node, Assignment::Append(node.column_name().to_cql(), list));
            }
        }
        self
    }

    pub fn prepend<V: ColumnValue>(mut self, getter: impl Getter<Vec<V>>, value: V) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            if let Some(element) = self.element(&node, value) {
                let list = CqlValue::List(vec![element]);
                self.push_unknown(node, Assignment::Prepend(node.column_name().to_cql(), list));
            }
        }
        self
    }

    /// Remove every occurrence of `value` from a list column
    pub fn discard<V: ColumnValue>(mut self, getter: impl Getter<Vec<V>>, value: V) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            if let Some(element) = self.element(&node, value) {
                let list = CqlValue::List(vec![element]);
                self.push_unknown(node, Assignment::Remove(node.column_name().to_cql(), list));
            }
        }
        self
    }

    pub fn add<V: ColumnValue + Ord>(mut self, getter: impl Getter<BTreeSet<V>>, value: V) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            if let Some(element) = self.element(&node, value) {
                let set = CqlValue::Set(vec![element]);
                self.push_unknown(node, Assignment::Add(node.column_name().to_cql(), set));
            }
        }
        self
    }

    pub fn remove<V: ColumnValue + Ord>(
        mut self,
        getter: impl Getter<BTreeSet<V>>,
        value: V,
    ) -> Self {
        if let Some(node) = self.resolve(getter.resolve()) {
            if let Some(element) = self.element(&node, value) {
                let set = CqlValue::Set(vec![element]);
                self.push_unknown(node, Assignment::Remove(node.column_name().to_cql(), set));
            }
        }
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
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
        let mut nodes = self.assignments.iter().map(|(node, _)| *node);
        let entity = match nodes.next() {
            Some(first) => first.entity(),
            None => self
                .filters
                .first_entity()
                .ok_or_else(|| HelenusError::mapping("no entity or table to update data"))?,
        };
        if let Some(node) = nodes.find(|n| !n.entity().same_as(entity)) {
            return Err(HelenusError::mapping(format!(
                "you can update columns only in a single entity {} or {}",
                entity,
                node.entity()
            )));
        }
        Ok(entity)
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

        let equalities = self.filters.equality_values(self.session.value_preparer());
        let keys = if self.filters.only_equalities() {
            manager.keys(&manager.bind_facet_values(&equalities))
        } else {
            Vec::new()
        };

        let mut known = Row::default();
        for (node, value) in &equalities {
            known.set(node.column_name().as_str(), Some(value.clone()));
        }
        for (node, value) in &self.known {
            known.set(node.column_name().as_str(), value.clone());
        }
        let unknown: Vec<String> = self
            .unknown
            .iter()
            .map(|node| node.column_name().as_str().to_string())
            .collect();

        let Some(uow) = uow else {
            if manager.is_session_cacheable(cache) {
                manager.merge_session(cache, &keys, &known, &unknown);
            }
            return Ok(());
        };

        if keys.is_empty() {
            uow.cache_evict_schema(entity.table().as_str());
            manager.evict_session(cache, &keys);
            return Ok(());
        }

        let mut row = match uow.cache_lookup(&keys) {
            Lookup::Found(row) => (*row).clone(),
            Lookup::Deleted => Row::default(),
            Lookup::Missing => manager
                .check_session(cache, &keys)
                .filter(|_| manager.is_session_cacheable(cache))
                .map(|row| (*row).clone())
                .unwrap_or_default(),
        };
        let previous = manager.keys(&manager.row_facets(&row));
        row.merge(&known);
        for column in &unknown {
            row.remove(column);
        }

        let facets = manager.row_facets(&row);
        let mut all = keys;
        all.extend(manager.keys(&facets));

        // Keys of superseded unique values no longer name this row
        let stale: Vec<String> = previous.into_iter().filter(|k| !all.contains(k)).collect();
        if !stale.is_empty() {
            debug!(uow = %uow.id(), keys = ?stale, "Masking superseded facet keys");
            uow.cache_delete(&stale);
        }

        let promote = entity.is_cacheable() && facets.len() >= MIN_FACETS_FOR_SESSION_CACHE;
        uow.cache_update(&all, Arc::new(row), promote);
        Ok(())
    }
}

impl FilterOperation for UpdateOperation {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }
}

impl StatementOperation for UpdateOperation {
    type Output = ResultSet;

    fn options(&self) -> &StatementOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut StatementOptions {
        &mut self.options
    }

    fn build_statement(&self) -> HelenusResult<BuiltStatement> {
        self.filters.check()?;
        let entity = self.entity()?;
        self.filters.check_entity(entity)?;
        if self.assignments.is_empty() {
            return Err(HelenusError::mapping(format!(
                "no columns to update in entity {entity}"
            )));
        }

        if self.if_exists && !self.filters.if_conditions().is_empty() {
            return Err(HelenusError::mapping(
                "only_if and if_exists cannot be combined",
            ));
        }

        let preparer = self.session.value_preparer();
        let mut update = Update::new(entity.table().to_cql());
        for (_, assignment) in &self.assignments {
            update = update.assign(assignment.clone());
        }
        for clause in self.filters.where_clauses(preparer)? {
            update = update.where_clause(clause);
        }
        for clause in self.filters.if_clauses(preparer)? {
            update = update.only_if(clause);
        }
        if self.if_exists {
            update = update.if_exists();
        }
        if let Some(ttl) = self.ttl {
            update = update.ttl(ttl);
        }
        if let Some(timestamp) = self.timestamp {
            update = update.timestamp(timestamp);
        }
        Ok(update.build())
    }
}

#[async_trait]
impl Executable for UpdateOperation {
    async fn execute_in(&self, uow: Option<&UnitOfWork>) -> HelenusResult<ResultSet> {
        let started = Instant::now();
        let result = self.apply(uow).await;
        self.session
            .metrics()
            .request_completed(OPERATION, started.elapsed());
        result
    }
}
