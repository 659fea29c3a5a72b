use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::count::CountOperation;
use super::filters::{FilterOperation, FilterSet};
use super::select_first::SelectFirstOperation;
use super::statement::{Executable, StatementOperation, StatementOptions};
use super::stream::{RowOperation, run_stream};
use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{
    ColumnValue, Entity, EntityDescriptor, Getter, OrderingDirection, Projection, PropertyNode, Row,
};
use crate::ordered::Ordered;
use crate::query::{BuiltStatement, Select};
use crate::session::HelenusSession;
use crate::uow::UnitOfWork;

type Mapper<T> = Arc<dyn Fn(&Row) -> HelenusResult<T> + Send + Sync>;

/// A SELECT over the columns of one entity.
///
/// Executing it returns every matching row. Use [`single`](Self::single) for a
/// point lookup that can be answered from the caches.
pub struct SelectOperation<T> {
    session: HelenusSession,
    options: StatementOptions,
    filters: FilterSet,
    projection: Vec<PropertyNode>,
    orderings: Vec<Ordered>,
    limit: Option<i32>,
    allow_filtering: bool,
    mapper: Mapper<T>,
}

impl<T> Clone for SelectOperation<T> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            options: self.options.clone(),
            filters: self.filters.clone(),
            projection: self.projection.clone(),
            orderings: self.orderings.clone(),
            limit: self.limit,
            allow_filtering: self.allow_filtering,
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<T> fmt::Debug for SelectOperation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectOperation")
            .field("projection", &self.projection)
            .field("filters", &self.filters)
            .field("orderings", &self.orderings)
            .field("limit", &self.limit)
            .field("allow_filtering", &self.allow_filtering)
            .finish()
    }
}

impl<T: Send + 'static> SelectOperation<T> {
    fn with_mapper(session: HelenusSession, projection: Vec<PropertyNode>, mapper: Mapper<T>) -> Self {
        Self {
            session,
            options: StatementOptions::default(),
            filters: FilterSet::default(),
            projection,
            orderings: Vec::new(),
            limit: None,
            allow_filtering: false,
            mapper,
        }
    }

    pub(crate) fn with_projection<P>(session: HelenusSession, projection: P) -> Self
    where
        P: Projection<Output = T>,
    {
        match projection.nodes() {
            Ok(nodes) => {
                let positions = nodes.clone();
                Self::with_mapper(
                    session,
                    nodes,
                    Arc::new(move |row: &Row| P::materialize(row, &positions)),
                )
            }
            Err(e) => {
                let mut op = Self::with_mapper(
                    session,
                    Vec::new(),
                    Arc::new(|_: &Row| Err(HelenusError::mapping("projection did not resolve"))),
                );
                op.filters.record(e);
                op
            }
        }
    }

    pub fn projection(&self) -> &[PropertyNode] {
        &self.projection
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn order_by<V: ColumnValue>(
        mut self,
        getter: impl Getter<V>,
        direction: OrderingDirection,
    ) -> Self {
        match Ordered::new(getter, direction) {
            Ok(ordered) => self.orderings.push(ordered),
            Err(e) => self.filters.record(e),
        }
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn allow_filtering(mut self) -> Self {
        self.allow_filtering = true;
        self
    }

    /// Point lookup of the first matching row
    pub fn single(self) -> SelectFirstOperation<T> {
        SelectFirstOperation::new(self.limit(1))
    }

    /// Transform every materialized item
    pub fn map<U, F>(self, f: F) -> SelectOperation<U>
    where
        U: Send + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let mapper = self.mapper.clone();
        self.replace_mapper::<U>(Arc::new(move |row: &Row| mapper(row).map(&f)))
    }

    /// Replace the materialization with a function of the raw row
    pub fn map_rows<U, F>(self, f: F) -> SelectOperation<U>
    where
        U: Send + 'static,
        F: Fn(&Row) -> HelenusResult<U> + Send + Sync + 'static,
    {
        self.replace_mapper::<U>(Arc::new(f))
    }

    /// Select every column of `E` and map rows to full entities
    pub fn map_to<E: Entity>(self) -> SelectOperation<E> {
        let descriptor = E::descriptor();
        let foreign = self
            .projection
            .iter()
            .find(|node| !node.entity().same_as(descriptor))
            .copied();
        let mut op = self.replace_mapper::<E>(Arc::new(E::from_row));
        op.projection = descriptor.nodes();
        if let Some(node) = foreign {
            op.filters.record(HelenusError::mapping(format!(
                "cannot map {} to entity {}",
                node, descriptor
            )));
        }
        op
    }

    /// Count the rows matching the same filters
    pub fn count(self) -> CountOperation {
        match self.entity() {
            Ok(entity) => {
                CountOperation::from_parts(self.session, self.options, self.filters, Some(entity))
            }
            Err(e) => {
                let mut filters = self.filters;
                filters.record(e);
                CountOperation::from_parts(self.session, self.options, filters, None)
            }
        }
    }

    fn replace_mapper<U: Send + 'static>(self, mapper: Mapper<U>) -> SelectOperation<U> {
        SelectOperation {
            session: self.session,
            options: self.options,
            filters: self.filters,
            projection: self.projection,
            orderings: self.orderings,
            limit: self.limit,
            allow_filtering: self.allow_filtering,
            mapper,
        }
    }

    /// The single entity every projected column belongs to
    pub(crate) fn entity(&self) -> HelenusResult<&'static EntityDescriptor> {
        let mut entity: Option<&'static EntityDescriptor> = None;
        for node in &self.projection {
            match entity {
                None => entity = Some(node.entity()),
                Some(e) if !e.same_as(node.entity()) => {
                    return Err(HelenusError::mapping(format!(
                        "you can select columns only from a single entity {} or {}",
                        e,
                        node.entity()
                    )));
                }
                Some(_) => {}
            }
        }
        entity.ok_or_else(|| HelenusError::mapping("no entity or table to select data"))
    }

    pub(crate) fn session(&self) -> &HelenusSession {
        &self.session
    }

    pub(crate) fn materialize(&self, row: &Row) -> HelenusResult<T> {
        (self.mapper)(row)
    }
}

impl SelectOperation<Row> {
    pub(crate) fn raw(session: HelenusSession) -> Self {
        Self::with_mapper(session, Vec::new(), Arc::new(|row: &Row| Ok(row.clone())))
    }

    /// Add one column to a raw row selection
    pub fn column<V: ColumnValue>(mut self, getter: impl Getter<V>) -> Self {
        match getter.resolve() {
            Ok(node) => self.projection.push(node),
            Err(e) => self.filters.record(e),
        }
        self
    }
}

impl<E: Entity> SelectOperation<E> {
    pub(crate) fn all(session: HelenusSession) -> Self {
        Self::with_mapper(session, E::descriptor().nodes(), Arc::new(E::from_row))
    }
}

impl<T> FilterOperation for SelectOperation<T> {
    fn filters_mut(&mut self) -> &mut FilterSet {
        &mut self.filters
    }
}

impl<T: Send + 'static> StatementOperation for SelectOperation<T> {
    type Output = Vec<T>;

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

        let columns = self
            .projection
            .iter()
            .map(|node| node.column_name().to_cql())
            .collect();
        let mut select = Select::columns(entity.table().to_cql(), columns);

        for ordered in &self.orderings {
            select = select.order_by(ordered.ordering());
        }
        if let Some(limit) = self.limit {
            select = select.limit(limit);
        }
        for clause in self.filters.where_clauses(self.session.value_preparer())? {
            select = select.where_clause(clause);
        }

        let case_sensitive = self
            .projection
            .iter()
            .any(|node| node.property().case_sensitive_index());
        if self.allow_filtering || case_sensitive {
            select = select.allow_filtering();
        }

        let statement = select.build();
        if !self.filters.if_conditions().is_empty() {
            warn!(
                conditions = ?self.filters.if_conditions(),
                cql = %statement.cql,
                "onlyIf conditions would be ignored in the statement"
            );
        }
        Ok(statement)
    }
}

impl<T: Send + 'static> RowOperation for SelectOperation<T> {
    type Item = T;

    const OPERATION: &'static str = "select";

    fn session(&self) -> &HelenusSession {
        &self.session
    }

    fn transform(&self, row: &Row) -> HelenusResult<T> {
        self.materialize(row)
    }
}

#[async_trait]
impl<T: Send + 'static> Executable for SelectOperation<T> {
    async fn execute_in(&self, uow: Option<&UnitOfWork>) -> HelenusResult<Vec<T>> {
        run_stream(self, uow).await
    }
}
