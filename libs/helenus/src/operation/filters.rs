use std::sync::Arc;

use scylla::value::CqlValue;

use crate::error::{HelenusError, HelenusResult, PendingError};
use crate::filter::{Condition, Filter, IntoCondition};
use crate::mapping::{ColumnValue, EntityDescriptor, Getter, PropertyNode, Row, ValuePreparer};
use crate::operator::Operator;
use crate::query::Clause;

/// WHERE and IF conditions of one statement, plus the first construction error
#[derive(Clone, Debug, Default)]
pub struct FilterSet {
    where_: Vec<Arc<dyn Condition>>,
    if_: Vec<Arc<dyn Condition>>,
    pending: PendingError,
}

impl FilterSet {
    pub(crate) fn record(&mut self, error: HelenusError) {
        self.pending.record(error);
    }

    pub(crate) fn check(&self) -> HelenusResult<()> {
        self.pending.check()
    }

    pub(crate) fn push_where(&mut self, condition: impl IntoCondition) {
        match condition.into_condition() {
            Ok(c) => self.where_.push(c),
            Err(e) => self.record(e),
        }
    }

    pub(crate) fn push_if(&mut self, condition: impl IntoCondition) {
        match condition.into_condition() {
            Ok(c) => self.if_.push(c),
            Err(e) => self.record(e),
        }
    }

    pub fn where_conditions(&self) -> &[Arc<dyn Condition>] {
        &self.where_
    }

    pub fn if_conditions(&self) -> &[Arc<dyn Condition>] {
        &self.if_
    }

    pub fn is_empty(&self) -> bool {
        self.where_.is_empty()
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = PropertyNode> + '_ {
        self.where_.iter().chain(self.if_.iter()).map(|c| c.node())
    }

    /// Entity of the first condition, for statements anchored on their filters
    pub(crate) fn first_entity(&self) -> Option<&'static EntityDescriptor> {
        self.nodes().next().map(|n| n.entity())
    }

    /// Reject conditions on properties of another entity
    pub(crate) fn check_entity(&self, entity: &'static EntityDescriptor) -> HelenusResult<()> {
        match self.nodes().find(|n| !n.entity().same_as(entity)) {
            Some(node) => Err(HelenusError::mapping(format!(
                "filter on {} does not belong to entity {}",
                node, entity
            ))),
            None => Ok(()),
        }
    }

    pub(crate) fn where_clauses(&self, preparer: &dyn ValuePreparer) -> HelenusResult<Vec<Clause>> {
        self.where_.iter().map(|c| c.clause(preparer)).collect()
    }

    pub(crate) fn if_clauses(&self, preparer: &dyn ValuePreparer) -> HelenusResult<Vec<Clause>> {
        self.if_.iter().map(|c| c.clause(preparer)).collect()
    }

    /// Prepared values of every equality WHERE condition
    pub(crate) fn equality_values(
        &self,
        preparer: &dyn ValuePreparer,
    ) -> Vec<(PropertyNode, CqlValue)> {
        self.where_
            .iter()
            .filter_map(|c| c.equality_value(preparer).map(|v| (c.node(), v)))
            .collect()
    }

    /// Whether every WHERE condition is an equality
    pub(crate) fn only_equalities(&self) -> bool {
        self.where_.iter().all(|c| c.operator() == Operator::Eq)
    }
}

/// Whether `row` agrees with every equality value
pub(crate) fn row_matches(row: &Row, equalities: &[(PropertyNode, CqlValue)]) -> bool {
    equalities.iter().all(|(node, value)| {
        matches!(row.value(node.column_name().as_str()), Some(Some(v)) if v == value)
    })
}

/// Operations that accept WHERE and IF conditions.
///
/// Invalid conditions do not fail the chain; the first error is returned
/// when the statement is built.
pub trait FilterOperation: Sized {
    fn filters_mut(&mut self) -> &mut FilterSet;

    fn where_(mut self, condition: impl IntoCondition) -> Self {
        self.filters_mut().push_where(condition);
        self
    }

    fn where_eq<V: ColumnValue>(self, getter: impl Getter<V>, value: V) -> Self {
        self.where_(Filter::equal(getter, value))
    }

    fn and(self, condition: impl IntoCondition) -> Self {
        self.where_(condition)
    }

    fn and_eq<V: ColumnValue>(self, getter: impl Getter<V>, value: V) -> Self {
        self.where_eq(getter, value)
    }

    fn only_if(mut self, condition: impl IntoCondition) -> Self {
        self.filters_mut().push_if(condition);
        self
    }

    fn only_if_eq<V: ColumnValue>(self, getter: impl Getter<V>, value: V) -> Self {
        self.only_if(Filter::equal(getter, value))
    }
}
