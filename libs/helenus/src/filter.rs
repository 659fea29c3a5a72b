use std::fmt;
use std::sync::Arc;

use scylla::value::CqlValue;

use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{ColumnValue, Entity, Getter, Property, PropertyNode, ValuePreparer};
use crate::operator::Operator;
use crate::postulate::{Postulate, PostulateValue};
use crate::query::Clause;

/// A resolved property compared through a [`Postulate`]
#[derive(Clone, PartialEq)]
pub struct Filter<V> {
    node: PropertyNode,
    postulate: Postulate<V>,
}

impl<V: ColumnValue> Filter<V> {
    pub fn with_postulate(getter: impl Getter<V>, postulate: Postulate<V>) -> HelenusResult<Self> {
        Ok(Self {
            node: getter.resolve()?,
            postulate,
        })
    }

    pub fn create(getter: impl Getter<V>, operator: Operator, value: V) -> HelenusResult<Self> {
        if operator == Operator::In {
            return Err(HelenusError::invalid_argument(
                "use Filter::is_in for the IN operator",
            ));
        }
        Self::with_postulate(getter, Postulate::of(operator, value)?)
    }

    /// Create a filter from a textual operator such as `"=="` or `">="`
    pub fn parse(getter: impl Getter<V>, operator: &str, value: V) -> HelenusResult<Self> {
        let op = Operator::find_by_operator(operator)
            .ok_or_else(|| HelenusError::mapping(format!("invalid operator {operator}")))?;
        Self::create(getter, op, value)
    }

    pub fn equal(getter: impl Getter<V>, value: V) -> HelenusResult<Self> {
        Self::create(getter, Operator::Eq, value)
    }

    pub fn is_in(getter: impl Getter<V>, values: Vec<V>) -> HelenusResult<Self> {
        let node = getter.resolve()?;
        Ok(Self {
            node,
            postulate: Postulate::of_many(Operator::In, values)?,
        })
    }

    pub fn greater_than(getter: impl Getter<V>, value: V) -> HelenusResult<Self> {
        Self::create(getter, Operator::Gt, value)
    }

    pub fn less_than(getter: impl Getter<V>, value: V) -> HelenusResult<Self> {
        Self::create(getter, Operator::Lt, value)
    }

    pub fn greater_than_or_equal(getter: impl Getter<V>, value: V) -> HelenusResult<Self> {
        Self::create(getter, Operator::Gte, value)
    }

    pub fn less_than_or_equal(getter: impl Getter<V>, value: V) -> HelenusResult<Self> {
        Self::create(getter, Operator::Lte, value)
    }

    pub fn node(&self) -> PropertyNode {
        self.node
    }

    pub fn postulate(&self) -> &Postulate<V> {
        &self.postulate
    }
}

impl<V: ColumnValue> fmt::Debug for Filter<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.postulate.value() {
            PostulateValue::Single(v) => {
                write!(f, "{} {} {:?}", self.node, self.postulate.operator(), v)
            }
            PostulateValue::Many(vs) => write!(f, "{} in {:?}", self.node, vs),
        }
    }
}

/// A filter with its value type erased, as stored by statement operations
pub trait Condition: fmt::Debug + Send + Sync {
    fn node(&self) -> PropertyNode;

    fn operator(&self) -> Operator;

    fn clause(&self, preparer: &dyn ValuePreparer) -> HelenusResult<Clause>;

    /// Prepared value of an equality filter
    fn equality_value(&self, preparer: &dyn ValuePreparer) -> Option<CqlValue>;
}

impl<V: ColumnValue> Condition for Filter<V> {
    fn node(&self) -> PropertyNode {
        self.node
    }

    fn operator(&self) -> Operator {
        self.postulate.operator()
    }

    fn clause(&self, preparer: &dyn ValuePreparer) -> HelenusResult<Clause> {
        self.postulate.clause(&self.node, preparer)
    }

    fn equality_value(&self, preparer: &dyn ValuePreparer) -> Option<CqlValue> {
        match (self.postulate.operator(), self.postulate.value()) {
            (Operator::Eq, PostulateValue::Single(v)) => {
                v.to_cql().map(|cql| preparer.prepare(&self.node, cql))
            }
            _ => None,
        }
    }
}

/// Anything that can be attached as a WHERE or IF condition
pub trait IntoCondition {
    fn into_condition(self) -> HelenusResult<Arc<dyn Condition>>;
}

impl<V: ColumnValue> IntoCondition for Filter<V> {
    fn into_condition(self) -> HelenusResult<Arc<dyn Condition>> {
        Ok(Arc::new(self))
    }
}

impl<V: ColumnValue> IntoCondition for HelenusResult<Filter<V>> {
    fn into_condition(self) -> HelenusResult<Arc<dyn Condition>> {
        self.map(|f| Arc::new(f) as Arc<dyn Condition>)
    }
}

/// Filter shorthands on property tokens, e.g. `User::ID.eq(100)`
impl<E: Entity, V: ColumnValue> Property<E, V> {
    pub fn eq(self, value: V) -> HelenusResult<Filter<V>> {
        Filter::equal(self, value)
    }

    pub fn is_in(self, values: Vec<V>) -> HelenusResult<Filter<V>> {
        Filter::is_in(self, values)
    }

    pub fn lt(self, value: V) -> HelenusResult<Filter<V>> {
        Filter::less_than(self, value)
    }

    pub fn lte(self, value: V) -> HelenusResult<Filter<V>> {
        Filter::less_than_or_equal(self, value)
    }

    pub fn gt(self, value: V) -> HelenusResult<Filter<V>> {
        Filter::greater_than(self, value)
    }

    pub fn gte(self, value: V) -> HelenusResult<Filter<V>> {
        Filter::greater_than_or_equal(self, value)
    }
}
