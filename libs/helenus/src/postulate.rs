use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{ColumnValue, PropertyNode, ValuePreparer};
use crate::operator::Operator;
use crate::query::Clause;

/// Right-hand side of a postulate
#[derive(Clone, Debug, PartialEq)]
pub enum PostulateValue<V> {
    Single(V),
    Many(Vec<V>),
}

/// An operator together with the value(s) it compares against.
///
/// `In` always carries a non-empty list; every other operator carries
/// exactly one non-null value.
#[derive(Clone, Debug, PartialEq)]
pub struct Postulate<V> {
    operator: Operator,
    value: PostulateValue<V>,
}

impl<V: ColumnValue> Postulate<V> {
    pub fn of(operator: Operator, value: V) -> HelenusResult<Self> {
        if operator == Operator::In {
            return Err(HelenusError::invalid_argument(
                "IN operator requires a list of values",
            ));
        }
        match value.try_to_cql() {
            Ok(Some(_)) => {}
            Ok(None) => return Err(HelenusError::invalid_argument("value is empty")),
            Err(e) => return Err(HelenusError::invalid_argument(format!("value is invalid: {e}"))),
        }
        Ok(Self {
            operator,
            value: PostulateValue::Single(value),
        })
    }

    pub fn of_many(operator: Operator, values: Vec<V>) -> HelenusResult<Self> {
        if operator != Operator::In {
            return Err(HelenusError::invalid_argument(format!(
                "operator '{operator}' does not accept a list of values"
            )));
        }
        if values.is_empty() {
            return Err(HelenusError::invalid_argument("values is empty"));
        }
        for (index, value) in values.iter().enumerate() {
            match value.try_to_cql() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    return Err(HelenusError::invalid_argument(format!(
                        "value[{index}] is empty"
                    )));
                }
                Err(e) => {
                    return Err(HelenusError::invalid_argument(format!(
                        "value[{index}] is invalid: {e}"
                    )));
                }
            }
        }
        Ok(Self {
            operator,
            value: PostulateValue::Many(values),
        })
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn value(&self) -> &PostulateValue<V> {
        &self.value
    }

    /// Build the driver clause, preparing every compared scalar in order
    pub fn clause(&self, node: &PropertyNode, preparer: &dyn ValuePreparer) -> HelenusResult<Clause> {
        let column = node.column_name().to_cql();
        let prepare = |v: &V| {
            v.to_cql()
                .map(|cql| preparer.prepare(node, cql))
                .ok_or_else(|| HelenusError::invalid_argument(format!("value of {node} is empty")))
        };
        match &self.value {
            PostulateValue::Single(value) => {
                Ok(Clause::new(column, self.operator, vec![prepare(value)?]))
            }
            PostulateValue::Many(values) => {
                let prepared = values.iter().map(prepare).collect::<HelenusResult<Vec<_>>>()?;
                Ok(Clause::new(column, Operator::In, prepared))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_list_rejected_for_scalar_operators() {
        for op in Operator::iter().filter(|op| *op != Operator::In) {
            assert!(Postulate::of_many(op, vec![1i32]).is_err(), "{op}");
            assert!(Postulate::of(op, 1i32).is_ok());
        }
    }

    #[test]
    fn test_scalar_rejected_for_in() {
        let err = Postulate::of(Operator::In, 1i32).unwrap_err();
        assert!(matches!(err, HelenusError::InvalidArgument(_)));
        assert!(Postulate::of_many(Operator::In, vec![1i32, 2]).is_ok());
    }

    #[test]
    fn test_null_values_rejected() {
        assert!(Postulate::of(Operator::Eq, None::<i32>).is_err());

        let err = Postulate::of_many(Operator::In, vec![Some(1i32), Some(2), None]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: value[2] is empty");

        let err = Postulate::of_many(Operator::In, Vec::<i32>::new()).unwrap_err();
        assert!(err.to_string().contains("values is empty"));

        let err = Postulate::of(Operator::Eq, vec![Some(1i32), None]).unwrap_err();
        assert!(matches!(err, HelenusError::InvalidArgument(_)));
        assert!(err.to_string().contains("list element [1] is null"));

        assert!(Postulate::of_many(Operator::In, vec![vec![1i32], vec![]]).is_ok());
        let err = Postulate::of_many(Operator::In, vec![vec![Some(1i32)], vec![None]]).unwrap_err();
        assert!(err.to_string().contains("value[1] is invalid"));
    }
}
