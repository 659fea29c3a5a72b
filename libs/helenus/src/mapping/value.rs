use std::collections::BTreeSet;
use std::fmt::Debug;

use scylla::value::CqlValue;
use thiserror::Error;
use uuid::Uuid;

use super::PropertyNode;

/// Why a value could not cross between Rust and CQL
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("column not present in row")]
    Missing,

    #[error("expected {expected}, found null")]
    Null { expected: &'static str },

    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: String,
    },

    #[error("{collection} element [{index}] is null")]
    NullElement {
        collection: &'static str,
        index: usize,
    },
}

/// A Rust value that can be bound into a statement or read back from a row.
///
/// `None` from [`to_cql`](ColumnValue::to_cql) is a CQL null.
pub trait ColumnValue: Clone + Debug + Send + Sync + 'static {
    fn to_cql(&self) -> Option<CqlValue>;

    /// Like [`to_cql`](ColumnValue::to_cql), but reports values that have no
    /// CQL form, such as a collection holding a null element
    fn try_to_cql(&self) -> Result<Option<CqlValue>, ValueError> {
        Ok(self.to_cql())
    }

    fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError>;
}

fn unexpected(expected: &'static str, found: Option<CqlValue>) -> ValueError {
    match found {
        Some(other) => ValueError::Mismatch {
            expected,
            found: format!("{other:?}"),
        },
        None => ValueError::Null { expected },
    }
}

fn elements<'a, T: ColumnValue>(
    collection: &'static str,
    items: impl Iterator<Item = &'a T>,
) -> Result<Vec<CqlValue>, ValueError> {
    items
        .enumerate()
        .map(|(index, item)| {
            item.try_to_cql()?
                .ok_or(ValueError::NullElement { collection, index })
        })
        .collect()
}

macro_rules! copy_column_value {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl ColumnValue for $ty {
            fn to_cql(&self) -> Option<CqlValue> {
                Some(CqlValue::$variant(*self))
            }

            fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError> {
                match value {
                    Some(CqlValue::$variant(v)) => Ok(v),
                    other => Err(unexpected($name, other)),
                }
            }
        }
    };
}

copy_column_value!(bool, Boolean, "boolean");
copy_column_value!(i8, TinyInt, "tinyint");
copy_column_value!(i16, SmallInt, "smallint");
copy_column_value!(i32, Int, "int");
copy_column_value!(f32, Float, "float");
copy_column_value!(f64, Double, "double");
copy_column_value!(Uuid, Uuid, "uuid");

impl ColumnValue for i64 {
    fn to_cql(&self) -> Option<CqlValue> {
        Some(CqlValue::BigInt(*self))
    }

    fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError> {
        match value {
            Some(CqlValue::BigInt(v)) => Ok(v),
            Some(CqlValue::Counter(counter)) => Ok(counter.0),
            other => Err(unexpected("bigint", other)),
        }
    }
}

impl ColumnValue for String {
    fn to_cql(&self) -> Option<CqlValue> {
        Some(CqlValue::Text(self.clone()))
    }

    fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError> {
        match value {
            Some(CqlValue::Text(v)) | Some(CqlValue::Ascii(v)) => Ok(v),
            other => Err(unexpected("text", other)),
        }
    }
}

impl ColumnValue for CqlValue {
    fn to_cql(&self) -> Option<CqlValue> {
        Some(self.clone())
    }

    fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError> {
        value.ok_or(ValueError::Null { expected: "value" })
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    fn to_cql(&self) -> Option<CqlValue> {
        self.as_ref().and_then(T::to_cql)
    }

    fn try_to_cql(&self) -> Result<Option<CqlValue>, ValueError> {
        match self {
            Some(value) => value.try_to_cql(),
            None => Ok(None),
        }
    }

    fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError> {
        match value {
            None => Ok(None),
            some => T::from_cql(some).map(Some),
        }
    }
}

// Cassandra returns null for empty collections. A collection holding a null
// element has no CQL form.
impl<T: ColumnValue> ColumnValue for Vec<T> {
    fn to_cql(&self) -> Option<CqlValue> {
        self.try_to_cql().ok().flatten()
    }

    fn try_to_cql(&self) -> Result<Option<CqlValue>, ValueError> {
        elements("list", self.iter()).map(|items| Some(CqlValue::List(items)))
    }

    fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError> {
        match value {
            None => Ok(Vec::new()),
            Some(CqlValue::List(items)) | Some(CqlValue::Set(items)) => items
                .into_iter()
                .map(|item| T::from_cql(Some(item)))
                .collect(),
            other => Err(unexpected("list", other)),
        }
    }
}

impl<T: ColumnValue + Ord> ColumnValue for BTreeSet<T> {
    fn to_cql(&self) -> Option<CqlValue> {
        self.try_to_cql().ok().flatten()
    }

    fn try_to_cql(&self) -> Result<Option<CqlValue>, ValueError> {
        elements("set", self.iter()).map(|items| Some(CqlValue::Set(items)))
    }

    fn from_cql(value: Option<CqlValue>) -> Result<Self, ValueError> {
        match value {
            None => Ok(BTreeSet::new()),
            Some(CqlValue::Set(items)) | Some(CqlValue::List(items)) => items
                .into_iter()
                .map(|item| T::from_cql(Some(item)))
                .collect(),
            other => Err(unexpected("set", other)),
        }
    }
}

/// Hook applied to every scalar before it is bound into a clause
pub trait ValuePreparer: Debug + Send + Sync {
    fn prepare(&self, node: &PropertyNode, value: CqlValue) -> CqlValue;
}

/// Binds values unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultValuePreparer;

impl ValuePreparer for DefaultValuePreparer {
    fn prepare(&self, _node: &PropertyNode, value: CqlValue) -> CqlValue {
        value
    }
}

/// Stable text form of a value, used inside cache keys
pub fn render_value(value: &CqlValue) -> String {
    match value {
        CqlValue::Text(s) | CqlValue::Ascii(s) => s.clone(),
        CqlValue::Boolean(v) => v.to_string(),
        CqlValue::TinyInt(v) => v.to_string(),
        CqlValue::SmallInt(v) => v.to_string(),
        CqlValue::Int(v) => v.to_string(),
        CqlValue::BigInt(v) => v.to_string(),
        CqlValue::Counter(v) => v.0.to_string(),
        CqlValue::Float(v) => v.to_string(),
        CqlValue::Double(v) => v.to_string(),
        CqlValue::Uuid(v) => v.to_string(),
        CqlValue::List(items) | CqlValue::Set(items) => {
            let rendered: Vec<String> = items.iter().map(render_value).collect();
            format!("[{}]", rendered.join(","))
        }
        other => format!("{other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_null() {
        assert_eq!(None::<i32>.to_cql(), None);
        assert_eq!(Some(7i32).to_cql(), Some(CqlValue::Int(7)));
        assert_eq!(Option::<i32>::from_cql(None), Ok(None));
    }

    #[test]
    fn test_string_accepts_ascii() {
        let value = String::from_cql(Some(CqlValue::Ascii("alex".into()))).unwrap();
        assert_eq!(value, "alex");
    }

    #[test]
    fn test_type_mismatch_reports_found_value() {
        let err = i32::from_cql(Some(CqlValue::Text("x".into()))).unwrap_err();
        assert!(matches!(err, ValueError::Mismatch { expected: "int", .. }));
        assert!(err.to_string().starts_with("expected int"));
        assert_eq!(
            i32::from_cql(None).unwrap_err(),
            ValueError::Null { expected: "int" }
        );
    }

    #[test]
    fn test_collections() {
        let list = vec![1i32, 2];
        assert_eq!(
            list.to_cql(),
            Some(CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2)]))
        );
        assert_eq!(Vec::<i32>::from_cql(None), Ok(vec![]));

        let set: BTreeSet<String> = ["b".to_string(), "a".to_string()].into();
        assert_eq!(
            set.to_cql(),
            Some(CqlValue::Set(vec![
                CqlValue::Text("a".into()),
                CqlValue::Text("b".into())
            ]))
        );
    }

    #[test]
    fn test_null_collection_elements_are_rejected() {
        let list = vec![Some(1i32), None, Some(3)];
        assert_eq!(
            list.try_to_cql(),
            Err(ValueError::NullElement {
                collection: "list",
                index: 1
            })
        );
        assert_eq!(list.to_cql(), None);

        let set: BTreeSet<Option<i32>> = [None, Some(2)].into();
        let err = set.try_to_cql().unwrap_err();
        assert_eq!(err.to_string(), "set element [0] is null");

        assert_eq!(
            vec![Some(1i32)].try_to_cql(),
            Ok(Some(CqlValue::List(vec![CqlValue::Int(1)])))
        );
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&CqlValue::Int(100)), "100");
        assert_eq!(render_value(&CqlValue::Text("alex".into())), "alex");
        assert_eq!(
            render_value(&CqlValue::List(vec![CqlValue::Int(1), CqlValue::Int(2)])),
            "[1,2]"
        );
    }
}
