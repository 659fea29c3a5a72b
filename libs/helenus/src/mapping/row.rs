use std::sync::Arc;

use scylla::value::CqlValue;

use super::{ColumnValue, Getter, PropertyNode, ValueError};
use crate::error::{HelenusError, HelenusResult};

const APPLIED_COLUMN: &str = "[applied]";

/// One result row: column names as reported by the cluster, with their values
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    values: Vec<Option<CqlValue>>,
}

impl Row {
    pub fn new(columns: Arc<Vec<String>>, values: Vec<Option<CqlValue>>) -> Self {
        Self { columns, values }
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Option<CqlValue>)>,
        S: Into<String>,
    {
        let (columns, values): (Vec<String>, Vec<Option<CqlValue>>) =
            pairs.into_iter().map(|(c, v)| (c.into(), v)).unzip();
        Self {
            columns: Arc::new(columns),
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Raw value of a column; `None` when the column is absent, `Some(None)` when null
    pub fn value(&self, column: &str) -> Option<&Option<CqlValue>> {
        self.position(column).map(|i| &self.values[i])
    }

    pub fn value_at(&self, index: usize) -> Option<&Option<CqlValue>> {
        self.values.get(index)
    }

    pub fn get_by_column<V: ColumnValue>(&self, column: &str) -> HelenusResult<V> {
        let value = self.value(column).ok_or_else(|| HelenusError::Conversion {
            column: column.to_string(),
            source: ValueError::Missing,
        })?;
        V::from_cql(value.clone()).map_err(|source| HelenusError::Conversion {
            column: column.to_string(),
            source,
        })
    }

    pub fn get_node<V: ColumnValue>(&self, node: &PropertyNode) -> HelenusResult<V> {
        self.get_by_column(node.column_name().as_str())
    }

    /// Read the column behind a typed getter
    pub fn get<V: ColumnValue>(&self, getter: impl Getter<V>) -> HelenusResult<V> {
        self.get_node(&getter.resolve()?)
    }

    pub fn set(&mut self, column: &str, value: Option<CqlValue>) {
        match self.position(column) {
            Some(i) => self.values[i] = value,
            None => {
                Arc::make_mut(&mut self.columns).push(column.to_string());
                self.values.push(value);
            }
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<Option<CqlValue>> {
        let i = self.position(column)?;
        Arc::make_mut(&mut self.columns).remove(i);
        Some(self.values.remove(i))
    }

    /// Overlay every column of `other` onto this row
    pub fn merge(&mut self, other: &Row) {
        for (column, value) in other.columns.iter().zip(&other.values) {
            self.set(column, value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Option<CqlValue>)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

/// Rows returned by one statement execution
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultSet {
    columns: Arc<Vec<String>>,
    rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Option<CqlValue>>>) -> Self {
        let columns = Arc::new(columns);
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&columns), values))
            .collect();
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|r| Arc::clone(&r.columns))
            .unwrap_or_default();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Outcome of a lightweight transaction; plain statements are always applied
    pub fn was_applied(&self) -> bool {
        match self.first().and_then(|row| row.value(APPLIED_COLUMN)) {
            Some(Some(CqlValue::Boolean(applied))) => *applied,
            _ => true,
        }
    }
}

/// Columns selected by a read, materialized into a typed value per row.
///
/// Implemented for a single [`Property`](super::Property) and for tuples of
/// up to six of them; tuple elements follow the declared projection order.
pub trait Projection: Send + Sync + 'static {
    type Output: Send + 'static;

    fn nodes(&self) -> HelenusResult<Vec<PropertyNode>>;

    fn materialize(row: &Row, nodes: &[PropertyNode]) -> HelenusResult<Self::Output>;
}

fn projected(nodes: &[PropertyNode], index: usize) -> HelenusResult<&PropertyNode> {
    nodes.get(index).ok_or_else(|| {
        HelenusError::mapping(format!("projection has no column at position {index}"))
    })
}

impl<E, V> Projection for super::Property<E, V>
where
    E: super::Entity,
    V: ColumnValue,
{
    type Output = V;

    fn nodes(&self) -> HelenusResult<Vec<PropertyNode>> {
        Ok(vec![self.resolve()?])
    }

    fn materialize(row: &Row, nodes: &[PropertyNode]) -> HelenusResult<V> {
        row.get_node(projected(nodes, 0)?)
    }
}

macro_rules! tuple_projection {
    ($($idx:tt => $E:ident, $V:ident);+) => {
        impl<$($E, $V),+> Projection for ($(super::Property<$E, $V>,)+)
        where
            $($E: super::Entity, $V: ColumnValue,)+
        {
            type Output = ($($V,)+);

            fn nodes(&self) -> HelenusResult<Vec<PropertyNode>> {
                Ok(vec![$(self.$idx.resolve()?),+])
            }

            fn materialize(row: &Row, nodes: &[PropertyNode]) -> HelenusResult<Self::Output> {
                Ok(($(row.get_node::<$V>(projected(nodes, $idx)?)?,)+))
            }
        }
    };
}

tuple_projection!(0 => E0, V0);
tuple_projection!(0 => E0, V0; 1 => E1, V1);
tuple_projection!(0 => E0, V0; 1 => E1, V1; 2 => E2, V2);
tuple_projection!(0 => E0, V0; 1 => E1, V1; 2 => E2, V2; 3 => E3, V3);
tuple_projection!(0 => E0, V0; 1 => E1, V1; 2 => E2, V2; 3 => E3, V3; 4 => E4, V4);
tuple_projection!(0 => E0, V0; 1 => E1, V1; 2 => E2, V2; 3 => E3, V3; 4 => E4, V4; 5 => E5, V5);
