use crate::error::{HelenusError, HelenusResult};
use crate::mapping::{ColumnType, ColumnValue, Getter, OrderingDirection, PropertyNode};
use crate::query::Ordering;

/// An ORDER BY entry; only clustering columns can be ordered
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ordered {
    node: PropertyNode,
    direction: OrderingDirection,
}

impl Ordered {
    pub fn new<V: ColumnValue>(
        getter: impl Getter<V>,
        direction: OrderingDirection,
    ) -> HelenusResult<Self> {
        let node = getter.resolve()?;
        if node.property().column_type() != ColumnType::ClusteringColumn {
            return Err(HelenusError::mapping(format!(
                "property must be a clustering column {node}"
            )));
        }
        Ok(Self { node, direction })
    }

    pub fn node(&self) -> PropertyNode {
        self.node
    }

    pub fn ordering(&self) -> Ordering {
        Ordering {
            column: self.node.column_name().to_cql(),
            direction: self.direction,
        }
    }
}
