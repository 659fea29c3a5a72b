use std::fmt;

use scylla::value::CqlValue;

use crate::mapping::{PropertyNode, Row, render_value};

const TABLE_FACET: &str = "table";

/// A bound cache key: ordered `(column, value)` pairs identifying one row.
///
/// The `table` facet is fixed: it names the schema but is never used as a
/// lookup key itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Facet {
    pairs: Vec<(String, String)>,
    fixed: bool,
}

impl Facet {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self {
            pairs,
            fixed: false,
        }
    }

    pub fn table(name: impl Into<String>) -> Self {
        Self {
            pairs: vec![(TABLE_FACET.to_string(), name.into())],
            fixed: true,
        }
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// Table name carried by a fixed table facet
    pub fn table_name(&self) -> Option<&str> {
        match self.pairs.as_slice() {
            [(name, value)] if self.fixed && name == TABLE_FACET => Some(value),
            _ => None,
        }
    }

    /// `column==value` pairs joined with `;`
    pub fn key(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{name}=={value}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A facet shape declared by an entity, waiting for values
#[derive(Clone, Debug, PartialEq)]
pub struct UnboundFacet {
    nodes: Vec<PropertyNode>,
}

impl UnboundFacet {
    pub fn new(nodes: Vec<PropertyNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[PropertyNode] {
        &self.nodes
    }

    /// Bind every property; `None` when any of them has no value
    pub fn bind(&self, value_of: impl Fn(&PropertyNode) -> Option<CqlValue>) -> Option<Facet> {
        self.nodes
            .iter()
            .map(|node| {
                value_of(node)
                    .map(|value| (node.column_name().as_str().to_string(), render_value(&value)))
            })
            .collect::<Option<Vec<_>>>()
            .map(Facet::new)
    }

    /// Bind from the non-null values of a row
    pub fn bind_row(&self, row: &Row) -> Option<Facet> {
        self.bind(|node| row.value(node.column_name().as_str()).cloned().flatten())
    }
}
