use std::fmt;
use std::ptr;

use strum::Display;

use crate::cache::UnboundFacet;
use crate::error::{HelenusError, HelenusResult};

/// A CQL identifier; names that are not plain lowercase are double-quoted in CQL
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentifierName {
    name: String,
    quoted: bool,
}

impl IdentifierName {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let quoted = !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        Self { name, quoted }
    }

    /// Name as the cluster reports it in result metadata
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Name as written into a statement
    pub fn to_cql(&self) -> String {
        if self.quoted {
            format!("\"{}\"", self.name.replace('"', "\"\""))
        } else {
            self.name.clone()
        }
    }
}

impl fmt::Display for IdentifierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cql())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ColumnType {
    PartitionKey,
    ClusteringColumn,
    Column,
    StaticColumn,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum OrderingDirection {
    #[strum(to_string = "ASC")]
    Asc,
    #[strum(to_string = "DESC")]
    Desc,
}

/// Mapping metadata for one entity property
#[derive(Clone, Debug)]
pub struct PropertyDescriptor {
    name: &'static str,
    column: IdentifierName,
    column_type: ColumnType,
    ordering: Option<OrderingDirection>,
    indexed: bool,
    case_sensitive_index: bool,
    unique: bool,
}

impl PropertyDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn column_name(&self) -> &IdentifierName {
        &self.column
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn ordering(&self) -> Option<OrderingDirection> {
        self.ordering
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn case_sensitive_index(&self) -> bool {
        self.case_sensitive_index
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(
            self.column_type,
            ColumnType::PartitionKey | ColumnType::ClusteringColumn
        )
    }
}

/// Schema description of one entity, built once and kept for the process lifetime.
///
/// ```ignore
/// static USERS: LazyLock<EntityDescriptor> = LazyLock::new(|| {
///     EntityDescriptor::builder("User", "simple_users")
///         .cacheable(true)
///         .partition_key("id")
///         .column("name")
///         .with_column_name("override_name")
///         .column("age")
///         .build()
/// });
/// ```
#[derive(Debug)]
pub struct EntityDescriptor {
    name: &'static str,
    table: IdentifierName,
    cacheable: bool,
    properties: Vec<PropertyDescriptor>,
}

impl EntityDescriptor {
    pub fn builder(name: &'static str, table: impl Into<String>) -> EntityDescriptorBuilder {
        EntityDescriptorBuilder {
            name,
            table: IdentifierName::new(table),
            cacheable: false,
            properties: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn table(&self) -> &IdentifierName {
        &self.table
    }

    pub fn is_cacheable(&self) -> bool {
        self.cacheable
    }

    pub fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }

    /// Resolve a property by name
    pub fn node(&'static self, property: &str) -> HelenusResult<PropertyNode> {
        self.properties
            .iter()
            .position(|p| p.name == property)
            .map(|index| PropertyNode {
                entity: self,
                index,
            })
            .ok_or_else(|| {
                HelenusError::mapping(format!(
                    "unresolved getter {} on entity {}",
                    property, self.name
                ))
            })
    }

    /// Resolve a property by its column name as reported in result metadata
    pub fn node_by_column(&'static self, column: &str) -> Option<PropertyNode> {
        self.properties
            .iter()
            .position(|p| p.column.as_str() == column)
            .map(|index| PropertyNode {
                entity: self,
                index,
            })
    }

    pub fn nodes(&'static self) -> Vec<PropertyNode> {
        (0..self.properties.len())
            .map(|index| PropertyNode {
                entity: self,
                index,
            })
            .collect()
    }

    /// Partition key columns followed by clustering columns
    pub fn primary_key(&'static self) -> Vec<PropertyNode> {
        let nodes = self.nodes();
        let partition = nodes
            .iter()
            .filter(|n| n.property().column_type == ColumnType::PartitionKey);
        let clustering = nodes
            .iter()
            .filter(|n| n.property().column_type == ColumnType::ClusteringColumn);
        partition.chain(clustering).copied().collect()
    }

    /// Cache key shapes: the primary key plus one per unique column
    pub fn facets(&'static self) -> Vec<UnboundFacet> {
        let mut facets = Vec::new();
        let primary_key = self.primary_key();
        if !primary_key.is_empty() {
            facets.push(UnboundFacet::new(primary_key));
        }
        facets.extend(
            self.nodes()
                .into_iter()
                .filter(|n| n.property().unique && !n.property().is_primary_key())
                .map(|n| UnboundFacet::new(vec![n])),
        );
        facets
    }

    pub fn same_as(&self, other: &EntityDescriptor) -> bool {
        ptr::eq(self, other)
    }
}

impl fmt::Display for EntityDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

pub struct EntityDescriptorBuilder {
    name: &'static str,
    table: IdentifierName,
    cacheable: bool,
    properties: Vec<PropertyDescriptor>,
}

impl EntityDescriptorBuilder {
    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    fn push(mut self, name: &'static str, column_type: ColumnType) -> Self {
        self.properties.push(PropertyDescriptor {
            name,
            column: IdentifierName::new(name),
            column_type,
            ordering: None,
            indexed: false,
            case_sensitive_index: false,
            unique: false,
        });
        self
    }

    fn last(mut self, update: impl FnOnce(&mut PropertyDescriptor)) -> Self {
        if let Some(property) = self.properties.last_mut() {
            update(property);
        }
        self
    }

    pub fn partition_key(self, name: &'static str) -> Self {
        self.push(name, ColumnType::PartitionKey)
    }

    pub fn clustering_column(self, name: &'static str, ordering: OrderingDirection) -> Self {
        self.push(name, ColumnType::ClusteringColumn)
            .last(|p| p.ordering = Some(ordering))
    }

    pub fn column(self, name: &'static str) -> Self {
        self.push(name, ColumnType::Column)
    }

    pub fn static_column(self, name: &'static str) -> Self {
        self.push(name, ColumnType::StaticColumn)
    }

    /// Override the column name of the last declared property
    pub fn with_column_name(self, column: impl Into<String>) -> Self {
        let column = IdentifierName::new(column);
        self.last(|p| p.column = column)
    }

    pub fn indexed(self) -> Self {
        self.last(|p| p.indexed = true)
    }

    /// Mark the last property as indexed with a case-sensitive index.
    ///
    /// Selects touching such a column always use `ALLOW FILTERING`.
    pub fn case_sensitive_index(self) -> Self {
        self.last(|p| {
            p.indexed = true;
            p.case_sensitive_index = true;
        })
    }

    /// Declare the last property as an alternate unique key
    pub fn unique(self) -> Self {
        self.last(|p| p.unique = true)
    }

    pub fn build(self) -> EntityDescriptor {
        EntityDescriptor {
            name: self.name,
            table: self.table,
            cacheable: self.cacheable,
            properties: self.properties,
        }
    }
}

/// A resolved property: the owning entity plus the property's position
#[derive(Clone, Copy)]
pub struct PropertyNode {
    entity: &'static EntityDescriptor,
    index: usize,
}

impl PropertyNode {
    pub fn entity(&self) -> &'static EntityDescriptor {
        self.entity
    }

    pub fn property(&self) -> &'static PropertyDescriptor {
        &self.entity.properties[self.index]
    }

    pub fn name(&self) -> &'static str {
        self.property().name
    }

    pub fn column_name(&self) -> &'static IdentifierName {
        &self.property().column
    }
}

impl PartialEq for PropertyNode {
    fn eq(&self, other: &Self) -> bool {
        self.entity.same_as(other.entity) && self.index == other.index
    }
}

impl Eq for PropertyNode {}

impl fmt::Debug for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity.name, self.name())
    }
}

impl fmt::Display for PropertyNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity.name, self.name())
    }
}
