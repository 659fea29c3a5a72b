use std::fmt;
use std::marker::PhantomData;

use scylla::value::CqlValue;

use super::{ColumnValue, EntityDescriptor, PropertyNode, Row, ValuePreparer};
use crate::error::HelenusResult;

/// An entity type with a static schema descriptor
pub trait Entity: Sized + Send + Sync + 'static {
    fn descriptor() -> &'static EntityDescriptor;

    fn from_row(row: &Row) -> HelenusResult<Self>;

    /// Property names paired with the values to write
    fn column_values(&self) -> Vec<(&'static str, Option<CqlValue>)>;
}

/// Typed accessor that resolves to a property of a known entity
pub trait Getter<V>: Copy + Send + Sync + 'static {
    fn resolve(&self) -> HelenusResult<PropertyNode>;
}

/// Typed property token, declared as an associated constant on the entity.
///
/// ```ignore
/// impl User {
///     pub const ID: Property<User, i32> = Property::new("id");
/// }
/// ```
pub struct Property<E, V> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, V)>,
}

impl<E, V> Property<E, V> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, V> Clone for Property<E, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, V> Copy for Property<E, V> {}

impl<E, V> fmt::Debug for Property<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Property({})", self.name)
    }
}

impl<E: Entity, V: ColumnValue> Getter<V> for Property<E, V> {
    fn resolve(&self) -> HelenusResult<PropertyNode> {
        E::descriptor().node(self.name)
    }
}

/// Column values of an entity instance, resolved to nodes and prepared for binding
pub(crate) fn entity_values<E: Entity>(
    entity: &E,
    preparer: &dyn ValuePreparer,
) -> HelenusResult<Vec<(PropertyNode, Option<CqlValue>)>> {
    let descriptor = E::descriptor();
    entity
        .column_values()
        .into_iter()
        .map(|(name, value)| {
            let node = descriptor.node(name)?;
            Ok((node, value.map(|v| preparer.prepare(&node, v))))
        })
        .collect()
}
