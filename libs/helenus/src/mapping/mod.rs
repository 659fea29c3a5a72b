//! Entity schema descriptors and the typed accessors built on them.
//!
//! Entities are described explicitly by an [`EntityDescriptor`] instead of
//! being discovered at runtime. [`Property`] constants give each column a
//! typed handle that filters, projections and assignments resolve into a
//! [`PropertyNode`].

mod entity;
mod property;
mod row;
mod value;

pub use entity::{
    ColumnType, EntityDescriptor, EntityDescriptorBuilder, IdentifierName, OrderingDirection,
    PropertyDescriptor, PropertyNode,
};
pub use property::{Entity, Getter, Property};
pub(crate) use property::entity_values;
pub use row::{Projection, ResultSet, Row};
pub use value::{ColumnValue, DefaultValuePreparer, ValueError, ValuePreparer, render_value};
