//! Fluent statement operations and their cache-aware execution.
//!
//! Every operation is built by chaining methods from a [`HelenusSession`]
//! entry point and executed with [`Executable::sync`],
//! [`Executable::sync_in`] or their spawned variants.
//!
//! [`HelenusSession`]: crate::session::HelenusSession

mod count;
mod delete;
mod filters;
mod insert;
mod optional;
mod select;
mod select_first;
mod statement;
mod stream;
mod update;

pub use count::CountOperation;
pub use delete::DeleteOperation;
pub use filters::{FilterOperation, FilterSet};
pub use insert::InsertOperation;
pub use select::SelectOperation;
pub use select_first::SelectFirstOperation;
pub use statement::{Executable, StatementOperation, StatementOptions};
pub use update::UpdateOperation;

#[cfg(test)]
mod tests;
