//! Fluent object mapping for Cassandra/ScyllaDB with a facet-keyed row cache
//!
//! Entities declare their schema once through an [`EntityDescriptor`] and
//! expose typed [`Property`] tokens. Statements are built from those tokens,
//! executed through a [`StatementExecutor`], and single-row reads are served
//! from a unit-of-work cache or the session cache when the filters bind one
//! of the row's facets (its primary key or a unique column).
//!
//! # Examples
//!
//! ```ignore
//! use helenus::prelude::*;
//!
//! let session = HelenusSession::connect(SessionConfig::from_env()?).await?;
//!
//! let user = session
//!     .select((User::NAME, User::AGE))
//!     .where_(User::ID.eq(100))
//!     .single()
//!     .sync()
//!     .await?;
//!
//! let uow = session.begin();
//! session.update().set(User::AGE, 35).where_eq(User::ID, 100).sync_in(&uow).await?;
//! uow.commit()?;
//! ```

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod metrics;
pub mod operation;
pub mod operator;
pub mod ordered;
pub mod postulate;
pub mod query;
pub mod session;
pub mod telemetry;
pub mod uow;

// Re-exports for convenience
pub use config::{CacheConfig, CassandraConfig, ConfigError, FromEnv, SessionConfig};
pub use driver::{ExecutionOptions, ScyllaExecutor, StatementExecutor};
pub use error::{HelenusError, HelenusResult};
pub use filter::{Condition, Filter, IntoCondition};
pub use mapping::{
    ColumnValue, Entity, EntityDescriptor, Getter, OrderingDirection, Property, PropertyNode,
    ResultSet, Row, ValueError, ValuePreparer,
};
pub use metrics::CacheStatistics;
pub use operation::{
    CountOperation, DeleteOperation, Executable, FilterOperation, InsertOperation,
    SelectFirstOperation, SelectOperation, StatementOperation, UpdateOperation,
};
pub use operator::Operator;
pub use postulate::Postulate;
pub use session::{HelenusSession, HelenusSessionBuilder};
pub use uow::{Lookup, UnitOfWork};

/// Traits and types needed by most callers of the DSL
pub mod prelude {
    pub use crate::config::FromEnv;
    pub use crate::mapping::{Entity, Getter, OrderingDirection, Property};
    pub use crate::operation::{Executable, FilterOperation, StatementOperation};
    pub use crate::{Filter, HelenusResult, HelenusSession, Operator, SessionConfig, UnitOfWork};
}
