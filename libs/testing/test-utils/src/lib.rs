//! Shared test utilities for the helenus crates
//!
//! This crate provides reusable test infrastructure:
//! - `RecordingExecutor`: in-memory statement executor that counts round trips
//!   and replays queued result sets (always available)
//! - `fixtures`: `User`, `Account` and `Post` entities (always available)
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//! - `TestCassandra`: ScyllaDB container with the fixture schema (feature: "cassandra")
//!
//! # Usage
//!
//! ```rust,ignore
//! use helenus::prelude::*;
//! use test_utils::{RecordingExecutor, fixtures::{User, user_rows}};
//!
//! #[tokio::test]
//! async fn my_lookup_test() {
//!     let executor = RecordingExecutor::new();
//!     executor.push_result(user_rows(&[&User::new(100, "alex", 34)]));
//!     let session = executor.session();
//!
//!     let user = session.select_all::<User>().where_eq(User::ID, 100).single().sync().await;
//!     assert_eq!(executor.round_trips(), 1);
//! }
//! ```

pub mod assertions;
mod builder;
mod executor;
pub mod fixtures;

#[cfg(feature = "cassandra")]
mod cassandra;

pub use builder::TestDataBuilder;
pub use executor::{RecordingExecutor, int, text};

#[cfg(feature = "cassandra")]
pub use cassandra::TestCassandra;
