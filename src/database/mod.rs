//! Relational store collaborator.
//!
//! # Feature Flags
//!
//! - `sql` - Enable the PostgreSQL backend (enabled by default)
//!
//! Without the feature only the [`SqlBackend`] trait and result types are
//! compiled, which is enough for the SQL tools to be exercised against a stub.

#[cfg(feature = "sql")]
pub mod postgres;
pub mod result;
pub mod traits;

#[cfg(feature = "sql")]
pub use postgres::PostgresBackend;
pub use result::*;
pub use traits::SqlBackend;
