//! Relational store capability trait.

use crate::collaborator::Collaborator;
use crate::database::result::{FieldDescriptor, QueryResult};
use crate::error::CollabResult;
use async_trait::async_trait;

/// Capabilities the SQL tools need from a relational store.
///
/// Implementations: [`PostgresBackend`](crate::database::PostgresBackend).
#[async_trait]
pub trait SqlBackend: Collaborator {
    /// Executes one statement and returns every row it produces.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError::QueryFailed`](crate::error::CollaboratorError::QueryFailed)
    /// if the store rejects the statement, or `Timeout` if it exceeds the
    /// configured query budget.
    async fn query(&self, sql: &str) -> CollabResult<QueryResult>;

    /// Base table names visible in the current schema, sorted.
    async fn list_tables(&self) -> CollabResult<Vec<String>>;

    /// Column descriptors of `table`, optionally schema-qualified
    /// (`schema.table`).
    ///
    /// # Errors
    ///
    /// Returns `TableNotFound` if the table has no visible columns.
    async fn table_schema(&self, table: &str) -> CollabResult<Vec<FieldDescriptor>>;
}
