use thiserror::Error;

/// Errors the Postgres storage adapter can raise. `strandline_core::engine` only
/// inspects these through [`strandline_core::storage::StorageAdapter::is_serialization_conflict`];
/// everything else propagates to the caller unchanged.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A query failed for a reason other than a predicate mismatch (connection loss,
    /// a malformed statement, constraint violation unrelated to optimistic locking).
    #[error("database error: {0}")]
    Query(#[from] diesel::result::Error),
    /// Could not check out a connection from the pool (pool exhausted or poisoned).
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    /// Could not read the database password file.
    #[error("could not read database password file: {0}")]
    PasswordFile(#[from] std::io::Error),
    /// Migrations failed to run at startup.
    #[error("migration error: {0}")]
    Migration(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Postgres SQLSTATE `40001`, `serialization_failure`: a commit-time write
    /// conflict under `SERIALIZABLE` isolation. The retry driver treats this
    /// identically to a failed predicate.
    pub fn is_serialization_failure(&self) -> bool {
        use diesel::result::{DatabaseErrorKind, Error as DieselError};

        matches!(
            self,
            StoreError::Query(DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _))
        )
    }
}
