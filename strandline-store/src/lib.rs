//! The Postgres realization of `strandline_core::storage::StorageAdapter`: a
//! connection pool, the `nodes` table schema, and the `conditional_update`/
//! `conditional_delete` queries the mutation engine is written against.

use diesel_migrations::{embed_migrations, EmbeddedMigrations};

pub mod adapter;
pub mod database;
pub mod error;
pub mod models;
pub mod schema;

pub use adapter::{PgAdapter, PgSession};
pub use database::{Database, DatabaseConfig};
pub use error::StoreError;

/// Embedded migrations, run at startup before the server accepts connections.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
