use diesel::r2d2::{self, ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;

use crate::error::StoreError;
use crate::MIGRATIONS;

/// Configuration needed to build a [`Database`] connection pool.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Candidate hosts; the first reachable one is used.
    pub hosts: Vec<String>,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password_file: Option<String>,
    /// Identifier of the replica set / HA cluster `hosts` belongs to, threaded into
    /// the connection string's `application_name` so a proxy (PgBouncer, Patroni)
    /// can route by cluster.
    pub replica_set: Option<String>,
    pub max_conns: Option<u32>,
}

impl DatabaseConfig {
    fn connection_url(&self) -> Result<String, StoreError> {
        let host = self
            .hosts
            .first()
            .expect("database configuration must list at least one host");

        let password = match &self.password_file {
            Some(path) => std::fs::read_to_string(path)?.trim().to_string(),
            None => String::new(),
        };

        let mut url = format!(
            "postgres://{user}:{password}@{host}:{port}/{name}",
            user = self.user,
            password = password,
            host = host,
            port = self.port,
            name = self.name,
        );

        if let Some(replica_set) = &self.replica_set {
            url.push_str(&format!("?application_name={replica_set}"));
        }

        Ok(url)
    }
}

/// The connection pool, running blocking Diesel calls on the Tokio blocking pool so
/// they never stall the async reactor.
#[derive(Debug, Clone)]
pub struct Database {
    connection_pool: Pool<ConnectionManager<PgConnection>>,
}

impl Database {
    /// Builds the connection pool from a [`DatabaseConfig`].
    pub fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let database_url = config.connection_url()?;
        let manager = ConnectionManager::<PgConnection>::new(database_url);

        let mut builder = r2d2::Builder::default();
        if let Some(max_size) = config.max_conns {
            builder = builder.max_size(max_size);
        }

        let connection_pool = builder.build(manager).map_err(StoreError::from)?;
        Ok(Database { connection_pool })
    }

    /// Checks a single connection out of the pool for the caller to hold across
    /// multiple blocking calls (used to host a transactional session).
    pub async fn checkout(
        &self,
    ) -> Result<PooledConnection<ConnectionManager<PgConnection>>, StoreError> {
        let pool = self.connection_pool.clone();
        tokio::task::spawn_blocking(move || pool.get().map_err(StoreError::from))
            .await
            .expect("blocking database task panicked")
    }

    /// Runs the embedded migrations. Called once at startup, before the server
    /// begins accepting connections.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        self.run(|conn| {
            conn.run_pending_migrations(MIGRATIONS)
                .map(|_| ())
                .map_err(StoreError::Migration)
        })
        .await
    }

    /// Runs `f` on the blocking pool with a pooled connection, without a transaction.
    pub async fn run<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut PooledConnection<ConnectionManager<PgConnection>>) -> Result<R, StoreError>
            + Send
            + 'static,
        R: Send + 'static,
    {
        let pool = self.connection_pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(StoreError::from)?;
            f(&mut conn)
        })
        .await
        .expect("blocking database task panicked")
    }
}
