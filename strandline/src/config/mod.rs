use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use strandline_store::{Database, DatabaseConfig as StoreDatabaseConfig, PgAdapter};

use crate::error::ServerError;
use crate::ws::ServerMessage;

/// Server transport configuration (`[server]` section).
pub mod server;
/// CORS configuration (`[cors]` section).
pub mod cors;

pub use cors::CorsConfig;
pub use server::ServerConfig;

/// Database configuration (`[database]` section). Reused directly from
/// `strandline-store`, which is the crate that actually needs to interpret it.
pub type DatabaseConfig = StoreDatabaseConfig;

/// The application configuration, loaded from a TOML file and layered with
/// `STRANDLINE_`-prefixed environment variable overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub database: RawDatabaseConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

/// The on-disk shape of `[database]`: identical fields to
/// [`strandline_store::DatabaseConfig`], kept separate so Serde's derive doesn't
/// have to live in `strandline-store` (which has no reason to depend on `serde`
/// beyond this).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawDatabaseConfig {
    pub hosts: Vec<String>,
    pub port: u16,
    pub name: String,
    pub user: String,
    #[serde(default)]
    pub password_file: Option<String>,
    #[serde(default)]
    pub replica_set: Option<String>,
    #[serde(default)]
    pub max_conns: Option<u32>,
}

impl From<RawDatabaseConfig> for DatabaseConfig {
    fn from(raw: RawDatabaseConfig) -> Self {
        DatabaseConfig {
            hosts: raw.hosts,
            port: raw.port,
            name: raw.name,
            user: raw.user,
            password_file: raw.password_file,
            replica_set: raw.replica_set,
            max_conns: raw.max_conns,
        }
    }
}

impl Config {
    /// Parses the TOML contents, then applies `STRANDLINE_`-prefixed environment
    /// variable overrides (e.g. `STRANDLINE_DATABASE_PORT`, `STRANDLINE_SERVER_PORT`).
    pub fn load(contents: &str) -> Result<Self, ServerError> {
        let mut config: Config = toml::from_str(contents)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("STRANDLINE_DATABASE_HOSTS") {
            self.database.hosts = value.split(',').map(str::to_string).collect();
        }
        if let Ok(value) = std::env::var("STRANDLINE_DATABASE_PORT") {
            if let Ok(port) = value.parse() {
                self.database.port = port;
            }
        }
        if let Ok(value) = std::env::var("STRANDLINE_DATABASE_NAME") {
            self.database.name = value;
        }
        if let Ok(value) = std::env::var("STRANDLINE_DATABASE_USER") {
            self.database.user = value;
        }
        if let Ok(value) = std::env::var("STRANDLINE_DATABASE_PASSWORD_FILE") {
            self.database.password_file = Some(value);
        }
        if let Ok(value) = std::env::var("STRANDLINE_DATABASE_REPLICA_SET") {
            self.database.replica_set = Some(value);
        }
        if let Ok(value) = std::env::var("STRANDLINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Ok(value) = std::env::var("STRANDLINE_SERVER_PORT") {
            if let Ok(port) = value.parse() {
                self.server.port = port;
            }
        }
        if let Ok(value) = std::env::var("STRANDLINE_CORS_ALLOWED_ORIGINS") {
            self.cors.allowed_origins = value.split(',').map(str::to_string).collect();
        }
    }
}

/// Shared application state, built once at startup and cloned (behind an `Arc`)
/// into every connection handler.
pub struct AppState {
    pub storage: PgAdapter,
    pub max_retry_attempts: usize,
    pub broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Arc<Self>, ServerError> {
        let database = Database::new(&config.database.clone().into())?;
        database.run_migrations().await?;

        let (broadcast, _) = broadcast::channel(1024);

        Ok(Arc::new(AppState {
            storage: PgAdapter::new(database),
            max_retry_attempts: config.server.max_retry_attempts,
            broadcast,
        }))
    }
}
