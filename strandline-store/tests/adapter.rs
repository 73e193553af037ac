//! Exercises `PgAdapter` against a real Postgres instance. Requires `DATABASE_URL`
//! and the `integration` feature; skipped otherwise since it needs live
//! infrastructure the rest of the suite doesn't.

#![cfg(feature = "integration")]

use futures::FutureExt;

use strandline_core::{engine, with_retry, DEFAULT_MAX_ATTEMPTS};
use strandline_store::{Database, DatabaseConfig, PgAdapter};

fn config_from_env() -> DatabaseConfig {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let parsed = url::Url::parse(&url).expect("DATABASE_URL must be a valid postgres:// URL");

    DatabaseConfig {
        hosts: vec![parsed.host_str().expect("DATABASE_URL must have a host").to_string()],
        port: parsed.port().unwrap_or(5432),
        name: parsed.path().trim_start_matches('/').to_string(),
        user: parsed.username().to_string(),
        password_file: None,
        replica_set: None,
        max_conns: Some(4),
    }
}

#[tokio::test]
async fn insert_at_head_against_real_postgres() {
    let database = Database::new(&config_from_env()).expect("pool construction");
    database.run_migrations().await.expect("migrations");
    let adapter = PgAdapter::new(database);

    let outcome = with_retry(&adapter, DEFAULT_MAX_ATTEMPTS, |adapter, session| {
        engine::insert_after(adapter, session, None).boxed()
    })
    .await
    .expect("insert at head succeeds against a fresh table");

    assert_eq!(outcome.created_node.version, 0);
    assert!(outcome.updated_nodes.is_empty());
}
