//! End-to-end HTTP surface tests against a real PostGIS instance.
//!
//! Ignored by default — set `DATABASE_URL` to a PostGIS-enabled database
//! seeded with the `map_server` schema (spec.md §3) and run with
//! `cargo test -- --ignored` to exercise them.

use std::sync::Arc;

use axum_test::TestServer;
use tileserver_rs::auth::DenyAll;
use tileserver_rs::config::{CacheConfig, Config, DatabaseConfig, PathsConfig, ServerConfig, TelemetryConfig};
use tileserver_rs::db::PostgresPool;
use tileserver_rs::routes::{router, AppState};

async fn test_app() -> TestServer {
    let connection_string = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored DB tests");
    let config = Config {
        server: ServerConfig { host: "127.0.0.1".into(), port: 0, cors_origins: vec!["*".into()] },
        telemetry: TelemetryConfig::default(),
        database: DatabaseConfig {
            connection_string,
            pool_size: 4,
            pool_wait_timeout_ms: 5_000,
            pool_create_timeout_ms: 5_000,
            pool_recycle_timeout_ms: 5_000,
            query_timeout_ms: 10_000,
        },
        cache: CacheConfig::default(),
        paths: PathsConfig::default(),
    };

    let pool = PostgresPool::new(&config.database.connection_string, (&config.database).into()).await.unwrap();
    let state = AppState::new(Arc::new(pool), Arc::new(config), Arc::new(DenyAll));
    TestServer::new(router(state)).unwrap()
}

#[tokio::test]
#[ignore]
async fn healthz_reports_postgres_and_postgis_versions() {
    let server = test_app().await;
    let response = server.get("/healthz").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["postgis"].as_str().is_some());
}

#[tokio::test]
#[ignore]
async fn unknown_layer_returns_not_found() {
    let server = test_app().await;
    let response = server.get("/tiles/does-not-exist/0/0/0").await;
    response.assert_status_not_found();
}

#[tokio::test]
#[ignore]
async fn geometry_tables_requires_authentication() {
    let server = test_app().await;
    let response = server.get("/mapserver/api/geometry-tables").await;
    response.assert_status_unauthorized();
}

#[tokio::test]
#[ignore]
async fn map_data_rejects_empty_layers() {
    let server = test_app().await;
    let response = server
        .post("/mapserver/api/map-data")
        .json(&serde_json::json!({ "geometry": "POINT(0 0)", "layers": [] }))
        .await;
    response.assert_status_bad_request();
}
