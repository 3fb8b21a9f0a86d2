use std::sync::Arc;

use tileserver_rs::auth::DenyAll;
use tileserver_rs::cli::Cli;
use tileserver_rs::config::Config;
use tileserver_rs::db::PostgresPool;
use tileserver_rs::routes::{router, AppState};
use tileserver_rs::telemetry;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse_args();

    let mut config = Config::load(cli.config.clone())?;
    if let Some(host) = cli.host.clone() {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(database_url) = cli.database_url.clone() {
        config.database.connection_string = database_url;
    }

    let otel_layer = telemetry::init_telemetry(&config.telemetry);
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().compact())
        .with(filter)
        .with(otel_layer)
        .init();

    let pool = PostgresPool::new(&config.database.connection_string, (&config.database).into()).await?;
    tracing::info!(
        database = pool.id(),
        postgres = %pool.postgres_version(),
        postgis = %pool.postgis_version(),
        "connected"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let config = Arc::new(config);
    let state = AppState::new(Arc::new(pool), config, Arc::new(DenyAll));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app.into_make_service()).await?;

    telemetry::shutdown_telemetry();
    Ok(())
}
