use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sightings::config::{Cli, Config};
use sightings::db;
use sightings::routes;
use sightings::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli);
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let db_path = config.db_path();
    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    tracing::info!("Database ready at {}", db_path.display());

    let state = AppState::new(pool, config.clone());
    let app = routes::build_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
