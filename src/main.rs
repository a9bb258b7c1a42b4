use std::sync::Arc;

use mub_api::catalog::PermissionCatalog;
use mub_api::state::AppState;
use mub_api::{config, database, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, MUB_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    let config = config::config();
    tracing::info!("Starting MUB API in {:?} mode", config.environment);

    let pool = database::connect_pool().await?;
    database::schema::ensure_schema(&pool).await?;

    // Feature modules declare their permissions, then the catalog reconciles
    // against storage exactly once before any request is served.
    let mut catalog = PermissionCatalog::new();
    let permissions = handlers::supervision::declare(&mut catalog)?;
    catalog.initialize(&pool).await?;

    let state = AppState::new(pool, Arc::new(catalog), permissions);
    let app = handlers::router(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("MUB_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("MUB API listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
