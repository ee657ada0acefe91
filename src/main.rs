//! LikeDAO API server
//!
//! All data is exposed via GraphQL at /graphql.

use std::net::SocketAddr;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use likedao_api::config::Config;
use likedao_api::db::Database;
use likedao_api::{AppState, api, node};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "likedao_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting LikeDAO API");

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        denom = %config.chain_coin_denom,
        max_page_size = config.max_page_size,
        "Configuration loaded"
    );

    let db = Database::connect(&config.database_url, config.database_max_connections).await?;
    tracing::info!("Database connected");

    let registry = node::build_registry(&db).context("Failed to build entity registry")?;
    tracing::info!(entity_types = ?registry.tags(), "Entity registry built");

    let port = config.port;
    let state = AppState::new(config, db, registry);
    let app = api::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);
    tracing::info!("GraphQL playground: http://localhost:{}/graphql", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
