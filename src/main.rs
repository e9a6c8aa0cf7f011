//! Account service binary.

use account_service::{
    create_routes, AccountService, AuthConfig, LocalBlobStore, MemoryUserStore, PgUserStore,
    ServerConfig, UserStore,
};

use anyhow::Context;
use axum::{http::HeaderValue, Router};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("account_service=info,tower_http=info")),
        )
        .init();

    let auth_config = AuthConfig::from_env()?;
    auth_config.validate()?;
    let server_config = ServerConfig::from_env()?;

    let store: Arc<dyn UserStore> = match &server_config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("connecting to DATABASE_URL")?;
            let store = PgUserStore::new(pool);
            store.migrate().await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, accounts are kept in memory only");
            Arc::new(MemoryUserStore::new())
        }
    };

    let blobs = Arc::new(LocalBlobStore::new(
        &server_config.upload_dir,
        &server_config.media_base_url,
    ));

    let accounts = Arc::new(AccountService::new(auth_config, store, blobs)?);

    let mut cors = CorsLayer::new();
    if let Some(origin) = &server_config.cors_origin {
        let origin: HeaderValue = origin.parse().context("parsing CORS_ORIGIN")?;
        cors = cors
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request());
    }

    let mut app = Router::new().nest(
        "/api/v1/users",
        create_routes(accounts, server_config.max_upload_bytes),
    );

    // Uploads are served locally unless MEDIA_BASE_URL points elsewhere
    let media_path = server_config.media_base_url.trim_end_matches('/');
    if media_path.starts_with('/') && media_path.len() > 1 {
        app = app.nest_service(media_path, ServeDir::new(&server_config.upload_dir));
    }

    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors),
    );

    let listener = TcpListener::bind(server_config.bind_address).await?;
    tracing::info!(address = %server_config.bind_address, "Account service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
