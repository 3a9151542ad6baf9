use std::path::PathBuf;

use axum::http::{HeaderName, Method};
use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use super::{
    services::{convert, ping},
    state::AppState,
};
use crate::config::{Config, CorsConfig};
use crate::convert::Converter;
use crate::fetch::FetcherRegistry;
use crate::render::TemplateRegistry;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(config_path: Option<PathBuf>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = match config_path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    // Bind configured fetchers to live instances once, at startup
    let registry = FetcherRegistry::with_builtin_drivers();
    let fetchers = registry.bind(&config.fetchers)?;
    info!(count = fetchers.len(), "Fetchers bound");

    let converter = Converter::new(&config.converter, fetchers);

    let templates = TemplateRegistry::from_config(&config.templates)?;

    let bind_addr = config.server.bind_addr;
    let prefix = config.server.path_prefix.trim_end_matches('/').to_string();
    let gzip_enabled = config.server.gzip_enabled;
    let cors = cors_layer(&config.cors);

    let state = AppState::new(config, converter, templates);

    // axum's GET route answers HEAD as well
    let mut app = Router::new()
        .route(&format!("{prefix}/convert"), post(convert))
        .route(&format!("{prefix}/ping"), get(ping))
        .with_state(state)
        .layer(cors);

    if gzip_enabled {
        app = app.layer(CompressionLayer::new().gzip(true));
    }

    let listener = TcpListener::bind(bind_addr).await?;
    info!(address = %bind_addr, "Listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new();

    if config.allowed_origins.is_empty()
        || config.allowed_origins.iter().any(|o| o == "*")
    {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer = layer.allow_origin(origins);
    }

    if config.allowed_methods.is_empty()
        || config.allowed_methods.iter().any(|m| m == "*")
    {
        layer = layer.allow_methods(Any);
    } else {
        let methods: Vec<Method> = config
            .allowed_methods
            .iter()
            .filter_map(|method| method.parse().ok())
            .collect();
        layer = layer.allow_methods(methods);
    }

    if config.allowed_headers.is_empty()
        || config.allowed_headers.iter().any(|h| h == "*")
    {
        layer = layer.allow_headers(Any);
    } else {
        let headers: Vec<HeaderName> = config
            .allowed_headers
            .iter()
            .filter_map(|header| header.parse().ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    layer
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
