pub mod aggregate;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod http;
mod middleware;
pub mod models;
pub mod service;
pub mod state;

use std::{sync::Arc, time::Duration};

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    auth::JwtSecret,
    cache::MovieCache,
    config::Config,
    db::{MovieStore, PgStore, Store},
    errors::AppError,
    middleware::cors_layer,
    service::RatingService,
    state::AppState,
};

/// Wires a store into the rating service and its movie cache.
pub fn build_state<S: Store>(store: Arc<S>, config: &Config) -> AppState<S> {
    let movies = Arc::new(MovieCache::with_shards(
        store.clone(),
        config.cache_ttl,
        config.cache_shards,
    ));
    AppState {
        ratings: Arc::new(RatingService::new(store, movies)),
        jwt_secret: JwtSecret(config.jwt_secret.clone()),
    }
}

pub fn build_router<S: Store>(state: AppState<S>, config: &Config) -> Router {
    http::create_http_routes(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(config.request_timeout)),
        )
        .layer(cors_layer(&config.allowed_origins))
        .fallback(|| async { "404 Not Found" })
}

pub async fn start_server() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    let store = Arc::new(PgStore::connect(&config).await?);
    let state = build_state(store, &config);

    if let Some(interval) = config.cache_sweep_interval {
        spawn_cache_sweeper(state.ratings.cache().clone(), interval);
    }

    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .map_err(|e| AppError::EnvError(format!("Failed to bind port {}: {}", config.port, e)))?;
    tracing::info!("Movie rating service listening on port {}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            tracing::error!("Server error: {}", e);
            AppError::InternalError
        })?;

    tracing::info!("Server gracefully stopped");
    Ok(())
}

fn spawn_cache_sweeper<S: MovieStore>(cache: Arc<MovieCache<S>>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = cache.purge_expired().await;
            if removed > 0 {
                tracing::debug!("Swept {} expired movie cache entries", removed);
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("Failed to listen for SIGTERM: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutting down server...");
}
