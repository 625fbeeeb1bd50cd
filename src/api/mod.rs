mod handlers;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::contracts::AddressDirectory;

pub use handlers::{
    ApiError, AppState, CandidateEntry, CandidatesResponse, ErrorResponse, ProvisionRequest,
    StatsResponse, SuggestResponse,
};

/// Creates the API router.
pub fn create_router<D: AddressDirectory + 'static>(state: Arc<AppState<D>>) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats::<D>))
        .route("/metrics", get(handlers::get_metrics::<D>))
        .route("/addresses/suggest", post(handlers::suggest_address::<D>))
        .route("/addresses/candidates", post(handlers::list_candidates::<D>))
        .route("/addresses", post(handlers::provision_address::<D>))
        .route(
            "/addresses/:address",
            get(handlers::get_address::<D>).delete(handlers::release_address::<D>),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Reads `STAFFMAIL_HOST` and `STAFFMAIL_PORT`.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("STAFFMAIL_HOST").unwrap_or(default.host),
            port: std::env::var("STAFFMAIL_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(default.port),
        }
    }
}

/// Starts the HTTP server.
pub async fn start_server<D, F>(
    config: ServerConfig,
    state: Arc<AppState<D>>,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    D: AddressDirectory + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    tracing::info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
