use crate::handlers;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use vote_tracker_orchestrator::VoteTracker;

pub struct ApiServer {
    tracker: Arc<VoteTracker>,
}

impl ApiServer {
    #[must_use]
    pub const fn new(tracker: Arc<VoteTracker>) -> Self {
        Self { tracker }
    }

    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            .route("/api/current", get(handlers::current))
            .route("/api/history", get(handlers::history))
            .route("/api/refresh", post(handlers::refresh))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
            .with_state(self.tracker.clone())
    }

    /// Starts the web server listening on the specified address.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the address or serve requests.
    pub async fn serve(self, addr: &str) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Web API listening on {}", addr);

        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
