pub mod handlers;
pub mod signals;
pub mod state;
pub mod types;
pub mod validation;

use axum::Router;
use axum::routing::{get, post};
pub use signals::shutdown_signal;
pub use state::AppState;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the API router over shared application state
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/jobs", post(handlers::submit_job_handler).get(handlers::list_jobs_handler))
        .route("/jobs/:id", get(handlers::job_status_handler))
        .route("/jobs/:id/report", get(handlers::job_report_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
