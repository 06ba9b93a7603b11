pub mod error;
pub mod handlers;
pub mod state;

pub use state::ApiState;

use axum::{
    Router,
    routing::{get, post},
};

pub fn build_api_router() -> Router<ApiState> {
    Router::new()
        .route("/api/v1/sites", post(handlers::ensure_site))
        .route("/api/v1/sites/{site_id}/deploy", post(handlers::deploy_site))
        .route("/api/v1/connections", post(handlers::connect_domain))
        .route("/api/v1/launches", post(handlers::launch_site))
        .route(
            "/api/v1/connections/{id}",
            get(handlers::get_connection).delete(handlers::disconnect),
        )
        .route(
            "/api/v1/connections/{id}/poll",
            post(handlers::poll_connection),
        )
        .route(
            "/api/v1/connections/{id}/events",
            get(handlers::connection_events),
        )
}
