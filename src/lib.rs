pub mod certificate;
pub mod cipher;
pub mod config;
pub mod error;
pub mod pdf;
pub mod routes;
pub mod state;
pub mod storage;
pub mod templates;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the service router over `state`.
pub fn app(state: Arc<AppState>) -> Router {
    let certificates = ServeDir::new(state.renderer.output_dir());

    Router::new()
        .route("/", get(routes::index))
        .route("/api/generate-certificate", post(routes::generate_certificate))
        .route("/details", post(routes::generate_certificate))
        .route("/view-certificate/:id", get(routes::view_certificate))
        .nest_service(storage::CERTIFICATES_URL_PREFIX, certificates)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
