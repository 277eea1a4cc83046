//! Router assembly

use crate::handlers::{configure_routes, health_check};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

/// Build the complete application router
pub fn create_router(state: AppState) -> Router {
    let gzip = state.global().gzip;

    let router = Router::new()
        .route("/healthz", get(health_check))
        .merge(configure_routes())
        .layer(TraceLayer::new_for_http());

    let router = if gzip {
        router.layer(CompressionLayer::new())
    } else {
        router
    };

    router.with_state(state)
}
