//! Route definitions for the flight oracle API

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::handlers::*;

pub fn flight_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_index))
        .route("/api/flights", get(list_flights))
        .route("/api/flights/status", post(request_flight_status))
}

/// Full application router.
pub fn app(state: AppState, cors_allowed_origins: Option<&[String]>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(flight_routes())
        .layer(build_cors_layer(cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ORIGIN, header::CONTENT_TYPE, header::ACCEPT]);

    match allowed_origins {
        Some(origins) => layer.allow_origin(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        ),
        None => layer.allow_origin(Any),
    }
}
