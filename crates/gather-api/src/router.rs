//! Axum router construction.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness
/// - `GET /ws/invalidations` -- `WebSocket` stale-view stream
/// - `GET /api/events` -- search
/// - `GET /api/events/featured` -- featured events
/// - `GET /api/events/{id}` -- event detail
/// - `POST /api/events/{id}/attendance` -- join or leave
/// - `GET /api/event-types` -- event type catalog
/// - `GET /api/trending-threshold` -- trending score threshold
/// - `GET /api/profile`, `PUT /api/profile` -- caller's profile
///
/// CORS allows any origin so a separately hosted frontend can call the API.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws/invalidations", get(ws::ws_invalidations))
        // REST API
        .route("/api/events", get(handlers::list_events))
        .route("/api/events/featured", get(handlers::featured_events))
        .route("/api/events/{id}", get(handlers::get_event))
        .route("/api/events/{id}/attendance", post(handlers::update_attendance))
        .route("/api/event-types", get(handlers::event_types))
        .route("/api/trending-threshold", get(handlers::get_trending_threshold))
        .route(
            "/api/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
