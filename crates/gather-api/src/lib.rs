//! HTTP API for the Gather events service.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for event search, featured events, event detail,
//!   attendance join/leave, the event type catalog, the trending
//!   threshold, and the caller's profile
//! - **`WebSocket` endpoint** (`/ws/invalidations`) streaming stale-view
//!   notices via [`tokio::sync::broadcast`]
//!
//! Callers are identified by bearer JWTs (see [`auth`]). Handlers talk to
//! storage only through the `gather-core` store traits, so the same
//! router runs over `PostgreSQL` or the in-memory store.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use auth::{Caller, JwtVerifier};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::{AppState, Invalidation};
