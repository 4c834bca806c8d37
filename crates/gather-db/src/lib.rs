//! `PostgreSQL` data layer for the Gather events service.
//!
//! # Modules
//!
//! - [`postgres`] -- connection pool, configuration and migrations
//! - [`event_store`] -- event search, featured list, scores and type catalog
//! - [`membership_store`] -- attendance rows and the attendee counter
//! - [`profile_store`] -- user profiles
//! - [`pg_store`] -- [`PgStore`], implementing the `gather-core` store traits
//! - [`error`] -- shared error types

pub mod error;
pub mod event_store;
pub mod membership_store;
pub mod pg_store;
pub mod postgres;
pub mod profile_store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use event_store::{EventRow, EventStore};
pub use membership_store::{AttendanceRow, MembershipStore};
pub use pg_store::PgStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use profile_store::{ProfileRow, UserProfileStore};
