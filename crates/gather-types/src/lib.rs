//! Shared type definitions for the Gather events service.
//!
//! This crate is the single source of truth for the entities exchanged
//! between the store, the core logic and the public API. Types flow to
//! `TypeScript` via `ts-rs` for the web client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for events, users and attendance rows
//! - [`enums`] -- Status, sort, price filter and membership enums
//! - [`structs`] -- `Event`, `Attendance`, `Attendee` and `Profile`

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EventStatus, Membership, PriceFilter, SortOrder};
pub use ids::{AttendanceId, EventId, UserId};
pub use structs::{Attendance, Attendee, Event, Profile};
