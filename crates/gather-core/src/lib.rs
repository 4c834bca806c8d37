//! Core logic for the Gather events service.
//!
//! Two independent components sit at the centre of the service:
//!
//! - the [`attendance`] ledger, which applies join/leave requests and
//!   reconciles each event's denormalized attendee count against its
//!   membership rows;
//! - the [`percentile`] estimator, which computes the nearest-rank
//!   percentile of active event scores used to flag trending events.
//!
//! Everything else here supports them: the [`store`] traits that
//! persistence implements, the [`query`] model for event searches,
//! [`profile`] validation, an in-[`memory`] store, and [`config`].
//!
//! # Request flow
//!
//! ```text
//! handler --(RequestContext)--> AttendanceLedger --> AttendanceStore
//!                                     |
//!                                     +--> ViewInvalidator ("/events/<id>", "/")
//!
//! handler --> trending_threshold --> EventCatalog::active_scores --> percentile
//! ```

pub mod attendance;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod percentile;
pub mod profile;
pub mod query;
pub mod store;

// Re-export primary types for convenience.
pub use attendance::{
    AttendanceChange, AttendanceLedger, AttendanceOutcome, CountSource, ViewInvalidator,
};
pub use config::{ConfigError, GatherConfig};
pub use context::RequestContext;
pub use error::{AttendanceError, StoreError};
pub use memory::MemoryStore;
pub use percentile::{TRENDING_PERCENTILE, is_trending, percentile, trending_threshold};
pub use profile::ProfileUpdate;
pub use query::{EventPage, EventQuery, Page, SearchParams, StartWindow};
pub use store::{AttendanceStore, EventCatalog, ProfileStore};
