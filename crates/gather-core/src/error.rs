//! Error types for the core services.
//!
//! Store implementations report failures as [`StoreError`]; the
//! attendance ledger lifts them into [`AttendanceError`], which is what
//! request handlers see.

use gather_types::{EventId, UserId};

/// Failures reported by a backing store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate record")]
    Duplicate,

    /// A referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other read or write failure, not further classified.
    #[error("store failure: {0}")]
    Backend(String),
}

/// Errors returned by [`AttendanceLedger::update_attendance`].
///
/// [`AttendanceLedger::update_attendance`]: crate::attendance::AttendanceLedger::update_attendance
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttendanceError {
    /// No authenticated user identity was present on the request.
    #[error("you must be logged in to attend events")]
    Unauthorized,

    /// The user already has a membership record for the event.
    #[error("user {user_id} is already attending event {event_id}")]
    Conflict {
        /// The event the user tried to join.
        event_id: EventId,
        /// The user that is already attending.
        user_id: UserId,
    },

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
