//! Store seams between the core logic and persistence.
//!
//! `gather-db` implements these traits over `PostgreSQL`;
//! [`MemoryStore`](crate::memory::MemoryStore) implements them in memory
//! for tests and local development. Filtering, ordering and paging are
//! the store's job: the core hands it a normalized [`EventQuery`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_types::{Attendance, Attendee, Event, EventId, Profile, UserId};

use crate::error::StoreError;
use crate::profile::ProfileUpdate;
use crate::query::{EventPage, EventQuery};

/// Membership rows and the denormalized attendee counter.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// Insert a membership row for `(event_id, user_id)`.
    ///
    /// Returns [`StoreError::Duplicate`] when the pair already exists and
    /// [`StoreError::NotFound`] when the event does not exist.
    async fn insert_attendance(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Attendance, StoreError>;

    /// Delete the membership row for `(event_id, user_id)`.
    ///
    /// Returns whether a row was removed; a missing row is not an error.
    async fn delete_attendance(&self, event_id: EventId, user_id: UserId)
    -> Result<bool, StoreError>;

    /// All membership rows for an event.
    async fn attendance_for_event(&self, event_id: EventId) -> Result<Vec<Attendance>, StoreError>;

    /// Overwrite the denormalized attendee count of an event.
    async fn set_attendee_count(&self, event_id: EventId, count: i64) -> Result<(), StoreError>;
}

/// Read access to the event listing.
#[async_trait]
pub trait EventCatalog: Send + Sync {
    /// Execute a normalized search and return one page of results.
    async fn search_events(&self, query: &EventQuery) -> Result<EventPage, StoreError>;

    /// The `limit` highest-scored events whose end time is after `now`.
    async fn featured_events(&self, now: DateTime<Utc>, limit: u32)
    -> Result<Vec<Event>, StoreError>;

    /// A single event by id.
    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError>;

    /// Attendees of an event joined with their profile names, oldest first.
    async fn attendees(&self, event_id: EventId) -> Result<Vec<Attendee>, StoreError>;

    /// Scores of every event whose end time is after `now`.
    async fn active_scores(&self, now: DateTime<Utc>) -> Result<Vec<f64>, StoreError>;

    /// The event type catalog, sorted by name.
    async fn event_types(&self) -> Result<Vec<String>, StoreError>;
}

/// User profiles.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The profile of `user_id`, if one exists.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError>;

    /// Create or update the profile of `user_id`.
    async fn upsert_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, StoreError>;
}
