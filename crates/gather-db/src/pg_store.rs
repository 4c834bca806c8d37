//! [`PgStore`]: the `PostgreSQL` implementation of the core store traits.
//!
//! Each call borrows the pool for a short-lived table store and converts
//! [`DbError`](crate::DbError) into [`StoreError`] on the way out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::{
    AttendanceStore, EventCatalog, EventPage, EventQuery, ProfileStore, ProfileUpdate, StoreError,
};
use gather_types::{Attendance, Attendee, Event, EventId, Profile, UserId};

use crate::event_store::EventStore;
use crate::membership_store::MembershipStore;
use crate::postgres::PostgresPool;
use crate::profile_store::UserProfileStore;

/// Store backed by a `PostgreSQL` pool. Cheap to clone.
#[derive(Clone)]
pub struct PgStore {
    db: PostgresPool,
}

impl PgStore {
    /// Wrap a connected pool.
    pub const fn new(db: PostgresPool) -> Self {
        Self { db }
    }

    /// The underlying pool.
    pub const fn pool(&self) -> &PostgresPool {
        &self.db
    }

    fn events(&self) -> EventStore<'_> {
        EventStore::new(self.db.pool())
    }

    fn memberships(&self) -> MembershipStore<'_> {
        MembershipStore::new(self.db.pool())
    }

    fn profiles(&self) -> UserProfileStore<'_> {
        UserProfileStore::new(self.db.pool())
    }
}

#[async_trait]
impl AttendanceStore for PgStore {
    async fn insert_attendance(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Attendance, StoreError> {
        Ok(self.memberships().insert(event_id, user_id).await?)
    }

    async fn delete_attendance(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        Ok(self.memberships().delete(event_id, user_id).await?)
    }

    async fn attendance_for_event(&self, event_id: EventId) -> Result<Vec<Attendance>, StoreError> {
        Ok(self.memberships().for_event(event_id).await?)
    }

    async fn set_attendee_count(&self, event_id: EventId, count: i64) -> Result<(), StoreError> {
        Ok(self.memberships().set_count(event_id, count).await?)
    }
}

#[async_trait]
impl EventCatalog for PgStore {
    async fn search_events(&self, query: &EventQuery) -> Result<EventPage, StoreError> {
        Ok(self.events().search(query).await?)
    }

    async fn featured_events(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Event>, StoreError> {
        Ok(self.events().featured(now, limit).await?)
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.events().get(event_id).await?)
    }

    async fn attendees(&self, event_id: EventId) -> Result<Vec<Attendee>, StoreError> {
        Ok(self.memberships().attendees(event_id).await?)
    }

    async fn active_scores(&self, now: DateTime<Utc>) -> Result<Vec<f64>, StoreError> {
        Ok(self.events().active_scores(now).await?)
    }

    async fn event_types(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.events().event_types().await?)
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.profiles().get(user_id).await?)
    }

    async fn upsert_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, StoreError> {
        Ok(self.profiles().upsert(user_id, update).await?)
    }
}
