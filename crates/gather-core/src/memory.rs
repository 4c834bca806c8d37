//! In-memory implementation of every store trait.
//!
//! Backs the unit and API tests and lets the server run without a
//! database (`database.url: memory`). Semantics follow the SQL store:
//! unique `(event, user)` membership, inserts against unknown events
//! fail with [`StoreError::NotFound`], searches honour [`EventQuery`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_types::{Attendance, AttendanceId, Attendee, Event, EventId, Profile, SortOrder, UserId};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::profile::ProfileUpdate;
use crate::query::{EventPage, EventQuery};
use crate::store::{AttendanceStore, EventCatalog, ProfileStore};

#[derive(Debug, Default)]
struct Tables {
    events: BTreeMap<EventId, Event>,
    attendance: Vec<Attendance>,
    profiles: BTreeMap<UserId, Profile>,
    event_types: BTreeSet<String>,
}

/// Store that keeps events, memberships and profiles in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_attendance_reads: AtomicBool,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an event. Its type is added to the type catalog.
    pub async fn insert_event(&self, event: Event) {
        let mut tables = self.tables.write().await;
        tables.event_types.insert(event.event_type.clone());
        tables.events.insert(event.id, event);
    }

    /// Add a name to the event type catalog.
    pub async fn insert_event_type(&self, name: &str) {
        self.tables.write().await.event_types.insert(name.to_owned());
    }

    /// A copy of a stored event.
    pub async fn event(&self, event_id: EventId) -> Option<Event> {
        self.tables.read().await.events.get(&event_id).cloned()
    }

    /// Number of membership rows for an event.
    pub async fn attendance_rows(&self, event_id: EventId) -> usize {
        self.tables
            .read()
            .await
            .attendance
            .iter()
            .filter(|a| a.event_id == event_id)
            .count()
    }

    /// Make [`AttendanceStore::attendance_for_event`] fail until reset.
    pub fn fail_attendance_reads(&self, fail: bool) {
        self.fail_attendance_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl AttendanceStore for MemoryStore {
    async fn insert_attendance(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Attendance, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.events.contains_key(&event_id) {
            return Err(StoreError::NotFound(format!("event {event_id}")));
        }
        if tables
            .attendance
            .iter()
            .any(|a| a.event_id == event_id && a.user_id == user_id)
        {
            return Err(StoreError::Duplicate);
        }

        let row = Attendance {
            id: AttendanceId::new(),
            event_id,
            user_id,
            created_at: Utc::now(),
        };
        tables.attendance.push(row.clone());
        Ok(row)
    }

    async fn delete_attendance(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let before = tables.attendance.len();
        tables
            .attendance
            .retain(|a| !(a.event_id == event_id && a.user_id == user_id));
        Ok(tables.attendance.len() != before)
    }

    async fn attendance_for_event(&self, event_id: EventId) -> Result<Vec<Attendance>, StoreError> {
        if self.fail_attendance_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(String::from("attendance reads disabled")));
        }
        Ok(self
            .tables
            .read()
            .await
            .attendance
            .iter()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn set_attendee_count(&self, event_id: EventId, count: i64) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let event = tables
            .events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::NotFound(format!("event {event_id}")))?;
        event.attendees_count = count;
        Ok(())
    }
}

#[async_trait]
impl EventCatalog for MemoryStore {
    async fn search_events(&self, query: &EventQuery) -> Result<EventPage, StoreError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<&Event> = tables.events.values().filter(|e| query.matches(e)).collect();

        match query.sort {
            SortOrder::DateAsc => matching.sort_by_key(|e| e.start_time),
            SortOrder::DateDesc => matching.sort_by(|a, b| b.start_time.cmp(&a.start_time)),
            SortOrder::Popular | SortOrder::Score => {
                matching.sort_by(|a, b| b.score.total_cmp(&a.score));
            }
        }

        let total = u64::try_from(matching.len()).unwrap_or(u64::MAX);
        let skip = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(query.page.limit()).unwrap_or(usize::MAX);
        let events = matching.into_iter().skip(skip).take(take).cloned().collect();

        Ok(EventPage {
            events,
            total,
            page: query.page,
        })
    }

    async fn featured_events(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Event>, StoreError> {
        let tables = self.tables.read().await;
        let mut active: Vec<&Event> = tables.events.values().filter(|e| e.is_active_at(now)).collect();
        active.sort_by(|a, b| b.score.total_cmp(&a.score));
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(active.into_iter().take(take).cloned().collect())
    }

    async fn get_event(&self, event_id: EventId) -> Result<Option<Event>, StoreError> {
        Ok(self.event(event_id).await)
    }

    async fn attendees(&self, event_id: EventId) -> Result<Vec<Attendee>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .attendance
            .iter()
            .filter(|a| a.event_id == event_id)
            .map(|a| Attendee {
                user_id: a.user_id,
                name: tables.profiles.get(&a.user_id).map(|p| p.name.clone()),
            })
            .collect())
    }

    async fn active_scores(&self, now: DateTime<Utc>) -> Result<Vec<f64>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .events
            .values()
            .filter(|e| e.is_active_at(now))
            .map(|e| e.score)
            .collect())
    }

    async fn event_types(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.tables.read().await.event_types.iter().cloned().collect())
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>, StoreError> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> Result<Profile, StoreError> {
        let mut tables = self.tables.write().await;
        let profile = tables.profiles.entry(user_id).or_insert_with(|| Profile {
            id: user_id,
            name: String::new(),
            bio: None,
            website: None,
            avatar_url: None,
            created_at: Utc::now(),
        });
        profile.name.clone_from(&update.name);
        profile.bio.clone_from(&update.bio);
        profile.website.clone_from(&update.website);
        Ok(profile.clone())
    }
}
