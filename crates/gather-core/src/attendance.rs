//! The attendance ledger: join/leave plus attendee count reconciliation.
//!
//! The membership table is the source of truth. After every successful
//! join or leave the ledger re-reads the event's full membership set and
//! writes its size into the event's denormalized `attendees_count`.
//! Only when that re-read fails does it fall back to adjusting the
//! caller's last known count by one.
//!
//! # Consistency
//!
//! The membership write and the counter write are two separate store
//! calls with no transaction around them. A crash in between leaves the
//! counter stale until the next update, and two concurrent updates can
//! both recount the same snapshot and undercount one change. The counter
//! is display-only, so this gap is accepted.

use gather_types::{EventId, Membership};
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::error::{AttendanceError, StoreError};
use crate::store::AttendanceStore;

/// Path of the landing page view, which lists featured events.
pub const LANDING_VIEW_PATH: &str = "/";

/// Path of the detail view of an event.
pub fn event_view_path(event_id: EventId) -> String {
    format!("/events/{event_id}")
}

/// Receives notice that a rendered view is out of date.
pub trait ViewInvalidator: Send + Sync {
    /// Mark the view at `path` as stale.
    fn invalidate(&self, path: &str);
}

/// A requested membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceChange {
    /// The event to join or leave.
    pub event_id: EventId,
    /// Whether the caller wants to attend.
    pub membership: Membership,
    /// The attendee count the caller last saw, used only as the fallback base.
    pub known_count: i64,
}

/// How the new attendee count was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    /// Counted from the membership rows.
    Recount,
    /// The re-read failed; the known count was adjusted by one.
    Fallback,
}

/// Result of a successful attendance update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttendanceOutcome {
    /// The event that changed.
    pub event_id: EventId,
    /// The membership state now in effect.
    pub membership: Membership,
    /// The attendee count written to the event.
    pub attendees_count: i64,
    /// How `attendees_count` was obtained.
    pub count_source: CountSource,
    /// False when leaving an event the user was not attending.
    pub changed: bool,
}

/// Applies membership changes and keeps the attendee counter in step.
pub struct AttendanceLedger<'a> {
    store: &'a dyn AttendanceStore,
    invalidator: &'a dyn ViewInvalidator,
}

impl<'a> AttendanceLedger<'a> {
    /// Create a ledger over a store, publishing stale views to `invalidator`.
    pub const fn new(store: &'a dyn AttendanceStore, invalidator: &'a dyn ViewInvalidator) -> Self {
        Self { store, invalidator }
    }

    /// Join or leave an event on behalf of the caller in `ctx`.
    ///
    /// # Errors
    ///
    /// - [`AttendanceError::Unauthorized`] if `ctx` carries no user; nothing
    ///   is written.
    /// - [`AttendanceError::Conflict`] when joining an event the user
    ///   already attends.
    /// - [`AttendanceError::Store`] if the membership write or the counter
    ///   write fails. A failed counter write leaves the membership change
    ///   in place.
    pub async fn update_attendance(
        &self,
        ctx: &RequestContext,
        change: AttendanceChange,
    ) -> Result<AttendanceOutcome, AttendanceError> {
        let user_id = ctx.user_id().ok_or(AttendanceError::Unauthorized)?;
        let event_id = change.event_id;

        let changed = match change.membership {
            Membership::Join => {
                self.store
                    .insert_attendance(event_id, user_id)
                    .await
                    .map_err(|e| match e {
                        StoreError::Duplicate => AttendanceError::Conflict { event_id, user_id },
                        other => AttendanceError::Store(other),
                    })?;
                true
            }
            Membership::Leave => self.store.delete_attendance(event_id, user_id).await?,
        };

        debug!(%event_id, %user_id, membership = ?change.membership, changed, "Membership updated");

        let (attendees_count, count_source) = match self.store.attendance_for_event(event_id).await {
            Ok(rows) => (
                i64::try_from(rows.len()).unwrap_or(i64::MAX),
                CountSource::Recount,
            ),
            Err(e) => {
                warn!(%event_id, error = %e, "Attendee re-read failed, adjusting known count");
                (fallback_count(change), CountSource::Fallback)
            }
        };

        self.store
            .set_attendee_count(event_id, attendees_count)
            .await?;

        self.invalidator.invalidate(&event_view_path(event_id));
        self.invalidator.invalidate(LANDING_VIEW_PATH);

        info!(
            %event_id,
            %user_id,
            membership = ?change.membership,
            attendees_count,
            ?count_source,
            "Attendance updated"
        );

        Ok(AttendanceOutcome {
            event_id,
            membership: change.membership,
            attendees_count,
            count_source,
            changed,
        })
    }
}

/// Known count adjusted by one in the direction of the change, never below zero.
///
/// The known count comes from the client, so a negative value is read as 0.
const fn fallback_count(change: AttendanceChange) -> i64 {
    let known = if change.known_count < 0 { 0 } else { change.known_count };
    match change.membership {
        Membership::Join => known.saturating_add(1),
        Membership::Leave => {
            let lowered = known.saturating_sub(1);
            if lowered < 0 { 0 } else { lowered }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Duration, Utc};
    use gather_types::{Event, UserId};

    use super::*;
    use crate::memory::MemoryStore;

    /// Collects invalidated paths.
    #[derive(Default)]
    struct RecordingInvalidator {
        paths: Mutex<Vec<String>>,
    }

    impl RecordingInvalidator {
        fn paths(&self) -> Vec<String> {
            self.paths.lock().map(|p| p.clone()).unwrap_or_default()
        }
    }

    impl ViewInvalidator for RecordingInvalidator {
        fn invalidate(&self, path: &str) {
            if let Ok(mut paths) = self.paths.lock() {
                paths.push(path.to_owned());
            }
        }
    }

    fn sample_event() -> Event {
        let start = Utc::now() + Duration::days(2);
        Event {
            id: EventId::new(),
            title: String::from("Trivia Night"),
            description: String::from("Teams of four."),
            start_time: start,
            end_time: Some(start + Duration::hours(3)),
            location: String::from("Caffe Ibis"),
            cost: None,
            website: None,
            host: String::from("Caffe Ibis"),
            event_type: String::from("Social"),
            attendees_count: 0,
            score: 12.0,
        }
    }

    fn join(event_id: EventId, known_count: i64) -> AttendanceChange {
        AttendanceChange {
            event_id,
            membership: Membership::Join,
            known_count,
        }
    }

    fn leave(event_id: EventId, known_count: i64) -> AttendanceChange {
        AttendanceChange {
            event_id,
            membership: Membership::Leave,
            known_count,
        }
    }

    async fn stored_count(store: &MemoryStore, event_id: EventId) -> i64 {
        store.event(event_id).await.map_or(-1, |e| e.attendees_count)
    }

    #[tokio::test]
    async fn anonymous_caller_is_rejected_without_writes() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);

        let result = ledger
            .update_attendance(&RequestContext::anonymous(), join(event_id, 0))
            .await;

        assert_eq!(result, Err(AttendanceError::Unauthorized));
        assert_eq!(store.attendance_rows(event_id).await, 0);
        assert!(invalidator.paths().is_empty());
    }

    #[tokio::test]
    async fn join_sets_count_from_membership_rows() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);

        let alice = RequestContext::authenticated(UserId::new());
        let bob = RequestContext::authenticated(UserId::new());

        let first = ledger.update_attendance(&alice, join(event_id, 0)).await;
        assert!(first.is_ok());

        // A stale known count does not matter when the recount succeeds.
        let second = ledger.update_attendance(&bob, join(event_id, 0)).await;

        assert_eq!(
            second.map(|o| (o.attendees_count, o.count_source)),
            Ok((2, CountSource::Recount))
        );
        assert_eq!(stored_count(&store, event_id).await, 2);
        assert_eq!(store.attendance_rows(event_id).await, 2);
    }

    #[tokio::test]
    async fn joining_twice_conflicts() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);
        let user_id = UserId::new();
        let ctx = RequestContext::authenticated(user_id);

        assert!(ledger.update_attendance(&ctx, join(event_id, 0)).await.is_ok());
        let again = ledger.update_attendance(&ctx, join(event_id, 1)).await;

        assert_eq!(again, Err(AttendanceError::Conflict { event_id, user_id }));
        assert_eq!(store.attendance_rows(event_id).await, 1);
        assert_eq!(stored_count(&store, event_id).await, 1);
    }

    #[tokio::test]
    async fn leave_recounts_remaining_rows() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);

        let alice = RequestContext::authenticated(UserId::new());
        let bob = RequestContext::authenticated(UserId::new());
        assert!(ledger.update_attendance(&alice, join(event_id, 0)).await.is_ok());
        assert!(ledger.update_attendance(&bob, join(event_id, 1)).await.is_ok());

        let result = ledger.update_attendance(&alice, leave(event_id, 2)).await;

        assert_eq!(result.map(|o| (o.attendees_count, o.changed)), Ok((1, true)));
        assert_eq!(stored_count(&store, event_id).await, 1);
    }

    #[tokio::test]
    async fn last_leave_writes_zero_not_fallback() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);
        let ctx = RequestContext::authenticated(UserId::new());

        assert!(ledger.update_attendance(&ctx, join(event_id, 0)).await.is_ok());
        let result = ledger.update_attendance(&ctx, leave(event_id, 5)).await;

        assert_eq!(
            result.map(|o| (o.attendees_count, o.count_source)),
            Ok((0, CountSource::Recount))
        );
    }

    #[tokio::test]
    async fn leaving_unjoined_event_is_a_noop_success() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);
        let ctx = RequestContext::authenticated(UserId::new());

        let result = ledger.update_attendance(&ctx, leave(event_id, 0)).await;

        assert_eq!(result.map(|o| (o.attendees_count, o.changed)), Ok((0, false)));
        assert_eq!(stored_count(&store, event_id).await, 0);
    }

    #[tokio::test]
    async fn failed_reread_falls_back_to_known_count() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);
        let ctx = RequestContext::authenticated(UserId::new());

        store.fail_attendance_reads(true);
        let joined = ledger.update_attendance(&ctx, join(event_id, 7)).await;
        assert_eq!(
            joined.map(|o| (o.attendees_count, o.count_source)),
            Ok((8, CountSource::Fallback))
        );
        assert_eq!(stored_count(&store, event_id).await, 8);

        let left = ledger.update_attendance(&ctx, leave(event_id, 0)).await;
        assert_eq!(
            left.map(|o| (o.attendees_count, o.count_source)),
            Ok((0, CountSource::Fallback))
        );
    }

    #[tokio::test]
    async fn negative_known_count_never_written() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);
        let ctx = RequestContext::authenticated(UserId::new());

        store.fail_attendance_reads(true);
        let joined = ledger.update_attendance(&ctx, join(event_id, -5)).await;
        assert_eq!(
            joined.map(|o| (o.attendees_count, o.count_source)),
            Ok((1, CountSource::Fallback))
        );
        assert_eq!(stored_count(&store, event_id).await, 1);
    }

    #[tokio::test]
    async fn unknown_event_surfaces_store_error() {
        let store = MemoryStore::new();
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);
        let ctx = RequestContext::authenticated(UserId::new());

        let result = ledger.update_attendance(&ctx, join(EventId::new(), 0)).await;

        assert!(matches!(
            result,
            Err(AttendanceError::Store(StoreError::NotFound(_)))
        ));
        assert!(invalidator.paths().is_empty());
    }

    #[tokio::test]
    async fn successful_update_invalidates_event_and_landing_views() {
        let store = MemoryStore::new();
        let event = sample_event();
        let event_id = event.id;
        store.insert_event(event).await;
        let invalidator = RecordingInvalidator::default();
        let ledger = AttendanceLedger::new(&store, &invalidator);
        let ctx = RequestContext::authenticated(UserId::new());

        assert!(ledger.update_attendance(&ctx, join(event_id, 0)).await.is_ok());

        assert_eq!(
            invalidator.paths(),
            vec![event_view_path(event_id), LANDING_VIEW_PATH.to_owned()]
        );
    }

    #[test]
    fn fallback_never_goes_negative() {
        let event_id = EventId::new();
        assert_eq!(fallback_count(leave(event_id, 0)), 0);
        assert_eq!(fallback_count(leave(event_id, 3)), 2);
        assert_eq!(fallback_count(join(event_id, i64::MAX)), i64::MAX);
        assert_eq!(fallback_count(join(event_id, -5)), 1);
        assert_eq!(fallback_count(leave(event_id, -5)), 0);
    }
}
