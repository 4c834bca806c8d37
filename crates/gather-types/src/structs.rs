//! Core entity structs for the Gather events service.
//!
//! These mirror the rows of the `events`, `event_attendees` and
//! `profiles` tables. The attendee count on [`Event`] is denormalized and
//! maintained by the attendance ledger in `gather-core`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::EventStatus;
use crate::ids::{AttendanceId, EventId, UserId};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A listed local event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Short title, searched case-insensitively.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// When the event starts.
    pub start_time: DateTime<Utc>,
    /// When the event ends. Events without an end time are never active.
    pub end_time: Option<DateTime<Utc>>,
    /// Where it takes place. The literal `none` means "at the host".
    pub location: String,
    /// Admission cost; `None` when unknown.
    #[ts(as = "Option<String>")]
    pub cost: Option<Decimal>,
    /// External website.
    pub website: Option<String>,
    /// Hosting organisation or person.
    pub host: String,
    /// Category name, one of the event type catalog entries.
    pub event_type: String,
    /// Denormalized number of attendance rows for this event.
    pub attendees_count: i64,
    /// Popularity score, maintained by an external process.
    pub score: f64,
}

impl Event {
    /// Derive the lifecycle status of the event at `now`.
    ///
    /// An event without an end time is `ongoing` once it has started.
    pub fn status_at(&self, now: DateTime<Utc>) -> EventStatus {
        if now < self.start_time {
            return EventStatus::Upcoming;
        }
        match self.end_time {
            Some(end) if now > end => EventStatus::Ended,
            _ => EventStatus::Ongoing,
        }
    }

    /// Whether the event's end time lies strictly after `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.end_time.is_some_and(|end| end > now)
    }

    /// The place to show for the event, falling back to the host when the
    /// location is the literal `none`.
    pub fn display_location(&self) -> &str {
        if self.location.eq_ignore_ascii_case("none") {
            &self.host
        } else {
            &self.location
        }
    }
}

// ---------------------------------------------------------------------------
// Attendance
// ---------------------------------------------------------------------------

/// A membership record: `user_id` is attending `event_id`.
///
/// Unique per `(event_id, user_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attendance {
    /// Row identifier.
    pub id: AttendanceId,
    /// The event being attended.
    pub event_id: EventId,
    /// The attending user.
    pub user_id: UserId,
    /// When the user joined.
    pub created_at: DateTime<Utc>,
}

/// An attendee as shown on an event detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Attendee {
    /// The attending user.
    pub user_id: UserId,
    /// Profile display name, if the user has a profile with a name.
    pub name: Option<String>,
}

impl Attendee {
    /// Name to display, `Anonymous User` when no profile name is known.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or("Anonymous User")
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Profile {
    /// Owner of the profile (same id as the identity provider user).
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Short biography.
    pub bio: Option<String>,
    /// Personal website.
    pub website: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
}
