//! Attendance rows in `event_attendees` and the denormalized counter on
//! `events`.
//!
//! The unique `(event_id, user_id)` constraint is what turns a repeated
//! join into [`StoreError::Duplicate`](gather_core::StoreError::Duplicate).

use chrono::{DateTime, Utc};
use gather_types::{Attendance, AttendanceId, Attendee, EventId, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbError;

/// Operations on the `event_attendees` table.
pub struct MembershipStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MembershipStore<'a> {
    /// Create a new membership store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a membership row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] with a unique violation when the user
    /// already attends, or a foreign key violation when the event is unknown.
    pub async fn insert(&self, event_id: EventId, user_id: UserId) -> Result<Attendance, DbError> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r"INSERT INTO event_attendees (id, event_id, user_id)
              VALUES ($1, $2, $3)
              RETURNING id, event_id, user_id, created_at",
        )
        .bind(AttendanceId::new().into_inner())
        .bind(event_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Delete a membership row. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the delete fails.
    pub async fn delete(&self, event_id: EventId, user_id: UserId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM event_attendees WHERE event_id = $1 AND user_id = $2")
            .bind(event_id.into_inner())
            .bind(user_id.into_inner())
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All membership rows of an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn for_event(&self, event_id: EventId) -> Result<Vec<Attendance>, DbError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r"SELECT id, event_id, user_id, created_at
              FROM event_attendees
              WHERE event_id = $1
              ORDER BY created_at, id",
        )
        .bind(event_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Attendance::from).collect())
    }

    /// Attendees of an event with their profile names, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn attendees(&self, event_id: EventId) -> Result<Vec<Attendee>, DbError> {
        let rows = sqlx::query_as::<_, (Uuid, Option<String>)>(
            r"SELECT a.user_id, p.name
              FROM event_attendees a
              LEFT JOIN profiles p ON p.id = a.user_id
              WHERE a.event_id = $1
              ORDER BY a.created_at, a.id",
        )
        .bind(event_id.into_inner())
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, name)| Attendee {
                user_id: UserId::from(user_id),
                name,
            })
            .collect())
    }

    /// Overwrite the attendee counter of an event.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if the event does not exist, or
    /// [`DbError::Postgres`] if the update fails.
    pub async fn set_count(&self, event_id: EventId, count: i64) -> Result<(), DbError> {
        let result = sqlx::query("UPDATE events SET attendees_count = $2 WHERE id = $1")
            .bind(event_id.into_inner())
            .bind(count)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("event {event_id}")));
        }

        tracing::debug!(%event_id, count, "Updated attendee count");
        Ok(())
    }
}

/// A row from the `event_attendees` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    /// Row identifier.
    pub id: Uuid,
    /// Event attended.
    pub event_id: Uuid,
    /// Attending user.
    pub user_id: Uuid,
    /// When the user joined.
    pub created_at: DateTime<Utc>,
}

impl From<AttendanceRow> for Attendance {
    fn from(row: AttendanceRow) -> Self {
        Self {
            id: AttendanceId::from(row.id),
            event_id: EventId::from(row.event_id),
            user_id: UserId::from(row.user_id),
            created_at: row.created_at,
        }
    }
}
