//! Event listing queries against the `events` table.
//!
//! Search filters are assembled with [`QueryBuilder`] so every user value
//! is bound as a parameter. The same `WHERE` clause drives both the count
//! query and the page query, keeping `total` consistent with the rows.

use chrono::{DateTime, Utc};
use gather_core::{EventPage, EventQuery};
use gather_types::{Event, EventId, PriceFilter, SortOrder};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::DbError;

const EVENT_COLUMNS: &str = "id, title, description, start_time, end_time, location, cost, \
     website, host, event_type, attendees_count, score";

/// Operations on the `events` and `event_types` tables.
pub struct EventStore<'a> {
    pool: &'a PgPool,
}

impl<'a> EventStore<'a> {
    /// Create a new event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an event and register its type in the type catalog.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if either insert fails.
    pub async fn insert_event(&self, event: &Event) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO event_types (event_type) VALUES ($1)
              ON CONFLICT (event_type) DO NOTHING",
        )
        .bind(&event.event_type)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"INSERT INTO events (id, title, description, start_time, end_time, location, cost, website, host, event_type, attendees_count, score)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(event.id.into_inner())
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.location)
        .bind(event.cost)
        .bind(&event.website)
        .bind(&event.host)
        .bind(&event.event_type)
        .bind(event.attendees_count)
        .bind(event.score)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(event_id = %event.id, "Inserted event");
        Ok(())
    }

    /// Add a name to the event type catalog. Existing names are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_event_type(&self, name: &str) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO event_types (event_type) VALUES ($1)
              ON CONFLICT (event_type) DO NOTHING",
        )
        .bind(name)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Run a normalized search and return the requested page.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if either query fails.
    pub async fn search(&self, query: &EventQuery) -> Result<EventPage, DbError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {EVENT_COLUMNS} FROM events"));
        push_filters(&mut select, query);
        select.push(order_by(query.sort));
        select
            .push(" LIMIT ")
            .push_bind(i64::try_from(query.page.limit()).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX));

        let rows: Vec<EventRow> = select.build_query_as().fetch_all(self.pool).await?;

        Ok(EventPage {
            events: rows.into_iter().map(Event::from).collect(),
            total: u64::try_from(total).unwrap_or(0),
            page: query.page,
        })
    }

    /// The `limit` highest-scored events still running after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn featured(&self, now: DateTime<Utc>, limit: u32) -> Result<Vec<Event>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE end_time > $1 ORDER BY score DESC, id LIMIT $2"
        ))
        .bind(now)
        .bind(i64::from(limit))
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Event::from).collect())
    }

    /// Fetch a single event by id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, event_id: EventId) -> Result<Option<Event>, DbError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(event_id.into_inner())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Event::from))
    }

    /// Scores of all events whose end time is after `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn active_scores(&self, now: DateTime<Utc>) -> Result<Vec<f64>, DbError> {
        let scores = sqlx::query_scalar::<_, f64>("SELECT score FROM events WHERE end_time > $1")
            .bind(now)
            .fetch_all(self.pool)
            .await?;
        Ok(scores)
    }

    /// The event type catalog, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn event_types(&self) -> Result<Vec<String>, DbError> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT event_type FROM event_types ORDER BY event_type",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(names)
    }
}

/// Append the `WHERE` clause for `query`.
fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &EventQuery) {
    builder
        .push(" WHERE end_time >= ")
        .push_bind(query.ends_on_or_after);

    if let Some(title) = &query.title_contains {
        builder
            .push(" AND title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)));
    }
    if let Some(event_type) = &query.event_type {
        builder.push(" AND event_type = ").push_bind(event_type.clone());
    }
    if let Some(window) = query.start_window {
        builder
            .push(" AND start_time >= ")
            .push_bind(window.from)
            .push(" AND start_time < ")
            .push_bind(window.until);
    }
    match query.price {
        Some(PriceFilter::Free) => {
            builder.push(" AND cost = 0");
        }
        Some(PriceFilter::Paid) => {
            builder.push(" AND cost > 0");
        }
        None => {}
    }
}

const fn order_by(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::DateAsc => " ORDER BY start_time ASC, id",
        SortOrder::DateDesc => " ORDER BY start_time DESC, id",
        SortOrder::Popular | SortOrder::Score => " ORDER BY score DESC, id",
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Event identifier.
    pub id: Uuid,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Start timestamp.
    pub start_time: DateTime<Utc>,
    /// End timestamp, if known.
    pub end_time: Option<DateTime<Utc>>,
    /// Venue, or `none`.
    pub location: String,
    /// Entry cost.
    pub cost: Option<Decimal>,
    /// Event website.
    pub website: Option<String>,
    /// Host name.
    pub host: String,
    /// Event type.
    pub event_type: String,
    /// Denormalized attendee count.
    pub attendees_count: i64,
    /// Popularity score.
    pub score: f64,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::from(row.id),
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            end_time: row.end_time,
            location: row.location,
            cost: row.cost,
            website: row.website,
            host: row.host,
            event_type: row.event_type,
            attendees_count: row.attendees_count,
            score: row.score,
        }
    }
}
