//! REST API endpoint handlers.
//!
//! Reads go through the [`EventCatalog`](gather_core::EventCatalog) and
//! [`ProfileStore`](gather_core::ProfileStore) handles in [`AppState`];
//! attendance changes go through the
//! [`AttendanceLedger`], with the state itself
//! receiving the stale-view notices.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness |
//! | `GET` | `/api/events` | Search events |
//! | `GET` | `/api/events/featured` | Top active events by score |
//! | `GET` | `/api/events/{id}` | Event detail with attendees |
//! | `POST` | `/api/events/{id}/attendance` | Join or leave an event |
//! | `GET` | `/api/event-types` | Event type catalog |
//! | `GET` | `/api/trending-threshold` | Trending score threshold |
//! | `GET` | `/api/profile` | Caller's profile |
//! | `PUT` | `/api/profile` | Update caller's profile |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use gather_core::{
    AttendanceChange, AttendanceLedger, EventQuery, ProfileUpdate, SearchParams,
    is_trending, trending_threshold,
};
use gather_types::{Attendee, Event, EventId, EventStatus, Membership, UserId};
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request and response bodies
// ---------------------------------------------------------------------------

/// An event as listed to clients, with derived fields.
#[derive(Debug, serde::Serialize)]
pub struct EventView {
    /// The stored event.
    #[serde(flatten)]
    pub event: Event,
    /// Where the event happens, falling back to the host.
    pub venue: String,
    /// Derived from the start and end times.
    pub status: EventStatus,
    /// Whether the score is above the trending threshold.
    pub trending: bool,
}

impl EventView {
    fn new(event: Event, now: DateTime<Utc>, threshold: Option<f64>) -> Self {
        Self {
            venue: event.display_location().to_owned(),
            status: event.status_at(now),
            trending: is_trending(event.score, threshold),
            event,
        }
    }
}

/// An attendee as shown on the event detail.
#[derive(Debug, serde::Serialize)]
pub struct AttendeeView {
    /// The attending user.
    pub user_id: UserId,
    /// Profile name, or `Anonymous User`.
    pub name: String,
}

impl From<&Attendee> for AttendeeView {
    fn from(attendee: &Attendee) -> Self {
        Self {
            user_id: attendee.user_id,
            name: attendee.display_name().to_owned(),
        }
    }
}

/// Body of `POST /api/events/{id}/attendance`.
#[derive(Debug, serde::Deserialize)]
pub struct AttendanceRequest {
    /// `true` to join, `false` to leave.
    pub attending: bool,
    /// Attendee count the client last displayed.
    #[serde(default)]
    pub known_count: i64,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Liveness probe.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ---------------------------------------------------------------------------
// GET /api/events -- search
// ---------------------------------------------------------------------------

/// Search events with optional filters, sorting and paging.
///
/// Query parameters: `query`, `type`, `date` (`YYYY-MM-DD`), `price`
/// (`free`/`paid`), `sort` (`date-asc`/`date-desc`/`popular`), `page`.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let query = EventQuery::from_params(&params, now, state.discovery.page_size);

    let page = state.catalog.search_events(&query).await?;
    let threshold =
        trending_threshold(state.catalog.as_ref(), now, state.discovery.trending_percentile)
            .await?;

    let total_pages = page.total_pages();
    let events: Vec<EventView> = page
        .events
        .into_iter()
        .map(|e| EventView::new(e, now, threshold))
        .collect();

    Ok(Json(serde_json::json!({
        "events": events,
        "total": page.total,
        "page": page.page.number,
        "page_size": page.page.size,
        "total_pages": total_pages,
        "percentile75": threshold,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/events/featured
// ---------------------------------------------------------------------------

/// The highest-scored events that have not ended yet.
pub async fn featured_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let now = Utc::now();
    let featured = state
        .catalog
        .featured_events(now, state.discovery.featured_limit)
        .await?;
    let threshold =
        trending_threshold(state.catalog.as_ref(), now, state.discovery.trending_percentile)
            .await?;

    let events: Vec<EventView> = featured
        .into_iter()
        .map(|e| EventView::new(e, now, threshold))
        .collect();

    Ok(Json(serde_json::json!({ "events": events })))
}

// ---------------------------------------------------------------------------
// GET /api/events/{id}
// ---------------------------------------------------------------------------

/// A single event. Attendees are listed only for authenticated callers.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let event_id = EventId::from(parse_uuid(&id_str)?);
    let now = Utc::now();

    let event = state
        .catalog
        .get_event(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("event {event_id}")))?;

    let (is_attending, attendees) = match ctx.user_id() {
        Some(user_id) => {
            let attendees = state.catalog.attendees(event_id).await?;
            let is_attending = attendees.iter().any(|a| a.user_id == user_id);
            let views: Vec<AttendeeView> = attendees.iter().map(AttendeeView::from).collect();
            (is_attending, Some(views))
        }
        None => (false, None),
    };

    let threshold =
        trending_threshold(state.catalog.as_ref(), now, state.discovery.trending_percentile)
            .await?;

    Ok(Json(serde_json::json!({
        "event": EventView::new(event, now, threshold),
        "is_attending": is_attending,
        "attendees": attendees,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/events/{id}/attendance
// ---------------------------------------------------------------------------

/// Join or leave an event as the authenticated caller.
pub async fn update_attendance(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    Path(id_str): Path<String>,
    payload: Result<Json<AttendanceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload?;
    let event_id = EventId::from(parse_uuid(&id_str)?);
    let change = AttendanceChange {
        event_id,
        membership: Membership::from(body.attending),
        known_count: body.known_count,
    };

    let ledger = AttendanceLedger::new(state.attendance.as_ref(), &*state);
    let outcome = ledger.update_attendance(&ctx, change).await?;

    Ok(Json(serde_json::json!({
        "event_id": outcome.event_id,
        "attending": outcome.membership == Membership::Join,
        "attendees_count": outcome.attendees_count,
        "count_source": outcome.count_source,
        "changed": outcome.changed,
    })))
}

// ---------------------------------------------------------------------------
// GET /api/event-types
// ---------------------------------------------------------------------------

/// The event type catalog, for populating filters.
pub async fn event_types(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let types = state.catalog.event_types().await?;
    Ok(Json(serde_json::json!({ "event_types": types })))
}

// ---------------------------------------------------------------------------
// GET /api/trending-threshold
// ---------------------------------------------------------------------------

/// The score above which an active event counts as trending.
pub async fn get_trending_threshold(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let threshold = trending_threshold(
        state.catalog.as_ref(),
        Utc::now(),
        state.discovery.trending_percentile,
    )
    .await?;
    Ok(Json(serde_json::json!({ "percentile75": threshold })))
}

// ---------------------------------------------------------------------------
// GET/PUT /api/profile
// ---------------------------------------------------------------------------

/// The authenticated caller's profile.
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = ctx.user_id().ok_or(ApiError::Unauthorized)?;
    let profile = state
        .profiles
        .get_profile(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("profile {user_id}")))?;
    Ok(Json(profile))
}

/// Create or update the authenticated caller's profile.
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Caller(ctx): Caller,
    payload: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = payload?;
    let user_id = ctx.user_id().ok_or(ApiError::Unauthorized)?;
    let update = update.validated()?;
    let profile = state.profiles.upsert_profile(user_id, &update).await?;
    Ok(Json(profile))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_uuid(s: &str) -> Result<Uuid, ApiError> {
    s.parse::<Uuid>()
        .map_err(|e| ApiError::InvalidUuid(format!("{s}: {e}")))
}
