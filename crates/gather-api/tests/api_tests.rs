//! Integration tests for the API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, over the in-memory store.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use gather_api::auth::Claims;
use gather_api::router::build_router;
use gather_api::state::AppState;
use gather_api::JwtVerifier;
use gather_core::config::DiscoverySection;
use gather_core::MemoryStore;
use gather_types::{Event, EventId, UserId};
use jsonwebtoken::{EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::Value;
use tower::ServiceExt;

const SECRET: &str = "api_test_secret";

struct Seeded {
    jazz: EventId,
    market: EventId,
    ended: EventId,
}

fn event(
    title: &str,
    event_type: &str,
    start: DateTime<Utc>,
    hours: i64,
    cost: Option<Decimal>,
    score: f64,
) -> Event {
    Event {
        id: EventId::new(),
        title: title.to_owned(),
        description: format!("{title} description"),
        start_time: start,
        end_time: Some(start + Duration::hours(hours)),
        location: String::from("Logan, UT"),
        cost,
        website: None,
        host: String::from("Cache Valley Events"),
        event_type: event_type.to_owned(),
        attendees_count: 0,
        score,
    }
}

async fn make_test_state() -> (Arc<AppState>, Arc<MemoryStore>, Seeded) {
    let store = Arc::new(MemoryStore::new());
    let now = Utc::now();

    let jazz = event("Jazz in the Park", "Music", now + Duration::days(1), 3, Some(Decimal::ZERO), 80.0);
    let market = event("Farmers Market", "Market", now + Duration::days(2), 4, Some(Decimal::new(500, 2)), 40.0);
    let talk = event("Tech Talk", "Education", now + Duration::days(3), 2, None, 20.0);
    let yoga = event("Sunrise Yoga", "Fitness", now + Duration::days(4), 1, Some(Decimal::new(1000, 2)), 30.0);
    let books = event("Book Club", "Education", now + Duration::days(5), 2, Some(Decimal::ZERO), 10.0);
    let ended = event("Old Concert", "Music", now - Duration::days(3), 2, Some(Decimal::ZERO), 100.0);

    let seeded = Seeded {
        jazz: jazz.id,
        market: market.id,
        ended: ended.id,
    };
    for e in [jazz, market, talk, yoga, books, ended] {
        store.insert_event(e).await;
    }

    let state = AppState::new(Arc::clone(&store), DiscoverySection::default())
        .with_auth(Some(JwtVerifier::new(SECRET, None, None)));
    (Arc::new(state), store, seeded)
}

fn token_for(user: UserId) -> String {
    let claims = Claims {
        sub: user.to_string(),
        exp: Utc::now().timestamp() + 3600,
        iss: None,
    };
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, user: Option<UserId>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user)));
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, user: Option<UserId>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(user) = user {
        builder = builder.header("authorization", format!("Bearer {}", token_for(user)));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn attend(event_id: EventId, user: Option<UserId>, attending: bool, known_count: i64) -> Request<Body> {
    send_json(
        "POST",
        &format!("/api/events/{event_id}/attendance"),
        user,
        &serde_json::json!({ "attending": attending, "known_count": known_count }),
    )
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_health() {
    let (state, _, _) = make_test_state().await;
    let response = build_router(state).oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_list_events_defaults() {
    let (state, _, seeded) = make_test_state().await;
    let response = build_router(state).oneshot(get("/api/events", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total"], 5);
    assert_eq!(json["page"], 1);
    assert_eq!(json["page_size"], 12);
    assert_eq!(json["total_pages"], 1);
    assert_eq!(json["percentile75"], 40.0);

    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(events[0]["id"], seeded.jazz.to_string());
    assert_eq!(events[0]["trending"], true);
    assert_eq!(events[0]["status"], "upcoming");
    assert_eq!(events[1]["trending"], false);
    assert!(events.iter().all(|e| e["id"] != seeded.ended.to_string()));
}

#[tokio::test]
async fn test_list_events_filters() {
    let (state, _, seeded) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(get("/api/events?type=Music", None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["events"][0]["id"], seeded.jazz.to_string());

    let response = router
        .clone()
        .oneshot(get("/api/events?price=free&sort=date-desc", None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total"], 2);
    assert_eq!(json["events"][0]["title"], "Book Club");
    assert_eq!(json["events"][1]["title"], "Jazz in the Park");

    let response = router
        .clone()
        .oneshot(get("/api/events?query=MARKET", None))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total"], 1);
    assert_eq!(json["events"][0]["id"], seeded.market.to_string());

    let response = router
        .oneshot(get("/api/events?date=not-a-date&page=abc", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["total"], 5);
    assert_eq!(json["page"], 1);
}

#[tokio::test]
async fn test_featured_excludes_ended_events() {
    let (state, _, seeded) = make_test_state().await;
    let response = build_router(state)
        .oneshot(get("/api/events/featured", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 5);
    assert_eq!(events[0]["id"], seeded.jazz.to_string());
    assert!(events.iter().all(|e| e["id"] != seeded.ended.to_string()));
}

#[tokio::test]
async fn test_get_event_anonymous_hides_attendees() {
    let (state, _, seeded) = make_test_state().await;
    let response = build_router(state)
        .oneshot(get(&format!("/api/events/{}", seeded.ended), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["event"]["title"], "Old Concert");
    assert_eq!(json["event"]["status"], "ended");
    assert_eq!(json["is_attending"], false);
    assert!(json["attendees"].is_null());
}

#[tokio::test]
async fn test_get_event_invalid_and_unknown_ids() {
    let (state, _, _) = make_test_state().await;
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(get("/api/events/not-a-uuid", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);

    let response = router
        .oneshot(get(&format!("/api/events/{}", EventId::new()), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attendance_requires_authentication() {
    let (state, store, seeded) = make_test_state().await;
    let response = build_router(state)
        .oneshot(attend(seeded.jazz, None, true, 0))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 401);
    assert_eq!(store.attendance_rows(seeded.jazz).await, 0);
}

#[tokio::test]
async fn test_join_twice_then_leave() {
    let (state, store, seeded) = make_test_state().await;
    let router = build_router(state);
    let user = UserId::new();

    let response = router
        .clone()
        .oneshot(attend(seeded.jazz, Some(user), true, 0))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["attendees_count"], 1);
    assert_eq!(json["attending"], true);
    assert_eq!(json["count_source"], "recount");

    let response = router
        .clone()
        .oneshot(attend(seeded.jazz, Some(user), true, 1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = router
        .oneshot(attend(seeded.jazz, Some(user), false, 1))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["attendees_count"], 0);
    assert_eq!(json["attending"], false);

    assert_eq!(store.attendance_rows(seeded.jazz).await, 0);
    assert_eq!(store.event(seeded.jazz).await.unwrap().attendees_count, 0);
}

#[tokio::test]
async fn test_attendance_on_unknown_event_is_not_found() {
    let (state, _, _) = make_test_state().await;
    let response = build_router(state)
        .oneshot(attend(EventId::new(), Some(UserId::new()), true, 0))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attendance_body_missing_field_is_bad_request() {
    let (state, store, seeded) = make_test_state().await;
    let response = build_router(state)
        .oneshot(send_json(
            "POST",
            &format!("/api/events/{}/attendance", seeded.jazz),
            Some(UserId::new()),
            &serde_json::json!({ "known_count": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
    assert!(json["error"].is_string());
    assert_eq!(store.attendance_rows(seeded.jazz).await, 0);
}

#[tokio::test]
async fn test_profile_body_missing_name_is_bad_request() {
    let (state, _, _) = make_test_state().await;
    let response = build_router(state)
        .oneshot(send_json(
            "PUT",
            "/api/profile",
            Some(UserId::new()),
            &serde_json::json!({ "bio": "No name given." }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_attendance_publishes_invalidations() {
    let (state, _, seeded) = make_test_state().await;
    let mut rx = state.subscribe();

    let response = build_router(Arc::clone(&state))
        .oneshot(attend(seeded.market, Some(UserId::new()), true, 0))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let first = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();
    assert_eq!(first.path, format!("/events/{}", seeded.market));
    assert_eq!(second.path, "/");
}

#[tokio::test]
async fn test_get_event_lists_attendees_for_members() {
    let (state, _, seeded) = make_test_state().await;
    let router = build_router(state);
    let named = UserId::new();
    let unnamed = UserId::new();

    let response = router
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/profile",
            Some(named),
            &serde_json::json!({ "name": "Ada" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    for user in [named, unnamed] {
        let response = router
            .clone()
            .oneshot(attend(seeded.jazz, Some(user), true, 0))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = router
        .oneshot(get(&format!("/api/events/{}", seeded.jazz), Some(unnamed)))
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["is_attending"], true);
    assert_eq!(json["event"]["attendees_count"], 2);

    let attendees = json["attendees"].as_array().unwrap();
    assert_eq!(attendees.len(), 2);
    assert_eq!(attendees[0]["name"], "Ada");
    assert_eq!(attendees[1]["name"], "Anonymous User");
}

#[tokio::test]
async fn test_trending_threshold() {
    let (state, _, _) = make_test_state().await;
    let response = build_router(state)
        .oneshot(get("/api/trending-threshold", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["percentile75"], 40.0);
}

#[tokio::test]
async fn test_trending_threshold_without_active_events_is_null() {
    let state = Arc::new(AppState::new(
        Arc::new(MemoryStore::new()),
        DiscoverySection::default(),
    ));
    let response = build_router(state)
        .oneshot(get("/api/trending-threshold", None))
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    assert!(json["percentile75"].is_null());
}

#[tokio::test]
async fn test_event_types() {
    let (state, _, _) = make_test_state().await;
    let response = build_router(state)
        .oneshot(get("/api/event-types", None))
        .await
        .unwrap();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(
        json["event_types"],
        serde_json::json!(["Education", "Fitness", "Market", "Music"])
    );
}

#[tokio::test]
async fn test_profile_flow() {
    let (state, _, _) = make_test_state().await;
    let router = build_router(state);
    let user = UserId::new();

    let response = router.clone().oneshot(get("/api/profile", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .clone()
        .oneshot(get("/api/profile", Some(user)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/profile",
            Some(user),
            &serde_json::json!({ "name": "A", "website": "not a url" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/profile",
            Some(user),
            &serde_json::json!({ "name": "Grace", "bio": "Compilers.", "website": "" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router.oneshot(get("/api/profile", Some(user))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["name"], "Grace");
    assert_eq!(json["bio"], "Compilers.");
    assert!(json["website"].is_null());
}

#[tokio::test]
async fn test_invalid_token_reads_as_anonymous() {
    let (state, _, seeded) = make_test_state().await;
    let request = Request::get(format!("/api/events/{}", seeded.jazz))
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();
    let response = build_router(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["attendees"].is_null());
}
