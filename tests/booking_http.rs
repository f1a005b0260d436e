//! HTTP-level tests for the booking server.
//!
//! These drive the full router (session middleware, JSON errors, SSE hub)
//! against the in-memory store, so no database is needed.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use club_booking::events::BookingEvents;
use club_booking::middleware::session::SessionKeys;
use club_booking::model::Role;
use club_booking::password::MIN_PASSWORD_COST;
use club_booking::service::SetupSeed;
use club_booking::store::MemoryBookingStore;
use club_booking::{build_router, AppState, BookingService};

const TEST_SECRET: &[u8] = b"test-secret-for-http-tests";
const DATE: &str = "2026-11-02";

// ── Test app builder ───────────────────────────────────────────

struct TestApp {
    app: axum::Router,
    state: AppState,
}

async fn build_test_app() -> TestApp {
    let service = BookingService::new(Arc::new(MemoryBookingStore::new()), BookingEvents::new(16))
        .with_password_cost(MIN_PASSWORD_COST);
    let sessions = SessionKeys::from_secret(TEST_SECRET, Duration::from_secs(3600));
    let state = AppState::new(service, sessions, SetupSeed::default());

    let static_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("static");
    let app = build_router(state.clone(), &static_dir);
    TestApp { app, state }
}

/// App with the default seed plus a second club, a viewer, and a super admin.
async fn seeded_app() -> TestApp {
    let t = build_test_app().await;
    let svc = &t.state.service;
    svc.setup(&t.state.seed).await.unwrap();
    svc.add_club("IEEE").await.unwrap();
    svc.add_user("ieee_admin", "ieee-pw", Role::ClubAdmin, Some("IEEE"))
        .await
        .unwrap();
    svc.add_user("viewer", "viewer-pw", Role::User, Some("ACM Amity"))
        .await
        .unwrap();
    svc.add_user("root", "root-pw", Role::SuperAdmin, None)
        .await
        .unwrap();
    t
}

impl TestApp {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        (status, body_json(resp).await)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(post_json(
                "/api/login",
                json!({ "username": username, "password": password }),
                None,
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn book(&self, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(post_json("/api/book", body, Some(token))).await
    }
}

fn post_json(uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn booking(location: &str, slot_id: i32) -> Value {
    json!({
        "event_name": "Tech Talk",
        "summary": "Intro to Rust",
        "location_id": location,
        "slot_id": slot_id,
        "date": DATE,
    })
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

// ── Public endpoints ───────────────────────────────────────────

#[tokio::test]
async fn health_no_auth() {
    let t = build_test_app().await;
    let (status, body) = t.send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn index_page_served() {
    let t = build_test_app().await;
    let resp = t.app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&bytes).contains("Club Slot Booking"));
}

#[tokio::test]
async fn setup_route_is_idempotent() {
    let t = build_test_app().await;
    let (status, body) = t.send(get("/setup")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["raw"], "Database initialized with admin user!");

    let (_, body) = t.send(get("/setup")).await;
    assert_eq!(body["raw"], "Database already initialized.");
}

// ── Login ──────────────────────────────────────────────────────

#[tokio::test]
async fn login_success_sets_cookie() {
    let t = seeded_app().await;
    let resp = t
        .app
        .clone()
        .oneshot(post_json(
            "/api/login",
            json!({ "username": "admin", "password": "admin123" }),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let body = body_json(resp).await;
    assert_eq!(body["message"], "Logged in");
    assert_eq!(body["role"], "club_admin");
    assert_eq!(body["club"], "ACM Amity");
}

#[tokio::test]
async fn login_without_club_reports_admin() {
    let t = seeded_app().await;
    let (status, body) = t
        .send(post_json(
            "/api/login",
            json!({ "username": "root", "password": "root-pw" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["role"], "super_admin");
    assert_eq!(body["club"], "Admin");
}

#[tokio::test]
async fn login_bad_password_is_401() {
    let t = seeded_app().await;
    let (status, body) = t
        .send(post_json(
            "/api/login",
            json!({ "username": "admin", "password": "nope" }),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn session_cookie_authenticates() {
    let t = seeded_app().await;
    let token = t.login("admin", "admin123").await;
    let (status, body) = t
        .send(
            Request::builder()
                .uri("/api/me")
                .header(header::COOKIE, format!("session={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "admin");
    assert_eq!(body["club"], "ACM Amity");
}

// ── Booking ────────────────────────────────────────────────────

#[tokio::test]
async fn book_requires_session() {
    let t = seeded_app().await;
    let (status, body) = t
        .send(post_json("/api/book", booking("loc_auditorium", 1), None))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn book_rejects_forged_token() {
    let t = seeded_app().await;
    let (status, _) = t.book("not-a-jwt", booking("loc_auditorium", 1)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn plain_user_cannot_book() {
    let t = seeded_app().await;
    let token = t.login("viewer", "viewer-pw").await;
    let (status, body) = t.book(&token, booking("loc_auditorium", 1)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Unauthorized");
}

#[tokio::test]
async fn club_admin_books_and_slot_shows_booked() {
    let t = seeded_app().await;
    let token = t.login("admin", "admin123").await;

    let (status, body) = t.book(&token, booking("loc_auditorium", 2)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["message"], "Booking successful");
    assert!(body["booking_id"].as_i64().is_some());

    let (status, body) = t
        .send(get(&format!("/api/availability?date={DATE}&slot_id=2")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["loc_auditorium"],
        json!({
            "status": "booked",
            "club": "ACM Amity",
            "event": "Tech Talk",
            "summary": "Intro to Rust",
        })
    );

    // Other slots are still free
    let (_, body) = t
        .send(get(&format!("/api/availability?date={DATE}&slot_id=3")))
        .await;
    assert_eq!(body, json!({}));
}

#[tokio::test]
async fn double_booking_is_409() {
    let t = seeded_app().await;
    let acm = t.login("admin", "admin123").await;
    let ieee = t.login("ieee_admin", "ieee-pw").await;

    let (status, _) = t.book(&acm, booking("loc_lab_1", 4)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = t.book(&ieee, booking("loc_lab_1", 4)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Slot already taken");
}

#[tokio::test]
async fn third_booking_same_day_hits_quota() {
    let t = seeded_app().await;
    let token = t.login("admin", "admin123").await;

    for slot in [1, 2] {
        let (status, _) = t.book(&token, booking("loc_auditorium", slot)).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, body) = t.book(&token, booking("loc_auditorium", 3)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Daily limit reached (2 slots max)");

    // Another date is unaffected
    let mut other_day = booking("loc_auditorium", 3);
    other_day["date"] = json!("2026-11-03");
    let (status, _) = t.book(&token, other_day).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn super_admin_books_for_named_club_without_quota() {
    let t = seeded_app().await;
    let token = t.login("root", "root-pw").await;
    let ieee = t
        .state
        .service
        .store()
        .find_club_by_name("IEEE")
        .await
        .unwrap()
        .unwrap();

    for slot in 1..=3 {
        let mut body = booking("loc_amphitheatre", slot);
        body["club_id"] = json!(ieee.id);
        let (status, resp) = t.book(&token, body).await;
        assert_eq!(status, StatusCode::CREATED, "{resp}");
    }

    let (_, grid) = t
        .send(get(&format!("/api/availability/day?date={DATE}")))
        .await;
    for slot in ["1", "2", "3"] {
        assert_eq!(grid[slot]["loc_amphitheatre"]["club"], "IEEE");
    }

    // Without a club the super admin has nothing to book for.
    let (status, _) = t.book(&token, booking("loc_lab_2", 1)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn club_admin_cannot_book_for_other_club() {
    let t = seeded_app().await;
    let token = t.login("admin", "admin123").await;
    let ieee = t
        .state
        .service
        .store()
        .find_club_by_name("IEEE")
        .await
        .unwrap()
        .unwrap();

    let mut body = booking("loc_auditorium", 1);
    body["club_id"] = json!(ieee.id);
    let (status, _) = t.book(&token, body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_booking_body_is_400() {
    let t = seeded_app().await;
    let token = t.login("admin", "admin123").await;

    let (status, body) = t
        .book(&token, json!({ "location_id": "loc_auditorium" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let mut bad_slot = booking("loc_auditorium", 9);
    bad_slot["slot_id"] = json!(9);
    let (status, _) = t.book(&token, bad_slot).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_date = booking("loc_auditorium", 1);
    bad_date["date"] = json!("02-11-2026");
    let (status, _) = t.book(&token, bad_date).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ── Availability parameters ────────────────────────────────────

#[tokio::test]
async fn availability_rejects_bad_params() {
    let t = seeded_app().await;
    for uri in [
        "/api/availability",
        "/api/availability?date=2026-11-02",
        "/api/availability?date=tomorrow&slot_id=1",
        "/api/availability?date=2026-11-02&slot_id=abc",
        "/api/availability?date=2026-11-02&slot_id=0",
        "/api/availability/day",
    ] {
        let (status, body) = t.send(get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}: {body}");
    }
}

// ── Broadcast ──────────────────────────────────────────────────

#[tokio::test]
async fn booking_broadcasts_map_update() {
    let t = seeded_app().await;
    let mut rx = t.state.service.events().subscribe();
    let token = t.login("admin", "admin123").await;

    let (status, _) = t.book(&token, booking("loc_seminar_hall", 5)).await;
    assert_eq!(status, StatusCode::CREATED);

    let update = rx.recv().await.unwrap();
    assert_eq!(update.location_id, "loc_seminar_hall");
    assert_eq!(update.slot_id, 5);
    assert_eq!(update.date, DATE);
    assert_eq!(update.status, "booked");
    assert_eq!(update.club_name, "ACM Amity");
    assert_eq!(update.event_name, "Tech Talk");
}

#[tokio::test]
async fn refused_booking_is_not_broadcast() {
    let t = seeded_app().await;
    let token = t.login("admin", "admin123").await;
    t.book(&token, booking("loc_lab_2", 1)).await;

    let mut rx = t.state.service.events().subscribe();
    let (status, _) = t.book(&token, booking("loc_lab_2", 1)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn events_endpoint_streams_sse() {
    let t = build_test_app().await;
    let resp = t.app.clone().oneshot(get("/api/events")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/event-stream"));
}

#[tokio::test]
async fn events_stream_ends_on_shutdown() {
    let t = build_test_app().await;
    let resp = t.app.clone().oneshot(get("/api/events")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    t.state.shutdown.trigger();
    let body = tokio::time::timeout(Duration::from_secs(5), resp.into_body().collect())
        .await
        .expect("event stream still open after shutdown");
    assert!(body.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn graceful_shutdown_with_connected_viewer() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let t = build_test_app().await;
    let shutdown = t.state.shutdown.clone();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = t.app.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown.triggered())
            .await
    });

    let mut viewer = tokio::net::TcpStream::connect(addr).await.unwrap();
    viewer
        .write_all(b"GET /api/events HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let mut head = [0u8; 64];
    let n = viewer.read(&mut head).await.unwrap();
    assert!(String::from_utf8_lossy(&head[..n]).starts_with("HTTP/1.1 200"));

    t.state.shutdown.trigger();
    let finished = tokio::time::timeout(Duration::from_secs(5), server).await;
    assert!(finished.is_ok(), "server still running with a viewer connected");
    finished.unwrap().unwrap().unwrap();
    drop(viewer);
}
