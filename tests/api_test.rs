//! Integration tests for the HTTP API.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::util::ServiceExt; // for `oneshot`

use askq::api::{AppState, build_router};
use askq::config::secrets::SecretString;
use askq::engine::Engine;
use askq::hub::Notice;
use askq::intake::IntakeConfig;

fn setup() -> (Engine, Router) {
    let engine = Engine::in_memory().expect("failed to create in-memory engine");
    let app = build_router(AppState::new(engine.clone(), IntakeConfig::default()));
    (engine, app)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, extract_json(response.into_body()).await)
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_reports_queue_depth() {
    let (_engine, app) = setup();
    call(&app, post_json("/api/ask", json!({ "question": "hi?" }))).await;

    let (status, body) = call(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["queued"], 1);
    assert!(body["time"].is_string());
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn ask_queues_and_reports_tier() {
    let (engine, app) = setup();

    let (status, body) = call(
        &app,
        post_json(
            "/api/ask",
            json!({ "user": "Bob", "question": "big one?", "amountCents": 1000 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["tier"], "priority");
    assert_eq!(body["duplicate"], false);

    let queue = engine.list_queue();
    assert_eq!(queue.len(), 1);
    assert_eq!(body["id"], queue[0].id.to_string());
    assert_eq!(queue[0].origin, "mod");
}

#[tokio::test]
async fn repeated_ask_is_flagged_duplicate() {
    let (_engine, app) = setup();
    let body = json!({ "user": "Alice", "question": "again?" });

    let (_, first) = call(&app, post_json("/api/ask", body.clone())).await;
    let (_, second) = call(&app, post_json("/api/ask", body)).await;

    assert_eq!(second["duplicate"], true);
    assert_eq!(second["id"], first["id"]);
}

#[tokio::test]
async fn missing_question_is_bad_request() {
    let (_engine, app) = setup();
    let (status, body) = call(&app, post_json("/api/ask", json!({ "user": "a" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_question");
}

#[tokio::test]
async fn blocked_question_is_bad_request() {
    let (engine, app) = setup();
    let (status, body) = call(
        &app,
        post_json("/api/ask", json!({ "question": "should I kill my coworker" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "blocked");
    assert!(engine.list_queue().is_empty());
}

// =============================================================================
// Queue control
// =============================================================================

#[tokio::test]
async fn stop_and_answer_now_drive_the_queue() {
    let (engine, app) = setup();
    let (_, alice) = call(&app, post_json("/api/ask", json!({ "user": "Alice", "question": "a?" }))).await;
    let (_, bob) = call(
        &app,
        post_json("/api/ask", json!({ "user": "Bob", "question": "b?", "amountCents": 500 })),
    )
    .await;
    let alice_id = alice["id"].as_str().unwrap();
    let bob_id = bob["id"].as_str().unwrap();

    let (status, _) = call(&app, post(&format!("/api/queue/{alice_id}/answer-now"))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, queue) = call(&app, get("/api/queue")).await;
    assert_eq!(queue["items"][0]["id"], alice_id);
    assert_eq!(queue["items"][0]["tier"], "priority");
    assert_eq!(queue["items"][1]["id"], bob_id);

    let (status, body) = call(&app, post(&format!("/api/queue/{bob_id}/stop"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(engine.list_queue().len(), 1);

    let (status, body) = call(&app, post(&format!("/api/queue/{bob_id}/stop"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn malformed_id_is_not_found() {
    let (_engine, app) = setup();
    let (status, _) = call(&app, post("/api/queue/not-a-uuid/answer-now")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn history_starts_empty() {
    let (_engine, app) = setup();
    let (status, body) = call(&app, get("/api/history")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
}

// =============================================================================
// Source events
// =============================================================================

#[tokio::test]
async fn tip_event_is_admitted_with_its_amount() {
    let (engine, app) = setup();
    let (status, body) = call(
        &app,
        post_json(
            "/api/events",
            json!({ "type": "tip", "username": "Dana", "amount": 5.0, "message": "how's the run" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tier"], "priority");

    let item = &engine.list_queue()[0];
    assert_eq!(item.submitter, "Dana");
    assert_eq!(item.origin, "tips");
    assert_eq!(item.amount_cents, 500);
    assert_eq!(item.text, "asks: how's the run");
}

#[tokio::test]
async fn redemption_without_text_is_ignored() {
    let (engine, app) = setup();
    let (status, body) = call(
        &app,
        post_json("/api/events", json!({ "type": "redemption", "userName": "Eve" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ignored"], true);
    assert!(engine.list_queue().is_empty());
}

// =============================================================================
// Event stream
// =============================================================================

#[tokio::test]
async fn event_stream_opens_with_queue_state() {
    let (engine, app) = setup();
    let response = app.oneshot(get("/events")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    assert_eq!(engine.hub().observer_count(), 1);

    let mut body = response.into_body();
    let frame = body.frame().await.unwrap().unwrap();
    let chunk = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
    assert!(chunk.contains("event: queue-state"), "got {chunk:?}");
    assert!(chunk.contains(r#""type":"queue-state""#));
}

#[tokio::test]
async fn malformed_body_gets_json_error() {
    let (engine, app) = setup();
    let request = Request::builder()
        .method("POST")
        .uri("/api/ask")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, body) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_body");
    assert!(engine.list_queue().is_empty());
}

#[tokio::test]
async fn negative_amount_gets_json_error() {
    let (_engine, app) = setup();
    let (status, body) = call(
        &app,
        post_json("/api/ask", json!({ "question": "q?", "amountCents": -5 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_body");
}

#[tokio::test]
async fn unknown_event_type_gets_json_error() {
    let (_engine, app) = setup();
    let (status, body) = call(&app, post_json("/api/events", json!({ "type": "raid" }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_body");
}

// =============================================================================
// Admin
// =============================================================================

fn setup_with_admin(token: &str) -> (Engine, Router) {
    let engine = Engine::in_memory().expect("failed to create in-memory engine");
    let state = AppState::new(engine.clone(), IntakeConfig::default())
        .with_admin_token(Some(SecretString::from(token.to_string())));
    (engine, build_router(state))
}

fn replay_request(token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/admin/overlay/replay");
    if let Some(token) = token {
        builder = builder.header("x-admin-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn replay_is_forbidden_without_configured_token() {
    let (engine, app) = setup();
    let mut sub = engine.subscribe();
    let _primed = sub.rx.try_recv().unwrap();

    let (status, body) = call(&app, replay_request(Some("anything"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
    assert!(sub.rx.try_recv().is_err());
}

#[tokio::test]
async fn replay_rejects_wrong_or_missing_token() {
    let (_engine, app) = setup_with_admin("s3cret");

    let (status, _) = call(&app, replay_request(Some("guess"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, replay_request(None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn replay_with_token_reaches_observers() {
    let (engine, app) = setup_with_admin("s3cret");
    let mut sub = engine.subscribe();
    let _primed = sub.rx.try_recv().unwrap();

    let (status, body) = call(&app, replay_request(Some("s3cret"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["delivered"], 1);
    assert_eq!(sub.rx.try_recv().unwrap(), Notice::Replay);
}
