//! End-to-end tests against an in-process HTTP server: real reqwest client,
//! real routing, real status codes. Store logic has its own unit suites; this
//! file covers what only the wire can exercise — bearer attachment, error
//! classification, 401 teardown and failure reporting.

use std::path::Path;
use std::sync::Arc;

use axum::extract::Path as RoutePath;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::broadcast::error::TryRecvError;

use makerlink::core::types::{Identity, NotificationKind, Role};
use makerlink::{ApiError, ClientConfig, MakerLink};

const LIVE_TOKEN: &str = "tok-live";

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn gig_json() -> Value {
    json!({
        "id": "g1",
        "title": "TIG welder",
        "description": "Pipe welds on site",
        "company": "Acme Fab",
        "location": "Detroit",
        "jobType": "contract",
        "requiredSkills": ["tig"],
        "postedBy": "u2",
        "status": "active",
        "createdAt": "2026-03-01T00:00:00Z",
        "updatedAt": "2026-03-01T00:00:00Z"
    })
}

async fn login(Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if body["password"] == "pw" {
        (
            StatusCode::OK,
            Json(json!({
                "token": LIVE_TOKEN,
                "user": { "id": "u1", "email": "u1@example.com", "role": "startup" }
            })),
        )
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "invalid credentials" })),
        )
    }
}

async fn list_gigs(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match bearer(&headers) {
        Some(LIVE_TOKEN) => (StatusCode::OK, Json(json!([gig_json()]))),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "token expired" })),
        ),
    }
}

async fn create_gig() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "message": "title required" })),
    )
}

async fn delete_gig(RoutePath(_id): RoutePath<String>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "no such gig" })),
    )
}

// Backend quirk under test: list endpoints that answer with a null or an
// object instead of an array.
async fn list_machines() -> Json<Value> {
    Json(Value::Null)
}

async fn list_gig_applications(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    match bearer(&headers) {
        Some(LIVE_TOKEN) => (
            StatusCode::OK,
            Json(json!({ "message": "nothing to see" })),
        ),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "token expired" }))),
    }
}

async fn serve() -> String {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/gigs", get(list_gigs).post(create_gig))
        .route("/api/gigs/{id}", delete(delete_gig))
        .route("/api/machines", get(list_machines))
        .route("/api/applications/gigs", get(list_gig_applications));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    // No trailing slash on purpose: the client must keep the /api prefix.
    format!("http://{addr}/api")
}

fn connect(base_url: String, dir: &Path) -> MakerLink {
    MakerLink::connect(&ClientConfig {
        base_url,
        request_timeout_secs: 5,
        state_dir: Some(dir.to_path_buf()),
    })
    .unwrap()
}

fn identity(role: Role) -> Identity {
    Identity {
        id: "u1".to_string(),
        email: "u1@example.com".to_string(),
        role,
        display_name: None,
        company_name: None,
    }
}

#[tokio::test]
async fn login_establishes_session_and_bearer_flows_to_later_calls() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let link = connect(base, dir.path());

    let who = link.session.login("u1@example.com", "pw").await.unwrap();
    assert_eq!(who.role, Role::Startup);
    assert!(link.session.is_authenticated());

    // The gigs route rejects anything but the token the login handed out.
    link.gigs.fetch_all(None).await.unwrap();
    let items = link.gigs.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].title, "TIG welder");
    assert!(link.notifications.is_empty());
}

#[tokio::test]
async fn failed_login_stays_anonymous_and_reports_once() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let link = connect(base, dir.path());
    let mut events = link.session_events();

    let err = link
        .session
        .login("u1@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(&err, ApiError::Unauthorized(Some(m)) if m == "invalid credentials"));
    assert!(!link.session.is_authenticated());

    // One notification for the failure, and no expiry event: there was no
    // session to tear down.
    let entries = link.notifications.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, NotificationKind::Error);
    assert_eq!(entries[0].title, "auth.login failed");
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn server_rejections_map_to_the_error_taxonomy() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let link = connect(base, dir.path());
    link.session
        .adopt_credential(LIVE_TOKEN.to_string(), Some(identity(Role::Startup)))
        .await
        .unwrap();

    let err = link
        .gigs
        .create(makerlink::core::types::GigDraft {
            title: String::new(),
            description: String::new(),
            company: "Acme Fab".to_string(),
            location: "Detroit".to_string(),
            salary: None,
            job_type: "contract".to_string(),
            required_skills: vec![],
        })
        .await
        .unwrap_err();
    assert!(matches!(&err, ApiError::Validation(Some(m)) if m == "title required"));

    let err = link.gigs.remove("g404").await.unwrap_err();
    assert!(matches!(&err, ApiError::NotFound(Some(m)) if m == "no such gig"));

    // Validation failures surface as warnings, the rest as errors.
    let entries = link.notifications.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].kind, NotificationKind::Warning);
    assert_eq!(entries[1].kind, NotificationKind::Error);
}

#[tokio::test]
async fn stale_credential_tears_the_session_down() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let link = connect(base, dir.path());
    link.session
        .adopt_credential("tok-stale".to_string(), Some(identity(Role::Worker)))
        .await
        .unwrap();
    assert!(link.session.is_authenticated());
    let mut events = link.session_events();

    let err = link.gigs.fetch_all(None).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(!link.session.is_authenticated());
    assert_eq!(
        events.try_recv(),
        Ok(makerlink::core::session::SessionEvent::Expired)
    );

    // Exactly one user-facing entry for the failed call.
    assert_eq!(link.notifications.len(), 1);
    assert_eq!(link.notifications.entries()[0].title, "gigs.list failed");
}

#[tokio::test]
async fn non_array_list_bodies_degrade_to_empty() {
    let base = serve().await;
    let dir = tempfile::tempdir().unwrap();
    let link = connect(base, dir.path());
    link.session
        .adopt_credential(LIVE_TOKEN.to_string(), Some(identity(Role::Worker)))
        .await
        .unwrap();

    // `null` body.
    link.machines.fetch_all(None).await.unwrap();
    assert!(link.machines.items().await.is_empty());

    // Object body.
    link.applications.fetch_gig_applications().await.unwrap();
    assert!(link.applications.gig_applications().await.is_empty());

    // Degraded responses are successes, not failures.
    assert!(link.notifications.is_empty());
}
