//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use member_store::{
    InMemoryMemberStore, Member, MemberCount, MemberId, MemberStore, MemberUpdate, NewMember,
    StoreError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

use api::routes::members::AppState;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// Store double whose storage is permanently unreachable.
#[derive(Clone)]
struct UnreachableStore;

fn unreachable() -> StoreError {
    StoreError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait::async_trait]
impl MemberStore for UnreachableStore {
    async fn add_member(&self, _new_member: NewMember) -> member_store::Result<Member> {
        Err(unreachable())
    }

    async fn remove_member(&self, _id: MemberId) -> member_store::Result<()> {
        Err(unreachable())
    }

    async fn update_member(
        &self,
        _id: MemberId,
        _update: MemberUpdate,
    ) -> member_store::Result<Member> {
        Err(unreachable())
    }

    async fn get_member(&self, _id: MemberId) -> member_store::Result<Option<Member>> {
        Err(unreachable())
    }

    async fn counter(&self) -> member_store::Result<Option<MemberCount>> {
        Err(unreachable())
    }

    async fn recalculate(&self) -> member_store::Result<i64> {
        Err(unreachable())
    }
}

fn setup() -> (axum::Router, InMemoryMemberStore) {
    let store = InMemoryMemberStore::new();
    let state = Arc::new(AppState {
        store: store.clone(),
    });
    let app = api::create_app(state, get_metrics_handle());
    (app, store)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn create_member_request(name: &str, email: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/members")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::to_string(&serde_json::json!({
                "name": name,
                "email": email,
            }))
            .unwrap(),
        ))
        .unwrap()
}

fn get_count_request() -> Request<Body> {
    Request::builder()
        .uri("/count")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_count_starts_at_zero() {
    let (app, _) = setup();

    let (status, json) = send(&app, get_count_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    assert!(json["last_updated"].is_string());
}

#[tokio::test]
async fn test_create_member_returns_created() {
    let (app, _) = setup();

    let (status, json) = send(&app, create_member_request("ada", "ada@example.com")).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["name"], "ada");
    assert_eq!(json["email"], "ada@example.com");
    assert!(json["id"].is_string());
}

#[tokio::test]
async fn test_count_scenario_insert_delete_duplicate() {
    let (app, _) = setup();

    // Insert three members with distinct natural keys
    let (_, first) = send(&app, create_member_request("m1", "m1@example.com")).await;
    send(&app, create_member_request("m2", "m2@example.com")).await;
    send(&app, create_member_request("m3", "m3@example.com")).await;

    let (_, json) = send(&app, get_count_request()).await;
    assert_eq!(json["count"], 3);

    // Delete one
    let id = first["id"].as_str().unwrap();
    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/members/{id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, json) = send(&app, get_count_request()).await;
    assert_eq!(json["count"], 2);

    // Duplicate natural key fails and leaves the count alone
    let (status, json) = send(&app, create_member_request("m2", "other@example.com")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("Duplicate member"));

    let (_, json) = send(&app, get_count_request()).await;
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn test_get_member_roundtrip() {
    let (app, _) = setup();

    let (_, created) = send(&app, create_member_request("ada", "ada@example.com")).await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        Request::builder()
            .uri(format!("/members/{id}"))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "ada");
}

#[tokio::test]
async fn test_delete_unknown_member_returns_not_found() {
    let (app, _) = setup();

    let (status, _) = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(format!("/members/{}", uuid::Uuid::new_v4()))
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_member_id_returns_bad_request() {
    let (app, _) = setup();

    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/members/not-a-uuid")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid ID"));
}

#[tokio::test]
async fn test_update_member_leaves_count_unchanged() {
    let (app, _) = setup();

    let (_, created) = send(&app, create_member_request("ada", "ada@example.com")).await;
    let id = created["id"].as_str().unwrap();

    let (status, json) = send(
        &app,
        Request::builder()
            .method("PUT")
            .uri(format!("/members/{id}"))
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(&serde_json::json!({"name": "ada lovelace"})).unwrap(),
            ))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "ada lovelace");
    assert_eq!(json["email"], "ada@example.com");

    let (_, json) = send(&app, get_count_request()).await;
    assert_eq!(json["count"], 1);
}

#[tokio::test]
async fn test_update_with_no_fields_rejected() {
    let (app, _) = setup();

    let (_, created) = send(&app, create_member_request("ada", "ada@example.com")).await;
    let id = created["id"].as_str().unwrap();

    let (status, _) = send(
        &app,
        Request::builder()
            .method("PUT")
            .uri(format!("/members/{id}"))
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_name_rejected() {
    let (app, _) = setup();

    let (status, _) = send(&app, create_member_request("  ", "ada@example.com")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recalculate_repairs_drift() {
    let (app, store) = setup();

    send(&app, create_member_request("m1", "m1@example.com")).await;
    send(&app, create_member_request("m2", "m2@example.com")).await;

    // Drift: scribble on the counter behind the store's back
    store.set_counter(42).await;

    let (status, json) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/count/recalculate")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);

    let (_, json) = send(&app, get_count_request()).await;
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn test_count_self_heals_missing_counter_row() {
    let (app, store) = setup();

    send(&app, create_member_request("m1", "m1@example.com")).await;
    send(&app, create_member_request("m2", "m2@example.com")).await;

    // Simulated corruption: counter row gone
    store.drop_counter().await;

    let (status, json) = send(&app, get_count_request()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
}

#[tokio::test]
async fn test_unreachable_storage_maps_to_service_unavailable() {
    let state = Arc::new(AppState {
        store: UnreachableStore,
    });
    let app = api::create_app(state, get_metrics_handle());

    let (status, json) = send(&app, get_count_request()).await;

    // Generic body only; the raw database error never reaches the client
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json, serde_json::json!({ "error": "service unavailable" }));
}

#[tokio::test]
async fn test_unreachable_storage_is_not_self_healed() {
    let state = Arc::new(AppState {
        store: UnreachableStore,
    });
    let app = api::create_app(state, get_metrics_handle());

    let (status, json) = send(
        &app,
        Request::builder()
            .method("POST")
            .uri("/count/recalculate")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "service unavailable");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
