//! Wiring tests for the HTTP layer: routing, status codes, and error
//! bodies, with in-memory collaborators behind the handlers.

use api::api_state::ApiContext;
use api::create_router;
use app_state::{
    ApiSettings, AppSettings, IngestionSettings, LimitSettings, LoggingSettings, SecretSettings,
    StorageSettings,
};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use common_services::database::MemoryStore;
use common_services::faces::HttpFaceExtractor;
use common_services::storage::MemoryStorage;
use http_body_util::BodyExt;
use ingestion::context::ServiceContext;
use serde_json::{Value, json};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_settings() -> AppSettings {
    AppSettings {
        ingestion: IngestionSettings {
            photo_extensions: vec!["jpg".into(), "png".into()],
            extractor_url: "http://localhost:9500".into(),
            cluster_threshold: 0.35,
            lease_seconds: 300,
            reaper_interval_seconds: 60,
        },
        storage: StorageSettings {
            blob_folder: PathBuf::from("/tmp/unused"),
            public_base_url: "http://localhost:8468/media".into(),
        },
        limits: LimitSettings {
            max_archive_bytes: 1024 * 1024,
            max_photos_per_album: 100,
            fetch_timeout_seconds: 5,
        },
        api: ApiSettings {
            host: "127.0.0.1".into(),
            port: 8468,
            allowed_origins: vec![],
        },
        logging: LoggingSettings {
            level: "info".into(),
        },
        secrets: SecretSettings {
            database_url: "postgres://unused".into(),
            access_code_salt: None,
        },
    }
}

fn test_router() -> Router {
    let ctx = Arc::new(ServiceContext::new(
        test_settings(),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryStorage::new()),
        Arc::new(HttpFaceExtractor::new(
            "http://localhost:9500",
            Duration::from_secs(1),
        )),
    ));
    // Never connected to; the health check is not exercised here.
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://postgres@localhost/unused")
        .expect("lazy pool");
    create_router(ApiContext { ctx, pool })
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test]
async fn root_responds() {
    let response = test_router()
        .oneshot(Request::get("/").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let response = test_router()
        .oneshot(
            Request::get("/openapi.json")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response.into_body()).await;
    assert!(doc["paths"]["/albums"]["post"].is_object());
}

#[tokio::test]
async fn blank_submission_is_a_bad_request() {
    let payload = json!({ "fingerprint": " ", "archive_key": "uploads/a.zip" });
    let response = test_router()
        .oneshot(
            Request::post("/albums")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response.into_body()).await;
    assert!(body["error"].as_str().expect("error body").contains("fingerprint"));
}

#[tokio::test]
async fn unknown_archive_key_is_a_bad_request() {
    let payload = json!({ "fingerprint": "f1", "archive_key": "uploads/missing.zip" });
    let response = test_router()
        .oneshot(
            Request::post("/albums")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_polls_report_queued_for_unknown_ids() {
    let response = test_router()
        .oneshot(
            Request::get("/albums/not-yet-visible/status")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response.into_body()).await;
    assert_eq!(body["status"], "queued");
    assert_eq!(body["progress"], 0);
}

#[tokio::test]
async fn cluster_listing_for_a_missing_album_is_not_found() {
    let response = test_router()
        .oneshot(
            Request::get("/albums/nope/clusters")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response.into_body()).await;
    assert!(body["error"].as_str().expect("error body").contains("Not found"));
}
