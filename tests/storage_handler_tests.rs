mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{
    InMemoryRepository, body_bytes, body_json, json_request, request, sample_question, seed_user,
    token_for,
};
use geo_questions::{
    AppState, create_router,
    models::Role,
    storage::{LocalImageStore, MockImageStore, StorageState},
};
use std::{path::Path, sync::Arc};
use tower::util::ServiceExt;

const BOUNDARY: &str = "geo-boundary";

fn multipart_upload(
    uri: &str,
    token: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Router whose upload directory (and `/uploads` mount) is `dir`.
async fn app_with_store(
    repo: Arc<InMemoryRepository>,
    dir: &Path,
    storage: Option<StorageState>,
) -> Router {
    let mut state: AppState = common::create_test_state(
        repo,
        storage.unwrap_or_else(|| Arc::new(LocalImageStore::new(dir)) as StorageState),
    );
    state.config.upload_dir = dir.to_path_buf();
    create_router(state)
}

async fn create_question(app: &Router, owner: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/questions",
            Some(&token_for(owner)),
            &serde_json::to_value(sample_question()).unwrap(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_upload_stores_file_and_links_question() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    seed_user(&repo, "ana", Role::User).await;
    let app = app_with_store(repo, dir.path(), None).await;
    let id = create_question(&app, "ana").await;

    let response = app
        .clone()
        .oneshot(multipart_upload(
            &format!("/questions/{}/upload-image", id),
            &token_for("ana"),
            "file",
            "mapa.png",
            "image/png",
            b"\x89PNG fake",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let url = body["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));

    // On disk.
    let name = url.trim_start_matches("/uploads/");
    assert_eq!(std::fs::read(dir.path().join(name)).unwrap(), b"\x89PNG fake");

    // Linked.
    let response = app
        .clone()
        .oneshot(request("GET", &format!("/questions/{}", id), Some(&token_for("ana"))))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["image_url"], url.as_str());

    // Served publicly.
    let response = app.oneshot(request("GET", &url, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"\x89PNG fake");
}

#[tokio::test]
async fn test_upload_rejects_non_images() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    seed_user(&repo, "ana", Role::User).await;
    let app = app_with_store(repo, dir.path(), None).await;
    let id = create_question(&app, "ana").await;

    let response = app
        .oneshot(multipart_upload(
            &format!("/questions/{}/upload-image", id),
            &token_for("ana"),
            "file",
            "notes.pdf",
            "application/pdf",
            b"%PDF",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_requires_file_field() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    seed_user(&repo, "ana", Role::User).await;
    let app = app_with_store(repo, dir.path(), None).await;
    let id = create_question(&app, "ana").await;

    let response = app
        .oneshot(multipart_upload(
            &format!("/questions/{}/upload-image", id),
            &token_for("ana"),
            "picture",
            "mapa.png",
            "image/png",
            b"png",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_upload_to_someone_elses_question_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    seed_user(&repo, "ana", Role::User).await;
    seed_user(&repo, "bruno", Role::User).await;
    let app = app_with_store(repo, dir.path(), None).await;
    let id = create_question(&app, "ana").await;

    let response = app
        .oneshot(multipart_upload(
            &format!("/questions/{}/upload-image", id),
            &token_for("bruno"),
            "file",
            "mapa.png",
            "image/png",
            b"png",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_upload_storage_failure_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = InMemoryRepository::new();
    seed_user(&repo, "ana", Role::User).await;
    let app = app_with_store(
        repo,
        dir.path(),
        Some(Arc::new(MockImageStore::new_failing())),
    )
    .await;
    let id = create_question(&app, "ana").await;

    let response = app
        .oneshot(multipart_upload(
            &format!("/questions/{}/upload-image", id),
            &token_for("ana"),
            "file",
            "mapa.png",
            "image/png",
            b"png",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body_json(response).await["detail"].as_str().unwrap().to_string();
    assert!(detail.contains("Mock Storage Error"));
}
