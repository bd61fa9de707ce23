//! End-to-end tests against the HTTP router

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{test_state, FakeLlm, Script};
use grounded_rag::server::build_router;

const BOUNDARY: &str = "grounded-rag-test-boundary";

fn multipart_body(files: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (filename, data) in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, bytes) = send(router, request).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn upload(files: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/upload_file")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(files)))
        .unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn by_name(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn router_with_geo(llm: std::sync::Arc<FakeLlm>) -> Router {
    let router = build_router(test_state(llm));
    let (status, report) = send_json(&router, upload(&[("geo.txt", "Paris is the capital of France.")])).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["documents"][0]["name"], "geo.txt");
    router
}

#[tokio::test]
async fn test_health_and_ready() {
    let router = build_router(test_state(FakeLlm::answering(vec!["ok"])));

    let (status, body) = send(&router, by_name(Method::GET, "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");

    let (status, _) = send(&router, by_name(Method::GET, "/ready", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_respond_cites_uploaded_document() {
    let llm = FakeLlm::answering(vec!["Paris", " is the capital."]);
    let router = router_with_geo(llm.clone()).await;

    let (status, body) = send_json(
        &router,
        post_json("/respond", json!({ "body": "What is the capital of France?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["body"], "Paris is the capital.");
    assert_eq!(body["context"], "Sources:\ngeo.txt");

    let prompt = llm.last_prompt().unwrap();
    assert!(prompt.contains("Paris is the capital of France."));
    assert!(prompt.contains("Question: What is the capital of France?"));
}

#[tokio::test]
async fn test_respond_uses_requested_model() {
    let llm = FakeLlm::answering(vec!["Paris"]);
    let router = router_with_geo(llm.clone()).await;

    let (status, _) = send_json(
        &router,
        post_json(
            "/respond",
            json!({ "body": "Capital of France?", "model_name": "phi3", "temperature": 0.1 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(llm.last_model().as_deref(), Some("phi3"));
}

#[tokio::test]
async fn test_respond_on_empty_store_still_answers() {
    let llm = FakeLlm::answering(vec!["I cannot answer."]);
    let router = build_router(test_state(llm.clone()));

    let (status, body) = send_json(&router, post_json("/respond", json!({ "body": "Anything?" }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["context"], "Sources:");
    assert!(llm
        .last_prompt()
        .unwrap()
        .contains("No context documents were found"));
}

#[tokio::test]
async fn test_respond_rejects_empty_question() {
    let router = build_router(test_state(FakeLlm::answering(vec!["unused"])));

    let (status, body) = send_json(&router, post_json("/respond", json!({ "body": "  " }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn test_backend_failure_is_opaque() {
    let router = router_with_geo(FakeLlm::new(Script::FailStart)).await;

    let (status, body) = send_json(&router, post_json("/respond", json!({ "body": "Capital?" }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Internal Server Error");
}

#[tokio::test]
async fn test_stream_ends_with_citations() {
    let router = router_with_geo(FakeLlm::answering(vec!["Paris", " is", " the capital."])).await;

    let request = post_json("/respond_stream", json!({ "body": "What is the capital of France?" }));
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(text, "Paris is the capital.\n\nSources:\ngeo.txt");
}

#[tokio::test]
async fn test_stream_start_failure_is_json_error() {
    let router = router_with_geo(FakeLlm::new(Script::FailStart)).await;

    let (status, body) =
        send_json(&router, post_json("/respond_stream", json!({ "body": "Capital?" }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["message"], "Internal Server Error");
}

#[tokio::test]
async fn test_stream_error_before_any_text_is_json_error() {
    let router = router_with_geo(FakeLlm::new(Script::FailAfter(vec![]))).await;

    let (status, body) =
        send_json(&router, post_json("/respond_stream", json!({ "body": "Capital?" }))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "generation_error");
}

#[tokio::test]
async fn test_stream_midway_failure_aborts_body() {
    let router = router_with_geo(FakeLlm::new(Script::FailAfter(vec!["Par"]))).await;

    let request = post_json("/respond_stream", json!({ "body": "Capital?" }));
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn test_document_lifecycle() {
    let router = router_with_geo(FakeLlm::answering(vec!["ok"])).await;

    let (status, body) =
        send_json(&router, by_name(Method::GET, "/get_document?doc_name=geo.txt", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
    assert_eq!(body["documents"][0]["content"], "Paris is the capital of France.");
    assert_eq!(body["documents"][0]["metadata"]["src"], "geo.txt");
    assert_eq!(body["documents"][0]["metadata"]["type"], "txt");
    assert_eq!(body["documents"][0]["dimensions"], common::DIMS);

    let (status, body) = send_json(
        &router,
        by_name(
            Method::PATCH,
            "/update_document?doc_name=geo.txt",
            Some(json!({ "key": "author", "value": "atlas" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], true);

    let (_, body) =
        send_json(&router, by_name(Method::GET, "/get_document?doc_name=geo.txt", None)).await;
    assert_eq!(body["documents"][0]["metadata"]["author"], "atlas");

    let (status, body) =
        send_json(&router, by_name(Method::DELETE, "/delete_document?doc_name=geo.txt", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], true);

    let (status, body) =
        send_json(&router, by_name(Method::GET, "/get_document?doc_name=geo.txt", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn test_missing_documents_are_not_found() {
    let router = build_router(test_state(FakeLlm::answering(vec!["ok"])));

    let (status, _) =
        send(&router, by_name(Method::DELETE, "/delete_document?doc_name=nope.txt", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &router,
        by_name(
            Method::PATCH,
            "/update_document?doc_name=nope.txt",
            Some(json!({ "key": "author", "value": "x" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_upload_skips_unreadable_files() {
    let router = build_router(test_state(FakeLlm::answering(vec!["ok"])));

    let (status, report) = send_json(
        &router,
        upload(&[
            ("notes.txt", "Rivers flow into the sea."),
            ("image.png", "\u{89}PNG"),
            ("page.html", "<html><body><p>Mountains are tall.</p></body></html>"),
        ]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = report["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["notes.txt", "page.html"]);
    assert_eq!(report["skipped"][0]["filename"], "image.png");
}

#[tokio::test]
async fn test_single_unsupported_upload_is_rejected() {
    let router = build_router(test_state(FakeLlm::answering(vec!["ok"])));

    let (status, body) = send_json(&router, upload(&[("archive.zip", "PK")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "unsupported_type");
}
