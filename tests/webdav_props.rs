//! WebDAV Property Tests
//!
//! Integration tests for PROPFIND, PROPPATCH and OPTIONS.

mod common;

use std::sync::Arc;

use axum::http::header::{ALLOW, CONTENT_TYPE};
use axum::http::StatusCode;
use common::{body_text, create_test_router, send};
use drivedav::drive::memory::MEMORY_ROOT_ID;
use drivedav::drive::InMemoryStore;
use drivedav::webdav::ALLOWED_METHODS;

/// root/docs/a.txt (10 bytes), root/docs/nested/b.txt
fn sample_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    let docs = store.add_folder(MEMORY_ROOT_ID, "docs");
    store.add_file(&docs, "a.txt", b"0123456789", "text/plain");
    let nested = store.add_folder(&docs, "nested");
    store.add_file(&nested, "b.txt", b"b", "text/plain");
    store
}

// ============================================================================
// PROPFIND
// ============================================================================

#[tokio::test]
async fn test_propfind_file_depth_zero() {
    let store = sample_store();
    let router = create_test_router(store);

    let response = send(&router, "PROPFIND", "/docs/a.txt", &[("Depth", "0")], "").await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/xml"));
    let xml = body_text(response).await;
    assert_eq!(xml.matches("<D:response>").count(), 1);
    assert!(xml.contains("<D:href>/docs/a.txt</D:href>"));
    assert!(xml.contains("<D:displayname>a.txt</D:displayname>"));
    assert!(xml.contains("<D:getcontentlength>10</D:getcontentlength>"));
    assert!(xml.contains("<D:resourcetype></D:resourcetype>"));
}

#[tokio::test]
async fn test_propfind_folder_depth_one() {
    let store = sample_store();
    let router = create_test_router(store);

    let response = send(&router, "PROPFIND", "/docs/", &[("Depth", "1")], "").await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let xml = body_text(response).await;
    assert_eq!(xml.matches("<D:response>").count(), 3);
    assert!(xml.contains("<D:href>/docs/</D:href>"));
    assert!(xml.contains("<D:href>/docs/a.txt</D:href>"));
    assert!(xml.contains("<D:href>/docs/nested/</D:href>"));
    // Grandchildren are never listed.
    assert!(!xml.contains("b.txt"));
}

#[tokio::test]
async fn test_propfind_infinity_expands_one_level() {
    let store = sample_store();
    let router = create_test_router(store.clone());

    let response = send(&router, "PROPFIND", "/docs/", &[], "").await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let xml = body_text(response).await;
    assert_eq!(xml.matches("<D:response>").count(), 3);
    assert!(!xml.contains("b.txt"));
    // One list to resolve "docs", one to list its children.
    assert_eq!(store.calls().list, 2);
}

#[tokio::test]
async fn test_propfind_folder_depth_zero() {
    let store = sample_store();
    let router = create_test_router(store);

    let response = send(&router, "PROPFIND", "/docs", &[("Depth", "0")], "").await;

    let xml = body_text(response).await;
    assert_eq!(xml.matches("<D:response>").count(), 1);
    assert!(xml.contains("<D:href>/docs/</D:href>"));
    assert!(xml.contains("<D:collection/>"));
}

#[tokio::test]
async fn test_propfind_root_depth_zero_skips_resolution() {
    let store = sample_store();
    let router = create_test_router(store.clone());

    let response = send(&router, "PROPFIND", "/", &[("Depth", "0")], "").await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let xml = body_text(response).await;
    assert_eq!(xml.matches("<D:response>").count(), 1);
    assert!(xml.contains("<D:href>/</D:href>"));
    assert!(xml.contains("<D:collection/>"));
    assert_eq!(store.calls().list, 0);
    assert_eq!(store.calls().get, 1);
}

#[tokio::test]
async fn test_propfind_root_lists_children() {
    let store = sample_store();
    let router = create_test_router(store);

    let response = send(&router, "PROPFIND", "/", &[("Depth", "1")], "").await;

    let xml = body_text(response).await;
    assert_eq!(xml.matches("<D:response>").count(), 2);
    assert!(xml.contains("<D:href>/docs/</D:href>"));
}

#[tokio::test]
async fn test_propfind_missing_is_not_found() {
    let store = sample_store();
    let router = create_test_router(store);

    let response = send(&router, "PROPFIND", "/docs/zzz", &[("Depth", "0")], "").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_propfind_escapes_names() {
    let store = Arc::new(InMemoryStore::new());
    store.add_file(MEMORY_ROOT_ID, "a&b <c>.txt", b"x", "text/plain");
    let router = create_test_router(store);

    let response = send(&router, "PROPFIND", "/", &[("Depth", "1")], "").await;

    let xml = body_text(response).await;
    assert!(xml.contains("<D:displayname>a&amp;b &lt;c&gt;.txt</D:displayname>"));
    assert!(xml.contains("<D:href>/a%26b%20%3Cc%3E.txt</D:href>"));
}

// ============================================================================
// PROPPATCH
// ============================================================================

#[tokio::test]
async fn test_proppatch_acknowledges_without_backend_calls() {
    let store = sample_store();
    let router = create_test_router(store.clone());

    let body = r#"<?xml version="1.0"?><D:propertyupdate xmlns:D="DAV:"/>"#;
    let response = send(&router, "PROPPATCH", "/docs/a.txt", &[], body).await;

    assert_eq!(response.status(), StatusCode::MULTI_STATUS);
    let xml = body_text(response).await;
    assert!(xml.contains("<D:href>/docs/a.txt</D:href>"));
    assert!(xml.contains("HTTP/1.1 200 OK"));
    assert_eq!(store.calls().total(), 0);
}

// ============================================================================
// OPTIONS
// ============================================================================

#[tokio::test]
async fn test_options_advertises_capabilities() {
    let store = sample_store();
    let router = create_test_router(store.clone());

    let response = send(&router, "OPTIONS", "/docs/", &[], "").await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[ALLOW], ALLOWED_METHODS);
    assert_eq!(response.headers()["DAV"], "1, 2");
    assert_eq!(store.calls().total(), 0);
}
