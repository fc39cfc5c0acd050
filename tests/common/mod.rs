//! Test helpers for WebDAV integration tests.
//!
//! Every test runs the real router over an [`InMemoryStore`], so backend
//! call counts can be asserted.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header::AUTHORIZATION, Request, Response};
use axum::Router;
use axum_test::TestServer;
use http_body_util::BodyExt;
use tower::ServiceExt;

use drivedav::drive::InMemoryStore;
use drivedav::webdav::{create_router, AppState, BasicAuth};

pub const USERNAME: &str = "user";
pub const PASSWORD: &str = "pass";

/// `Basic base64("user:pass")`.
pub const AUTH_HEADER: &str = "Basic dXNlcjpwYXNz";

/// Create a router over `store`.
pub fn create_test_router(store: Arc<InMemoryStore>) -> Router {
    let root_id = store.root_id();
    create_router(
        Arc::new(AppState::new(store, root_id)),
        Arc::new(BasicAuth::new(USERNAME, PASSWORD, "webdav")),
        16 * 1024 * 1024,
    )
}

/// Create a test server over `store`.
pub fn create_test_server(store: Arc<InMemoryStore>) -> TestServer {
    TestServer::new(create_test_router(store)).expect("Failed to create test server")
}

/// Send an authenticated request with an arbitrary method.
///
/// Used for extension methods such as PROPFIND and MKCOL.
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: impl Into<Body>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(AUTHORIZATION, AUTH_HEADER);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    router
        .clone()
        .oneshot(builder.body(body.into()).unwrap())
        .await
        .unwrap()
}

/// Collect a response body.
pub async fn body_bytes(response: Response<Body>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

/// Collect a response body as text.
pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}
