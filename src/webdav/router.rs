//! Router configuration for the WebDAV surface.

use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::auth::{basic_auth, BasicAuth};
use super::handlers::{dispatch, AppState};

/// Create the WebDAV router.
///
/// Every path and method goes to [`dispatch`]; the Basic auth gate runs
/// first.
pub fn create_router(app_state: Arc<AppState>, auth: Arc<BasicAuth>, max_body_bytes: usize) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(max_body_bytes))
                .layer(middleware::from_fn(move |req, next| {
                    let auth = auth.clone();
                    basic_auth(auth, req, next)
                })),
        )
        .with_state(app_state)
}
