//! Basic authentication gate.
//!
//! Every method except OPTIONS must carry the configured credentials; the
//! check runs before any handler, so rejected requests never reach the
//! backend.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header::AUTHORIZATION, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use subtle::ConstantTimeEq;

use super::error::DavError;

/// Expected Basic credentials.
#[derive(Clone)]
pub struct BasicAuth {
    /// `base64(username:password)`, computed once.
    expected: Vec<u8>,
    realm: String,
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("realm", &self.realm)
            .finish_non_exhaustive()
    }
}

impl BasicAuth {
    /// Create the gate for the given credentials.
    pub fn new(username: &str, password: &str, realm: impl Into<String>) -> Self {
        Self {
            expected: STANDARD.encode(format!("{username}:{password}")).into_bytes(),
            realm: realm.into(),
        }
    }

    /// Realm announced in challenges.
    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Check an `Authorization` header value.
    ///
    /// The scheme is matched case-insensitively; the credentials are compared
    /// in constant time.
    pub fn verify(&self, header: Option<&HeaderValue>) -> bool {
        let Some(value) = header.map(HeaderValue::as_bytes) else {
            return false;
        };
        if value.len() < 6 || !value[..6].eq_ignore_ascii_case(b"basic ") {
            return false;
        }

        let credentials = value[6..].trim_ascii();
        credentials.ct_eq(&self.expected).into()
    }
}

/// Reject requests without valid credentials; OPTIONS passes through.
pub async fn basic_auth(auth: Arc<BasicAuth>, request: Request<Body>, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    if !auth.verify(request.headers().get(AUTHORIZATION)) {
        tracing::debug!(
            method = %request.method(),
            path = request.uri().path(),
            "Rejected request without valid credentials"
        );
        return DavError::unauthorized(auth.realm()).into_response();
    }

    next.run(request).await
}
