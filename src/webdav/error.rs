//! Error responses for the WebDAV surface.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::DriveDavError;

/// Methods announced in `Allow` headers.
pub const ALLOWED_METHODS: &str = "GET, HEAD, PUT, DELETE, MKCOL, PROPFIND, PROPPATCH, OPTIONS";

/// WebDAV error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad request (400).
    BadRequest,
    /// Unauthorized (401).
    Unauthorized,
    /// Forbidden (403).
    Forbidden,
    /// Not found (404).
    NotFound,
    /// Method not allowed (405).
    MethodNotAllowed,
    /// Conflict (409).
    Conflict,
    /// Internal server error (500).
    InternalError,
}

impl ErrorCode {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by WebDAV handlers.
///
/// Rendered as a short plain-text body; WebDAV clients ignore JSON errors.
#[derive(Debug)]
pub struct DavError {
    code: ErrorCode,
    message: String,
    /// Realm for the `WWW-Authenticate` challenge of a 401.
    realm: Option<String>,
}

impl DavError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            realm: None,
        }
    }

    /// Create an unauthorized error carrying a Basic challenge for `realm`.
    pub fn unauthorized(realm: &str) -> Self {
        Self {
            realm: Some(realm.to_string()),
            ..Self::new(ErrorCode::Unauthorized, "Unauthorized")
        }
    }

    /// Create a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Create a not found error.
    pub fn not_found() -> Self {
        Self::new(ErrorCode::NotFound, "Not Found")
    }

    /// Create a method not allowed error.
    pub fn method_not_allowed() -> Self {
        Self::new(ErrorCode::MethodNotAllowed, "Method Not Allowed")
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Create an internal server error.
    pub fn internal() -> Self {
        Self::new(ErrorCode::InternalError, "Internal Server Error")
    }

    /// Error code of this error.
    pub fn code(&self) -> ErrorCode {
        self.code
    }
}

impl IntoResponse for DavError {
    fn into_response(self) -> Response {
        let status = self.code.status_code();
        let mut response = (status, self.message).into_response();

        if self.code == ErrorCode::MethodNotAllowed {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }

        if let Some(realm) = self.realm {
            let challenge = format!("Basic realm=\"{}\"", realm.replace('"', ""));
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}

impl std::fmt::Display for DavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for DavError {}

impl From<DriveDavError> for DavError {
    fn from(err: DriveDavError) -> Self {
        match &err {
            DriveDavError::NotFound(_) => DavError::not_found(),
            DriveDavError::Conflict(msg) => DavError::conflict(msg.clone()),
            _ => {
                tracing::error!("Request failed: {}", err);
                DavError::internal()
            }
        }
    }
}
