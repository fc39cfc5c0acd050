//! WebDAV request handlers.
//!
//! Routing is done on the method name rather than through axum's method
//! router, since PROPFIND, PROPPATCH and MKCOL are extension methods.

mod props;
mod read;
mod write;

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};

use super::error::DavError;
use super::render::href_for;
use crate::drive::{RemoteObject, RemoteStore};
use crate::resolver::PathResolver;
use crate::Result;

/// Shared state for WebDAV handlers.
pub struct AppState {
    /// Remote object store.
    pub store: Arc<dyn RemoteStore>,
    /// ID of the folder exposed as `/`.
    pub root_id: String,
}

impl AppState {
    /// Create a new state.
    pub fn new(store: Arc<dyn RemoteStore>, root_id: impl Into<String>) -> Self {
        Self {
            store,
            root_id: root_id.into(),
        }
    }

    fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(self.store.as_ref())
    }

    /// Metadata of the object at `path`.
    ///
    /// The root is fetched by ID; the resolver is never asked for it.
    async fn lookup(&self, path: &RequestPath) -> Result<Option<RemoteObject>> {
        if path.is_root() {
            return self.store.get_metadata(&self.root_id).await;
        }
        self.resolver()
            .resolve_segments(path.segments(), &self.root_id)
            .await
    }
}

/// Decoded request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    segments: Vec<String>,
    trailing_slash: bool,
}

impl RequestPath {
    /// Parse the path component of a request URI.
    ///
    /// Segments are percent-decoded; empty segments are dropped. Dot segments
    /// and invalid encodings are rejected.
    pub fn parse(uri_path: &str) -> std::result::Result<Self, DavError> {
        let segments = uri_path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                let decoded = urlencoding::decode(s)
                    .map_err(|_| DavError::bad_request("Invalid path encoding"))?;
                if decoded == "." || decoded == ".." {
                    return Err(DavError::bad_request("Relative path segments are not allowed"));
                }
                Ok(decoded.into_owned())
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            segments,
            trailing_slash: uri_path.ends_with('/'),
        })
    }

    /// True for `/`.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Decoded segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// True when the client addressed a collection (trailing `/`).
    pub fn targets_collection(&self) -> bool {
        self.trailing_slash || self.is_root()
    }

    /// Segments joined with `/`, for logging.
    pub fn joined(&self) -> String {
        self.segments.join("/")
    }

    /// Parent segments and leaf name, or `None` for the root.
    pub fn split_leaf(&self) -> Option<(Vec<&str>, &str)> {
        let (leaf, parents) = self.segments.split_last()?;
        Some((parents.iter().map(String::as_str).collect(), leaf.as_str()))
    }

    /// Canonical href of this path.
    pub fn href(&self, collection: bool) -> String {
        href_for(&self.segments, collection)
    }
}

/// Entry point for every request that passed authentication.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = match RequestPath::parse(uri.path()) {
        Ok(path) => path,
        Err(e) => return e.into_response(),
    };

    tracing::debug!(method = %method, path = %uri.path(), "WebDAV request");

    let result = match method.as_str() {
        "GET" => read::get(&state, &path).await,
        "HEAD" => read::head(&state, &path).await,
        "PUT" => write::put(&state, &path, &headers, body).await,
        "DELETE" => write::delete(&state, &path).await,
        "MKCOL" => write::mkcol(&state, &path).await,
        "PROPFIND" => props::propfind(&state, &path, &headers).await,
        "PROPPATCH" => Ok(props::proppatch(&path)),
        "OPTIONS" => Ok(props::options()),
        _ => Err(DavError::method_not_allowed()),
    };

    result.unwrap_or_else(IntoResponse::into_response)
}
