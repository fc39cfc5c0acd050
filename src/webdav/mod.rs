//! WebDAV HTTP surface.
//!
//! Maps WebDAV requests onto a [`RemoteStore`](crate::drive::RemoteStore):
//! - `auth`: Basic authentication gate
//! - `handlers`: per-method request handling
//! - `render`: multistatus XML and HTML listings
//! - `router` / `server`: axum wiring

pub mod auth;
pub mod error;
pub mod handlers;
pub mod render;
pub mod router;
pub mod server;

pub use auth::BasicAuth;
pub use error::{DavError, ErrorCode, ALLOWED_METHODS};
pub use handlers::{AppState, RequestPath};
pub use router::create_router;
pub use server::WebServer;
