//! drivedav - WebDAV gateway for Google Drive
//!
//! Serves a Drive folder over WebDAV, translating paths to Drive's
//! ID-addressed object graph on every request.

pub mod config;
pub mod datetime;
pub mod drive;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod webdav;

pub use config::Config;
pub use error::{DriveDavError, Result};
