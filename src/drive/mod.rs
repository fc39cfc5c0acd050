//! Remote object store access.
//!
//! The backend addresses objects by opaque ID only. Hierarchy exists as
//! parent edges plus a per-object name, so everything path-shaped is built on
//! top of the small capability set in [`RemoteStore`]:
//! - list one page of a folder's children
//! - fetch one object's metadata or content
//! - create an object under a parent
//! - delete an object

mod client;
pub mod memory;
pub mod token;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::Result;

pub use client::DriveClient;
pub use memory::InMemoryStore;
pub use token::{AccessToken, OAuthRefresh, TokenCache, TokenExchange};

/// MIME type the backend uses to mark folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Content type used when neither the client nor the file name tells us better.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Kind of a remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Regular file with byte content.
    File,
    /// Folder that can hold children.
    Folder,
}

impl ObjectKind {
    /// Classify a backend MIME type.
    pub fn from_mime_type(mime_type: &str) -> Self {
        if mime_type == FOLDER_MIME_TYPE {
            ObjectKind::Folder
        } else {
            ObjectKind::File
        }
    }

    /// Check if this is a folder.
    pub fn is_folder(&self) -> bool {
        matches!(self, ObjectKind::Folder)
    }
}

/// Metadata of a single remote object.
///
/// Copies are fetched per request and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Backend-assigned identifier.
    pub id: String,
    /// Name, unique only among siblings (and not even that is enforced).
    pub name: String,
    /// File or folder.
    pub kind: ObjectKind,
    /// Size in bytes; always 0 for folders.
    pub size: u64,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    pub modified_at: Option<DateTime<Utc>>,
    /// Backend MIME type.
    pub content_type: String,
}

impl RemoteObject {
    /// Check if this object is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

/// One page of a folder listing.
#[derive(Debug, Clone, Default)]
pub struct ChildPage {
    /// Children on this page, in backend order.
    pub objects: Vec<RemoteObject>,
    /// Cursor for the next page, `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Content of a file object.
#[derive(Debug, Clone)]
pub struct ObjectContent {
    /// Raw bytes.
    pub bytes: Bytes,
    /// Content type reported by the backend.
    pub content_type: String,
}

/// Parameters for creating an object.
#[derive(Debug, Clone)]
pub struct NewObject {
    /// Parent folder ID.
    pub parent_id: String,
    /// Object name.
    pub name: String,
    /// File or folder.
    pub kind: ObjectKind,
    /// File content; ignored for folders.
    pub content: Bytes,
    /// Declared content type; ignored for folders.
    pub content_type: String,
}

impl NewObject {
    /// Create parameters for a folder.
    pub fn folder(parent_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: name.into(),
            kind: ObjectKind::Folder,
            content: Bytes::new(),
            content_type: FOLDER_MIME_TYPE.to_string(),
        }
    }

    /// Create parameters for a file.
    pub fn file(
        parent_id: impl Into<String>,
        name: impl Into<String>,
        content: Bytes,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            parent_id: parent_id.into(),
            name: name.into(),
            kind: ObjectKind::File,
            content,
            content_type: content_type.into(),
        }
    }
}

/// Capability set of the remote object store.
///
/// Token handling is internal to implementations; callers never see it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List one page of the children of `parent_id`.
    async fn list_page(&self, parent_id: &str, page_token: Option<&str>) -> Result<ChildPage>;

    /// Fetch one object's metadata.
    ///
    /// Returns `Ok(None)` when the object does not exist, so callers can tell
    /// "nothing there" apart from a failed call.
    async fn get_metadata(&self, id: &str) -> Result<Option<RemoteObject>>;

    /// Fetch the content of a file object. Must not be called for folders.
    async fn get_content(&self, id: &str) -> Result<ObjectContent>;

    /// Create an object and return its metadata.
    async fn create_object(&self, new_object: NewObject) -> Result<RemoteObject>;

    /// Delete an object. Deleting a missing object succeeds.
    async fn delete_object(&self, id: &str) -> Result<()>;

    /// List every child of `parent_id`, following page cursors.
    ///
    /// With `recursive`, each folder child is followed by its own descendants
    /// (depth-first, pre-order). The starting folder itself is never included.
    async fn list_children(&self, parent_id: &str, recursive: bool) -> Result<Vec<RemoteObject>> {
        let children = self.list_all_pages(parent_id).await?;
        if !recursive {
            return Ok(children);
        }

        let mut result = Vec::with_capacity(children.len());
        // Reversed so that popping yields backend order.
        let mut stack: Vec<RemoteObject> = children.into_iter().rev().collect();

        while let Some(object) = stack.pop() {
            if object.is_folder() {
                let nested = self.list_all_pages(&object.id).await?;
                stack.extend(nested.into_iter().rev());
            }
            result.push(object);
        }

        Ok(result)
    }

    /// Follow page cursors until the listing of `parent_id` is exhausted.
    async fn list_all_pages(&self, parent_id: &str) -> Result<Vec<RemoteObject>> {
        let mut objects = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(parent_id, page_token.as_deref()).await?;
            objects.extend(page.objects);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(objects)
    }
}
