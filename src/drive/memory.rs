//! Process-local [`RemoteStore`].
//!
//! Behaves like the Drive API where it matters to the WebDAV layer: objects
//! are addressed by generated IDs, names are not unique among siblings,
//! listings are paginated and keep insertion order, deleting a folder deletes
//! its subtree and deleting a missing ID succeeds.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use super::{ChildPage, NewObject, ObjectContent, ObjectKind, RemoteObject, RemoteStore};
use crate::error::{DriveDavError, Result};

/// ID of the root folder of a fresh store.
pub const MEMORY_ROOT_ID: &str = "root";

/// Default number of children per listing page.
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct StoredObject {
    object: RemoteObject,
    parent_id: Option<String>,
    content: Bytes,
}

/// Snapshot of how often each capability was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    /// `list_page` calls.
    pub list: usize,
    /// `get_metadata` calls.
    pub get: usize,
    /// `get_content` calls.
    pub content: usize,
    /// `create_object` calls.
    pub create: usize,
    /// `delete_object` calls.
    pub delete: usize,
}

impl StoreCalls {
    /// Total number of backend calls.
    pub fn total(&self) -> usize {
        self.list + self.get + self.content + self.create + self.delete
    }
}

#[derive(Debug, Default)]
struct CallCounters {
    list: AtomicUsize,
    get: AtomicUsize,
    content: AtomicUsize,
    create: AtomicUsize,
    delete: AtomicUsize,
}

/// In-memory object store.
#[derive(Debug)]
pub struct InMemoryStore {
    objects: Mutex<Vec<StoredObject>>,
    page_size: usize,
    calls: CallCounters,
    failing: AtomicBool,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a store holding only the root folder.
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Create a store that returns at most `page_size` children per page.
    pub fn with_page_size(page_size: usize) -> Self {
        let now = Utc::now();
        let root = StoredObject {
            object: RemoteObject {
                id: MEMORY_ROOT_ID.to_string(),
                name: "My Drive".to_string(),
                kind: ObjectKind::Folder,
                size: 0,
                created_at: Some(now),
                modified_at: Some(now),
                content_type: super::FOLDER_MIME_TYPE.to_string(),
            },
            parent_id: None,
            content: Bytes::new(),
        };

        Self {
            objects: Mutex::new(vec![root]),
            page_size: page_size.max(1),
            calls: CallCounters::default(),
            failing: AtomicBool::new(false),
        }
    }

    /// ID of the root folder.
    pub fn root_id(&self) -> &'static str {
        MEMORY_ROOT_ID
    }

    /// Make every subsequent call fail with a backend error (or stop failing).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// How often each capability has been invoked so far.
    pub fn calls(&self) -> StoreCalls {
        StoreCalls {
            list: self.calls.list.load(Ordering::SeqCst),
            get: self.calls.get.load(Ordering::SeqCst),
            content: self.calls.content.load(Ordering::SeqCst),
            create: self.calls.create.load(Ordering::SeqCst),
            delete: self.calls.delete.load(Ordering::SeqCst),
        }
    }

    /// Insert a folder directly, bypassing call accounting.
    pub fn add_folder(&self, parent_id: &str, name: &str) -> String {
        self.insert(NewObject::folder(parent_id, name)).id
    }

    /// Insert a file directly, bypassing call accounting.
    pub fn add_file(&self, parent_id: &str, name: &str, content: &[u8], content_type: &str) -> String {
        self.insert(NewObject::file(
            parent_id,
            name,
            Bytes::copy_from_slice(content),
            content_type,
        ))
        .id
    }

    /// Names of the direct children of `parent_id`, in listing order.
    pub fn child_names(&self, parent_id: &str) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|s| s.parent_id.as_deref() == Some(parent_id))
            .map(|s| s.object.name.clone())
            .collect()
    }

    /// Number of objects, root included.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the store holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredObject>> {
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, new_object: NewObject) -> RemoteObject {
        let now = Utc::now();
        let (size, content) = match new_object.kind {
            ObjectKind::Folder => (0, Bytes::new()),
            ObjectKind::File => (new_object.content.len() as u64, new_object.content),
        };
        let object = RemoteObject {
            id: Uuid::new_v4().simple().to_string(),
            name: new_object.name,
            kind: new_object.kind,
            size,
            created_at: Some(now),
            modified_at: Some(now),
            content_type: new_object.content_type,
        };

        self.lock().push(StoredObject {
            object: object.clone(),
            parent_id: Some(new_object.parent_id),
            content,
        });
        object
    }

    fn check_failing(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DriveDavError::backend(503, "memory store is failing"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn list_page(&self, parent_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        self.calls.list.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let offset = match page_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| DriveDavError::backend(400, format!("invalid page token {token}")))?,
            None => 0,
        };

        let objects = self.lock();
        let children: Vec<&StoredObject> = objects
            .iter()
            .filter(|s| s.parent_id.as_deref() == Some(parent_id))
            .collect();

        let end = (offset + self.page_size).min(children.len());
        let page = children
            .get(offset..end)
            .unwrap_or_default()
            .iter()
            .map(|s| s.object.clone())
            .collect();
        let next_page_token = (end < children.len()).then(|| end.to_string());

        Ok(ChildPage {
            objects: page,
            next_page_token,
        })
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<RemoteObject>> {
        self.calls.get.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        Ok(self
            .lock()
            .iter()
            .find(|s| s.object.id == id)
            .map(|s| s.object.clone()))
    }

    async fn get_content(&self, id: &str) -> Result<ObjectContent> {
        self.calls.content.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let objects = self.lock();
        let stored = objects
            .iter()
            .find(|s| s.object.id == id)
            .ok_or_else(|| DriveDavError::NotFound(format!("object {id}")))?;

        if stored.object.is_folder() {
            return Err(DriveDavError::backend(
                403,
                format!("{id} is a folder and has no content"),
            ));
        }

        Ok(ObjectContent {
            bytes: stored.content.clone(),
            content_type: stored.object.content_type.clone(),
        })
    }

    async fn create_object(&self, new_object: NewObject) -> Result<RemoteObject> {
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let parent_is_folder = self
            .lock()
            .iter()
            .any(|s| s.object.id == new_object.parent_id && s.object.is_folder());
        if !parent_is_folder {
            return Err(DriveDavError::backend(
                404,
                format!("parent {} not found", new_object.parent_id),
            ));
        }

        Ok(self.insert(new_object))
    }

    async fn delete_object(&self, id: &str) -> Result<()> {
        self.calls.delete.fetch_add(1, Ordering::SeqCst);
        self.check_failing()?;

        let mut objects = self.lock();

        // Collect the subtree rooted at `id`.
        let mut doomed = vec![id.to_string()];
        let mut index = 0;
        while index < doomed.len() {
            let current = doomed[index].clone();
            doomed.extend(
                objects
                    .iter()
                    .filter(|s| s.parent_id.as_deref() == Some(current.as_str()))
                    .map(|s| s.object.id.clone()),
            );
            index += 1;
        }

        objects.retain(|s| !doomed.contains(&s.object.id));
        Ok(())
    }
}
