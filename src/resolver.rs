//! Path resolution over the ID graph.
//!
//! The backend has no "look up this path" call, so a path is resolved by
//! walking it one segment at a time: list the children of the current folder,
//! take the first child with a matching name, descend. Every walk starts from
//! the configured root and nothing is cached between requests.
//!
//! When several siblings share a name, the first one in listing order wins.

use crate::drive::{NewObject, RemoteObject, RemoteStore};
use crate::{DriveDavError, Result};

/// Split a slash-delimited path into its non-empty segments.
///
/// `""`, `"/"` and `"///"` all yield no segments.
pub fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Walks paths through a [`RemoteStore`].
pub struct PathResolver<'a> {
    store: &'a dyn RemoteStore,
}

impl<'a> PathResolver<'a> {
    /// Create a resolver over the given store.
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self { store }
    }

    /// Resolve `path` below `root_id` to an object ID.
    ///
    /// Returns `Ok(None)` when any segment has no matching child, and also for
    /// a path without segments: the root itself is never returned here, so
    /// callers must handle the empty path before resolving.
    pub async fn resolve(&self, path: &str, root_id: &str) -> Result<Option<String>> {
        let object = self.resolve_object(path, root_id).await?;
        Ok(object.map(|o| o.id).filter(|id| id != root_id))
    }

    /// Resolve `path` below `root_id` to the matching object's metadata.
    ///
    /// Same walk as [`resolve`](Self::resolve); the record comes from the
    /// parent's listing, so no extra metadata call is made.
    pub async fn resolve_object(&self, path: &str, root_id: &str) -> Result<Option<RemoteObject>> {
        self.resolve_segments(&split_segments(path), root_id).await
    }

    /// Resolve already-split segments below `root_id`.
    ///
    /// Each segment is matched as a whole name, so a decoded name containing
    /// `/` stays one segment. No segments resolve to `None`.
    pub async fn resolve_segments<S: AsRef<str> + Sync>(
        &self,
        segments: &[S],
        root_id: &str,
    ) -> Result<Option<RemoteObject>> {
        if segments.is_empty() {
            return Ok(None);
        }

        let mut current: Option<RemoteObject> = None;
        for segment in segments {
            let segment = segment.as_ref();
            let parent_id = current.as_ref().map_or(root_id, |o| o.id.as_str());
            match self.find_child(parent_id, segment).await? {
                Some(child) => current = Some(child),
                None => {
                    tracing::debug!(segment, parent_id, "Path segment not found");
                    return Ok(None);
                }
            }
        }

        Ok(current)
    }

    /// Make sure every segment exists as a folder below `root_id` ("mkdir -p").
    ///
    /// Existing folders are reused; missing ones are created in order. Once a
    /// level had to be created, deeper levels cannot exist and are created
    /// without listing. Returns the ID of the last folder, or `root_id` when
    /// there are no segments. A file in the way is a conflict. Nothing is rolled back if a creation fails
    /// halfway.
    pub async fn ensure_folders(&self, segments: &[&str], root_id: &str) -> Result<String> {
        let mut current = root_id.to_string();
        let mut creating = false;

        for segment in segments {
            if !creating {
                if let Some(existing) = self.find_child(&current, segment).await? {
                    if !existing.is_folder() {
                        return Err(DriveDavError::Conflict(format!("{segment} is not a folder")));
                    }
                    current = existing.id;
                    continue;
                }
                creating = true;
            }

            let folder = self
                .store
                .create_object(NewObject::folder(current.as_str(), *segment))
                .await?;
            tracing::debug!(name = segment, id = %folder.id, "Created missing folder");
            current = folder.id;
        }

        Ok(current)
    }

    /// First child of `parent_id` named `name`.
    ///
    /// Pages are fetched until a match shows up or the listing ends.
    pub async fn find_child(&self, parent_id: &str, name: &str) -> Result<Option<RemoteObject>> {
        let mut page_token: Option<String> = None;

        loop {
            let page = self.store.list_page(parent_id, page_token.as_deref()).await?;
            if let Some(found) = page.objects.into_iter().find(|o| o.name == name) {
                return Ok(Some(found));
            }
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::memory::MEMORY_ROOT_ID;
    use crate::drive::InMemoryStore;

    /// root/docs/a.txt, root/docs/nested/b.txt, root/top.txt
    fn sample_store() -> (InMemoryStore, String, String) {
        let store = InMemoryStore::new();
        let docs = store.add_folder(MEMORY_ROOT_ID, "docs");
        let a = store.add_file(&docs, "a.txt", b"0123456789", "text/plain");
        let nested = store.add_folder(&docs, "nested");
        store.add_file(&nested, "b.txt", b"b", "text/plain");
        store.add_file(MEMORY_ROOT_ID, "top.txt", b"t", "text/plain");
        (store, docs, a)
    }

    #[test]
    fn test_split_segments() {
        assert_eq!(split_segments("docs/a.txt"), vec!["docs", "a.txt"]);
        assert_eq!(split_segments("/docs//a.txt/"), vec!["docs", "a.txt"]);
        assert!(split_segments("").is_empty());
        assert!(split_segments("///").is_empty());
    }

    #[tokio::test]
    async fn test_resolve_walks_each_segment() {
        let (store, docs, a) = sample_store();
        let resolver = PathResolver::new(&store);

        assert_eq!(
            resolver.resolve("docs", MEMORY_ROOT_ID).await.unwrap(),
            Some(docs)
        );
        assert_eq!(
            resolver.resolve("docs/a.txt", MEMORY_ROOT_ID).await.unwrap(),
            Some(a)
        );
        // one listing per segment
        assert_eq!(store.calls().list, 3);
    }

    #[tokio::test]
    async fn test_resolve_deep_path() {
        let (store, _, _) = sample_store();
        let resolver = PathResolver::new(&store);

        let object = resolver
            .resolve_object("docs/nested/b.txt", MEMORY_ROOT_ID)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(object.name, "b.txt");
        assert_eq!(object.size, 1);
    }

    #[tokio::test]
    async fn test_resolve_miss_short_circuits() {
        let (store, _, _) = sample_store();
        let resolver = PathResolver::new(&store);

        let result = resolver
            .resolve("missing/nested/b.txt", MEMORY_ROOT_ID)
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(store.calls().list, 1);
    }

    #[tokio::test]
    async fn test_resolve_miss_in_the_middle() {
        let (store, _, _) = sample_store();
        let resolver = PathResolver::new(&store);

        assert!(resolver
            .resolve("docs/ghost/b.txt", MEMORY_ROOT_ID)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_resolve_empty_and_root_are_not_found() {
        let (store, _, _) = sample_store();
        let resolver = PathResolver::new(&store);

        assert!(resolver.resolve("", MEMORY_ROOT_ID).await.unwrap().is_none());
        assert!(resolver.resolve("/", MEMORY_ROOT_ID).await.unwrap().is_none());
        assert!(resolver.resolve("//", MEMORY_ROOT_ID).await.unwrap().is_none());
        assert_eq!(store.calls().list, 0);
    }

    #[tokio::test]
    async fn test_resolve_duplicate_names_first_wins() {
        let store = InMemoryStore::new();
        let first = store.add_file(MEMORY_ROOT_ID, "dup.txt", b"1", "text/plain");
        store.add_file(MEMORY_ROOT_ID, "dup.txt", b"2", "text/plain");
        let resolver = PathResolver::new(&store);

        assert_eq!(
            resolver.resolve("dup.txt", MEMORY_ROOT_ID).await.unwrap(),
            Some(first)
        );
    }

    #[tokio::test]
    async fn test_find_child_on_later_page() {
        let store = InMemoryStore::with_page_size(2);
        for name in ["a", "b", "c", "d", "e"] {
            store.add_file(MEMORY_ROOT_ID, name, b"x", "text/plain");
        }
        let resolver = PathResolver::new(&store);

        let found = resolver.find_child(MEMORY_ROOT_ID, "c").await.unwrap();
        assert_eq!(found.unwrap().name, "c");
        assert_eq!(store.calls().list, 2);

        assert!(resolver
            .find_child(MEMORY_ROOT_ID, "z")
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.calls().list, 5);
    }

    #[tokio::test]
    async fn test_ensure_folders_creates_only_missing() {
        let (store, docs, _) = sample_store();
        let resolver = PathResolver::new(&store);

        let id = resolver
            .ensure_folders(&["docs", "x", "y"], MEMORY_ROOT_ID)
            .await
            .unwrap();

        assert_eq!(store.calls().create, 2);
        assert_eq!(store.child_names(&docs), vec!["a.txt", "nested", "x"]);
        assert_eq!(
            resolver.resolve("docs/x/y", MEMORY_ROOT_ID).await.unwrap(),
            Some(id)
        );
    }

    #[tokio::test]
    async fn test_ensure_folders_is_idempotent() {
        let store = InMemoryStore::new();
        let resolver = PathResolver::new(&store);

        let first = resolver
            .ensure_folders(&["a", "b"], MEMORY_ROOT_ID)
            .await
            .unwrap();
        let second = resolver
            .ensure_folders(&["a", "b"], MEMORY_ROOT_ID)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(store.calls().create, 2);
        assert_eq!(store.child_names(MEMORY_ROOT_ID), vec!["a"]);
    }

    #[tokio::test]
    async fn test_resolve_segments_keeps_slash_in_name() {
        let store = InMemoryStore::new();
        let id = store.add_file(MEMORY_ROOT_ID, "a/b.txt", b"x", "text/plain");
        store.add_folder(MEMORY_ROOT_ID, "a");
        let resolver = PathResolver::new(&store);

        let found = resolver
            .resolve_segments(&["a/b.txt"], MEMORY_ROOT_ID)
            .await
            .unwrap();
        assert_eq!(found.map(|o| o.id), Some(id));

        // The string form splits on every slash.
        assert!(resolver
            .resolve("a/b.txt", MEMORY_ROOT_ID)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_ensure_folders_through_file_conflicts() {
        let (store, _, _) = sample_store();
        let resolver = PathResolver::new(&store);

        let err = resolver
            .ensure_folders(&["top.txt", "x"], MEMORY_ROOT_ID)
            .await
            .unwrap_err();

        assert!(matches!(err, DriveDavError::Conflict(_)));
        assert_eq!(store.calls().create, 0);
    }

    #[tokio::test]
    async fn test_ensure_folders_empty_is_root() {
        let store = InMemoryStore::new();
        let resolver = PathResolver::new(&store);

        let id = resolver.ensure_folders(&[], MEMORY_ROOT_ID).await.unwrap();
        assert_eq!(id, MEMORY_ROOT_ID);
        assert_eq!(store.calls().total(), 0);
    }
}
