//! PUT, DELETE and MKCOL.

use axum::{
    body::Bytes,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use super::{AppState, RequestPath};
use crate::drive::{NewObject, RemoteObject};
use crate::webdav::error::DavError;

/// Store the body as a file, creating missing ancestors.
///
/// An existing file of the same name is replaced: the new object is created
/// first and the old ones are deleted afterwards, so a failed upload leaves
/// the previous content in place.
pub(super) async fn put(
    state: &AppState,
    path: &RequestPath,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Response, DavError> {
    let Some((parents, leaf)) = path.split_leaf() else {
        return Err(DavError::bad_request("Cannot PUT to the root collection"));
    };

    let parent_id = state
        .resolver()
        .ensure_folders(&parents, &state.root_id)
        .await?;

    let existing: Vec<RemoteObject> = state
        .store
        .list_children(&parent_id, false)
        .await?
        .into_iter()
        .filter(|o| o.name == leaf)
        .collect();
    if existing.iter().any(RemoteObject::is_folder) {
        return Err(DavError::conflict(format!("{leaf} is a collection")));
    }

    let content_type = content_type_for(headers, leaf);
    let size = body.len();
    let created = state
        .store
        .create_object(NewObject::file(parent_id, leaf, body, content_type))
        .await?;

    for old in &existing {
        state.store.delete_object(&old.id).await?;
    }

    tracing::info!(
        path = %path.joined(),
        id = %created.id,
        size,
        replaced = existing.len(),
        "Stored file"
    );

    let status = if existing.is_empty() {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    };
    Ok(status.into_response())
}

/// Delete the object at `path`; missing targets are not an error.
pub(super) async fn delete(state: &AppState, path: &RequestPath) -> Result<Response, DavError> {
    if path.is_root() {
        return Err(DavError::forbidden("Cannot delete the root collection"));
    }

    match state.lookup(path).await? {
        Some(object) => {
            state.store.delete_object(&object.id).await?;
            tracing::info!(path = %path.joined(), id = %object.id, "Deleted object");
        }
        None => tracing::debug!(path = %path.joined(), "Delete target does not exist"),
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Create a folder, creating missing ancestors.
pub(super) async fn mkcol(state: &AppState, path: &RequestPath) -> Result<Response, DavError> {
    let Some((parents, leaf)) = path.split_leaf() else {
        return Err(DavError::method_not_allowed());
    };

    let parent_id = state
        .resolver()
        .ensure_folders(&parents, &state.root_id)
        .await?;
    let folder = state
        .store
        .create_object(NewObject::folder(parent_id, leaf))
        .await?;

    tracing::info!(path = %path.joined(), id = %folder.id, "Created collection");
    Ok(StatusCode::CREATED.into_response())
}

/// Declared `Content-Type`, else a guess from the extension.
fn content_type_for(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            mime_guess::from_path(name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        })
}
