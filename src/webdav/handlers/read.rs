//! GET and HEAD.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};

use super::{AppState, RequestPath};
use crate::datetime::to_rfc1123;
use crate::drive::RemoteObject;
use crate::webdav::error::DavError;
use crate::webdav::render::render_listing;

/// Content of a file, or the HTML listing of a folder.
pub(super) async fn get(state: &AppState, path: &RequestPath) -> Result<Response, DavError> {
    if path.is_root() {
        return listing(state, path, &state.root_id).await;
    }

    let object = state.lookup(path).await?.ok_or_else(DavError::not_found)?;
    if object.is_folder() {
        return listing(state, path, &object.id).await;
    }
    if path.targets_collection() {
        // A file addressed as a collection.
        return Err(DavError::not_found());
    }

    let content = state.store.get_content(&object.id).await?;

    let mut headers = HeaderMap::new();
    insert_header(&mut headers, header::CONTENT_TYPE, &content.content_type);
    insert_header(
        &mut headers,
        header::LAST_MODIFIED,
        &to_rfc1123(object.modified_at.as_ref()),
    );

    Ok((StatusCode::OK, headers, content.bytes).into_response())
}

/// Metadata headers only.
pub(super) async fn head(state: &AppState, path: &RequestPath) -> Result<Response, DavError> {
    let object = state.lookup(path).await?.ok_or_else(DavError::not_found)?;
    Ok((StatusCode::OK, metadata_headers(&object)).into_response())
}

async fn listing(
    state: &AppState,
    path: &RequestPath,
    folder_id: &str,
) -> Result<Response, DavError> {
    let children = state.store.list_children(folder_id, false).await?;
    Ok(Html(render_listing(path.segments(), &children)).into_response())
}

fn metadata_headers(object: &RemoteObject) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, header::CONTENT_TYPE, &object.content_type);
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(object.size));
    insert_header(
        &mut headers,
        header::LAST_MODIFIED,
        &to_rfc1123(object.modified_at.as_ref()),
    );
    headers
}

/// Values from the backend are skipped if they are not valid header text.
fn insert_header(headers: &mut HeaderMap, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
