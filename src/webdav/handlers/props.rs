//! PROPFIND, PROPPATCH and OPTIONS.

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use super::{AppState, RequestPath};
use crate::webdav::error::{DavError, ALLOWED_METHODS};
use crate::webdav::render::{child_href, render_multistatus, render_proppatch, DavEntry};

const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Properties of the target and, unless `Depth: 0`, of its direct children.
///
/// Any other depth, `infinity` included, expands exactly one level.
pub(super) async fn propfind(
    state: &AppState,
    path: &RequestPath,
    headers: &HeaderMap,
) -> Result<Response, DavError> {
    let depth = headers
        .get("Depth")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("infinity");

    let object = state.lookup(path).await?.ok_or_else(DavError::not_found)?;

    let children = if object.is_folder() && depth != "0" {
        state.store.list_children(&object.id, false).await?
    } else {
        Vec::new()
    };

    let mut entries = Vec::with_capacity(children.len() + 1);
    entries.push(DavEntry {
        href: path.href(object.is_folder()),
        object: &object,
    });
    entries.extend(children.iter().map(|child| DavEntry {
        href: child_href(path.segments(), child),
        object: child,
    }));

    Ok(multistatus(render_multistatus(&entries)))
}

/// Acknowledge without storing anything.
pub(super) fn proppatch(path: &RequestPath) -> Response {
    multistatus(render_proppatch(&path.href(path.targets_collection())))
}

pub(super) fn options() -> Response {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS)),
            (
                header::HeaderName::from_static("dav"),
                HeaderValue::from_static("1, 2"),
            ),
            (
                header::HeaderName::from_static("ms-author-via"),
                HeaderValue::from_static("DAV"),
            ),
        ],
    )
        .into_response()
}

fn multistatus(body: String) -> Response {
    (
        StatusCode::MULTI_STATUS,
        [(header::CONTENT_TYPE, HeaderValue::from_static(XML_CONTENT_TYPE))],
        body,
    )
        .into_response()
}
