//! Rendering of remote metadata into WebDAV XML and HTML listings.
//!
//! Everything here is pure: input is already-resolved metadata, output is a
//! response body.

use std::fmt::Write;

use crate::datetime::{to_iso8601, to_rfc1123};
use crate::drive::RemoteObject;

/// Title of the HTML directory listing.
const LISTING_TITLE: &str = "Google Drive WebDAV";

/// Escape text for use in XML or HTML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Build an absolute, percent-encoded href from decoded path segments.
///
/// Collections get a trailing `/`; the root is always `/`.
pub fn href_for<S: AsRef<str>>(segments: &[S], collection: bool) -> String {
    let mut href = String::from("/");
    let encoded: Vec<String> = segments
        .iter()
        .map(|s| urlencoding::encode(s.as_ref()).into_owned())
        .collect();
    href.push_str(&encoded.join("/"));
    if collection && !segments.is_empty() {
        href.push('/');
    }
    href
}

/// Href of a child of the collection at `parent_segments`.
pub fn child_href<S: AsRef<str>>(parent_segments: &[S], child: &RemoteObject) -> String {
    let mut segments: Vec<&str> = parent_segments.iter().map(|s| s.as_ref()).collect();
    segments.push(&child.name);
    href_for(&segments, child.is_folder())
}

/// Render the HTML listing of a folder's children.
///
/// Includes a link to the parent unless `segments` is the root.
pub fn render_listing<S: AsRef<str>>(segments: &[S], children: &[RemoteObject]) -> String {
    let mut links = String::new();

    if !segments.is_empty() {
        links.push_str("<a href=\"../\">..</a><br>\n");
    }

    for child in children {
        let href = child_href(segments, child);
        let label = if child.is_folder() {
            format!("{}/", child.name)
        } else {
            child.name.clone()
        };
        let _ = writeln!(
            links,
            "<a href=\"{}\">{}</a><br>",
            escape_xml(&href),
            escape_xml(&label)
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>{title}</title>
    <style>
      body {{ font-family: sans-serif; padding: 20px; }}
      a {{ display: block; padding: 5px; text-decoration: none; }}
      a:hover {{ background: #eee; }}
    </style>
  </head>
  <body>
    <h1>{title}</h1>
{links}  </body>
</html>
"#,
        title = LISTING_TITLE,
        links = links,
    )
}

/// One `<D:response>` element of a multistatus document.
#[derive(Debug, Clone)]
pub struct DavEntry<'a> {
    /// Absolute href of the resource.
    pub href: String,
    /// Metadata of the resource.
    pub object: &'a RemoteObject,
}

fn write_entry(out: &mut String, entry: &DavEntry<'_>) {
    let object = entry.object;
    let resource_type = if object.is_folder() {
        "<D:collection/>"
    } else {
        ""
    };

    let _ = write!(
        out,
        "  <D:response>\n\
         \x20   <D:href>{href}</D:href>\n\
         \x20   <D:propstat>\n\
         \x20     <D:prop>\n\
         \x20       <D:displayname>{name}</D:displayname>\n\
         \x20       <D:resourcetype>{resource_type}</D:resourcetype>\n\
         \x20       <D:getcontentlength>{size}</D:getcontentlength>\n\
         \x20       <D:getlastmodified>{modified}</D:getlastmodified>\n\
         \x20       <D:creationdate>{created}</D:creationdate>\n\
         \x20       <D:getcontenttype>{content_type}</D:getcontenttype>\n\
         \x20     </D:prop>\n\
         \x20     <D:status>HTTP/1.1 200 OK</D:status>\n\
         \x20   </D:propstat>\n\
         \x20 </D:response>\n",
        href = escape_xml(&entry.href),
        name = escape_xml(&object.name),
        size = object.size,
        modified = to_rfc1123(object.modified_at.as_ref()),
        created = to_iso8601(object.created_at.as_ref()),
        content_type = escape_xml(&object.content_type),
    );
}

/// Render a multistatus document with one response per entry.
pub fn render_multistatus(entries: &[DavEntry<'_>]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n<D:multistatus xmlns:D=\"DAV:\">\n",
    );
    for entry in entries {
        write_entry(&mut out, entry);
    }
    out.push_str("</D:multistatus>\n");
    out
}

/// Render the acknowledgement of a PROPPATCH on `href`.
pub fn render_proppatch(href: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n\
         <D:multistatus xmlns:D=\"DAV:\">\n\
         \x20 <D:response>\n\
         \x20   <D:href>{}</D:href>\n\
         \x20   <D:propstat>\n\
         \x20     <D:prop/>\n\
         \x20     <D:status>HTTP/1.1 200 OK</D:status>\n\
         \x20   </D:propstat>\n\
         \x20 </D:response>\n\
         </D:multistatus>\n",
        escape_xml(href)
    )
}
