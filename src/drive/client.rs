//! Google Drive v3 implementation of [`RemoteStore`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::token::{OAuthRefresh, TokenCache};
use super::{
    ChildPage, NewObject, ObjectContent, ObjectKind, RemoteObject, RemoteStore,
    DEFAULT_CONTENT_TYPE, FOLDER_MIME_TYPE,
};
use crate::config::DriveConfig;
use crate::datetime::parse_rfc3339;
use crate::error::{DriveDavError, Result};

/// Fields requested for a single object.
const FILE_FIELDS: &str = "id,name,mimeType,size,createdTime,modifiedTime";

/// Fields requested for a listing page.
const LIST_FIELDS: &str = "files(id,name,mimeType,size,createdTime,modifiedTime),nextPageToken";

/// User agent sent with every request.
const USER_AGENT: &str = concat!("drivedav/", env!("CARGO_PKG_VERSION"));

/// Object metadata as serialized by the Drive API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    /// int64 values are sent as JSON strings.
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    created_time: Option<String>,
    #[serde(default)]
    modified_time: Option<String>,
}

impl From<DriveFile> for RemoteObject {
    fn from(file: DriveFile) -> Self {
        let kind = ObjectKind::from_mime_type(&file.mime_type);
        let size = match kind {
            ObjectKind::Folder => 0,
            ObjectKind::File => file
                .size
                .as_deref()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        };

        RemoteObject {
            id: file.id,
            name: file.name,
            kind,
            size,
            created_at: file.created_time.as_deref().and_then(parse_rfc3339),
            modified_at: file.modified_time.as_deref().and_then(parse_rfc3339),
            content_type: file.mime_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Metadata body for create calls.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateMetadata<'a> {
    name: &'a str,
    mime_type: &'a str,
    parents: [&'a str; 1],
}

/// Build the `q` filter selecting the non-trashed children of a folder.
fn children_query(parent_id: &str) -> String {
    let escaped = parent_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}' in parents and trashed = false")
}

/// Build a `multipart/related` upload body: JSON metadata part, then content.
fn multipart_related(boundary: &str, metadata: &[u8], content_type: &str, content: &[u8]) -> Bytes {
    let mut body = BytesMut::with_capacity(content.len() + metadata.len() + 256);
    body.put_slice(format!("--{boundary}\r\n").as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(metadata);
    body.put_slice(format!("\r\n--{boundary}\r\n").as_bytes());
    body.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.put_slice(content);
    body.put_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body.freeze()
}

/// Drive API client.
///
/// Cheap to share behind an `Arc`; the token cache inside is process-wide.
pub struct DriveClient {
    http: Client,
    tokens: Arc<TokenCache>,
    api_base_url: String,
    upload_base_url: String,
    page_size: u32,
}

impl DriveClient {
    /// Create a client from configuration, including its OAuth2 token cache.
    pub fn new(config: &DriveConfig) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DriveDavError::Config(format!("failed to create HTTP client: {e}")))?;

        let exchange = OAuthRefresh::new(
            http.clone(),
            &config.token_url,
            &config.client_id,
            &config.client_secret,
            &config.refresh_token,
        );
        let tokens = Arc::new(TokenCache::new(Arc::new(exchange)));

        Ok(Self::with_token_cache(http, tokens, config))
    }

    /// Create a client that shares an existing token cache.
    pub fn with_token_cache(http: Client, tokens: Arc<TokenCache>, config: &DriveConfig) -> Self {
        Self {
            http,
            tokens,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
        }
    }

    /// Get the token cache used by this client.
    pub fn token_cache(&self) -> &Arc<TokenCache> {
        &self.tokens
    }

    fn file_url(&self, id: &str) -> String {
        format!("{}/files/{}", self.api_base_url, urlencoding::encode(id))
    }

    /// Attach the bearer token and send.
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self.tokens.bearer().await?;
        let response = request.bearer_auth(&token).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Revoked or expired early; the next call refreshes.
            self.tokens.invalidate(&token);
        }

        Ok(response)
    }

    /// Turn a non-success response into a backend error.
    async fn check(response: Response, context: &str) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), context, "Drive API call failed");
        Err(DriveDavError::backend(
            status.as_u16(),
            format!("{context}: {body}"),
        ))
    }

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<RemoteObject> {
        let metadata = CreateMetadata {
            name,
            mime_type: FOLDER_MIME_TYPE,
            parents: [parent_id],
        };

        let request = self
            .http
            .post(format!("{}/files", self.api_base_url))
            .query(&[("fields", FILE_FIELDS)])
            .json(&metadata);

        let response = Self::check(self.send(request).await?, "create folder").await?;
        let file: DriveFile = response.json().await?;
        Ok(file.into())
    }

    async fn upload_file(
        &self,
        parent_id: &str,
        name: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<RemoteObject> {
        let metadata = CreateMetadata {
            name,
            mime_type: content_type,
            parents: [parent_id],
        };
        let metadata = serde_json::to_vec(&metadata)
            .map_err(|e| DriveDavError::Validation(format!("invalid upload metadata: {e}")))?;

        let boundary = format!("drivedav-{}", Uuid::new_v4().simple());
        let body = multipart_related(&boundary, &metadata, content_type, content);

        let request = self
            .http
            .post(format!("{}/files", self.upload_base_url))
            .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
            .header(
                header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body);

        let response = Self::check(self.send(request).await?, "upload file").await?;
        let file: DriveFile = response.json().await?;
        Ok(file.into())
    }
}

#[async_trait]
impl RemoteStore for DriveClient {
    async fn list_page(&self, parent_id: &str, page_token: Option<&str>) -> Result<ChildPage> {
        let mut query = vec![
            ("q", children_query(parent_id)),
            ("fields", LIST_FIELDS.to_string()),
            ("pageSize", self.page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let request = self
            .http
            .get(format!("{}/files", self.api_base_url))
            .query(&query);

        let response = Self::check(self.send(request).await?, "list children").await?;
        let list: FileList = response.json().await?;

        tracing::debug!(
            parent_id,
            count = list.files.len(),
            more = list.next_page_token.is_some(),
            "Listed children page"
        );

        Ok(ChildPage {
            objects: list.files.into_iter().map(RemoteObject::from).collect(),
            next_page_token: list.next_page_token,
        })
    }

    async fn get_metadata(&self, id: &str) -> Result<Option<RemoteObject>> {
        let request = self.http.get(self.file_url(id)).query(&[("fields", FILE_FIELDS)]);

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = Self::check(response, "get metadata").await?;
        let file: DriveFile = response.json().await?;
        Ok(Some(file.into()))
    }

    async fn get_content(&self, id: &str) -> Result<ObjectContent> {
        let request = self.http.get(self.file_url(id)).query(&[("alt", "media")]);

        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(DriveDavError::NotFound(format!("object {id}")));
        }

        let response = Self::check(response, "download content").await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await?;

        Ok(ObjectContent {
            bytes,
            content_type,
        })
    }

    async fn create_object(&self, new_object: NewObject) -> Result<RemoteObject> {
        let created = match new_object.kind {
            ObjectKind::Folder => {
                self.create_folder(&new_object.parent_id, &new_object.name)
                    .await?
            }
            ObjectKind::File => {
                self.upload_file(
                    &new_object.parent_id,
                    &new_object.name,
                    &new_object.content,
                    &new_object.content_type,
                )
                .await?
            }
        };

        tracing::info!(
            id = %created.id,
            parent_id = %new_object.parent_id,
            name = %created.name,
            kind = ?created.kind,
            "Created remote object"
        );
        Ok(created)
    }

    async fn delete_object(&self, id: &str) -> Result<()> {
        let response = self.send(self.http.delete(self.file_url(id))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(id, "Delete of missing object ignored");
            return Ok(());
        }

        Self::check(response, "delete object").await?;
        tracing::info!(id, "Deleted remote object");
        Ok(())
    }
}
