//! WebDAV server for drivedav.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use super::auth::BasicAuth;
use super::handlers::AppState;
use super::router::create_router;
use crate::config::{BackendKind, Config};
use crate::drive::{DriveClient, InMemoryStore, RemoteStore};
use crate::{DriveDavError, Result};

/// WebDAV server bound to one remote store.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// Application state.
    app_state: Arc<AppState>,
    /// Basic auth gate.
    auth: Arc<BasicAuth>,
    /// Request body limit in bytes.
    max_body_bytes: usize,
}

impl WebServer {
    /// Create a server for the configured backend.
    pub fn new(config: &Config) -> Result<Self> {
        let (store, root_id): (Arc<dyn RemoteStore>, String) = match config.drive.backend {
            BackendKind::Google => (
                Arc::new(DriveClient::new(&config.drive)?),
                config.drive.root_folder_id.clone(),
            ),
            BackendKind::Memory => {
                tracing::warn!("Using the in-memory backend; contents are lost on exit");
                let store = InMemoryStore::new();
                let root_id = store.root_id().to_string();
                (Arc::new(store), root_id)
            }
        };

        Self::with_store(config, store, root_id)
    }

    /// Create a server over an existing store.
    pub fn with_store(
        config: &Config,
        store: Arc<dyn RemoteStore>,
        root_id: impl Into<String>,
    ) -> Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| DriveDavError::Config(format!("invalid server address: {e}")))?;

        let max_body_bytes = config
            .server
            .max_upload_size_mb
            .saturating_mul(1024 * 1024)
            .try_into()
            .unwrap_or(usize::MAX);

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(store, root_id)),
            auth: Arc::new(BasicAuth::new(
                &config.auth.username,
                &config.auth.password,
                config.auth.realm.clone(),
            )),
            max_body_bytes,
        })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Run the server until it fails.
    pub async fn run(self) -> Result<()> {
        let router = create_router(self.app_state, self.auth, self.max_body_bytes);
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!("WebDAV server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, router).await?;
        Ok(())
    }

    /// Run the server in the background and return the bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let router = create_router(self.app_state, self.auth, self.max_body_bytes);
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("WebDAV server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("WebDAV server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
