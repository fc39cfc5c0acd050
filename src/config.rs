//! Configuration module for drivedav.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveDavError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum PUT body size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_size() -> u64 {
    512
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Which remote store implementation backs the WebDAV surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Google Drive v3 REST API.
    #[default]
    Google,
    /// Process-local store, contents are lost on exit.
    Memory,
}

/// Remote store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveConfig {
    /// Backend implementation.
    #[serde(default)]
    pub backend: BackendKind,
    /// OAuth2 client ID.
    #[serde(default)]
    pub client_id: String,
    /// OAuth2 client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Long-lived OAuth2 refresh token.
    #[serde(default)]
    pub refresh_token: String,
    /// ID of the folder exposed as the WebDAV root.
    #[serde(default)]
    pub root_folder_id: String,
    /// OAuth2 token endpoint.
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Base URL of the metadata API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Base URL of the upload API.
    #[serde(default = "default_upload_base_url")]
    pub upload_base_url: String,
    /// Children requested per list call.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base_url() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    300 // uploads can be large
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            root_folder_id: String::new(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
            upload_base_url: default_upload_base_url(),
            page_size: default_page_size(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
        }
    }
}

/// Basic authentication configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Username expected in the Authorization header.
    #[serde(default)]
    pub username: String,
    /// Password expected in the Authorization header.
    #[serde(default)]
    pub password: String,
    /// Realm announced in the WWW-Authenticate challenge.
    #[serde(default = "default_realm")]
    pub realm: String,
}

fn default_realm() -> String {
    "webdav".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            realm: default_realm(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/drivedav.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote store configuration.
    #[serde(default)]
    pub drive: DriveConfig,
    /// Basic authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Override `target` with the named environment variable when it is set and non-empty.
fn override_from_env(target: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *target = value;
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveDavError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveDavError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DRIVEDAV_CLIENT_ID`, `DRIVEDAV_CLIENT_SECRET`, `DRIVEDAV_REFRESH_TOKEN`
    /// - `DRIVEDAV_ROOT_FOLDER_ID`
    /// - `DRIVEDAV_USERNAME`, `DRIVEDAV_PASSWORD`
    pub fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.drive.client_id, "DRIVEDAV_CLIENT_ID");
        override_from_env(&mut self.drive.client_secret, "DRIVEDAV_CLIENT_SECRET");
        override_from_env(&mut self.drive.refresh_token, "DRIVEDAV_REFRESH_TOKEN");
        override_from_env(&mut self.drive.root_folder_id, "DRIVEDAV_ROOT_FOLDER_ID");
        override_from_env(&mut self.auth.username, "DRIVEDAV_USERNAME");
        override_from_env(&mut self.auth.password, "DRIVEDAV_PASSWORD");
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - No Basic auth username is configured
    /// - The google backend is selected and a credential or the root folder ID is missing
    pub fn validate(&self) -> Result<()> {
        if self.auth.username.is_empty() {
            return Err(DriveDavError::Validation(
                "auth.username is not set. \
                 Set it in config.toml or via DRIVEDAV_USERNAME environment variable."
                    .to_string(),
            ));
        }

        if self.drive.page_size == 0 {
            return Err(DriveDavError::Validation(
                "drive.page_size must be greater than zero".to_string(),
            ));
        }

        if self.drive.backend == BackendKind::Google {
            let required = [
                ("drive.client_id", &self.drive.client_id),
                ("drive.client_secret", &self.drive.client_secret),
                ("drive.refresh_token", &self.drive.refresh_token),
                ("drive.root_folder_id", &self.drive.root_folder_id),
            ];
            for (name, value) in required {
                if value.is_empty() {
                    return Err(DriveDavError::Validation(format!(
                        "{name} is required for the google backend"
                    )));
                }
            }
        }

        Ok(())
    }
}
