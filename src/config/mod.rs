//! Configuration module for Tubely
//!
//! Handles loading and parsing of YAML configuration files with support for
//! environment variable expansion and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

// ============================================================================
// Validation Helpers
// ============================================================================

/// Validate that a URL starts with http:// or https://
fn is_valid_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        ConfigLoader::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_http_url(&self.server.base_url) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid server.base_url '{}': must start with http:// or https://",
                self.server.base_url
            )));
        }

        if self.server.max_upload_bytes == 0 || self.server.max_thumbnail_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "Upload size limits must be greater than zero".into(),
            ));
        }

        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.bucket cannot be empty".into(),
            ));
        }

        if self.storage.region.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.region cannot be empty".into(),
            ));
        }

        for (field, url) in [
            ("storage.endpoint", &self.storage.endpoint),
            ("storage.public_base_url", &self.storage.public_base_url),
        ] {
            if let Some(url) = url {
                if !is_valid_http_url(url) {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid {} '{}': must start with http:// or https://",
                        field, url
                    )));
                }
            }
        }

        let jwt = &self.auth.jwt;
        if jwt.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.jwt.secret cannot be empty".into(),
            ));
        }

        match jwt.algorithm.to_uppercase().as_str() {
            "HS256" | "RS256" | "ES256" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "Unsupported JWT algorithm '{}': must be 'HS256', 'RS256' or 'ES256'",
                    other
                )))
            }
        }

        if self.media.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "media.timeout_seconds must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub address: String,
    /// Public origin of this service, used to build thumbnail URLs
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_assets_root")]
    pub assets_root: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default = "default_max_thumbnail_bytes")]
    pub max_thumbnail_bytes: u64,
}

fn default_base_url() -> String {
    "http://localhost:8091".to_string()
}

fn default_assets_root() -> PathBuf {
    PathBuf::from("assets")
}

fn default_max_upload_bytes() -> u64 {
    1 << 30 // 1GB
}

fn default_max_thumbnail_bytes() -> u64 {
    10 << 20 // 10MB
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Overrides the `https://<bucket>.s3.<region>.amazonaws.com` origin of stored URLs
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt: JwtConfig,
}

/// JWT configuration
///
/// For `RS256`/`ES256`, `secret` holds the PEM-encoded public key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,
    #[serde(default)]
    pub issuer: Option<String>,
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

/// External media tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,
    /// Directory for staged uploads. Default: system temp dir
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl MediaConfig {
    /// Directory staged uploads are written to
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Upper bound for a single ffprobe/ffmpeg invocation
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
            ffmpeg_path: default_ffmpeg_path(),
            temp_dir: None,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_timeout_seconds() -> u64 {
    300
}

/// Metadata store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// JSON array of video records loaded at startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}
