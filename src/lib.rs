//! Tubely Library
//!
//! Video ingestion service: accepts user uploads, classifies them by
//! orientation, rewrites them for progressive playback and hands them to S3.
//!
//! # Features
//!
//! - **Ownership Checks**: Only the owner of a video record may replace its content
//! - **Fast Start**: Uploads are remuxed with `-movflags faststart`, never re-encoded
//! - **Orientation Buckets**: Objects land under `landscape/`, `portrait/` or `other/`
//! - **Guaranteed Cleanup**: Staged files are removed on every exit path
//!
//! # Example
//!
//! ```no_run
//! use tubely::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let server = Server::from_config(config).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod ingest;
pub mod media;
pub mod metadata;
pub mod metrics;
pub mod server;
pub mod storage;
pub mod thumbnail;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{IngestError, VideoIngestor};
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The only media type accepted for video uploads
pub const VIDEO_MEDIA_TYPE: &str = "video/mp4";
