//! HTTP server module
//!
//! A `hyper` HTTP/1.1 server exposing the upload API. Each connection is
//! served on its own task; requests share one [`AppState`].
//!
//! # Example
//!
//! ```no_run
//! use tubely::config::Config;
//! use tubely::server::Server;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.yaml")?;
//! let server = Server::from_config(config).await?;
//! println!("Listening on {}", server.local_addr());
//! server.run().await?;
//! # Ok(())
//! # }
//! ```

use crate::auth::jwt::JwtAuthenticator;
use crate::auth::{AuthError, Authenticator};
use crate::config::Config;
use crate::ingest::{IngestSettings, VideoIngestor};
use crate::media::{FfmpegToolkit, MediaToolkit};
use crate::metadata::{MemoryVideoStore, MetadataError, VideoStore};
use crate::storage::{ObjectStore, S3ObjectStore};
use crate::thumbnail::ThumbnailUploader;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{error, info};

pub mod multipart;
pub mod response;
pub mod routes;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(String),

    #[error("Authenticator setup failed: {0}")]
    AuthError(#[from] AuthError),

    #[error("Metadata setup failed: {0}")]
    MetadataError(#[from] MetadataError),
}

/// Collaborators shared by all requests
pub struct AppState {
    pub ingestor: VideoIngestor,
    pub thumbnails: ThumbnailUploader,
    pub assets_root: PathBuf,
}

impl AppState {
    /// Wire the request handlers to the given collaborators
    pub fn new(
        config: &Config,
        authenticator: Arc<dyn Authenticator>,
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn ObjectStore>,
        media: Arc<dyn MediaToolkit>,
    ) -> Self {
        let ingestor = VideoIngestor::new(
            Arc::clone(&authenticator),
            Arc::clone(&videos),
            objects,
            media,
            IngestSettings::from_config(config),
        );
        let thumbnails = ThumbnailUploader::from_config(config, authenticator, videos);

        Self {
            ingestor,
            thumbnails,
            assets_root: config.server.assets_root.clone(),
        }
    }
}

/// HTTP server bound to its listener
pub struct Server {
    state: Arc<AppState>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Build the production collaborators from `config` and bind.
    ///
    /// Video records live in memory, optionally seeded from
    /// `metadata.seed_path`.
    pub async fn from_config(config: Config) -> Result<Self, ServerError> {
        let authenticator: Arc<dyn Authenticator> =
            Arc::new(JwtAuthenticator::from_config(&config.auth.jwt)?);

        let videos = MemoryVideoStore::new();
        if let Some(seed) = &config.metadata.seed_path {
            let loaded = videos.load_seed(seed)?;
            info!(records = loaded, path = %seed.display(), "Loaded video records");
        }

        let objects: Arc<dyn ObjectStore> =
            Arc::new(S3ObjectStore::from_config(&config.storage).await);
        let media: Arc<dyn MediaToolkit> = Arc::new(FfmpegToolkit::from_config(&config.media));

        let state = AppState::new(&config, authenticator, Arc::new(videos), objects, media);
        Self::bind(&config.server.address, state).await
    }

    /// Bind `address` and serve `state` once [`Server::run`] is called.
    ///
    /// Port 0 lets the OS pick a port; see [`Server::local_addr`].
    pub async fn bind(address: &str, state: AppState) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::BindError(format!("Invalid address: {}", e)))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("Failed to bind to {}: {}", addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(format!("Failed to get local address: {}", e)))?;

        info!("Server bound to {}", local_addr);

        Ok(Self {
            state: Arc::new(state),
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// In-flight requests keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: std::future::Future<Output = ()>,
    {
        info!("Starting server on {}", self.local_addr);
        tokio::pin!(shutdown);

        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        continue;
                    }
                },
            };

            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service =
                    service_fn(move |req| routes::handle_request(req, Arc::clone(&state)));

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", peer_addr, e);
                }
            });
        }

        info!("Shutting down server");
        Ok(())
    }
}
