//! Upload bodies
//!
//! An [`UploadBody`] yields the declared content type of the file part
//! before any bytes are read, so requests can be rejected without staging.

use super::IngestError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;

/// Default chunk size for [`BufferedUpload`]
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Streaming source of one uploaded file
#[async_trait]
pub trait UploadBody: Send {
    /// Locate the file part and return its declared content type.
    ///
    /// Returns `BadInput` when the part is missing.
    async fn open(&mut self) -> Result<Option<String>, IngestError>;

    /// Next chunk of the file part, `None` once exhausted
    async fn chunk(&mut self) -> Result<Option<Bytes>, IngestError>;
}

/// In-memory [`UploadBody`], for driving the pipeline without an HTTP server
#[derive(Debug, Clone)]
pub struct BufferedUpload {
    content_type: Option<String>,
    chunks: VecDeque<Bytes>,
    opened: bool,
}

impl BufferedUpload {
    pub fn new(content_type: Option<&str>, data: impl Into<Bytes>) -> Self {
        Self::with_chunk_size(content_type, data, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(
        content_type: Option<&str>,
        data: impl Into<Bytes>,
        chunk_size: usize,
    ) -> Self {
        let mut data: Bytes = data.into();
        let chunk_size = chunk_size.max(1);
        let mut chunks = VecDeque::new();
        while !data.is_empty() {
            let take = chunk_size.min(data.len());
            chunks.push_back(data.split_to(take));
        }

        Self {
            content_type: content_type.map(str::to_string),
            chunks,
            opened: false,
        }
    }

    /// Whether [`UploadBody::open`] has been called
    pub fn is_opened(&self) -> bool {
        self.opened
    }

    /// Bytes not yet handed out
    pub fn remaining(&self) -> usize {
        self.chunks.iter().map(Bytes::len).sum()
    }
}

#[async_trait]
impl UploadBody for BufferedUpload {
    async fn open(&mut self) -> Result<Option<String>, IngestError> {
        self.opened = true;
        Ok(self.content_type.clone())
    }

    async fn chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        if !self.opened {
            return Err(IngestError::Internal("upload body read before open".into()));
        }
        Ok(self.chunks.pop_front())
    }
}
