//! Multipart request bodies

use crate::ingest::{IngestError, UploadBody};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::Request;
use multer::{Constraints, Field, Multipart, SizeLimit};

/// Streams one named file part out of a `multipart/form-data` request.
///
/// Parts before the target are skipped; parts after it are never read.
/// The whole request body, skipped parts and framing included, is bounded
/// by `limit` bytes.
pub struct MultipartUpload {
    multipart: Option<Multipart<'static>>,
    field_name: &'static str,
    field: Option<Field<'static>>,
}

impl MultipartUpload {
    /// Wrap the request body.
    ///
    /// A missing or malformed boundary is reported on [`UploadBody::open`],
    /// after the caller has been authorized.
    pub fn from_request(req: Request<Incoming>, field_name: &'static str, limit: u64) -> Self {
        let boundary = req
            .headers()
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| multer::parse_boundary(value).ok());

        let multipart = boundary.map(|boundary| {
            let constraints =
                Constraints::new().size_limit(SizeLimit::new().whole_stream(limit));
            Multipart::with_constraints(req.into_body().into_data_stream(), boundary, constraints)
        });

        Self {
            multipart,
            field_name,
            field: None,
        }
    }
}

fn read_error(e: multer::Error) -> IngestError {
    match e {
        multer::Error::StreamSizeExceeded { limit } => IngestError::PayloadTooLarge { limit },
        e => {
            tracing::debug!(error = %e, "multipart read failed");
            IngestError::BadInput("Unable to parse multipart form".to_string())
        }
    }
}

#[async_trait]
impl UploadBody for MultipartUpload {
    async fn open(&mut self) -> Result<Option<String>, IngestError> {
        let multipart = self
            .multipart
            .as_mut()
            .ok_or_else(|| IngestError::BadInput("Unable to parse multipart form".to_string()))?;

        while let Some(field) = multipart.next_field().await.map_err(read_error)? {
            if field.name() == Some(self.field_name) {
                let content_type = field.content_type().map(|mime| mime.to_string());
                self.field = Some(field);
                return Ok(content_type);
            }
        }

        Err(IngestError::BadInput(format!(
            "Missing form field '{}'",
            self.field_name
        )))
    }

    async fn chunk(&mut self) -> Result<Option<Bytes>, IngestError> {
        match self.field.as_mut() {
            Some(field) => field.chunk().await.map_err(read_error),
            None => Err(IngestError::Internal("multipart field read before open".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_limit_is_payload_too_large() {
        let error = read_error(multer::Error::StreamSizeExceeded { limit: 65536 });
        assert!(matches!(error, IngestError::PayloadTooLarge { limit: 65536 }));
    }

    #[test]
    fn test_truncated_body_is_bad_input() {
        let error = read_error(multer::Error::IncompleteStream);
        assert!(matches!(error, IngestError::BadInput(_)));
        assert_eq!(error.public_message(), "Unable to parse multipart form");
    }
}
