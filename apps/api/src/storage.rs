use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to upload '{key}': {message}")]
    Upload { key: String, message: String },

    #[error("Failed to sign URL for '{key}': {message}")]
    Sign { key: String, message: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Destination for finished worksheets. Carried in `AppState` as
/// `Arc<dyn WorksheetStore>` so tests can swap in an in-memory store.
#[async_trait]
pub trait WorksheetStore: Send + Sync {
    async fn upload(&self, key: &str, bytes: Vec<u8>, content_type: &str)
        -> Result<(), StorageError>;

    /// Time-limited GET URL for an uploaded object.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}

// ────────────────────────────────────────────────────────────────────────────
// S3 / MinIO
// ────────────────────────────────────────────────────────────────────────────

pub struct S3WorksheetStore {
    client: S3Client,
    bucket: String,
}

impl S3WorksheetStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl WorksheetStore for S3WorksheetStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        info!("Uploaded {size} bytes to s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError> {
        let sign_error = |message: String| StorageError::Sign {
            key: key.to_string(),
            message,
        };
        let presigning = PresigningConfig::expires_in(ttl).map_err(|e| sign_error(e.to_string()))?;
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| sign_error(e.to_string()))?;
        Ok(request.uri().to_string())
    }
}

/// Object key for a client's worksheet: `worksheets/{safe_name}_{timestamp}.pdf`.
pub fn destination_key(client_name: &str, now: DateTime<Utc>) -> String {
    let safe_name = client_name
        .trim()
        .to_lowercase()
        .replace(' ', "_")
        .replace('/', "-");
    format!("worksheets/{safe_name}_{}.pdf", now.format("%Y%m%dT%H%M%S"))
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store for tests
// ────────────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_destination_key_sanitizes_name() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            destination_key("Jane Doe", now),
            "worksheets/jane_doe_20240309T140507.pdf"
        );
        assert_eq!(
            destination_key("  Smith/Jones LLC ", now),
            "worksheets/smith-jones_llc_20240309T140507.pdf"
        );
    }

    #[tokio::test]
    async fn test_memory_store_records_uploads() {
        let store = memory::MemoryWorksheetStore::default();
        store
            .upload("worksheets/a.pdf", b"%PDF".to_vec(), PDF_CONTENT_TYPE)
            .await
            .unwrap();
        let url = store
            .signed_url("worksheets/a.pdf", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(url, "memory://worksheets/a.pdf?expires=60");
        let objects = store.objects.lock().unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].content_type, PDF_CONTENT_TYPE);
    }
}
