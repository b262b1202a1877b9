use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;

/// Prefix marking a document reference that lives in the configured bucket.
pub const STORAGE_SCHEME: &str = "storage://";

pub fn storage_reference(key: &str) -> String {
    format!("{STORAGE_SCHEME}{}", key.trim_start_matches('/'))
}

/// Returns the object key when `reference` points into blob storage.
pub fn storage_key(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(STORAGE_SCHEME)
        .map(|key| key.trim_start_matches('/'))
        .filter(|key| !key.is_empty())
}

#[async_trait]
pub trait BlobStorage: Send + Sync + 'static {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        content_disposition: Option<String>,
    ) -> Result<()>;

    async fn get_object(&self, key: &str) -> Result<Vec<u8>>;

    async fn delete_object(&self, key: &str) -> Result<()>;
}

pub struct S3Storage {
    client: S3Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStorage for S3Storage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        content_disposition: Option<String>,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes));

        if let Some(content_type) = content_type {
            request = request.content_type(content_type);
        }
        if let Some(content_disposition) = content_disposition {
            request = request.content_disposition(content_disposition);
        }

        request
            .send()
            .await
            .with_context(|| format!("failed to upload document object {key}"))?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("failed to fetch document object {key}"))?;

        let bytes = response
            .body
            .collect()
            .await
            .context("failed to read document object stream")?
            .into_bytes()
            .to_vec();
        Ok(bytes)
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("failed to delete document object {key}"))?;
        Ok(())
    }
}
