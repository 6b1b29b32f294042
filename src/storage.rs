use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    presigning::PresigningConfig,
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::StorageConfig;

/// Picture objects never change once written (every upload gets a fresh
/// random name), so clients may cache them for a long time.
pub const PICTURE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

/// Object storage holding uploaded pictures.
#[async_trait]
pub trait StorageClient: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String>;
}

/// S3 compatible bucket (MinIO in development).
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub async fn connect(cfg: &StorageConfig) -> anyhow::Result<Self> {
        if cfg.minio_bucket.is_empty() {
            anyhow::bail!("MINIO_BUCKET must not be empty");
        }
        let creds = Credentials::new(
            &cfg.minio_access_key,
            &cfg.minio_secret_key,
            None,
            None,
            "postboard-env",
        );
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.minio_region.clone()))
            .credentials_provider(creds)
            .load()
            .await;

        // MinIO serves buckets as path segments, not subdomains.
        let s3 = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.minio_endpoint)
            .force_path_style(true)
            .build();

        debug!(endpoint = %cfg.minio_endpoint, bucket = %cfg.minio_bucket, "picture storage configured");
        Ok(Self {
            client: Client::from_conf(s3),
            bucket: cfg.minio_bucket.clone(),
        })
    }

    /// Creates the picture bucket when it does not exist yet.
    pub async fn ensure_bucket(&self) -> anyhow::Result<()> {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => {
                self.client
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .with_context(|| format!("create bucket {}", self.bucket))?;
                info!(bucket = %self.bucket, "picture bucket created");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("head bucket {}", self.bucket)),
        }
    }
}

#[async_trait]
impl StorageClient for S3Storage {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> anyhow::Result<()> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .cache_control(PICTURE_CACHE_CONTROL)
            .content_length(size as i64)
            .body(ByteStream::from(body))
            .send()
            .await
            .with_context(|| format!("store {key}"))?;
        debug!(%key, size, "picture stored");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("delete {key}"))?;
        debug!(%key, "picture deleted");
        Ok(())
    }

    async fn presign_get(&self, key: &str, seconds: u64) -> anyhow::Result<String> {
        let expires = PresigningConfig::expires_in(Duration::from_secs(seconds))
            .with_context(|| format!("presign ttl {seconds}s"))?;
        let url = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(expires)
            .await
            .with_context(|| format!("presign {key}"))?
            .uri()
            .to_string();
        Ok(url)
    }
}
