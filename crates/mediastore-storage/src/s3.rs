use crate::keys::{encode_key, validate_key};
use crate::traits::{StorageDriver, StorageError, StorageResult};
use crate::{StorageBackend, Visibility};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder, AmazonS3ConfigKey};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::time::Duration;

const DEFAULT_SIGNED_URL_EXPIRY: Duration = Duration::from_secs(15 * 60);
const SERVER_SIDE_ENCRYPTION_KEY: &str = "aws_server_side_encryption";
const SERVER_SIDE_ENCRYPTION: &str = "AES256";

/// Connection settings for an S3-compatible bucket.
///
/// Works with AWS S3 as well as Cloudflare R2, MinIO and other providers
/// exposing the S3 API through a custom `endpoint`.
#[derive(Clone, Debug)]
pub struct ObjectStorageConfig {
    pub bucket: String,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    /// Custom endpoint, with or without scheme (e.g. "localhost:9000")
    pub endpoint: Option<String>,
    /// Scheme used for schemeless endpoints and direct URLs
    pub use_ssl: bool,
    pub visibility: Visibility,
    /// Expiry of the signed URL returned by `put` on private buckets. Zero means 15 minutes.
    pub default_expiry: Duration,
}

/// S3 storage implementation
#[derive(Clone, Debug)]
pub struct ObjectStorage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    visibility: Visibility,
    default_expiry: Duration,
}

impl ObjectStorage {
    /// Create a new ObjectStorage instance
    ///
    /// Fails with `InvalidConfig` when the bucket or credentials are missing or
    /// the underlying client cannot be built. No request is sent here.
    pub fn new(config: ObjectStorageConfig) -> StorageResult<Self> {
        if config.bucket.trim().is_empty() {
            return Err(StorageError::InvalidConfig("bucket is required".to_string()));
        }
        if config.access_key.is_empty() {
            return Err(StorageError::InvalidConfig("access key is required".to_string()));
        }
        if config.secret_key.is_empty() {
            return Err(StorageError::InvalidConfig("secret key is required".to_string()));
        }

        let endpoint_url = config
            .endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(|e| with_scheme(e, config.use_ssl));

        let builder = s3_builder(&config, endpoint_url.as_deref())?;

        let store = builder.build().map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %config.bucket,
                "Failed to build S3 client"
            );
            StorageError::InvalidConfig(e.to_string())
        })?;

        let default_expiry = if config.default_expiry.is_zero() {
            DEFAULT_SIGNED_URL_EXPIRY
        } else {
            config.default_expiry
        };

        Ok(ObjectStorage {
            store,
            bucket: config.bucket,
            region: config.region,
            endpoint_url,
            visibility: config.visibility,
            default_expiry,
        })
    }

    /// Generate public URL for S3 object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{key}
    /// For S3-compatible providers, uses path-style: {endpoint}/{bucket}/{key}
    fn generate_url(&self, key: &str) -> String {
        let key = encode_key(key);
        if let Some(ref endpoint) = self.endpoint_url {
            format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }

    async fn sign(&self, key: &str, expiry: Duration) -> StorageResult<String> {
        let location = Path::from(key.to_string());
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expiry)
            .await;

        let url = url_result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                "S3 signed URL generation failed"
            );
            StorageError::Internal(e.to_string())
        })?;

        Ok(url.to_string())
    }
}

/// Client builder for a bucket. Every upload is encrypted at rest with SSE-S3.
fn s3_builder(
    config: &ObjectStorageConfig,
    endpoint_url: Option<&str>,
) -> StorageResult<AmazonS3Builder> {
    let encryption: AmazonS3ConfigKey = SERVER_SIDE_ENCRYPTION_KEY
        .parse()
        .map_err(|e: ObjectStoreError| StorageError::InvalidConfig(e.to_string()))?;

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(config.bucket.clone())
        .with_region(config.region.clone())
        .with_access_key_id(config.access_key.clone())
        .with_secret_access_key(config.secret_key.clone())
        .with_config(encryption, SERVER_SIDE_ENCRYPTION);

    if let Some(endpoint) = endpoint_url {
        let allow_http = endpoint.starts_with("http://");
        // Path-style requests for MinIO / R2
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(allow_http);
    }

    Ok(builder)
}

fn with_scheme(endpoint: &str, use_ssl: bool) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else if use_ssl {
        format!("https://{}", endpoint)
    } else {
        format!("http://{}", endpoint)
    }
}

#[async_trait]
impl StorageDriver for ObjectStorage {
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Path::from(key.to_string());

        let result: ObjectResult<_> = self.store.delete(&location).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 delete failed"
            );
            StorageError::Internal(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let location = Path::from(key.to_string());
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    "S3 exists check failed"
                );
                Err(StorageError::Internal(e.to_string()))
            }
        }
    }

    async fn get_signed_url(&self, key: &str, expiry: Duration) -> StorageResult<String> {
        if !self.visibility.is_private() {
            return Ok(String::new());
        }
        self.sign(key, expiry).await
    }

    async fn get_url(&self, key: &str) -> StorageResult<String> {
        if !self.visibility.is_public() {
            return Ok(String::new());
        }
        Ok(self.generate_url(key))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<String> {
        if let Err(e) = validate_key(key) {
            tracing::warn!(error = %e, key = %key, "Rejected S3 upload key");
            return Err(e);
        }

        let size = data.len() as u64;
        let location = Path::from(key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::Internal(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        match self.visibility {
            Visibility::Public => Ok(self.generate_url(key)),
            Visibility::Private => self.sign(key, self.default_expiry).await,
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
