//! Storage provider configuration and object store construction.

use std::path::PathBuf;
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;

use crate::error::ConfigError;

/// Storage provider options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// Local filesystem, served statically by the HTTP app (development).
    Local,
    /// AWS S3.
    AwsS3,
    /// Cloudflare R2 (S3-compatible, zero egress fees).
    CloudflareR2,
    /// Self-hosted MinIO.
    MinIO,
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    /// Bucket name, or local directory for the `Local` provider.
    pub bucket: String,
    /// Region (use "auto" for R2).
    pub region: String,
    /// Custom endpoint URL (required for R2 and MinIO).
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
}

impl StorageConfig {
    /// Local-disk configuration rooted at `path`.
    pub fn local(path: &str) -> Self {
        Self {
            provider: StorageProvider::Local,
            bucket: path.to_string(),
            region: String::new(),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// - `BROADSHEET_STORAGE_PROVIDER`: "local", "s3", "r2", or "minio"
    /// - `BROADSHEET_BUCKET`: bucket name or local directory
    /// - `BROADSHEET_REGION`: region (default "auto")
    /// - `R2_ENDPOINT` or `MINIO_ENDPOINT`: custom endpoint URL
    /// - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`: credentials
    pub fn from_env() -> Result<Self, ConfigError> {
        let provider_str =
            std::env::var("BROADSHEET_STORAGE_PROVIDER").unwrap_or_else(|_| "local".to_string());

        let provider = match provider_str.to_lowercase().as_str() {
            "local" => StorageProvider::Local,
            "aws_s3" | "s3" => StorageProvider::AwsS3,
            "cloudflare_r2" | "r2" => StorageProvider::CloudflareR2,
            "minio" => StorageProvider::MinIO,
            _ => return Err(ConfigError::UnknownProvider(provider_str)),
        };

        let bucket =
            std::env::var("BROADSHEET_BUCKET").unwrap_or_else(|_| "./data/uploads".to_string());

        let region = std::env::var("BROADSHEET_REGION").unwrap_or_else(|_| "auto".to_string());

        let endpoint = std::env::var("R2_ENDPOINT")
            .or_else(|_| std::env::var("MINIO_ENDPOINT"))
            .ok();

        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").ok();
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").ok();

        Ok(Self {
            provider,
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        })
    }

    /// The local directory backing the store, if the provider is `Local`.
    ///
    /// The HTTP app mounts a static file service here.
    pub fn local_root(&self) -> Option<PathBuf> {
        match self.provider {
            StorageProvider::Local => Some(PathBuf::from(&self.bucket)),
            _ => None,
        }
    }

    /// Build an [`ObjectStore`] instance from this configuration.
    pub fn build_object_store(&self) -> Result<Arc<dyn ObjectStore>, ConfigError> {
        match &self.provider {
            StorageProvider::CloudflareR2 | StorageProvider::MinIO => {
                let endpoint =
                    self.endpoint
                        .as_ref()
                        .ok_or_else(|| ConfigError::MissingEndpoint {
                            provider: format!("{:?}", self.provider),
                        })?;

                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&self.bucket)
                    .with_region(&self.region)
                    .with_endpoint(endpoint)
                    .with_virtual_hosted_style_request(false);

                if let (Some(key), Some(secret)) = (&self.access_key_id, &self.secret_access_key) {
                    builder = builder
                        .with_access_key_id(key)
                        .with_secret_access_key(secret);
                }

                Ok(Arc::new(builder.build()?))
            }

            StorageProvider::AwsS3 => {
                let mut builder = AmazonS3Builder::new()
                    .with_bucket_name(&self.bucket)
                    .with_region(&self.region);

                if let (Some(key), Some(secret)) = (&self.access_key_id, &self.secret_access_key) {
                    builder = builder
                        .with_access_key_id(key)
                        .with_secret_access_key(secret);
                }

                Ok(Arc::new(builder.build()?))
            }

            StorageProvider::Local => {
                let root = PathBuf::from(&self.bucket);
                std::fs::create_dir_all(&root).map_err(|e| ConfigError::PrepareDirectory {
                    path: root.clone(),
                    source: e,
                })?;
                Ok(Arc::new(LocalFileSystem::new_with_prefix(&root)?))
            }
        }
    }
}
