//! Durable storage for finished page images.
//!
//! Backed by `object_store`, so the same adapter serves a local uploads
//! directory in development and an S3-compatible bucket in production.

pub mod config;

pub use config::{StorageConfig, StorageProvider};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use futures_util::FutureExt;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};

use crate::error::{ConfigError, StoreError};
use crate::sanitize::sanitize_object_name;

/// Object key namespace for issue page images.
const COLLECTION: &str = "newspapers";

/// Page uploads in flight at once. Whole files are buffered in memory, so
/// the window bounds both memory and outbound bandwidth spikes.
const UPLOAD_WINDOW: usize = 2;

/// Writes page images to durable storage and hands back public URLs.
///
/// Cloning is cheap; clones share the underlying store client.
#[derive(Clone)]
pub struct MediaStore {
    store: Arc<dyn ObjectStore>,
    public_url: String,
}

impl MediaStore {
    pub fn new(store: Arc<dyn ObjectStore>, public_url: &str) -> Self {
        Self {
            store,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(storage: &StorageConfig, public_url: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(storage.build_object_store()?, public_url))
    }

    /// Upload finished page images in their given (page) order.
    ///
    /// Returns one public URL per input file, same order. Uploads run
    /// [`UPLOAD_WINDOW`] at a time; the window preserves ordering. Every
    /// key shares one timestamp prefix per call, so a whole issue groups
    /// together under `newspapers/`. Local files are deleted after their
    /// upload succeeds; a failed deletion is logged and ignored, the
    /// uploaded object is what matters.
    pub async fn upload_pages(&self, files: &[PathBuf]) -> Result<Vec<String>, StoreError> {
        let stamp = chrono::Utc::now().timestamp_millis();

        // Boxed and collected up front: a borrowing closure or opaque
        // future held inside `buffered` trips rustc's higher-ranked
        // auto-trait check (rust-lang/rust#102211) and the callers'
        // futures lose `Send`. The futures are inert until polled, so
        // eager construction changes nothing observable.
        let uploads: Vec<_> = files
            .iter()
            .map(|path| self.upload_one(stamp, path).boxed())
            .collect();

        stream::iter(uploads)
            .buffered(UPLOAD_WINDOW)
            .try_collect()
            .await
    }

    async fn upload_one(&self, stamp: i64, path: &Path) -> Result<String, StoreError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::ReadImage {
                path: path.to_path_buf(),
                source: e,
            })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("page.jpg");
        let key = self.key_for(stamp, filename);

        self.store
            .put(&key, PutPayload::from(Bytes::from(bytes)))
            .await
            .map_err(|e| StoreError::Put {
                key: key.to_string(),
                source: e,
            })?;

        if let Err(e) = tokio::fs::remove_file(path).await {
            log::warn!("Could not remove local page file {}: {}", path.display(), e);
        }

        Ok(self.url_for(&key))
    }

    /// Best-effort deletion of a previously returned public URL.
    ///
    /// An object that is already gone counts as deleted.
    pub async fn delete_by_url(&self, url: &str) -> Result<(), StoreError> {
        let prefix = format!("{}/", self.public_url);
        let key = url
            .strip_prefix(&prefix)
            .ok_or_else(|| StoreError::ForeignUrl(url.to_string()))?;

        let path = ObjectPath::from(key);
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(StoreError::Delete {
                key: path.to_string(),
                source: e,
            }),
        }
    }

    fn key_for(&self, stamp: i64, filename: &str) -> ObjectPath {
        ObjectPath::from(format!(
            "{}/{}-{}",
            COLLECTION,
            stamp,
            sanitize_object_name(filename)
        ))
    }

    fn url_for(&self, key: &ObjectPath) -> String {
        format!("{}/{}", self.public_url, key.as_ref())
    }
}
