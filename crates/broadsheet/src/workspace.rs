//! Job-scoped scratch directories for in-flight conversions.
//!
//! Every upload gets its own directory under the scratch root, keyed by the
//! job id, with a nested `pages/` directory for rasterizer output. Jobs own
//! their subtree exclusively; concurrent uploads never share files.

use std::path::{Path, PathBuf};

use crate::error::WorkspaceError;
use crate::sanitize::sanitize_object_name;

/// Handle on the scratch root. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ConversionWorkspace {
    root: PathBuf,
}

impl ConversionWorkspace {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the scratch root if absent. Safe to call repeatedly.
    pub fn ensure(&self) -> Result<(), WorkspaceError> {
        std::fs::create_dir_all(&self.root).map_err(|e| WorkspaceError::CreateDirectory {
            path: self.root.clone(),
            source: e,
        })
    }

    /// Provisions a fresh directory tree for one conversion job.
    ///
    /// A leftover directory under the same id (crashed previous run) is
    /// removed first, so a job always starts from an empty tree.
    pub fn begin_job(&self, job_id: &str) -> Result<JobWorkspace, WorkspaceError> {
        self.ensure()?;

        let dir = self.root.join(job_id);
        if dir.exists() {
            std::fs::remove_dir_all(&dir).map_err(|e| WorkspaceError::ResetJob {
                path: dir.clone(),
                source: e,
            })?;
        }

        let pages = dir.join("pages");
        std::fs::create_dir_all(&pages).map_err(|e| WorkspaceError::CreateDirectory {
            path: pages.clone(),
            source: e,
        })?;

        Ok(JobWorkspace { dir, pages })
    }

    /// Removes leftover job directories, typically at process startup.
    ///
    /// Jobs interrupted by a crash leave their tree behind; nothing else
    /// ever lives under the scratch root. Returns the number of directories
    /// removed; individual failures are logged and skipped.
    pub fn sweep_orphans(&self) -> usize {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => removed += 1,
                Err(e) => log::warn!(
                    "Could not remove orphaned job directory {}: {}",
                    path.display(),
                    e
                ),
            }
        }

        if removed > 0 {
            log::info!("Removed {} orphaned conversion job directories", removed);
        }
        removed
    }
}

/// Scratch directory tree owned by a single conversion job.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: PathBuf,
    pages: PathBuf,
}

impl JobWorkspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where rasterization strategies write their page images.
    pub fn pages_dir(&self) -> &Path {
        &self.pages
    }

    /// Writes the uploaded PDF into the job directory under a sanitized
    /// version of its original name and returns the path.
    pub async fn write_source(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, WorkspaceError> {
        let path = self.dir.join(sanitize_object_name(filename));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| WorkspaceError::WriteSource {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }

    /// Removes the whole job directory. Runs on every job exit path;
    /// failures are logged, never escalated, so cleanup cannot mask the
    /// job's own result.
    pub async fn cleanup(&self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Could not remove job directory {}: {}",
                    self.dir.display(),
                    e
                );
            }
        }
    }
}
