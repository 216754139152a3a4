//! Ingestion error types.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::error::{ConvertError, StoreError, ValidateError, WorkspaceError};

/// Errors that abort an ingestion job.
///
/// Soft conversion failures never appear here; the strategy chain
/// absorbs them. `Conversion` only surfaces when every strategy failed,
/// placeholder synthesis included.
#[derive(Error, Debug)]
pub enum IngestError {
    /// No usable file in the request, or not a PDF.
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    /// The document could not be parsed or has no pages.
    #[error("Document validation failed: {0}")]
    Validation(#[from] ValidateError),

    /// Scratch directory provisioning or source write failed.
    #[error("Workspace failure: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Every rasterization strategy failed.
    #[error("Conversion failed: {0}")]
    Conversion(#[from] ConvertError),

    /// Durable storage rejected a page upload.
    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),

    /// The issue record could not be saved.
    #[error("Could not save issue record: {0}")]
    Record(#[from] DatabaseError),
}
