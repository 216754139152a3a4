use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BroadsheetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Validation error: {0}")]
    Validate(#[from] ValidateError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown storage provider: {0}")]
    UnknownProvider(String),

    #[error("Missing endpoint for storage provider '{provider}'")]
    MissingEndpoint { provider: String },

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid timezone offset '{0}': expected +HH:MM or -HH:MM")]
    InvalidTimezone(String),

    #[error("Failed to prepare directory '{path}': {source}")]
    PrepareDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build object store backend: {0}")]
    StorageBackend(#[from] object_store::Error),
}

/// Errors preparing or writing into a job's scratch directory. Always fatal
/// for the job in question.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to reset job directory '{path}': {source}")]
    ResetJob {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write uploaded file '{path}': {source}")]
    WriteSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from inspecting an uploaded PDF before any conversion work.
#[derive(Error, Debug)]
pub enum ValidateError {
    #[error("Failed to parse PDF structure: {0}")]
    InvalidDocument(String),

    #[error("PDF contains no pages")]
    EmptyDocument,
}

/// Errors from the rasterization strategies. All of these are soft inside
/// the chain (logged, next strategy tried) except `WriteImage`, which means
/// the pages directory itself is unusable.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Failed to spawn '{tool}': {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{tool}' exited with failure: {detail}")]
    ToolFailed { tool: String, detail: String },

    #[error("'{tool}' did not finish within {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("In-process rendering failed: {0}")]
    Renderer(String),

    #[error("Strategy '{strategy}' produced no output files")]
    NoOutput { strategy: String },

    #[error("Failed to scan pages directory '{path}': {source}")]
    ScanPages {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write page image '{path}': {source}")]
    WriteImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode page image: {0}")]
    EncodeImage(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read page image '{path}': {source}")]
    ReadImage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to upload object '{key}': {source}")]
    Put {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Failed to delete object '{key}': {source}")]
    Delete {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("URL '{0}' does not belong to this store")]
    ForeignUrl(String),
}

pub type Result<T> = std::result::Result<T, BroadsheetError>;
