pub mod config;
pub mod convert;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod publish;
pub mod sanitize;
pub mod store;
pub mod validate;
pub mod workspace;

pub use config::AppConfig;
pub use db::{Database, DatabaseError, Issue, NewIssue};
pub use error::{
    BroadsheetError, ConfigError, ConvertError, Result, StoreError, ValidateError, WorkspaceError,
};
pub use pipeline::{IngestError, IngestPipeline, UploadJob};
pub use publish::PublishScheduler;
pub use store::{MediaStore, StorageConfig, StorageProvider};
pub use workspace::ConversionWorkspace;
