pub mod context;
pub mod error;
pub mod runner;

pub use context::IngestContext;
pub use error::IngestError;
pub use runner::{IngestPipeline, UploadJob};
