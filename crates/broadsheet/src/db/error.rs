//! Errors from the issue database.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    /// The calendar-day slot is taken; at most one issue per day.
    #[error("An issue is already scheduled for {day}")]
    DuplicateDay { day: String },

    /// Underlying rusqlite failure.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Could not create the database file's parent directories.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A schema migration did not apply cleanly.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// A previous holder of the connection lock panicked.
    #[error("Database lock poisoned")]
    LockPoisoned,
}
