use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::db::Issue;
use crate::workspace::JobWorkspace;

/// Everything accumulated while ingesting one uploaded document.
pub struct IngestContext {
    // Input
    pub job_id: String,
    pub original_filename: String,
    pub title: String,
    pub publication_date: DateTime<Utc>,
    pub external_video_link: Option<String>,

    // Set once the job directory exists; cleaned up unconditionally
    pub workspace: Option<JobWorkspace>,

    // Where the uploaded PDF was written
    pub source_path: Option<PathBuf>,

    // Page count reported by validation
    pub page_count: Option<usize>,

    // Page images produced by the winning strategy, in page order
    pub page_files: Vec<PathBuf>,

    // Public URLs after persistence, in page order
    pub page_urls: Vec<String>,

    // The saved record
    pub issue: Option<Issue>,
}

impl IngestContext {
    pub fn new(
        job_id: String,
        original_filename: String,
        title: String,
        publication_date: DateTime<Utc>,
        external_video_link: Option<String>,
    ) -> Self {
        Self {
            job_id,
            original_filename,
            title,
            publication_date,
            external_video_link,
            workspace: None,
            source_path: None,
            page_count: None,
            page_files: Vec::new(),
            page_urls: Vec::new(),
            issue: None,
        }
    }
}
