use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;

use crate::convert::{self, RasterStrategy, RenderPlan};
use crate::db::{issue_repo, Database, Issue, NewIssue};
use crate::store::MediaStore;
use crate::validate;
use crate::workspace::ConversionWorkspace;

use super::context::IngestContext;
use super::error::IngestError;

/// One uploaded document plus its form metadata.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub bytes: Bytes,
    pub filename: String,
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub publication_date: Option<DateTime<Utc>>,
    pub external_video_link: Option<String>,
}

/// Drives one upload from raw bytes to a saved issue record.
pub struct IngestPipeline {
    workspace: ConversionWorkspace,
    media: MediaStore,
    db: Database,
    display_offset: FixedOffset,
    strategies: Vec<Box<dyn RasterStrategy>>,
}

impl IngestPipeline {
    /// Production constructor using the full strategy chain.
    pub fn new(
        workspace: ConversionWorkspace,
        media: MediaStore,
        db: Database,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            workspace,
            media,
            db,
            display_offset,
            strategies: convert::default_strategies(),
        }
    }

    /// Test constructor with an injected strategy chain.
    #[cfg(test)]
    pub fn with_strategies(
        workspace: ConversionWorkspace,
        media: MediaStore,
        db: Database,
        display_offset: FixedOffset,
        strategies: Vec<Box<dyn RasterStrategy>>,
    ) -> Self {
        Self {
            workspace,
            media,
            db,
            display_offset,
            strategies,
        }
    }

    /// Runs the full pipeline for one upload.
    /// Returns an (outcome, context) pair; the context carries whatever
    /// intermediate state existed when the run ended.
    ///
    /// Workspace cleanup is unconditional. It runs on every exit path,
    /// success or failure, before this method returns.
    pub async fn run(&self, upload: UploadJob) -> (Result<Issue, IngestError>, IngestContext) {
        let job_id = Uuid::new_v4().to_string();
        let title = upload
            .title
            .clone()
            .unwrap_or_else(|| title_from_filename(&upload.filename));
        let publication_date = upload.publication_date.unwrap_or_else(Utc::now);

        let mut ctx = IngestContext::new(
            job_id,
            upload.filename.clone(),
            title,
            publication_date,
            upload.external_video_link.clone(),
        );

        tracing::info!(
            job_id = %ctx.job_id,
            filename = %ctx.original_filename,
            "ingest started"
        );

        let result = self.run_steps(&upload, &mut ctx).await;

        match &result {
            Ok(issue) => tracing::info!(
                job_id = %ctx.job_id,
                issue_id = %issue.id,
                pages = issue.total_pages,
                "ingest completed"
            ),
            Err(error) => tracing::warn!(job_id = %ctx.job_id, %error, "ingest failed"),
        }

        if let Some(job) = ctx.workspace.as_ref() {
            job.cleanup().await;
        }

        (result, ctx)
    }

    async fn run_steps(
        &self,
        upload: &UploadJob,
        ctx: &mut IngestContext,
    ) -> Result<Issue, IngestError> {
        self.step_check_upload(upload)?;

        let job = self.workspace.begin_job(&ctx.job_id)?;
        let source = job.write_source(&upload.filename, &upload.bytes).await;
        let pages_dir = job.pages_dir().to_path_buf();
        // Parked in the context before the write result is inspected, so
        // cleanup covers a failed write too.
        ctx.workspace = Some(job);
        let source_path = source?;
        ctx.source_path = Some(source_path.clone());

        let page_count = validate::validate_pdf(&upload.bytes)?;
        ctx.page_count = Some(page_count);

        let plan = RenderPlan {
            pdf_path: source_path,
            page_count,
            pages_dir,
        };
        let files = convert::rasterize_with(&self.strategies, &plan).await?;
        ctx.page_files = files.clone();

        let urls = self.media.upload_pages(&files).await?;
        ctx.page_urls = urls.clone();

        let issue = issue_repo::insert(
            &self.db,
            NewIssue {
                title: ctx.title.clone(),
                original_filename: ctx.original_filename.clone(),
                page_image_urls: urls,
                publication_date: ctx.publication_date,
                external_video_link: ctx.external_video_link.clone(),
            },
            &self.display_offset,
        )?;
        ctx.issue = Some(issue.clone());

        Ok(issue)
    }

    /// Rejects requests with no usable PDF before any scratch space is
    /// provisioned. A PDF declaration in either the content type or the
    /// filename extension is accepted.
    fn step_check_upload(&self, upload: &UploadJob) -> Result<(), IngestError> {
        if upload.bytes.is_empty() {
            return Err(IngestError::InvalidUpload(
                "Uploaded file is empty".to_string(),
            ));
        }

        let declared_pdf = upload
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.eq_ignore_ascii_case("application/pdf"));
        let named_pdf = mime_guess::from_path(&upload.filename)
            .first()
            .is_some_and(|m| m == mime_guess::mime::APPLICATION_PDF);

        if !declared_pdf && !named_pdf {
            return Err(IngestError::InvalidUpload(format!(
                "Only PDF uploads are accepted, got '{}'",
                upload.content_type.as_deref().unwrap_or("unknown")
            )));
        }
        Ok(())
    }
}

fn title_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .trim();
    if stem.is_empty() {
        "Untitled issue".to_string()
    } else {
        stem.to_string()
    }
}
