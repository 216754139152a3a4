//! Application state for the broadsheet API

use std::path::PathBuf;

use anyhow::Result;
use chrono::FixedOffset;

use broadsheet::{AppConfig, ConversionWorkspace, Database, IngestPipeline, MediaStore};

pub struct AppState {
    pub pipeline: IngestPipeline,
    pub db: Database,
    pub media: MediaStore,
    pub display_offset: FixedOffset,
    /// Directory mounted under `/uploads` when storage is local.
    pub local_media_root: Option<PathBuf>,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let workspace = ConversionWorkspace::new(&config.scratch_dir);
        workspace.ensure()?;
        // Jobs interrupted by a crash leave scratch directories behind.
        workspace.sweep_orphans();

        let db = Database::open(&config.db_path)?;
        let media = MediaStore::from_config(&config.storage, &config.public_url)?;

        let pipeline = IngestPipeline::new(
            workspace,
            media.clone(),
            db.clone(),
            config.display_offset,
        );

        Ok(Self {
            pipeline,
            db,
            media,
            display_offset: config.display_offset,
            local_media_root: config.storage.local_root(),
        })
    }
}
