//! Environment-driven application configuration.
//!
//! All knobs are read once at startup. Missing variables fall back to
//! development defaults, so a bare `cargo run` serves from local disk.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;

use crate::error::ConfigError;
use crate::store::StorageConfig;

/// Default publication sweep period: once a day.
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Durable storage for page images.
    pub storage: StorageConfig,
    /// Public base URL under which stored objects are reachable.
    pub public_url: String,
    /// SQLite database file.
    pub db_path: PathBuf,
    /// Root of the per-job conversion scratch directories.
    pub scratch_dir: PathBuf,
    /// Timezone used for calendar-day bucketing of publication dates.
    pub display_offset: FixedOffset,
    /// Period of the publication sweep.
    pub sweep_interval: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Recognized variables:
    /// - `BROADSHEET_PUBLIC_URL`: public base for image URLs
    /// - `BROADSHEET_DB_PATH`: SQLite file path
    /// - `BROADSHEET_SCRATCH_DIR`: conversion scratch root
    /// - `BROADSHEET_TZ_OFFSET`: display timezone, `+HH:MM` form
    /// - `BROADSHEET_SWEEP_INTERVAL_SECS`: publication sweep period
    /// - plus the storage set, see [`StorageConfig::from_env`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let storage = StorageConfig::from_env()?;

        let public_url = std::env::var("BROADSHEET_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:3000/uploads".to_string())
            .trim_end_matches('/')
            .to_string();

        let db_path = std::env::var("BROADSHEET_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/broadsheet.db"));

        let scratch_dir = std::env::var("BROADSHEET_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("broadsheet"));

        let offset_str =
            std::env::var("BROADSHEET_TZ_OFFSET").unwrap_or_else(|_| "+00:00".to_string());
        let display_offset = offset_str
            .parse::<FixedOffset>()
            .map_err(|_| ConfigError::InvalidTimezone(offset_str))?;

        let sweep_interval = match std::env::var("BROADSHEET_SWEEP_INTERVAL_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                    name: "BROADSHEET_SWEEP_INTERVAL_SECS".to_string(),
                    value: raw.clone(),
                    reason: "expected a positive integer of seconds".to_string(),
                })?;
                Duration::from_secs(secs.max(1))
            }
            Err(_) => Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        };

        Ok(Self {
            storage,
            public_url,
            db_path,
            scratch_dir,
            display_offset,
            sweep_interval,
        })
    }
}
