//! PDF rasterization strategies.
//!
//! A conversion job walks an ordered chain of [`RasterStrategy`]
//! implementations until one produces page images. Earlier entries are
//! faster but depend on external tools; the final entry synthesizes
//! placeholder pages and cannot realistically fail, so a job always ends
//! with one image per page.

mod external;
mod placeholder;
mod renderer;

pub use external::{BatchedPdftoppm, FallbackTools};
pub use placeholder::PlaceholderSynth;
pub use renderer::InProcessRenderer;

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;

use crate::error::ConvertError;

/// Everything a strategy needs to render one document.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    /// Source PDF inside the job workspace.
    pub pdf_path: PathBuf,
    /// Page count reported by validation.
    pub page_count: usize,
    /// Directory the strategy writes page images into.
    pub pages_dir: PathBuf,
}

/// One way of turning a PDF into page images.
///
/// Implementations must return the produced files in page order and
/// must not assume any prior strategy ran; each gets the same plan.
#[async_trait]
pub trait RasterStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Render all pages, returning the image paths in page order.
    async fn run(&self, plan: &RenderPlan) -> Result<Vec<PathBuf>, ConvertError>;
}

/// The production strategy chain, fastest first.
pub fn default_strategies() -> Vec<Box<dyn RasterStrategy>> {
    vec![
        Box::new(BatchedPdftoppm::new()),
        Box::new(FallbackTools::new()),
        Box::new(InProcessRenderer::new()),
        Box::new(PlaceholderSynth::new()),
    ]
}

/// Runs the default chain against `plan`.
pub async fn rasterize(plan: &RenderPlan) -> Result<Vec<PathBuf>, ConvertError> {
    rasterize_with(&default_strategies(), plan).await
}

/// Walks `strategies` in order and returns the first non-empty result.
///
/// A strategy that errors or produces no files is logged and skipped;
/// only when every strategy has failed does the last error surface.
pub async fn rasterize_with(
    strategies: &[Box<dyn RasterStrategy>],
    plan: &RenderPlan,
) -> Result<Vec<PathBuf>, ConvertError> {
    let mut last_error = ConvertError::NoOutput {
        strategy: "none".into(),
    };

    for strategy in strategies {
        tracing::debug!(strategy = strategy.name(), "attempting rasterization");
        match strategy.run(plan).await {
            Ok(files) if !files.is_empty() => {
                tracing::info!(
                    strategy = strategy.name(),
                    pages = files.len(),
                    "rasterization succeeded"
                );
                return Ok(files);
            }
            Ok(_) => {
                tracing::warn!(strategy = strategy.name(), "strategy produced no pages");
                last_error = ConvertError::NoOutput {
                    strategy: strategy.name().to_string(),
                };
            }
            Err(error) => {
                tracing::warn!(strategy = strategy.name(), %error, "strategy failed");
                last_error = error;
            }
        }
    }

    Err(last_error)
}

static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Extracts the page number from a rendered file name.
///
/// Tools differ in how they pad page counters, so ordering relies on the
/// first integer in the file stem rather than the lexical name.
pub fn page_number_of(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    PAGE_NUMBER.find(stem)?.as_str().parse().ok()
}

/// Collects files under `dir` matching `prefix` and `ext`, sorted by
/// page number. Files without a number sort last, by name.
///
/// The strict prefix/extension filter keeps one tool's output from
/// picking up files another tool (or a stale run) left behind.
pub(crate) fn collect_pages(
    dir: &Path,
    prefix: &str,
    ext: &str,
) -> Result<Vec<PathBuf>, ConvertError> {
    let scan_err = |source| ConvertError::ScanPages {
        path: dir.to_path_buf(),
        source,
    };

    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        let path = entry.path();
        let named_for_tool = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        let right_ext = path.extension().and_then(|e| e.to_str()) == Some(ext);
        if named_for_tool && right_ext && path.is_file() {
            found.push(path);
        }
    }

    found.sort_by(|a, b| match (page_number_of(a), page_number_of(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.file_name().cmp(&b.file_name()),
    });
    Ok(found)
}
