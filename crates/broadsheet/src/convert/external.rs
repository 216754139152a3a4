//! Strategies backed by external command-line rasterizers.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::join_all;
use tokio::process::Command as TokioCommand;

use super::{collect_pages, RasterStrategy, RenderPlan};
use crate::error::ConvertError;

/// Resolution for the batched fast path.
const FAST_DPI: u32 = 150;
/// Resolution for the whole-document fallback tools.
const FALLBACK_DPI: u32 = 300;
/// Pages handed to one `pdftoppm` invocation.
const BATCH_PAGES: usize = 4;
/// Hard cap on a single tool invocation.
const TOOL_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs `tool` to completion, treating a missing binary, a non-zero
/// exit, and a timeout as distinct errors. The child is killed if the
/// deadline expires.
async fn run_tool(tool: &str, args: &[String]) -> Result<(), ConvertError> {
    run_tool_bounded(tool, args, TOOL_TIMEOUT).await
}

async fn run_tool_bounded(
    tool: &str,
    args: &[String],
    deadline: Duration,
) -> Result<(), ConvertError> {
    let mut cmd = TokioCommand::new(tool);
    cmd.args(args).kill_on_drop(true);

    let output = match tokio::time::timeout(deadline, cmd.output()).await {
        Ok(result) => result.map_err(|source| ConvertError::Spawn {
            tool: tool.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ConvertError::Timeout {
                tool: tool.to_string(),
                seconds: deadline.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ConvertError::ToolFailed {
            tool: tool.to_string(),
            detail,
        });
    }
    Ok(())
}

/// Splits `1..=page_count` into inclusive ranges of at most `batch` pages.
fn batch_ranges(page_count: usize, batch: usize) -> Vec<(usize, usize)> {
    let batch = batch.max(1);
    let mut ranges = Vec::new();
    let mut first = 1;
    while first <= page_count {
        let last = (first + batch - 1).min(page_count);
        ranges.push((first, last));
        first = last + 1;
    }
    ranges
}

/// Fast path: one `pdftoppm` process per page batch, batches running
/// concurrently at moderate resolution.
///
/// Batches settle independently; a failing batch is logged and does not
/// abort its siblings. Whatever pages the surviving batches wrote are
/// returned, and only a fully empty output directory counts as failure.
pub struct BatchedPdftoppm {
    batch_pages: usize,
}

impl BatchedPdftoppm {
    pub fn new() -> Self {
        Self {
            batch_pages: BATCH_PAGES,
        }
    }
}

impl Default for BatchedPdftoppm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterStrategy for BatchedPdftoppm {
    fn name(&self) -> &'static str {
        "batched-pdftoppm"
    }

    async fn run(&self, plan: &RenderPlan) -> Result<Vec<PathBuf>, ConvertError> {
        let pdf = plan.pdf_path.to_string_lossy().into_owned();
        let out_prefix = plan.pages_dir.join("fast").to_string_lossy().into_owned();

        let batches = batch_ranges(plan.page_count, self.batch_pages.min(plan.page_count));
        let jobs = batches.into_iter().map(|(first, last)| {
            let args = vec![
                "-jpeg".to_string(),
                "-r".to_string(),
                FAST_DPI.to_string(),
                "-f".to_string(),
                first.to_string(),
                "-l".to_string(),
                last.to_string(),
                pdf.clone(),
                out_prefix.clone(),
            ];
            async move {
                let outcome = run_tool("pdftoppm", &args).await;
                if let Err(ref error) = outcome {
                    tracing::warn!(%error, first, last, "pdftoppm batch failed");
                }
                outcome
            }
        });

        let outcomes = join_all(jobs).await;
        let produced = collect_pages(&plan.pages_dir, "fast", "jpg")?;
        if produced.is_empty() {
            if let Some(error) = outcomes.into_iter().filter_map(Result::err).last() {
                return Err(error);
            }
        }
        Ok(produced)
    }
}

/// Whole-document fallbacks tried one tool at a time at higher
/// resolution. The first tool that writes at least one page wins.
pub struct FallbackTools;

impl FallbackTools {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FallbackTools {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterStrategy for FallbackTools {
    fn name(&self) -> &'static str {
        "fallback-tools"
    }

    async fn run(&self, plan: &RenderPlan) -> Result<Vec<PathBuf>, ConvertError> {
        let pdf = plan.pdf_path.to_string_lossy().into_owned();
        let dir = &plan.pages_dir;
        let dpi = FALLBACK_DPI.to_string();

        // Each entry is the tool binary, which doubles as the output
        // filename prefix scanned afterwards.
        let attempts: Vec<(&'static str, Vec<String>)> = vec![
            (
                "pdftocairo",
                vec![
                    "-jpeg".to_string(),
                    "-r".to_string(),
                    dpi.clone(),
                    pdf.clone(),
                    dir.join("pdftocairo").to_string_lossy().into_owned(),
                ],
            ),
            (
                "mutool",
                vec![
                    "draw".to_string(),
                    "-r".to_string(),
                    dpi.clone(),
                    "-o".to_string(),
                    dir.join("mutool-%d.jpg").to_string_lossy().into_owned(),
                    pdf.clone(),
                ],
            ),
            (
                "gs",
                vec![
                    "-dBATCH".to_string(),
                    "-dNOPAUSE".to_string(),
                    "-dSAFER".to_string(),
                    "-sDEVICE=jpeg".to_string(),
                    format!("-r{FALLBACK_DPI}"),
                    "-o".to_string(),
                    dir.join("gs-%03d.jpg").to_string_lossy().into_owned(),
                    pdf.clone(),
                ],
            ),
        ];

        let mut last_error: Option<ConvertError> = None;
        for (tool, args) in attempts {
            match run_tool(tool, &args).await {
                Ok(()) => {
                    let produced = collect_pages(dir, tool, "jpg")?;
                    if !produced.is_empty() {
                        tracing::info!(tool, pages = produced.len(), "fallback tool succeeded");
                        return Ok(produced);
                    }
                    tracing::warn!(tool, "fallback tool exited cleanly but wrote no pages");
                    last_error = Some(ConvertError::NoOutput {
                        strategy: tool.to_string(),
                    });
                }
                Err(error) => {
                    tracing::warn!(tool, %error, "fallback tool failed");
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) => Err(error),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_cover_all_pages_without_overlap() {
        assert_eq!(batch_ranges(10, 4), vec![(1, 4), (5, 8), (9, 10)]);
        assert_eq!(batch_ranges(4, 4), vec![(1, 4)]);
        assert_eq!(batch_ranges(3, 4), vec![(1, 3)]);
        assert_eq!(batch_ranges(1, 4), vec![(1, 1)]);
        assert_eq!(batch_ranges(0, 4), Vec::<(usize, usize)>::new());
    }

    #[test]
    fn test_ranges_tolerate_zero_batch_size() {
        assert_eq!(batch_ranges(2, 0), vec![(1, 1), (2, 2)]);
    }

    #[tokio::test]
    async fn test_missing_binary_reports_spawn_error() {
        let err = run_tool("definitely-not-a-real-tool-7141", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_nonzero_exit_reports_tool_failure_with_stderr() {
        let args = vec!["-c".to_string(), "echo nope >&2; exit 3".to_string()];
        let err = run_tool("sh", &args).await.unwrap_err();
        match err {
            ConvertError::ToolFailed { detail, .. } => assert_eq!(detail, "nope"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_hung_tool_times_out() {
        let args = vec!["5".to_string()];
        let err = run_tool_bounded("sleep", &args, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_batched_strategy_fails_on_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let plan = RenderPlan {
            pdf_path: dir.path().join("missing.pdf"),
            page_count: 3,
            pages_dir: dir.path().to_path_buf(),
        };
        assert!(BatchedPdftoppm::new().run(&plan).await.is_err());
    }

    #[tokio::test]
    async fn test_fallback_strategy_fails_on_unreadable_input() {
        let dir = tempfile::tempdir().unwrap();
        let plan = RenderPlan {
            pdf_path: dir.path().join("missing.pdf"),
            page_count: 3,
            pages_dir: dir.path().to_path_buf(),
        };
        assert!(FallbackTools::new().run(&plan).await.is_err());
    }
}
