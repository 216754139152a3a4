//! In-process rendering through the Pdfium library.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use pdfium_render::prelude::*;

use super::{RasterStrategy, RenderPlan};
use crate::error::ConvertError;
use crate::sanitize::redact_path;

/// Scale factor applied to each page's native size.
const RENDER_SCALE: f32 = 2.0;

/// Renders pages with Pdfium, no external process involved.
///
/// Pages are rendered strictly in order onto a white canvas, so PDFs
/// with transparent backgrounds come out readable. Any Pdfium failure,
/// including the library not being installed, is reported as a soft
/// [`ConvertError::Renderer`] so the chain can move on.
pub struct InProcessRenderer {
    scale: f32,
}

impl InProcessRenderer {
    pub fn new() -> Self {
        Self {
            scale: RENDER_SCALE,
        }
    }
}

impl Default for InProcessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterStrategy for InProcessRenderer {
    fn name(&self) -> &'static str {
        "in-process"
    }

    async fn run(&self, plan: &RenderPlan) -> Result<Vec<PathBuf>, ConvertError> {
        let pdf_path = plan.pdf_path.clone();
        let pages_dir = plan.pages_dir.clone();
        let scale = self.scale;

        tokio::task::spawn_blocking(move || render_document(&pdf_path, &pages_dir, scale))
            .await
            .map_err(|e| ConvertError::Renderer(format!("render task panicked: {e}")))?
    }
}

fn render_document(
    pdf_path: &Path,
    pages_dir: &Path,
    scale: f32,
) -> Result<Vec<PathBuf>, ConvertError> {
    let _span = tracing::info_span!("convert.render", doc = %redact_path(pdf_path)).entered();

    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ConvertError::Renderer(format!("pdfium unavailable: {e}")))?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| ConvertError::Renderer(format!("failed to open document: {e}")))?;

    let pages = document.pages();
    let config = PdfRenderConfig::new().scale_page_by_factor(scale);

    let mut produced = Vec::with_capacity(pages.len() as usize);
    for index in 0..pages.len() {
        let page = pages
            .get(index)
            .map_err(|e| ConvertError::Renderer(format!("page {}: {e}", index + 1)))?;
        let rendered = page
            .render_with_config(&config)
            .map_err(|e| ConvertError::Renderer(format!("page {}: {e}", index + 1)))?
            .as_image()
            .to_rgba8();

        let out = pages_dir.join(format!("render-{:03}.jpg", index + 1));
        write_on_white(&rendered, &out)?;
        produced.push(out);
    }

    Ok(produced)
}

/// Flattens `rendered` onto an opaque white canvas and encodes it.
fn write_on_white(rendered: &RgbaImage, out: &Path) -> Result<(), ConvertError> {
    let mut canvas = RgbaImage::from_pixel(
        rendered.width(),
        rendered.height(),
        Rgba([255, 255, 255, 255]),
    );
    image::imageops::overlay(&mut canvas, rendered, 0, 0);

    DynamicImage::ImageRgba8(canvas)
        .to_rgb8()
        .save(out)
        .map_err(|e| ConvertError::EncodeImage(e.to_string()))
}
