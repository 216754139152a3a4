//! Terminal fallback: synthesized placeholder pages.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use image::{Rgb, RgbImage};

use super::{RasterStrategy, RenderPlan};
use crate::error::ConvertError;

/// A4 portrait at roughly 150 DPI.
const PAGE_W: u32 = 1240;
const PAGE_H: u32 = 1754;

const GLYPH_W: u32 = 5;
const GLYPH_H: u32 = 7;
/// Glyph cell width including one column of spacing.
const ADVANCE: u32 = GLYPH_W + 1;
/// Canvas pixels per font pixel.
const TEXT_SCALE: u32 = 6;

const INK: Rgb<u8> = Rgb([40, 40, 40]);

/// Synthesizes one diagnostic page image per expected page.
///
/// The message is drawn with a built-in 5x7 pixel font, so this path
/// needs no font files, no libraries beyond the image encoder, and no
/// external processes. It only fails if the disk itself refuses writes.
pub struct PlaceholderSynth;

impl PlaceholderSynth {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PlaceholderSynth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RasterStrategy for PlaceholderSynth {
    fn name(&self) -> &'static str {
        "placeholder"
    }

    async fn run(&self, plan: &RenderPlan) -> Result<Vec<PathBuf>, ConvertError> {
        let pages_dir = plan.pages_dir.clone();
        let page_count = plan.page_count;

        tokio::task::spawn_blocking(move || synthesize_all(&pages_dir, page_count))
            .await
            .map_err(|e| ConvertError::Renderer(format!("placeholder task panicked: {e}")))?
    }
}

fn synthesize_all(pages_dir: &Path, page_count: usize) -> Result<Vec<PathBuf>, ConvertError> {
    let _span = tracing::info_span!("convert.placeholder", pages = page_count).entered();

    let mut produced = Vec::with_capacity(page_count);
    for page in 1..=page_count {
        let out = pages_dir.join(format!("placeholder-{page:03}.jpg"));
        let mut canvas = RgbImage::from_pixel(PAGE_W, PAGE_H, Rgb([255, 255, 255]));
        draw_text(&mut canvas, &format!("Page {page} conversion failed"));
        canvas
            .save(&out)
            .map_err(|e| ConvertError::EncodeImage(e.to_string()))?;
        produced.push(out);
    }

    Ok(produced)
}

/// Draws `text` centered on the canvas. Characters without a glyph are
/// skipped; the table covers everything the diagnostic message uses.
fn draw_text(canvas: &mut RgbImage, text: &str) {
    let cols = text.chars().count() as u32;
    let text_w = cols * ADVANCE * TEXT_SCALE;
    let text_h = GLYPH_H * TEXT_SCALE;
    let x0 = canvas.width().saturating_sub(text_w) / 2;
    let y0 = canvas.height().saturating_sub(text_h) / 2;

    for (i, ch) in text.chars().enumerate() {
        let Some(rows) = glyph(ch) else { continue };
        let gx = x0 + i as u32 * ADVANCE * TEXT_SCALE;
        for (ry, row) in rows.iter().enumerate() {
            for rx in 0..GLYPH_W {
                if row & (1 << (GLYPH_W - 1 - rx)) != 0 {
                    fill_block(canvas, gx + rx * TEXT_SCALE, y0 + ry as u32 * TEXT_SCALE);
                }
            }
        }
    }
}

fn fill_block(canvas: &mut RgbImage, x: u32, y: u32) {
    for dy in 0..TEXT_SCALE {
        for dx in 0..TEXT_SCALE {
            let (px, py) = (x + dx, y + dy);
            if px < canvas.width() && py < canvas.height() {
                canvas.put_pixel(px, py, INK);
            }
        }
    }
}

/// 5x7 bitmap rows, bit 4 leftmost. Covers the diagnostic message and
/// any page number.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch {
        ' ' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'c' => [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'f' => [0x06, 0x09, 0x08, 0x1C, 0x08, 0x08, 0x08],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'l' => [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        'v' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04],
        _ => return None,
    };
    Some(rows)
}
