//! Structural validation of uploaded PDFs.
//!
//! Runs before any rasterization work. The returned page count is the
//! authoritative expected output count for the whole conversion job.

use crate::error::ValidateError;

/// Parses the uploaded bytes and returns the page count.
///
/// Uses `lopdf`, which reads the object structure of owner-password
/// protected PDFs without decrypting stream contents, so page counting
/// stays possible for documents a viewer could still open.
pub fn validate_pdf(bytes: &[u8]) -> Result<usize, ValidateError> {
    let _span = tracing::info_span!("pipeline.validate", size = bytes.len()).entered();

    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| ValidateError::InvalidDocument(e.to_string()))?;

    let page_count = doc.get_pages().len();
    if page_count == 0 {
        return Err(ValidateError::EmptyDocument);
    }

    Ok(page_count)
}
