//! Rasterizer: PDF bytes → one encoded image per page, all or nothing.
//!
//! Pages are rendered strictly in order. The first page that fails to
//! render or encode aborts the document; images already produced for it
//! are dropped, never returned. The document is closed on every path by
//! [`PdfEngine::with_document`].

use crate::config::OutputFormat;
use crate::error::Pdf2ImageError;
use crate::pipeline::encode;
use crate::pipeline::render::PdfEngine;
use std::sync::Arc;
use tracing::debug;

/// Render every page of `bytes` at `dpi` and encode it as `format`.
///
/// Blocking: pdfium is CPU-bound and not async-aware. Use [`convert`] from
/// async code.
pub fn convert_blocking(
    engine: &dyn PdfEngine,
    bytes: &[u8],
    dpi: u32,
    format: OutputFormat,
) -> Result<Vec<Vec<u8>>, Pdf2ImageError> {
    let mut images = Vec::new();

    engine.with_document(bytes, &mut |doc| {
        let total_pages = doc.page_count();
        images.reserve(total_pages);

        for index in 0..total_pages {
            let page = index + 1;
            let image = doc.render_page(index, dpi)?;
            let data = encode::encode_image(&image, format).map_err(|e| {
                Pdf2ImageError::PageRender {
                    page,
                    detail: format!("Image encoding failed: {}", e),
                }
            })?;
            debug!("Page {}/{} → {} bytes", page, total_pages, data.len());
            images.push(data);
        }
        Ok(())
    })?;

    Ok(images)
}

/// Async wrapper running [`convert_blocking`] on Tokio's blocking pool.
pub async fn convert(
    engine: Arc<dyn PdfEngine>,
    bytes: Vec<u8>,
    dpi: u32,
    format: OutputFormat,
) -> Result<Vec<Vec<u8>>, Pdf2ImageError> {
    tokio::task::spawn_blocking(move || convert_blocking(engine.as_ref(), &bytes, dpi, format))
        .await
        .map_err(|e| Pdf2ImageError::Internal(format!("Render task panicked: {}", e)))?
}
