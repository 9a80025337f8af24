//! PDF rasterisation engine: open a document and render pages to images.
//!
//! The engine sits behind [`PdfEngine`] so the rest of the pipeline never
//! touches pdfium directly. Documents are only reachable inside
//! [`PdfEngine::with_document`], which closes them when the closure
//! returns, whether it succeeded, failed, or panicked.
//!
//! ## Pixel size
//!
//! PDF pages are measured in points (1/72 inch). A page is rendered at
//! `ceil(points * dpi / 72)` pixels per axis; see [`pixel_dimensions`].

use crate::error::Pdf2ImageError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// An open PDF document.
pub trait PdfDocumentHandle {
    fn page_count(&self) -> usize;

    /// Render the page at 0-based `index`. Failures are reported as
    /// [`Pdf2ImageError::PageRender`] with the 1-indexed page number.
    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage, Pdf2ImageError>;
}

/// Callback run against an open document.
pub type DocumentFn<'f> = dyn FnMut(&dyn PdfDocumentHandle) -> Result<(), Pdf2ImageError> + 'f;

/// Opens PDF bytes for rendering.
pub trait PdfEngine: Send + Sync {
    /// Open `bytes`, run `f` against the document, then close it.
    ///
    /// Bytes that cannot be parsed as a PDF fail with
    /// [`Pdf2ImageError::DocumentOpen`] and `f` is never called.
    fn with_document(&self, bytes: &[u8], f: &mut DocumentFn<'_>) -> Result<(), Pdf2ImageError>;
}

/// Output size in pixels for a page of `width_pt` × `height_pt` points.
pub fn pixel_dimensions(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let scale = dpi as f64 / 72.0;
    let px = |pt: f32| ((pt as f64 * scale).ceil() as u32).max(1);
    (px(width_pt), px(height_pt))
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// [`PdfEngine`] backed by the pdfium C++ library via `pdfium-render`.
///
/// Library lookup order: `PDFIUM_LIB_PATH`, then the working directory,
/// then the system library path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Locate pdfium and check it can be bound.
    pub fn new() -> Result<Self, Pdf2ImageError> {
        let engine = Self {
            library_path: std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from),
        };
        engine.bind()?;
        Ok(engine)
    }

    /// Use the pdfium library at an explicit path.
    pub fn from_library_path(path: impl Into<PathBuf>) -> Result<Self, Pdf2ImageError> {
        let engine = Self {
            library_path: Some(path.into()),
        };
        engine.bind()?;
        Ok(engine)
    }

    fn bind(&self) -> Result<Pdfium, Pdf2ImageError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| Pdf2ImageError::PdfiumBindingFailed(format!("{:?}", e)))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PdfEngine for PdfiumEngine {
    fn with_document(&self, bytes: &[u8], f: &mut DocumentFn<'_>) -> Result<(), Pdf2ImageError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(open_error)?;
        let handle = PdfiumDocument { document };
        info!("PDF loaded: {} pages", handle.page_count());

        let result = f(&handle);
        drop(handle);
        result
    }
}

fn open_error(e: PdfiumError) -> Pdf2ImageError {
    let err_str = format!("{:?}", e);
    let detail = if err_str.contains("FormatError") {
        format!("not a valid PDF document ({err_str})")
    } else if err_str.contains("Password") || err_str.contains("password") {
        format!("document is password-protected ({err_str})")
    } else {
        err_str
    };
    Pdf2ImageError::DocumentOpen { detail }
}

struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl Drop for PdfiumDocument<'_> {
    fn drop(&mut self) {
        debug!("Closing PDF document");
    }
}

impl PdfDocumentHandle for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn render_page(&self, index: usize, dpi: u32) -> Result<DynamicImage, Pdf2ImageError> {
        let render_error = |detail: String| Pdf2ImageError::PageRender {
            page: index + 1,
            detail,
        };

        let page_index = index
            .try_into()
            .map_err(|_| render_error(format!("page index {index} out of range")))?;
        let page = self
            .document
            .pages()
            .get(page_index)
            .map_err(|e| render_error(format!("{:?}", e)))?;

        let (width, height) = pixel_dimensions(page.width().value, page.height().value, dpi);
        let render_config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_target_height(height as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_error(format!("{:?}", e)))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            index + 1,
            image.width(),
            image.height()
        );
        Ok(image)
    }
}
