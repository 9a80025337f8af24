//! Error types for the edgequake-pdf2image library.
//!
//! A single fatal error type, [`Pdf2ImageError`], covers every way a run can
//! stop: a malformed host payload, a non-PDF input, a failed download, an
//! unparseable document or a page that cannot be rasterised. Errors are
//! raised where they happen and travel up unchanged to the tool entry point
//! ([`crate::tool::Pdf2ImageTool`]), which is the only place that turns them
//! into an output event.
//!
//! [`Pdf2ImageError::kind`] gives each variant a stable machine-readable tag
//! so hosts can branch on the failure class without parsing messages.

use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2image library.
#[derive(Debug, Error)]
pub enum Pdf2ImageError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// A file reference is missing a required field.
    #[error("Malformed file reference: '{field}' {detail}")]
    MalformedReference { field: &'static str, detail: String },

    /// The host payload could not be read as tool parameters at all.
    #[error("Invalid tool parameters: {0}")]
    InvalidParameters(String),

    /// An input file's declared MIME type is not `application/pdf`.
    #[error("File '{filename}' has type '{mime_type}'; only application/pdf is supported")]
    UnsupportedFileType { filename: String, mime_type: String },

    // ── Download errors ───────────────────────────────────────────────────
    /// Transport error or non-success HTTP status.
    #[error("Failed to download '{filename}' from '{url}': {reason}")]
    DownloadFailed {
        filename: String,
        url: String,
        reason: String,
    },

    /// The request exceeded the configured timeout.
    #[error("Download of '{filename}' timed out after {secs}s ({url})")]
    DownloadTimeout {
        filename: String,
        url: String,
        secs: u64,
    },

    /// The server answered with an empty body.
    #[error("Download of '{filename}' from '{url}' returned no data")]
    EmptyDownload { filename: String, url: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The downloaded bytes could not be opened as a PDF document.
    #[error("PDF could not be opened: {detail}")]
    DocumentOpen { detail: String },

    /// A single page failed to rasterise or encode. `page` is 1-indexed.
    #[error("Rendering failed on page {page}: {detail}")]
    PageRender { page: usize, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
working directory, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Pdf2ImageError {
    /// Stable snake_case tag for the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            Pdf2ImageError::MalformedReference { .. } => "malformed_reference",
            Pdf2ImageError::InvalidParameters(_) => "invalid_parameters",
            Pdf2ImageError::UnsupportedFileType { .. } => "unsupported_file_type",
            Pdf2ImageError::DownloadFailed { .. }
            | Pdf2ImageError::DownloadTimeout { .. }
            | Pdf2ImageError::EmptyDownload { .. } => "download_failed",
            Pdf2ImageError::DocumentOpen { .. } => "document_open_failed",
            Pdf2ImageError::PageRender { .. } => "page_render_failed",
            Pdf2ImageError::InvalidConfig(_) => "invalid_config",
            Pdf2ImageError::PdfiumBindingFailed(_) => "engine_unavailable",
            Pdf2ImageError::Internal(_) => "internal",
        }
    }
}
