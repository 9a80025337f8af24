//! # edgequake-pdf2image
//!
//! Download remotely hosted PDF documents and rasterise every page to an
//! image, streaming status messages and images back to a plugin host.
//!
//! ## Pipeline Overview
//!
//! ```text
//! host payload
//!  │
//!  ├─ 1. Validate  every file must be application/pdf, or the batch is rejected
//!  ├─ 2. Fetch     resolve host-relative URL, HTTP GET with a fixed timeout
//!  ├─ 3. Render    rasterise each page via pdfium at the configured DPI
//!  ├─ 4. Encode    PNG (default) or JPEG
//!  └─ 5. Emit      status text, one blob per page, or a single error event
//! ```
//!
//! Files are processed one at a time in input order. A failure stops the
//! whole batch by default; a document whose page 7 fails yields no images
//! at all, even though pages 1–6 rendered.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2image::{CollectingSink, Pdf2ImageTool, ToolConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tool = Pdf2ImageTool::new(ToolConfig::default())?;
//!     let sink = CollectingSink::new();
//!     tool.invoke_value(
//!         json!({
//!             "pdf_files": [{
//!                 "filename": "report.pdf",
//!                 "url": "/files/report.pdf",
//!                 "mime_type": "application/pdf"
//!             }],
//!             "host_url": "http://127.0.0.1"
//!         }),
//!         &sink,
//!     )
//!     .await?;
//!     for event in sink.into_events() {
//!         println!("{}", serde_json::to_string(&event)?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2image` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## PDFium
//!
//! Rendering needs the pdfium shared library at runtime. Set
//! `PDFIUM_LIB_PATH` to its location, place it in the working directory,
//! or install it on the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod reference;
pub mod sink;
pub mod tool;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{FailurePolicy, OutputFormat, ToolConfig, ToolConfigBuilder};
pub use error::Pdf2ImageError;
pub use output::{BlobMeta, EncodedImage, RunSummary, ToolEvent};
pub use pipeline::fetch::{resolve_url, Fetcher, HttpFetcher};
pub use pipeline::rasterize::{convert, convert_blocking};
pub use pipeline::render::{DocumentFn, PdfDocumentHandle, PdfEngine, PdfiumEngine};
pub use reference::{FileReference, ToolParameters, PDF_MIME_TYPE};
pub use sink::{ChannelSink, CollectingSink, DirectorySink, OutputSink};
pub use tool::{Pdf2ImageTool, ToolEventStream};
