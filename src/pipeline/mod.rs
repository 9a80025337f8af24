//! Pipeline stages for PDF-to-image conversion.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested alone and the engine or transport swapped without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! fetch ──▶ render ──▶ encode
//! (HTTP)    (pdfium)   (PNG/JPEG)
//!       └── rasterize ───┘
//! ```
//!
//! 1. [`fetch`]     resolve the host-relative URL and download the bytes
//! 2. [`render`]    the [`render::PdfEngine`] seam and its pdfium backend
//! 3. [`encode`]    pixel grid → PNG or JPEG bytes
//! 4. [`rasterize`] drives render + encode over every page, fail-fast

pub mod encode;
pub mod fetch;
pub mod rasterize;
pub mod render;
