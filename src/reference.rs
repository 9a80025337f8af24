//! Host-supplied tool parameters and the file references inside them.
//!
//! The host hands the tool loosely-typed JSON. Everything is checked once,
//! here, so the rest of the crate only ever sees a [`FileReference`] with
//! its `filename` and `url` present. A missing field is a
//! [`Pdf2ImageError::MalformedReference`], never a panic further down.

use crate::config::OutputFormat;
use crate::error::Pdf2ImageError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The only MIME type accepted for input files.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// One input document as described by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReference {
    filename: String,
    url: String,
    mime_type: String,
}

impl FileReference {
    /// Build a reference, rejecting an empty `filename` or `url`.
    pub fn new(
        filename: impl Into<String>,
        url: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Result<Self, Pdf2ImageError> {
        let filename = filename.into();
        let url = url.into();
        if filename.trim().is_empty() {
            return Err(Pdf2ImageError::MalformedReference {
                field: "filename",
                detail: "is missing or empty".into(),
            });
        }
        if url.trim().is_empty() {
            return Err(Pdf2ImageError::MalformedReference {
                field: "url",
                detail: format!("is missing or empty for file '{filename}'"),
            });
        }
        Ok(Self {
            filename,
            url,
            mime_type: mime_type.into(),
        })
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME_TYPE
    }

    /// Name of the emitted image for a 1-indexed `page`:
    /// `{filename}_page{N}.{ext}`.
    pub fn output_name(&self, page: usize, format: OutputFormat) -> String {
        format!("{}_page{}.{}", self.filename, page, format.extension())
    }
}

/// Parameters of one tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolParameters {
    pub pdf_files: Vec<FileReference>,
    pub host_url: String,
}

impl ToolParameters {
    pub fn new(pdf_files: Vec<FileReference>, host_url: impl Into<String>) -> Self {
        Self {
            pdf_files,
            host_url: host_url.into(),
        }
    }

    /// Parse the host's JSON payload.
    ///
    /// `pdf_files` may be an array or a single object; the older singular
    /// key `pdf_file` is accepted too. `mime_type` may also be spelled
    /// `mimeType`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, Pdf2ImageError> {
        let raw: RawParameters = serde_json::from_value(value)
            .map_err(|e| Pdf2ImageError::InvalidParameters(e.to_string()))?;

        let files = match raw.pdf_files {
            Some(OneOrMany::Many(files)) => files,
            Some(OneOrMany::One(file)) => vec![file],
            None => {
                return Err(Pdf2ImageError::InvalidParameters(
                    "missing 'pdf_files'".into(),
                ))
            }
        };

        let pdf_files = files
            .into_iter()
            .map(RawFileReference::into_reference)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            pdf_files,
            host_url: raw.host_url.unwrap_or_default(),
        })
    }
}

// ── Wire shapes ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RawParameters {
    #[serde(default, alias = "pdf_file")]
    pdf_files: Option<OneOrMany>,
    #[serde(default)]
    host_url: Option<String>,
}

// `Many` first: a struct would also accept a JSON array positionally.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawFileReference>),
    One(RawFileReference),
}

// Objects only: a bare array must not be read positionally as one file.
#[derive(Deserialize)]
#[serde(try_from = "Map<String, Value>")]
struct RawFileReference(FileFields);

#[derive(Deserialize)]
struct FileFields {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default, alias = "mimeType")]
    mime_type: Option<String>,
}

impl TryFrom<Map<String, Value>> for RawFileReference {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        serde_json::from_value(Value::Object(map)).map(RawFileReference)
    }
}

impl RawFileReference {
    fn into_reference(self) -> Result<FileReference, Pdf2ImageError> {
        let RawFileReference(fields) = self;
        let filename = fields.filename.ok_or(Pdf2ImageError::MalformedReference {
            field: "filename",
            detail: "is missing".into(),
        })?;
        let url = fields.url.ok_or_else(|| Pdf2ImageError::MalformedReference {
            field: "url",
            detail: format!("is missing for file '{filename}'"),
        })?;
        FileReference::new(filename, url, fields.mime_type.unwrap_or_default())
    }
}
