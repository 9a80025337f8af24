//! Output types: rendered page images and the events handed to the host.
//!
//! The host output channel understands three event kinds (plain status
//! text, a structured JSON result and a binary blob with metadata), which
//! map one-to-one onto [`ToolEvent`]'s variants. Events serialise to JSON
//! (blob bytes as base64) so the CLI can print them as JSON lines.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Serialize, Serializer};

/// One rendered and encoded page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// 1-indexed page number.
    pub page: usize,
    /// `{filename}_page{N}.{ext}`.
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl From<EncodedImage> for ToolEvent {
    fn from(image: EncodedImage) -> Self {
        ToolEvent::Blob {
            data: image.data,
            meta: BlobMeta {
                file_name: image.file_name,
                mime_type: image.mime_type,
            },
        }
    }
}

/// Metadata attached to a blob event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobMeta {
    pub file_name: String,
    pub mime_type: String,
}

/// A single unit of tool output, delivered in emission order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolEvent {
    /// Human-readable status line.
    Text { text: String },
    /// Structured result; used for the terminal error report.
    Json { json: serde_json::Value },
    /// One produced image.
    Blob {
        #[serde(serialize_with = "serialize_base64")]
        data: Vec<u8>,
        meta: BlobMeta,
    },
}

impl ToolEvent {
    pub fn text(text: impl Into<String>) -> Self {
        ToolEvent::Text { text: text.into() }
    }

    pub fn json(json: serde_json::Value) -> Self {
        ToolEvent::Json { json }
    }

    pub fn is_blob(&self) -> bool {
        matches!(self, ToolEvent::Blob { .. })
    }

    /// `true` for the structured error report emitted when a run fails.
    pub fn is_error(&self) -> bool {
        match self {
            ToolEvent::Json { json } => {
                json.get("status").and_then(|s| s.as_str()) == Some("error")
            }
            _ => false,
        }
    }
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

/// What a completed run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Files whose every page was emitted.
    pub files_converted: usize,
    /// Files that failed under [`crate::config::FailurePolicy::ContinueBatch`].
    pub files_failed: usize,
    pub images_emitted: usize,
}
