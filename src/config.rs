//! Configuration types for PDF-to-image conversion.
//!
//! All tool behaviour is controlled through [`ToolConfig`], built via its
//! [`ToolConfigBuilder`]. The host supplies only the file list and the base
//! URL per invocation; everything else lives here and is shared read-only
//! across runs.

use crate::error::Pdf2ImageError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest DPI accepted by [`ToolConfigBuilder::build`].
pub const MAX_DPI: u32 = 1200;

/// Configuration for a PDF-to-image tool run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2image::{OutputFormat, ToolConfig};
///
/// let config = ToolConfig::builder()
///     .dpi(150)
///     .format(OutputFormat::Jpeg)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 150);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ToolConfigFields")]
pub struct ToolConfig {
    /// Rendering DPI applied to both axes. Default: 200.
    ///
    /// Output pixels per axis are `ceil(points * dpi / 72)`.
    pub dpi: u32,

    /// Image encoding of every emitted page. Default: PNG.
    pub format: OutputFormat,

    /// Per-request download timeout in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// What a failed file does to the rest of the batch. Default: abort.
    pub failure_policy: FailurePolicy,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            dpi: 200,
            format: OutputFormat::default(),
            download_timeout_secs: 60,
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl ToolConfig {
    /// Create a new builder for `ToolConfig`.
    pub fn builder() -> ToolConfigBuilder {
        ToolConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check the constraints enforced by [`ToolConfigBuilder::build`].
    ///
    /// Fields are public, so the tool re-checks any config it is handed.
    pub fn validate(&self) -> Result<(), Pdf2ImageError> {
        if self.dpi == 0 || self.dpi > MAX_DPI {
            return Err(Pdf2ImageError::InvalidConfig(format!(
                "DPI must be 1–{MAX_DPI}, got {}",
                self.dpi
            )));
        }
        if self.download_timeout_secs == 0 {
            return Err(Pdf2ImageError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(())
    }
}

/// Serde shape of [`ToolConfig`]; missing keys take the defaults.
#[derive(Deserialize)]
#[serde(default)]
struct ToolConfigFields {
    dpi: u32,
    format: OutputFormat,
    download_timeout_secs: u64,
    failure_policy: FailurePolicy,
}

impl Default for ToolConfigFields {
    fn default() -> Self {
        let c = ToolConfig::default();
        Self {
            dpi: c.dpi,
            format: c.format,
            download_timeout_secs: c.download_timeout_secs,
            failure_policy: c.failure_policy,
        }
    }
}

impl TryFrom<ToolConfigFields> for ToolConfig {
    type Error = Pdf2ImageError;

    fn try_from(f: ToolConfigFields) -> Result<Self, Self::Error> {
        ToolConfig::builder()
            .dpi(f.dpi)
            .format(f.format)
            .download_timeout_secs(f.download_timeout_secs)
            .failure_policy(f.failure_policy)
            .build()
    }
}

/// Builder for [`ToolConfig`].
#[derive(Debug)]
pub struct ToolConfigBuilder {
    config: ToolConfig,
}

impl ToolConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.config.format = format;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ToolConfig, Pdf2ImageError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding used for rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless PNG (default).
    #[default]
    Png,
    /// Baseline JPEG; the alpha channel is dropped before encoding.
    Jpeg,
}

impl OutputFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            OutputFormat::Png => image::ImageFormat::Png,
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Pdf2ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(Pdf2ImageError::InvalidConfig(format!(
                "Unsupported image format '{other}' (expected png or jpeg)"
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// How a per-file failure affects the rest of the batch.
///
/// Type validation happens before any file is touched and always rejects
/// the whole batch, whichever policy is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first download or conversion failure ends the run. (default)
    #[default]
    AbortBatch,
    /// A failed file emits its own error event; later files still run.
    ContinueBatch,
}
