//! Tool entry point: validate the batch, convert each file, emit events.
//!
//! A run has three phases:
//!
//! 1. **Validate**: every reference must be `application/pdf`. One bad
//!    entry rejects the whole batch before anything is downloaded.
//! 2. **Convert**: files run one after another in input order:
//!    status text, download, rasterise, status text, then one blob per page.
//! 3. **Finish**: a final status line once every file has been handled.
//!
//! Every error travels up to [`Pdf2ImageTool::invoke`], which emits exactly
//! one structured error event and stops. Events already emitted stand.
//! With [`FailurePolicy::ContinueBatch`] a download or conversion failure
//! only ends that file instead.

use crate::config::{FailurePolicy, ToolConfig};
use crate::error::Pdf2ImageError;
use crate::output::{EncodedImage, RunSummary, ToolEvent};
use crate::pipeline::fetch::{Fetcher, HttpFetcher};
use crate::pipeline::rasterize;
use crate::pipeline::render::{PdfEngine, PdfiumEngine};
use crate::reference::{FileReference, ToolParameters};
use crate::sink::{ChannelSink, OutputSink};
use serde_json::json;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of tool events.
pub type ToolEventStream = Pin<Box<dyn Stream<Item = ToolEvent> + Send>>;

/// The PDF-to-image tool.
///
/// Cheap to clone; the fetcher and engine are shared.
#[derive(Clone)]
pub struct Pdf2ImageTool {
    config: ToolConfig,
    fetcher: Arc<dyn Fetcher>,
    engine: Arc<dyn PdfEngine>,
}

/// An error plus the file it happened on, if any.
struct RunError {
    file: Option<String>,
    error: Pdf2ImageError,
}

impl From<Pdf2ImageError> for RunError {
    fn from(error: Pdf2ImageError) -> Self {
        Self { file: None, error }
    }
}

impl Pdf2ImageTool {
    /// Tool with the HTTP fetcher and the pdfium engine.
    pub fn new(config: ToolConfig) -> Result<Self, Pdf2ImageError> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config.download_timeout_secs)?;
        let engine = PdfiumEngine::new()?;
        Self::with_parts(config, Arc::new(fetcher), Arc::new(engine))
    }

    /// Tool with caller-supplied transport and engine.
    ///
    /// Fails with [`Pdf2ImageError::InvalidConfig`] if `config` is out of range.
    pub fn with_parts(
        config: ToolConfig,
        fetcher: Arc<dyn Fetcher>,
        engine: Arc<dyn PdfEngine>,
    ) -> Result<Self, Pdf2ImageError> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher,
            engine,
        })
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Run the tool on raw host JSON.
    ///
    /// A payload that cannot be parsed produces the single error event.
    pub async fn invoke_value(
        &self,
        value: serde_json::Value,
        sink: &dyn OutputSink,
    ) -> Result<RunSummary, Pdf2ImageError> {
        match ToolParameters::from_value(value) {
            Ok(params) => self.invoke(&params, sink).await,
            Err(error) => {
                warn!("Rejected tool parameters: {}", error);
                sink.emit(error_event(&error, None));
                Err(error)
            }
        }
    }

    /// Run the tool, emitting every event into `sink`.
    ///
    /// On failure the error event has already been emitted when this returns.
    pub async fn invoke(
        &self,
        params: &ToolParameters,
        sink: &dyn OutputSink,
    ) -> Result<RunSummary, Pdf2ImageError> {
        match self.run(params, sink).await {
            Ok(summary) => Ok(summary),
            Err(RunError { file, error }) => {
                warn!("Run aborted: {}", error);
                sink.emit(error_event(&error, file.as_deref()));
                Err(error)
            }
        }
    }

    /// Run the tool on a spawned task and stream its events.
    ///
    /// Must be called from within a Tokio runtime. Dropping the stream does
    /// not cancel the run; further events are discarded.
    pub fn invoke_stream(&self, params: ToolParameters) -> ToolEventStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let tool = self.clone();
        tokio::spawn(async move {
            let sink = ChannelSink::new(tx);
            // Outcome is already in the stream as events.
            let _ = tool.invoke(&params, &sink).await;
        });
        Box::pin(UnboundedReceiverStream::new(rx))
    }

    async fn run(
        &self,
        params: &ToolParameters,
        sink: &dyn OutputSink,
    ) -> Result<RunSummary, RunError> {
        // ── Phase 1: validate the whole batch ───────────────────────────
        validate_types(&params.pdf_files)?;

        // ── Phase 2: convert each file in order ─────────────────────────
        let total = params.pdf_files.len();
        let mut summary = RunSummary::default();

        for (i, file) in params.pdf_files.iter().enumerate() {
            info!("Processing '{}' ({}/{})", file.filename(), i + 1, total);
            sink.emit(ToolEvent::text(format!(
                "Processing '{}' ({}/{})…",
                file.filename(),
                i + 1,
                total
            )));

            let images = match self.convert_file(file, &params.host_url).await {
                Ok(images) => images,
                Err(error) => match self.config.failure_policy {
                    FailurePolicy::AbortBatch => {
                        return Err(RunError {
                            file: Some(file.filename().to_string()),
                            error,
                        })
                    }
                    FailurePolicy::ContinueBatch => {
                        warn!("Skipping '{}': {}", file.filename(), error);
                        sink.emit(error_event(&error, Some(file.filename())));
                        summary.files_failed += 1;
                        continue;
                    }
                },
            };

            info!("'{}' converted to {} images", file.filename(), images.len());
            sink.emit(ToolEvent::text(format!(
                "'{}' converted to {} images.",
                file.filename(),
                images.len()
            )));

            summary.files_converted += 1;
            summary.images_emitted += images.len();
            for image in images {
                sink.emit(image.into());
            }
        }

        // ── Phase 3: done ───────────────────────────────────────────────
        let done = if summary.files_failed == 0 {
            format!("All {total} files processed.")
        } else {
            format!(
                "Finished {total} files: {} converted, {} failed.",
                summary.files_converted, summary.files_failed
            )
        };
        sink.emit(ToolEvent::text(done));

        Ok(summary)
    }

    /// Download one file and rasterise every page.
    async fn convert_file(
        &self,
        file: &FileReference,
        host_url: &str,
    ) -> Result<Vec<EncodedImage>, Pdf2ImageError> {
        let bytes = self.fetcher.download(file, host_url).await?;

        let format = self.config.format;
        let pages =
            rasterize::convert(Arc::clone(&self.engine), bytes, self.config.dpi, format).await?;

        Ok(pages
            .into_iter()
            .enumerate()
            .map(|(index, data)| EncodedImage {
                page: index + 1,
                file_name: file.output_name(index + 1, format),
                mime_type: format.mime_type().to_string(),
                data,
            })
            .collect())
    }
}

/// Reject the batch if any file is not declared as a PDF.
fn validate_types(files: &[FileReference]) -> Result<(), RunError> {
    match files.iter().find(|f| !f.is_pdf()) {
        Some(file) => Err(RunError {
            file: Some(file.filename().to_string()),
            error: Pdf2ImageError::UnsupportedFileType {
                filename: file.filename().to_string(),
                mime_type: file.mime_type().to_string(),
            },
        }),
        None => Ok(()),
    }
}

/// The structured error event reported to the host.
pub fn error_event(error: &Pdf2ImageError, file: Option<&str>) -> ToolEvent {
    let mut body = json!({
        "status": "error",
        "kind": error.kind(),
        "message": error.to_string(),
    });
    if let Some(file) = file {
        body["file"] = json!(file);
    }
    ToolEvent::json(body)
}
