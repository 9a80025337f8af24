//! Orchestration tests for `Pdf2ImageTool`.
//!
//! These run without network or pdfium: a scripted fetcher serves bytes per
//! URL, and a fake engine reads `pages=N fail=K` out of those bytes.

use async_trait::async_trait;
use edgequake_pdf2image::{
    resolve_url, CollectingSink, DocumentFn, FailurePolicy, Fetcher, FileReference,
    OutputFormat, Pdf2ImageError, Pdf2ImageTool, PdfDocumentHandle, PdfEngine, ToolConfig,
    ToolEvent, ToolParameters, PDF_MIME_TYPE,
};
use futures::StreamExt;
use image::{DynamicImage, Rgba, RgbaImage};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const HOST: &str = "http://h.com/";

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Serves canned bodies keyed by resolved URL; unknown URLs fail.
#[derive(Default)]
struct ScriptedFetcher {
    bodies: HashMap<String, Vec<u8>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    fn with(mut self, url: &str, body: &str) -> Self {
        self.bodies
            .insert(resolve_url(url, HOST), body.as_bytes().to_vec());
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn download(
        &self,
        file: &FileReference,
        base_url: &str,
    ) -> Result<Vec<u8>, Pdf2ImageError> {
        let url = resolve_url(file.url(), base_url);
        self.requested.lock().unwrap().push(file.filename().to_string());
        self.bodies
            .get(&url)
            .cloned()
            .ok_or_else(|| Pdf2ImageError::DownloadFailed {
                filename: file.filename().to_string(),
                url,
                reason: "HTTP 404 Not Found".into(),
            })
    }
}

#[derive(Default)]
struct FakeEngine {
    open_docs: Arc<AtomicUsize>,
}

struct FakeDoc {
    pages: usize,
    fail_on: Option<usize>,
    open_docs: Arc<AtomicUsize>,
}

impl Drop for FakeDoc {
    fn drop(&mut self) {
        self.open_docs.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PdfDocumentHandle for FakeDoc {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn render_page(&self, index: usize, _dpi: u32) -> Result<DynamicImage, Pdf2ImageError> {
        if self.fail_on == Some(index + 1) {
            return Err(Pdf2ImageError::PageRender {
                page: index + 1,
                detail: "corrupt content stream".into(),
            });
        }
        Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            4 + index as u32,
            4,
            Rgba([255, 255, 255, 255]),
        )))
    }
}

impl PdfEngine for FakeEngine {
    fn with_document(&self, bytes: &[u8], f: &mut DocumentFn<'_>) -> Result<(), Pdf2ImageError> {
        let script = std::str::from_utf8(bytes).unwrap_or("");
        let field = |key: &str| {
            script.split_whitespace()
                .find_map(|p| p.strip_prefix(key))
                .and_then(|n| n.parse::<usize>().ok())
        };
        let pages = field("pages=").ok_or_else(|| Pdf2ImageError::DocumentOpen {
            detail: "not a valid PDF document".into(),
        })?;

        self.open_docs.fetch_add(1, Ordering::SeqCst);
        let doc = FakeDoc {
            pages,
            fail_on: field("fail="),
            open_docs: Arc::clone(&self.open_docs),
        };
        f(&doc)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn pdf(name: &str) -> FileReference {
    FileReference::new(name, format!("files/{name}"), PDF_MIME_TYPE).unwrap()
}

fn tool_with(
    fetcher: Arc<ScriptedFetcher>,
    config: ToolConfig,
) -> (Pdf2ImageTool, Arc<FakeEngine>) {
    let engine = Arc::new(FakeEngine::default());
    let tool = Pdf2ImageTool::with_parts(config, fetcher, engine.clone())
        .expect("test config is valid");
    (tool, engine)
}

fn blob_names(events: &[ToolEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ToolEvent::Blob { meta, .. } => Some(meta.file_name.clone()),
            _ => None,
        })
        .collect()
}

fn texts(events: &[ToolEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            ToolEvent::Text { text } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn error_events(events: &[ToolEvent]) -> Vec<serde_json::Value> {
    events
        .iter()
        .filter_map(|e| match e {
            ToolEvent::Json { json } if e.is_error() => Some(json.clone()),
            _ => None,
        })
        .collect()
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn converts_every_page_of_every_file_in_order() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with("files/a.pdf", "pages=3")
            .with("files/b.pdf", "pages=1"),
    );
    let (tool, engine) = tool_with(fetcher.clone(), ToolConfig::default());
    let params = ToolParameters::new(vec![pdf("a.pdf"), pdf("b.pdf")], HOST);

    let sink = CollectingSink::new();
    let summary = tool.invoke(&params, &sink).await.expect("run should succeed");
    let events = sink.into_events();

    assert_eq!(summary.files_converted, 2);
    assert_eq!(summary.images_emitted, 4);
    assert_eq!(
        blob_names(&events),
        vec![
            "a.pdf_page1.png",
            "a.pdf_page2.png",
            "a.pdf_page3.png",
            "b.pdf_page1.png"
        ]
    );
    assert_eq!(
        texts(&events),
        vec![
            "Processing 'a.pdf' (1/2)…",
            "'a.pdf' converted to 3 images.",
            "Processing 'b.pdf' (2/2)…",
            "'b.pdf' converted to 1 images.",
            "All 2 files processed.",
        ]
    );
    // Status line comes before the file's images.
    assert_eq!(events[1], ToolEvent::text("'a.pdf' converted to 3 images."));
    assert!(events[2].is_blob());
    assert!(error_events(&events).is_empty());
    assert_eq!(fetcher.requested(), vec!["a.pdf", "b.pdf"]);
    assert_eq!(engine.open_docs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn image_content_follows_page_order() {
    let fetcher = Arc::new(ScriptedFetcher::default().with("files/a.pdf", "pages=4"));
    let (tool, _) = tool_with(fetcher, ToolConfig::default());
    let sink = CollectingSink::new();
    tool.invoke(&ToolParameters::new(vec![pdf("a.pdf")], HOST), &sink)
        .await
        .unwrap();

    let widths: Vec<u32> = sink
        .into_events()
        .into_iter()
        .filter_map(|e| match e {
            ToolEvent::Blob { data, meta } => {
                assert_eq!(meta.mime_type, "image/png");
                Some(image::load_from_memory(&data).unwrap().width())
            }
            _ => None,
        })
        .collect();
    assert_eq!(widths, vec![4, 5, 6, 7]);
}

#[tokio::test]
async fn jpeg_format_changes_names_and_mime() {
    let fetcher = Arc::new(ScriptedFetcher::default().with("files/a.pdf", "pages=1"));
    let config = ToolConfig::builder()
        .format(OutputFormat::Jpeg)
        .build()
        .unwrap();
    let (tool, _) = tool_with(fetcher, config);
    let sink = CollectingSink::new();
    tool.invoke(&ToolParameters::new(vec![pdf("a.pdf")], HOST), &sink)
        .await
        .unwrap();

    match sink.into_events().into_iter().find(|e| e.is_blob()) {
        Some(ToolEvent::Blob { meta, data }) => {
            assert_eq!(meta.file_name, "a.pdf_page1.jpg");
            assert_eq!(meta.mime_type, "image/jpeg");
            assert_eq!(image::guess_format(&data).unwrap(), image::ImageFormat::Jpeg);
        }
        other => panic!("expected a blob, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_batch_only_reports_completion() {
    let (tool, _) = tool_with(Arc::new(ScriptedFetcher::default()), ToolConfig::default());
    let sink = CollectingSink::new();
    let summary = tool
        .invoke(&ToolParameters::new(vec![], HOST), &sink)
        .await
        .unwrap();
    assert_eq!(summary.images_emitted, 0);
    assert_eq!(sink.into_events(), vec![ToolEvent::text("All 0 files processed.")]);
}

// ── Configuration ────────────────────────────────────────────────────────────

#[test]
fn out_of_range_config_is_refused_by_the_tool() {
    let bad = [
        ToolConfig {
            dpi: 0,
            ..ToolConfig::default()
        },
        ToolConfig {
            dpi: 1201,
            ..ToolConfig::default()
        },
        ToolConfig {
            download_timeout_secs: 0,
            ..ToolConfig::default()
        },
    ];
    for config in bad {
        let fetcher: Arc<ScriptedFetcher> = Arc::new(ScriptedFetcher::default());
        let result =
            Pdf2ImageTool::with_parts(config.clone(), fetcher, Arc::new(FakeEngine::default()));
        match result {
            Err(err) => assert_eq!(err.kind(), "invalid_config", "{config:?}"),
            Ok(_) => panic!("accepted {config:?}"),
        }
    }
}

#[test]
fn deserialised_zero_dpi_never_reaches_the_tool() {
    let parsed = serde_json::from_value::<ToolConfig>(json!({
        "dpi": 0,
        "format": "png",
        "download_timeout_secs": 0,
        "failure_policy": "abort_batch"
    }));
    assert!(parsed.is_err());
}

// ── Type validation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_anywhere_rejects_whole_batch() {
    for bad_position in 0..3 {
        let fetcher = Arc::new(
            ScriptedFetcher::default()
                .with("files/a.pdf", "pages=1")
                .with("files/b.pdf", "pages=1")
                .with("files/c.pdf", "pages=1"),
        );
        let (tool, _) = tool_with(fetcher.clone(), ToolConfig::default());

        let mut files = vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")];
        files[bad_position] =
            FileReference::new("sheet.xlsx", "files/sheet.xlsx", "application/vnd.ms-excel")
                .unwrap();

        let sink = CollectingSink::new();
        let err = tool
            .invoke(&ToolParameters::new(files, HOST), &sink)
            .await
            .unwrap_err();
        let events = sink.into_events();

        assert!(matches!(err, Pdf2ImageError::UnsupportedFileType { .. }));
        assert_eq!(events.len(), 1, "exactly one rejection event");
        let rejection = &error_events(&events)[0];
        assert_eq!(rejection["kind"], "unsupported_file_type");
        assert_eq!(rejection["file"], "sheet.xlsx");
        assert!(fetcher.requested().is_empty(), "nothing may be downloaded");
    }
}

#[tokio::test]
async fn validation_is_fatal_even_when_continuing_on_errors() {
    let config = ToolConfig::builder()
        .failure_policy(FailurePolicy::ContinueBatch)
        .build()
        .unwrap();
    let fetcher = Arc::new(ScriptedFetcher::default().with("files/a.pdf", "pages=1"));
    let (tool, _) = tool_with(fetcher.clone(), config);

    let files = vec![
        pdf("a.pdf"),
        FileReference::new("b.txt", "files/b.txt", "text/plain").unwrap(),
    ];
    let sink = CollectingSink::new();
    assert!(tool
        .invoke(&ToolParameters::new(files, HOST), &sink)
        .await
        .is_err());
    assert_eq!(sink.into_events().len(), 1);
    assert!(fetcher.requested().is_empty());
}

// ── Batch-fatal failures ─────────────────────────────────────────────────────

#[tokio::test]
async fn download_failure_on_second_file_stops_the_batch() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with("files/a.pdf", "pages=2")
            .with("files/c.pdf", "pages=2"),
    );
    let (tool, _) = tool_with(fetcher.clone(), ToolConfig::default());
    let params = ToolParameters::new(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")], HOST);

    let sink = CollectingSink::new();
    let err = tool.invoke(&params, &sink).await.unwrap_err();
    let events = sink.into_events();

    assert_eq!(err.kind(), "download_failed");
    // File 1's images stand; nothing for b or c.
    assert_eq!(blob_names(&events), vec!["a.pdf_page1.png", "a.pdf_page2.png"]);
    assert!(!texts(&events).iter().any(|t| t.contains("c.pdf")));
    assert_eq!(fetcher.requested(), vec!["a.pdf", "b.pdf"]);

    let errors = error_events(&events);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["file"], "b.pdf");
    assert!(errors[0]["message"].as_str().unwrap().contains("404"));
    assert!(events.last().unwrap().is_error(), "error event is terminal");
}

#[tokio::test]
async fn failing_page_yields_no_images_for_that_document() {
    let fetcher = Arc::new(ScriptedFetcher::default().with("files/a.pdf", "pages=5 fail=4"));
    let (tool, engine) = tool_with(fetcher, ToolConfig::default());

    let sink = CollectingSink::new();
    let err = tool
        .invoke(&ToolParameters::new(vec![pdf("a.pdf")], HOST), &sink)
        .await
        .unwrap_err();
    let events = sink.into_events();

    assert!(matches!(err, Pdf2ImageError::PageRender { page: 4, .. }));
    assert!(blob_names(&events).is_empty());
    assert_eq!(error_events(&events)[0]["kind"], "page_render_failed");
    assert_eq!(engine.open_docs.load(Ordering::SeqCst), 0, "document closed");
}

#[tokio::test]
async fn unparseable_document_is_reported_as_open_failure() {
    let fetcher = Arc::new(ScriptedFetcher::default().with("files/a.pdf", "<html>login</html>"));
    let (tool, _) = tool_with(fetcher, ToolConfig::default());

    let sink = CollectingSink::new();
    let err = tool
        .invoke(&ToolParameters::new(vec![pdf("a.pdf")], HOST), &sink)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "document_open_failed");
    assert_eq!(error_events(&sink.into_events())[0]["file"], "a.pdf");
}

// ── Continue-on-error policy ─────────────────────────────────────────────────

#[tokio::test]
async fn continue_policy_skips_failed_file() {
    let config = ToolConfig::builder()
        .failure_policy(FailurePolicy::ContinueBatch)
        .build()
        .unwrap();
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with("files/a.pdf", "pages=1")
            .with("files/b.pdf", "pages=3 fail=2")
            .with("files/c.pdf", "pages=1"),
    );
    let (tool, _) = tool_with(fetcher, config);
    let params = ToolParameters::new(vec![pdf("a.pdf"), pdf("b.pdf"), pdf("c.pdf")], HOST);

    let sink = CollectingSink::new();
    let summary = tool.invoke(&params, &sink).await.expect("run completes");
    let events = sink.into_events();

    assert_eq!(summary.files_converted, 2);
    assert_eq!(summary.files_failed, 1);
    assert_eq!(blob_names(&events), vec!["a.pdf_page1.png", "c.pdf_page1.png"]);
    let errors = error_events(&events);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["file"], "b.pdf");
    assert_eq!(
        events.last(),
        Some(&ToolEvent::text("Finished 3 files: 2 converted, 1 failed."))
    );
}

// ── Host payloads ────────────────────────────────────────────────────────────

#[tokio::test]
async fn malformed_payload_emits_single_error() {
    let (tool, _) = tool_with(Arc::new(ScriptedFetcher::default()), ToolConfig::default());
    let sink = CollectingSink::new();
    let err = tool
        .invoke_value(
            json!({"pdf_files": [{"url": "files/a.pdf", "mime_type": "application/pdf"}]}),
            &sink,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Pdf2ImageError::MalformedReference {
            field: "filename",
            ..
        }
    ));
    let events = sink.into_events();
    assert_eq!(events.len(), 1);
    assert_eq!(error_events(&events)[0]["kind"], "malformed_reference");
}

#[tokio::test]
async fn payload_with_relative_urls_is_resolved_against_host() {
    let fetcher = Arc::new(ScriptedFetcher::default().with("/files/a.pdf", "pages=2"));
    let (tool, _) = tool_with(fetcher, ToolConfig::default());
    let sink = CollectingSink::new();
    tool.invoke_value(
        json!({
            "pdf_files": [{
                "filename": "a.pdf",
                "url": "/files/a.pdf",
                "mimeType": "application/pdf"
            }],
            "host_url": "http://h.com"
        }),
        &sink,
    )
    .await
    .unwrap();
    assert_eq!(blob_names(&sink.into_events()).len(), 2);
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_yields_same_events_as_sink() {
    let fetcher = Arc::new(
        ScriptedFetcher::default()
            .with("files/a.pdf", "pages=2")
            .with("files/b.pdf", "pages=1"),
    );
    let (tool, _) = tool_with(fetcher, ToolConfig::default());
    let params = ToolParameters::new(vec![pdf("a.pdf"), pdf("b.pdf")], HOST);

    let sink = CollectingSink::new();
    tool.invoke(&params, &sink).await.unwrap();
    let collected = sink.into_events();

    let streamed: Vec<ToolEvent> = tool.invoke_stream(params).collect().await;
    assert_eq!(streamed, collected);
}

#[tokio::test]
async fn stream_ends_after_error_event() {
    let fetcher = Arc::new(ScriptedFetcher::default().with("files/a.pdf", "pages=1"));
    let (tool, _) = tool_with(fetcher, ToolConfig::default());
    let params = ToolParameters::new(vec![pdf("a.pdf"), pdf("missing.pdf"), pdf("a.pdf")], HOST);

    let streamed: Vec<ToolEvent> = tool.invoke_stream(params).collect().await;
    assert!(streamed.last().unwrap().is_error());
    assert_eq!(blob_names(&streamed), vec!["a.pdf_page1.png"]);
}
