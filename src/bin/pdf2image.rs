//! CLI binary for edgequake-pdf2image.
//!
//! A thin shim over the library: flags map to `ToolConfig`, inputs map to
//! `ToolParameters`, and events go either into a directory or to stdout as
//! JSON lines.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use edgequake_pdf2image::{
    DirectorySink, FailurePolicy, FileReference, OutputFormat, OutputSink, Pdf2ImageTool,
    ToolConfig, ToolEvent, ToolParameters, PDF_MIME_TYPE,
};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Rasterise a PDF into the current directory
  pdf2image https://example.com/report.pdf

  # Host-relative URLs, JPEG at 150 DPI, into ./pages
  pdf2image --host-url http://127.0.0.1:8080 --format jpeg --dpi 150 \
      /files/a.pdf /files/b.pdf -o pages

  # Replay a host payload and print events as JSON lines
  pdf2image --params payload.json --jsonl > events.jsonl

PDFIUM:
  The pdfium shared library must be loadable. Set PDFIUM_LIB_PATH, place the
  library in the working directory, or install it system-wide."#;

#[derive(Parser, Debug)]
#[command(
    name = "pdf2image",
    version,
    about = "Download PDF files and rasterise every page to PNG or JPEG",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF URLs, absolute or relative to --host-url.
    #[arg(required_unless_present = "params", conflicts_with = "params")]
    inputs: Vec<String>,

    /// Base URL prefixed to host-relative input URLs.
    #[arg(long, env = "PDF2IMAGE_HOST_URL", default_value = "")]
    host_url: String,

    /// Read a host JSON payload (`pdf_files`, `host_url`) from this file.
    #[arg(long)]
    params: Option<PathBuf>,

    /// Rendering DPI (1–1200).
    #[arg(long, env = "PDF2IMAGE_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(1..=1200))]
    dpi: u32,

    /// Image format.
    #[arg(long, env = "PDF2IMAGE_FORMAT", value_enum, default_value = "png")]
    format: FormatArg,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2IMAGE_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Skip files that fail to download or convert instead of stopping.
    #[arg(long, env = "PDF2IMAGE_CONTINUE_ON_ERROR")]
    continue_on_error: bool,

    /// Directory to write images into.
    #[arg(short, long, env = "PDF2IMAGE_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// Print every event as a JSON line on stdout instead of writing files.
    #[arg(long, conflicts_with = "output")]
    jsonl: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2IMAGE_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, env = "PDF2IMAGE_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Png,
    #[value(alias = "jpg")]
    Jpeg,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => OutputFormat::Png,
            FormatArg::Jpeg => OutputFormat::Jpeg,
        }
    }
}

/// Prints each event as one JSON object per line.
struct JsonLinesSink;

impl OutputSink for JsonLinesSink {
    fn emit(&self, event: ToolEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not serialise event: {}", e);
                return;
            }
        };
        let mut out = io::stdout().lock();
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            warn!("Could not write event to stdout: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let policy = if cli.continue_on_error {
        FailurePolicy::ContinueBatch
    } else {
        FailurePolicy::AbortBatch
    };
    let config = ToolConfig::builder()
        .dpi(cli.dpi)
        .format(cli.format.into())
        .download_timeout_secs(cli.download_timeout)
        .failure_policy(policy)
        .build()
        .context("Invalid configuration")?;

    let tool = Pdf2ImageTool::new(config).context("Failed to initialise the PDF engine")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let directory = if cli.jsonl {
        None
    } else {
        Some(
            DirectorySink::create(&cli.output)
                .with_context(|| format!("Cannot create {}", cli.output.display()))?,
        )
    };
    let sink: &dyn OutputSink = match &directory {
        Some(dir) => dir,
        None => &JsonLinesSink,
    };

    let outcome = match &cli.params {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read {}", path.display()))?;
            let mut value: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;
            if !cli.host_url.is_empty() && value.is_object() && value.get("host_url").is_none() {
                value["host_url"] = serde_json::Value::String(cli.host_url.clone());
            }
            tool.invoke_value(value, sink).await
        }
        None => {
            let files = cli
                .inputs
                .iter()
                .map(|url| FileReference::new(file_name_from_url(url), url.as_str(), PDF_MIME_TYPE))
                .collect::<Result<Vec<_>, _>>()?;
            tool.invoke(&ToolParameters::new(files, cli.host_url.as_str()), sink)
                .await
        }
    };

    // The error event has already been emitted through the sink.
    if outcome.is_err() {
        std::process::exit(1);
    }
    if let Some(dir) = &directory {
        if dir.write_failures() > 0 {
            bail!("{} image(s) could not be written", dir.write_failures());
        }
        if !cli.quiet {
            eprintln!(
                "{} image(s) written to {}",
                dir.written().len(),
                cli.output.display()
            );
        }
    }
    Ok(())
}

/// Last path segment of `url`, without query or fragment.
fn file_name_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.trim_end_matches('/').rsplit('/').next() {
        Some(name) if !name.is_empty() && !name.contains(':') => name.to_string(),
        _ => "document.pdf".to_string(),
    }
}
