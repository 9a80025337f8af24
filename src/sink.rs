//! Output sinks: where [`ToolEvent`]s go once the tool produces them.
//!
//! The tool never buffers its output. Each event is passed to an
//! [`OutputSink`] the moment it is ready, so a host can show the first
//! page while later ones are still rendering. The sink decides the
//! transport; the tool only guarantees emission order.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2image::{OutputSink, ToolEvent};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingSink {
//!     images: AtomicUsize,
//! }
//!
//! impl OutputSink for CountingSink {
//!     fn emit(&self, event: ToolEvent) {
//!         if event.is_blob() {
//!             self.images.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//! ```

use crate::output::ToolEvent;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

/// Receives tool output in emission order.
///
/// Implementations must be `Send + Sync`: the streaming API drives the run
/// on a spawned Tokio task.
pub trait OutputSink: Send + Sync {
    fn emit(&self, event: ToolEvent);
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ToolEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<ToolEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn into_events(self) -> Vec<ToolEvent> {
        self.events.into_inner().unwrap_or_default()
    }
}

impl OutputSink for CollectingSink {
    fn emit(&self, event: ToolEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Forwards events into an unbounded Tokio channel.
///
/// Backs [`crate::tool::Pdf2ImageTool::invoke_stream`].
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<ToolEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ToolEvent>) -> Self {
        Self { tx }
    }
}

impl OutputSink for ChannelSink {
    fn emit(&self, event: ToolEvent) {
        if self.tx.send(event).is_err() {
            debug!("Output receiver dropped; discarding event");
        }
    }
}

/// Writes image blobs into a directory and logs everything else.
///
/// Used by the `pdf2image` binary. Path separators in blob names are
/// replaced so every file lands directly inside the directory.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: Mutex<Vec<PathBuf>>,
    write_failures: Mutex<usize>,
}

impl DirectorySink {
    /// Create the directory if needed.
    pub fn create(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            written: Mutex::new(Vec::new()),
            write_failures: Mutex::new(0),
        })
    }

    /// Paths written so far, in emission order.
    pub fn written(&self) -> Vec<PathBuf> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    pub fn write_failures(&self) -> usize {
        self.write_failures.lock().map(|n| *n).unwrap_or(0)
    }
}

impl OutputSink for DirectorySink {
    fn emit(&self, event: ToolEvent) {
        match event {
            ToolEvent::Text { text } => info!("{}", text),
            ToolEvent::Json { json } => {
                if json.get("status").and_then(|s| s.as_str()) == Some("error") {
                    error!("{}", json);
                } else {
                    info!("{}", json);
                }
            }
            ToolEvent::Blob { data, meta } => {
                let path = self.dir.join(sanitize_file_name(&meta.file_name));
                match std::fs::write(&path, &data) {
                    Ok(()) => {
                        debug!("Wrote {} ({} bytes)", path.display(), data.len());
                        if let Ok(mut w) = self.written.lock() {
                            w.push(path);
                        }
                    }
                    Err(e) => {
                        warn!("Failed to write {}: {}", path.display(), e);
                        if let Ok(mut n) = self.write_failures.lock() {
                            *n += 1;
                        }
                    }
                }
            }
        }
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
