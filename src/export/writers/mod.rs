//! Document sinks for export operations
//!
//! Every slice task writes into the same sink, so sinks take `&self` and do
//! their own locking.

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::BufWriter;

use crate::client::Hit;
use crate::error::{EsExportError, Result};

pub mod jsonl;

pub use jsonl::JsonLWriter;

/// Destination for exported documents
#[async_trait]
pub trait DocumentSink: Send + Sync {
    /// Accept a batch of documents from one slice
    ///
    /// # Returns
    /// * `Result<usize>` - Number of documents written
    async fn accept(&self, docs: &[Hit]) -> Result<usize>;

    /// Flush buffered output
    async fn finalize(&self) -> Result<()>;

    /// Number of documents accepted so far
    fn written(&self) -> u64;
}

/// Sink that drops every document
///
/// Used when no output file is configured; the export still walks every slice.
#[derive(Debug, Default)]
pub struct NullSink {
    seen: AtomicU64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentSink for NullSink {
    async fn accept(&self, docs: &[Hit]) -> Result<usize> {
        self.seen.fetch_add(docs.len() as u64, Ordering::Relaxed);
        Ok(docs.len())
    }

    async fn finalize(&self) -> Result<()> {
        Ok(())
    }

    fn written(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

/// Helper function to create a buffered file writer
///
/// The file is truncated if it already exists.
pub(crate) async fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path)
        .await
        .map_err(|e| EsExportError::Sink(format!("Failed to create file: {}", e)))?;
    Ok(BufWriter::with_capacity(8 * 1024 * 1024, file)) // 8MB buffer
}

/// Helper function to validate file path and directory
pub(crate) fn validate_path(path: &Path) -> Result<()> {
    // Check if parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(EsExportError::Sink(format!(
                "Directory does not exist: {}",
                parent.display()
            )));
        }
    }

    Ok(())
}
