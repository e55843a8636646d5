//! JSON Lines writer for export operations
//!
//! Each hit becomes one line: `{"_id": ..., "_source": {...}}`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;
use tracing::debug;

use crate::client::Hit;
use crate::error::{EsExportError, Result};

use super::{DocumentSink, create_writer, validate_path};

/// Writer for JSON Lines format, shared by every slice task
pub struct JsonLWriter {
    /// Buffered file writer; a batch is written while holding the lock
    writer: Mutex<BufWriter<File>>,
    /// Path to the output file
    path: PathBuf,
    /// Number of documents written
    written: AtomicU64,
}

impl JsonLWriter {
    /// Create a new JSON Lines writer
    ///
    /// # Arguments
    /// * `path` - Output file path, truncated if present
    ///
    /// # Returns
    /// * `Result<Self>` - New writer instance or error
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        validate_path(path)?;
        let writer = create_writer(path).await?;

        debug!("Created JSON Lines writer for: {}", path.display());

        Ok(Self {
            writer: Mutex::new(writer),
            path: path.to_path_buf(),
            written: AtomicU64::new(0),
        })
    }

    /// Size of the output file on disk
    pub async fn file_size(&self) -> Result<u64> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| EsExportError::Sink(format!("Failed to get file metadata: {}", e)))?;
        Ok(metadata.len())
    }
}

#[async_trait]
impl DocumentSink for JsonLWriter {
    async fn accept(&self, docs: &[Hit]) -> Result<usize> {
        // Serialize before locking so slices only contend on the write itself
        let mut buf = Vec::with_capacity(docs.len() * 128);
        for doc in docs {
            serde_json::to_writer(&mut buf, doc)
                .map_err(|e| EsExportError::Sink(format!("Failed to encode document: {}", e)))?;
            buf.push(b'\n');
        }

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&buf)
            .await
            .map_err(|e| EsExportError::Sink(format!("Failed to write to file: {}", e)))?;
        drop(writer);

        let total = self.written.fetch_add(docs.len() as u64, Ordering::Relaxed) + docs.len() as u64;
        debug!("Wrote {} documents to JSON Lines (total: {})", docs.len(), total);

        Ok(docs.len())
    }

    async fn finalize(&self) -> Result<()> {
        self.writer
            .lock()
            .await
            .flush()
            .await
            .map_err(|e| EsExportError::Sink(format!("Failed to flush file: {}", e)))?;

        debug!(
            "Finalized JSON Lines file: {} ({} documents)",
            self.path.display(),
            self.written()
        );
        Ok(())
    }

    fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}
