//! Export coordinator for orchestrating sliced exports
//!
//! Builds one cursor per slice, drives each on its own task into the shared
//! sink, and runs a progress reporter alongside until every slice has ended.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::client::SearchBackend;
use crate::error::{EsExportError, Result};

use super::cursor::{CursorOptions, SlicedScrollCursor};
use super::progress::{ProgressObserver, ProgressReporter};
use super::writers::DocumentSink;

/// Default interval between progress polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What to export
#[derive(Debug, Clone)]
pub struct ExportPlan {
    /// Number of slices; 0 and 1 run a single unsliced cursor
    pub slices: usize,
    /// Field the backend slices on
    pub slice_field: Option<String>,
    /// Base search body
    pub query: Value,
}

/// Outcome of one slice
#[derive(Debug)]
pub struct PartitionOutcome {
    pub slice: usize,
    /// Documents handed to the sink by this slice
    pub documents: u64,
    pub elapsed: Duration,
    pub result: Result<()>,
}

/// Result of an export operation
#[derive(Debug)]
pub struct ExportReport {
    /// One entry per slice, ordered by slice index
    pub partitions: Vec<PartitionOutcome>,
    /// Documents handed to the sink across every slice
    pub documents_exported: u64,
    /// Error raised while flushing the sink, if any
    pub sink_error: Option<EsExportError>,
    pub elapsed_ms: u64,
}

impl ExportReport {
    /// Every slice finished and the output was flushed
    pub fn is_success(&self) -> bool {
        self.sink_error.is_none() && self.partitions.iter().all(|p| p.result.is_ok())
    }

    /// Slices that ended with an error
    pub fn failures(&self) -> impl Iterator<Item = &PartitionOutcome> {
        self.partitions.iter().filter(|p| p.result.is_err())
    }
}

/// Coordinator for sliced export operations
pub struct ExportCoordinator {
    backend: Arc<dyn SearchBackend>,
    plan: ExportPlan,
    sink: Arc<dyn DocumentSink>,
    observer: Option<Arc<dyn ProgressObserver>>,
    poll_interval: Duration,
    options: CursorOptions,
}

impl ExportCoordinator {
    /// Create a new export coordinator
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        plan: ExportPlan,
        sink: Arc<dyn DocumentSink>,
    ) -> Self {
        Self {
            backend,
            plan,
            sink,
            observer: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            options: CursorOptions::default(),
        }
    }

    /// Report aggregate progress to `observer`
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set the interval between progress polls
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set cursor options such as query tracing
    pub fn with_options(mut self, options: CursorOptions) -> Self {
        self.options = options;
        self
    }

    /// Build one cursor per slice
    ///
    /// Fails on the first invalid slice, before any request is made.
    fn build_cursors(&self) -> Result<Vec<SlicedScrollCursor>> {
        let count = self.plan.slices.max(1);
        (0..count)
            .map(|index| {
                SlicedScrollCursor::new(
                    Arc::clone(&self.backend),
                    index,
                    self.plan.slices,
                    self.plan.slice_field.clone(),
                    &self.plan.query,
                    self.options,
                )
            })
            .collect()
    }

    /// Execute the export
    ///
    /// # Returns
    /// * `Result<ExportReport>` - `Err` only when the export could not be set
    ///   up; slice failures are reported inside the report
    pub async fn execute(self) -> Result<ExportReport> {
        let start_time = Instant::now();
        let cursors = self.build_cursors()?;

        info!("Starting export with {} slice(s)", cursors.len());

        let stop = CancellationToken::new();
        let reporter = self.observer.as_ref().map(|observer| {
            let slices = cursors.iter().map(|c| c.progress()).collect();
            let reporter = ProgressReporter::new(slices, Arc::clone(observer), self.poll_interval);
            tokio::spawn(reporter.run(stop.clone()))
        });

        let handles: Vec<_> = cursors
            .into_iter()
            .map(|cursor| {
                let sink = Arc::clone(&self.sink);
                tokio::spawn(process_cursor(cursor, sink))
            })
            .collect();

        let mut partitions = Vec::with_capacity(handles.len());
        for (slice, joined) in join_all(handles).await.into_iter().enumerate() {
            let outcome = joined.unwrap_or_else(|e| PartitionOutcome {
                slice,
                documents: 0,
                elapsed: Duration::ZERO,
                result: Err(EsExportError::Generic(format!("Slice task aborted: {e}"))),
            });
            partitions.push(outcome);
        }

        stop.cancel();
        if let Some(handle) = reporter {
            match handle.await {
                Ok(summary) => debug!("Progress reporter stopped after {} ticks", summary.ticks),
                Err(e) => error!("Progress reporter task failed: {}", e),
            }
        }

        let sink_error = self.sink.finalize().await.err();
        if let Some(e) = &sink_error {
            error!("Error finalizing output: {}", e);
        }

        let documents_exported = partitions.iter().map(|p| p.documents).sum();
        let elapsed_ms = start_time.elapsed().as_millis() as u64;
        debug!("esexport took {:?}", start_time.elapsed());

        info!(
            "Export completed: {} documents, {} of {} slices failed, {} ms",
            documents_exported,
            partitions.iter().filter(|p| p.result.is_err()).count(),
            partitions.len(),
            elapsed_ms
        );

        Ok(ExportReport {
            partitions,
            documents_exported,
            sink_error,
            elapsed_ms,
        })
    }
}

/// Drive one cursor to exhaustion, forwarding every batch to the sink
async fn process_cursor(
    mut cursor: SlicedScrollCursor,
    sink: Arc<dyn DocumentSink>,
) -> PartitionOutcome {
    let start = Instant::now();
    let slice = cursor.slice_index();
    let mut documents = 0u64;

    let result = loop {
        let batch = match cursor.next().await {
            Ok(batch) => batch,
            Err(e) => break Err(e),
        };

        if batch.is_empty() {
            break Ok(());
        }

        match sink.accept(&batch).await {
            Ok(n) => documents += n as u64,
            Err(e) => break Err(e),
        }
    };

    if let Err(e) = &result {
        error!("Error processing cursor {}: {}", slice, e);
    }

    let elapsed = start.elapsed();
    debug!("Cursor {} took {:?}", slice, elapsed);

    PartitionOutcome {
        slice,
        documents,
        elapsed,
        result,
    }
}
