//! Sliced export engine
//!
//! The export system is built on three main components:
//!
//! 1. **SlicedScrollCursor**: walks one slice of the query with search + scroll
//! 2. **ProgressReporter**: polls every cursor and reports aggregate progress
//! 3. **DocumentSink**: receives the documents of every slice
//!
//! These components are orchestrated by the **ExportCoordinator**, which runs
//! one task per slice plus the reporter and collects per-slice outcomes.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use esexport::client::EsClient;
//! use esexport::config::Config;
//! use esexport::export::{ExportCoordinator, ExportPlan, JsonLWriter, LogProgressObserver};
//!
//! # async fn run() -> esexport::Result<()> {
//! let config = Config::default();
//! let backend = Arc::new(EsClient::new(&config.connection)?);
//! let sink = Arc::new(JsonLWriter::new("out.jsonl").await?);
//! let plan = ExportPlan {
//!     slices: 4,
//!     slice_field: None,
//!     query: serde_json::json!({ "size": 1000 }),
//! };
//!
//! let report = ExportCoordinator::new(backend, plan, sink)
//!     .with_progress(Arc::new(LogProgressObserver))
//!     .execute()
//!     .await?;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod cursor;
pub mod progress;
pub mod writers;

pub use coordinator::{ExportCoordinator, ExportPlan, ExportReport, PartitionOutcome};
pub use cursor::{CursorOptions, SlicedScrollCursor};
pub use progress::{
    LogProgressObserver, ProgressBarObserver, ProgressObserver, ProgressReporter, ProgressTick,
    SliceProgress, SliceState,
};
pub use writers::{DocumentSink, JsonLWriter, NullSink};
