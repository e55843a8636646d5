//! Elasticsearch Sliced Export Library
//!
//! This library exports every document matching a query by splitting the
//! result set into slices and scrolling through each slice concurrently.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `client`: Search backend capability and its HTTP implementation
//! - `config`: Configuration management
//! - `error`: Error types and handling
//! - `export`: Cursors, coordinator, progress reporting and output sinks
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use esexport::{Config, EsClient, ExportCoordinator, ExportPlan, NullSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let backend = Arc::new(EsClient::new(&config.connection)?);
//!     let plan = ExportPlan {
//!         slices: 2,
//!         slice_field: None,
//!         query: serde_json::json!({}),
//!     };
//!
//!     let report = ExportCoordinator::new(backend, plan, Arc::new(NullSink::new()))
//!         .execute()
//!         .await?;
//!     println!("Exported {} documents", report.documents_exported);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod export;

// Re-export commonly used types
pub use client::{EsClient, Hit, SearchBackend};
pub use config::Config;
pub use error::{EsExportError, Result};
pub use export::{ExportCoordinator, ExportPlan, ExportReport, NullSink};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}
