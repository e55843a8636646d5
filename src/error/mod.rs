//! Error handling module for export operations.
//!
//! Errors fall into two classes:
//! - export-fatal errors raised while building the export (bad partition
//!   layout, unusable query, configuration problems), which abort before any
//!   request is sent
//! - partition-fatal errors raised by a single slice while it talks to the
//!   backend, which end that slice only
//!
//! # Example
//!
//! ```rust
//! use esexport::error::{EsExportError, Result};
//!
//! fn check(index: usize, count: usize) -> Result<()> {
//!     if count >= 2 && index >= count {
//!         return Err(EsExportError::InvalidPartition { index, count });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(2, 2).is_err());
//! ```

pub mod kinds;

// Re-export commonly used types
pub use kinds::{ConfigError, EsExportError, Result, TransportError};
