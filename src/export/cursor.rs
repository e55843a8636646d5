//! Sliced scroll cursor
//!
//! A [`SlicedScrollCursor`] walks one slice of a query: an initial search
//! opens the scroll context and reports the slice total, then scroll calls
//! continue until every document of the slice has been pulled.

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::client::{Hit, SearchBackend};
use crate::error::{EsExportError, Result};

use super::progress::SliceProgress;

/// Per-cursor behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorOptions {
    /// Log the initial query and total of each slice at debug level
    pub trace_queries: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    NotStarted,
    InProgress { total: u64, retrieved: u64 },
    Done { total: u64, retrieved: u64 },
}

/// Iterator over one slice of a scrolled search.
///
/// Only the task that owns the cursor mutates it. Progress is published
/// through a shared [`SliceProgress`] that other tasks may read at any time.
///
/// Any error is terminal: the counters keep their pre-call values and every
/// later [`next`](Self::next) returns [`EsExportError::CursorFailed`] without
/// contacting the backend.
pub struct SlicedScrollCursor {
    backend: Arc<dyn SearchBackend>,
    query: Map<String, Value>,
    slice_index: usize,
    slice_count: usize,
    slice_field: Option<String>,
    state: CursorState,
    scroll_id: String,
    failed: bool,
    progress: Arc<SliceProgress>,
    options: CursorOptions,
}

impl SlicedScrollCursor {
    /// Create a cursor for one slice
    ///
    /// # Arguments
    /// * `backend` - Search capability shared by every cursor of the export
    /// * `slice_index` - 0-based slice handled by this cursor
    /// * `slice_count` - Number of slices; 0 and 1 mean no slicing
    /// * `slice_field` - Field the backend slices on, backend default if `None`
    /// * `query` - Base search body, must be a JSON object
    /// * `options` - Tracing switches
    ///
    /// # Returns
    /// * `Result<Self>` - `InvalidPartition` when `slice_count >= 2` and
    ///   `slice_index >= slice_count`; `MalformedQuery` when the query cannot
    ///   take a slice clause
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        slice_index: usize,
        slice_count: usize,
        slice_field: Option<String>,
        query: &Value,
        options: CursorOptions,
    ) -> Result<Self> {
        if slice_count >= 2 && slice_index >= slice_count {
            return Err(EsExportError::InvalidPartition {
                index: slice_index,
                count: slice_count,
            });
        }

        let query = match query {
            Value::Object(map) => map.clone(),
            other => {
                return Err(EsExportError::MalformedQuery(format!(
                    "expected a JSON object, got {}",
                    json_kind(other)
                )));
            }
        };

        if slice_count > 1 && query.contains_key("slice") {
            return Err(EsExportError::MalformedQuery(
                "query already defines a slice clause".to_string(),
            ));
        }

        Ok(Self {
            backend,
            query,
            slice_index,
            slice_count,
            slice_field: slice_field.filter(|f| !f.is_empty()),
            state: CursorState::NotStarted,
            scroll_id: String::new(),
            failed: false,
            progress: Arc::new(SliceProgress::new()),
            options,
        })
    }

    /// Fetch the next batch of documents
    ///
    /// Returns an empty batch once the slice is exhausted; no request is sent
    /// in that case.
    pub async fn next(&mut self) -> Result<Vec<Hit>> {
        if self.failed {
            return Err(EsExportError::CursorFailed {
                slice: self.slice_index,
            });
        }

        let state = self.state;
        let result = match state {
            CursorState::NotStarted => self.search().await,
            CursorState::InProgress { total, retrieved } => self.scroll(total, retrieved).await,
            CursorState::Done { .. } => Ok(Vec::new()),
        };

        if result.is_err() {
            self.failed = true;
        }

        result
    }

    /// Build the body of the initial search
    ///
    /// The slice clause is only added when there is more than one slice, so an
    /// unsliced export sends the base query untouched.
    pub fn search_query(&self) -> Value {
        let mut query = self.query.clone();

        if self.slice_count > 1 {
            let mut slice = json!({
                "id": self.slice_index,
                "max": self.slice_count,
            });
            if let Some(field) = &self.slice_field {
                slice["field"] = Value::String(field.clone());
            }
            query.insert("slice".to_string(), slice);
        }

        Value::Object(query)
    }

    async fn search(&mut self) -> Result<Vec<Hit>> {
        let body = self.search_query();
        if self.options.trace_queries {
            debug!("Slice {} query: {}", self.slice_index, body);
        }

        let resp = self.backend.search(&body).await?;

        let total = resp.hits.total;
        let retrieved = resp.hits.hits.len() as u64;
        self.scroll_id = resp.scroll_id;
        self.advance(total, retrieved);

        if self.options.trace_queries {
            debug!("Slice {} total: {}", self.slice_index, total);
        }

        Ok(resp.hits.hits)
    }

    async fn scroll(&mut self, total: u64, retrieved: u64) -> Result<Vec<Hit>> {
        let resp = self.backend.scroll(&self.scroll_id).await?;

        let hits = resp.hits.hits;
        self.scroll_id = resp.scroll_id;

        if hits.is_empty() {
            warn!(
                "Slice {} ended early: {} of {} documents retrieved",
                self.slice_index, retrieved, total
            );
            self.state = CursorState::Done { total, retrieved };
            self.progress.publish(total, retrieved, true);
            return Ok(hits);
        }

        self.advance(total, retrieved + hits.len() as u64);
        Ok(hits)
    }

    fn advance(&mut self, total: u64, retrieved: u64) {
        if retrieved > total {
            warn!(
                "Slice {} returned {} documents but reported a total of {}",
                self.slice_index, retrieved, total
            );
        }
        let retrieved = retrieved.min(total);
        let done = retrieved >= total;
        self.state = if done {
            CursorState::Done { total, retrieved }
        } else {
            CursorState::InProgress { total, retrieved }
        };
        self.progress.publish(total, retrieved, done);
    }

    /// Slice handled by this cursor
    pub fn slice_index(&self) -> usize {
        self.slice_index
    }

    /// Total documents in the slice, known after the first response
    pub fn total(&self) -> Option<u64> {
        match self.state {
            CursorState::NotStarted => None,
            CursorState::InProgress { total, .. } | CursorState::Done { total, .. } => Some(total),
        }
    }

    /// Documents pulled so far, known after the first response
    pub fn retrieved(&self) -> Option<u64> {
        match self.state {
            CursorState::NotStarted => None,
            CursorState::InProgress { retrieved, .. } | CursorState::Done { retrieved, .. } => {
                Some(retrieved)
            }
        }
    }

    /// Whether every document of the slice has been returned
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, CursorState::Done { .. })
    }

    /// Whether a previous call failed
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Shared progress handle for concurrent readers
    pub fn progress(&self) -> Arc<SliceProgress> {
        Arc::clone(&self.progress)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
