//! Search backend capability
//!
//! The export engine only needs two calls from the backend: an initial
//! search that opens a scroll context, and a scroll that continues it.
//! [`SearchBackend`] captures that contract; [`EsClient`] implements it over
//! HTTP.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{EsExportError, Result};

pub mod http;

pub use http::EsClient;

/// Capability the cursors pull documents through.
///
/// Implementations must reject responses that did not come from every shard
/// (see [`Shards::ensure_complete`]).
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run the initial search and open a scroll context
    async fn search(&self, body: &Value) -> Result<SearchResponse>;

    /// Continue a scroll context
    async fn scroll(&self, scroll_id: &str) -> Result<SearchResponse>;
}

/// A document returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_source", default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Map<String, Value>>,
}

/// The `hits` part of a search response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Hits {
    #[serde(default, deserialize_with = "deserialize_total")]
    pub total: u64,

    #[serde(default)]
    pub hits: Vec<Hit>,
}

/// The `_shards` part of a search response
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Shards {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub successful: u64,
    #[serde(default)]
    pub failed: u64,
}

/// A search or scroll response
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: String,

    #[serde(default)]
    pub hits: Hits,

    #[serde(rename = "_shards", default)]
    pub shards: Shards,
}

impl Shards {
    /// Reject a response that is missing results from any shard.
    ///
    /// A partial response cannot be trusted for completeness, so it is an
    /// error rather than a short batch.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.failed == 0 && self.successful == self.total {
            Ok(())
        } else {
            Err(EsExportError::IncompleteShardResponse {
                total: self.total,
                successful: self.successful,
                failed: self.failed,
            })
        }
    }
}

impl SearchResponse {
    /// Build a response from parts, mostly useful for in-memory backends
    pub fn new(scroll_id: impl Into<String>, total: u64, hits: Vec<Hit>, shards: Shards) -> Self {
        Self {
            scroll_id: scroll_id.into(),
            hits: Hits { total, hits },
            shards,
        }
    }
}

impl Hit {
    /// Create a hit without a source document
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: None,
        }
    }

    /// Attach a source document
    pub fn with_source(mut self, source: Map<String, Value>) -> Self {
        self.source = Some(source);
        self
    }
}

/// Accept `hits.total` both as a bare count and as `{"value": n, ...}`
fn deserialize_total<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Total {
        Count(u64),
        Object { value: u64 },
    }

    Ok(match Total::deserialize(deserializer)? {
        Total::Count(n) => n,
        Total::Object { value } => value,
    })
}
