//! HTTP implementation of [`SearchBackend`].

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::config::ConnectionConfig;
use crate::error::{Result, TransportError};

use super::{SearchBackend, SearchResponse};

/// Client for the search and scroll endpoints of an Elasticsearch cluster
#[derive(Debug, Clone)]
pub struct EsClient {
    http: reqwest::Client,
    base: Url,
    index: String,
    doc_type: String,
    routing: String,
    scroll_ttl: String,
}

impl EsClient {
    /// Create a client from connection settings
    ///
    /// # Arguments
    /// * `config` - Connection settings; `host` must be an absolute URL
    ///
    /// # Returns
    /// * `Result<Self>` - New client or `TransportError::InvalidHost`
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Self::with_http_client(http, config)
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(http: reqwest::Client, config: &ConnectionConfig) -> Result<Self> {
        let base = match Url::parse(&config.host) {
            Ok(url) if url.has_host() => url,
            _ => return Err(TransportError::InvalidHost(config.host.clone()).into()),
        };

        Ok(Self {
            http,
            base,
            index: config.index.clone(),
            doc_type: config.doc_type.clone(),
            routing: config.routing.clone(),
            scroll_ttl: config.scroll_ttl.clone(),
        })
    }

    /// Base URL with `suffix` appended to its path
    fn endpoint(&self, suffix: &str) -> Url {
        let mut url = self.base.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), suffix);
        url.set_path(&path);
        url.set_query(None);
        url
    }

    /// URL of the initial search request
    ///
    /// When only a document type is set, the index segment becomes `*`.
    pub fn search_url(&self) -> Url {
        let mut suffix = String::new();

        if !self.index.is_empty() {
            suffix.push('/');
            suffix.push_str(&self.index);
        } else if !self.doc_type.is_empty() {
            suffix.push_str("/*");
        }

        if !self.doc_type.is_empty() {
            suffix.push('/');
            suffix.push_str(&self.doc_type);
        }

        suffix.push_str("/_search");
        let mut url = self.endpoint(&suffix);

        // Sorted by key: routing, scroll
        let params = [("routing", &self.routing), ("scroll", &self.scroll_ttl)];
        if params.iter().any(|(_, v)| !v.is_empty()) {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in params.iter().filter(|(_, v)| !v.is_empty()) {
                pairs.append_pair(key, value);
            }
        }

        url
    }

    /// URL of every scroll continuation request
    pub fn scroll_url(&self) -> Url {
        self.endpoint("/_search/scroll")
    }

    async fn post(&self, url: Url, body: &Value) -> Result<SearchResponse> {
        let resp = self.http.post(url).json(body).send().await?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = match resp.text().await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Error reading response: {}", e);
                    String::new()
                }
            };
            warn!("Bad response content: {}", body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: SearchResponse = resp.json().await?;

        parsed.shards.ensure_complete()?;
        Ok(parsed)
    }
}

#[async_trait]
impl SearchBackend for EsClient {
    async fn search(&self, body: &Value) -> Result<SearchResponse> {
        let url = self.search_url();
        debug!("POST {}", url);
        self.post(url, body).await
    }

    async fn scroll(&self, scroll_id: &str) -> Result<SearchResponse> {
        let body = json!({ "scroll": self.scroll_ttl, "scroll_id": scroll_id });
        self.post(self.scroll_url(), &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EsExportError;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connection(host: &str, index: &str, doc_type: &str, routing: &str, ttl: &str) -> ConnectionConfig {
        ConnectionConfig {
            host: host.to_string(),
            index: index.to_string(),
            doc_type: doc_type.to_string(),
            routing: routing.to_string(),
            scroll_ttl: ttl.to_string(),
            timeout: 5,
        }
    }

    #[test]
    fn test_new_rejects_invalid_host() {
        let result = EsClient::new(&connection("invalid-url", "index", "", "", "1m"));
        assert!(matches!(
            result,
            Err(EsExportError::Transport(TransportError::InvalidHost(_)))
        ));
    }

    #[test]
    fn test_search_url_matrix() {
        let host = "http://localhost:9200";
        let cases = [
            ("", "", "", "", "http://localhost:9200/_search"),
            ("my_index", "", "", "", "http://localhost:9200/my_index/_search"),
            ("", "my_type", "", "", "http://localhost:9200/*/my_type/_search"),
            ("my_index", "my_type", "", "", "http://localhost:9200/my_index/my_type/_search"),
            (
                "my_index",
                "my_type",
                "my_routing",
                "",
                "http://localhost:9200/my_index/my_type/_search?routing=my_routing",
            ),
            (
                "my_index",
                "my_type",
                "",
                "1m",
                "http://localhost:9200/my_index/my_type/_search?scroll=1m",
            ),
            (
                "my_index",
                "my_type",
                "my_routing",
                "1m",
                "http://localhost:9200/my_index/my_type/_search?routing=my_routing&scroll=1m",
            ),
        ];

        for (index, doc_type, routing, ttl, expected) in cases {
            let client = EsClient::new(&connection(host, index, doc_type, routing, ttl)).unwrap();
            assert_eq!(client.search_url().as_str(), expected);
        }
    }

    #[test]
    fn test_routing_is_encoded() {
        let client =
            EsClient::new(&connection("http://es:9200/", "", "", "a b&c", "")).unwrap();
        assert_eq!(client.search_url().as_str(), "http://es:9200/_search?routing=a+b%26c");
        assert_eq!(client.scroll_url().as_str(), "http://es:9200/_search/scroll");
    }

    #[tokio::test]
    async fn test_search_posts_body_and_decodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs/_search"))
            .and(query_param("scroll", "1m"))
            .and(body_json(json!({ "size": 10 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "abc",
                "hits": { "total": 1, "hits": [{ "_id": "1", "_source": { "a": 1 } }] },
                "_shards": { "total": 1, "successful": 1, "failed": 0 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EsClient::new(&connection(&server.uri(), "logs", "", "", "1m")).unwrap();
        let resp = client.search(&json!({ "size": 10 })).await.unwrap();

        assert_eq!(resp.scroll_id, "abc");
        assert_eq!(resp.hits.total, 1);
        assert_eq!(resp.hits.hits[0].id, "1");
    }

    #[tokio::test]
    async fn test_scroll_sends_ttl_and_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/_search/scroll"))
            .and(body_json(json!({ "scroll": "5m", "scroll_id": "abc" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "def",
                "hits": { "total": 2, "hits": [{ "_id": "2" }] },
                "_shards": { "total": 1, "successful": 1, "failed": 0 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = EsClient::new(&connection(&server.uri(), "", "", "", "5m")).unwrap();
        let resp = client.scroll("abc").await.unwrap();

        assert_eq!(resp.scroll_id, "def");
        assert_eq!(resp.hits.hits, vec![crate::client::Hit::new("2")]);
    }

    #[tokio::test]
    async fn test_non_200_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = EsClient::new(&connection(&server.uri(), "", "", "", "1m")).unwrap();
        let err = client.search(&json!({})).await.unwrap_err();

        match err {
            EsExportError::Transport(TransportError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = EsClient::new(&connection(&server.uri(), "", "", "", "1m")).unwrap();
        let err = client.search(&json!({})).await.unwrap_err();

        assert!(matches!(err, EsExportError::Transport(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_partial_shards_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_scroll_id": "abc",
                "hits": { "total": 1, "hits": [] },
                "_shards": { "total": 2, "successful": 1, "failed": 1 }
            })))
            .mount(&server)
            .await;

        let client = EsClient::new(&connection(&server.uri(), "", "", "", "1m")).unwrap();
        let err = client.search(&json!({})).await.unwrap_err();

        assert!(matches!(err, EsExportError::IncompleteShardResponse { .. }));
    }
}
