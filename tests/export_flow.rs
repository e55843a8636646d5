//! End-to-end export against a mocked cluster

use std::sync::Arc;

use esexport::config::ConnectionConfig;
use esexport::export::{ExportCoordinator, ExportPlan, JsonLWriter};
use esexport::{EsClient, EsExportError, Hit};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn connection(host: &str) -> ConnectionConfig {
    ConnectionConfig {
        host: host.to_string(),
        index: "logs".to_string(),
        scroll_ttl: "1m".to_string(),
        timeout: 5,
        ..Default::default()
    }
}

fn page(scroll_id: &str, total: u64, ids: &[&str]) -> ResponseTemplate {
    let hits: Vec<_> = ids
        .iter()
        .map(|id| json!({ "_id": id, "_source": { "id": id } }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({
        "_scroll_id": scroll_id,
        "hits": { "total": total, "hits": hits },
        "_shards": { "total": 2, "successful": 2, "failed": 0 }
    }))
}

#[tokio::test]
async fn test_sliced_export_to_file() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/logs/_search"))
        .and(body_partial_json(json!({ "slice": { "id": 0, "max": 2 } })))
        .respond_with(page("s0-1", 3, &["a1", "a2"]))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_search/scroll"))
        .and(body_partial_json(json!({ "scroll_id": "s0-1" })))
        .respond_with(page("s0-2", 3, &["a3"]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/logs/_search"))
        .and(body_partial_json(json!({ "slice": { "id": 1, "max": 2 } })))
        .respond_with(page("s1-1", 1, &["b1"]))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("export.jsonl");

    let backend = Arc::new(EsClient::new(&connection(&server.uri())).unwrap());
    let sink = Arc::new(JsonLWriter::new(&out).await.unwrap());
    let plan = ExportPlan {
        slices: 2,
        slice_field: None,
        query: json!({ "size": 2 }),
    };

    let report = ExportCoordinator::new(backend, plan, sink)
        .execute()
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.documents_exported, 4);

    let content = std::fs::read_to_string(&out).unwrap();
    let mut ids: Vec<String> = content
        .lines()
        .map(|line| serde_json::from_str::<Hit>(line).unwrap().id)
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a1", "a2", "a3", "b1"]);
}

#[tokio::test]
async fn test_partial_failure_keeps_successful_slice() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/logs/_search"))
        .and(body_partial_json(json!({ "slice": { "id": 0 } })))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/logs/_search"))
        .and(body_partial_json(json!({ "slice": { "id": 1 } })))
        .respond_with(page("s1-1", 1, &["b1"]))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("export.jsonl");

    let backend = Arc::new(EsClient::new(&connection(&server.uri())).unwrap());
    let sink = Arc::new(JsonLWriter::new(&out).await.unwrap());
    let plan = ExportPlan {
        slices: 2,
        slice_field: Some("date".to_string()),
        query: json!({}),
    };

    let report = ExportCoordinator::new(backend, plan, sink)
        .execute()
        .await
        .unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.partitions[0].result,
        Err(EsExportError::Transport(_))
    ));
    assert!(report.partitions[1].result.is_ok());

    let content = std::fs::read_to_string(&out).unwrap();
    assert_eq!(content, "{\"_id\":\"b1\",\"_source\":{\"id\":\"b1\"}}\n");
}
