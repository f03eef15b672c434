//! Summary and graph panels backed by a mock backend.

use std::sync::Arc;

use paperchat_core::panels::{GRAPH_EMPTY, GRAPH_FAILED, SHARE_FAILED, SUMMARY_FAILED};
use paperchat_core::{ApiClient, Document, GraphPanel, MemoryTokenStore, PanelBody, SummaryPanel};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::with_token("tok")))
}

fn document() -> Document {
    serde_json::from_value(json!({"id": 11, "filename": "resnet.pdf"})).unwrap()
}

#[tokio::test]
async fn test_summary_load_and_regenerate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pdf/summarize"))
        .and(body_json(json!({"pdf_id": 11, "force": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": "Residual connections."})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pdf/summarize"))
        .and(body_json(json!({"pdf_id": 11, "force": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"summary": "Deeper nets train better."})))
        .expect(1)
        .mount(&server)
        .await;

    let insights = api(&server).insights();
    let mut panel = SummaryPanel::open(document());
    assert!(panel.body.is_loading());

    panel.load(&insights).await;
    assert_eq!(panel.summary(), Some("Residual connections."));

    panel.regenerate(&insights).await;
    assert_eq!(panel.summary(), Some("Deeper nets train better."));
}

#[tokio::test]
async fn test_summary_failure_keeps_panel_open() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pdf/summarize"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "model overloaded"})))
        .mount(&server)
        .await;

    let mut panel = SummaryPanel::open(document());
    panel.load(&api(&server).insights()).await;
    assert_eq!(panel.body, PanelBody::Failed(SUMMARY_FAILED));
    assert_eq!(panel.text(), "Failed to summarize document.");
}

#[tokio::test]
async fn test_summary_share() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/qa/answershare"))
        .and(body_json(json!({"answer": "Residual connections."})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"url": "http://localhost:3000/shared/xyz"})))
        .expect(1)
        .mount(&server)
        .await;

    let chat = api(&server).chat();
    let mut panel = SummaryPanel::open(document());
    panel.apply(Ok("Residual connections.".into()), false);

    let url = panel.share(&chat).await.unwrap();
    assert_eq!(url, "http://localhost:3000/shared/xyz");
    assert_eq!(panel.share_url.as_deref(), Some(url.as_str()));
}

#[tokio::test]
async fn test_summary_share_failure_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/qa/answershare"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut panel = SummaryPanel::open(document());
    panel.apply(Ok("text".into()), false);
    let err = panel.share(&api(&server).chat()).await.unwrap_err();
    assert_eq!(err.to_string(), SHARE_FAILED);
}

#[tokio::test]
async fn test_graph_panel_states() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pdf/entities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"graph": {"nodes": [], "edges": []}})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/pdf/entities"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let insights = api(&server).insights();
    let mut panel = GraphPanel::open(document());

    panel.load(&insights).await;
    assert_eq!(panel.lines(), vec![GRAPH_EMPTY.to_string()]);

    panel.load(&insights).await;
    assert_eq!(panel.lines(), vec![GRAPH_FAILED.to_string()]);
}
