use reqwest::Method;

use super::ApiClient;
use crate::error::ApiResult;
use crate::models::{wire_id, GraphResponse, KnowledgeGraph, SummaryResponse};

/// Document summaries and entity graphs.
#[derive(Clone)]
pub struct InsightsClient {
    api: ApiClient,
}

impl InsightsClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    /// `force` asks the backend to regenerate instead of returning its cache.
    pub async fn summarize(&self, document_id: &str, force: bool) -> ApiResult<String> {
        let request = self
            .api
            .authed(Method::POST, "/pdf/summarize")?
            .json(&serde_json::json!({ "pdf_id": wire_id(document_id), "force": force }));
        let response: SummaryResponse = self.api.send_json(request).await?;
        Ok(response.summary)
    }

    pub async fn entities(&self, document_id: &str) -> ApiResult<KnowledgeGraph> {
        let request = self
            .api
            .authed(Method::POST, "/pdf/entities")?
            .json(&serde_json::json!({ "pdf_id": wire_id(document_id) }));
        let response: GraphResponse = self.api.send_json(request).await?;
        let graph = KnowledgeGraph::from_raw(response.graph);
        tracing::debug!(
            "Graph for {}: {} nodes, {} edges",
            document_id,
            graph.nodes.len(),
            graph.edges.len()
        );
        Ok(graph)
    }
}
