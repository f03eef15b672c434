//! Summary and knowledge-graph panels for a single document.

use std::io;
use std::path::{Path, PathBuf};

use crate::api::{ChatClient, InsightsClient};
use crate::error::{ApiError, ApiResult};
use crate::models::{Document, KnowledgeGraph};

pub const SUMMARY_LOADING: &str = "Loading...";
pub const SUMMARY_REGENERATING: &str = "Regenerating...";
pub const SUMMARY_FAILED: &str = "Failed to summarize document.";
pub const REGENERATE_FAILED: &str = "Failed to regenerate summary.";
pub const SHARE_FAILED: &str = "Failed to create shareable link.";
pub const GRAPH_FAILED: &str = "Failed to generate knowledge graph.";
pub const GRAPH_EMPTY: &str = "No entities found.";

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody<T> {
    Loading(&'static str),
    Ready(T),
    Failed(&'static str),
}

impl<T> PanelBody<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, PanelBody::Loading(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            PanelBody::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Panel body stays open on failure; the failure text replaces the content.
#[derive(Debug, Clone)]
pub struct SummaryPanel {
    pub document: Document,
    pub body: PanelBody<String>,
    pub share_url: Option<String>,
}

impl SummaryPanel {
    pub fn open(document: Document) -> Self {
        Self {
            document,
            body: PanelBody::Loading(SUMMARY_LOADING),
            share_url: None,
        }
    }

    pub fn begin_regenerate(&mut self) {
        self.body = PanelBody::Loading(SUMMARY_REGENERATING);
        self.share_url = None;
    }

    /// `regenerated` picks the failure text.
    pub fn apply(&mut self, result: ApiResult<String>, regenerated: bool) {
        self.body = match result {
            Ok(summary) => PanelBody::Ready(summary),
            Err(e) => {
                tracing::warn!("Summary for {} failed: {}", self.document.id, e);
                PanelBody::Failed(if regenerated { REGENERATE_FAILED } else { SUMMARY_FAILED })
            }
        };
    }

    pub async fn load(&mut self, insights: &InsightsClient) {
        let result = insights.summarize(&self.document.id, false).await;
        self.apply(result, false);
    }

    pub async fn regenerate(&mut self, insights: &InsightsClient) {
        self.begin_regenerate();
        let result = insights.summarize(&self.document.id, true).await;
        self.apply(result, true);
    }

    /// What the panel shows right now.
    pub fn text(&self) -> &str {
        match &self.body {
            PanelBody::Loading(text) | PanelBody::Failed(text) => text,
            PanelBody::Ready(summary) => summary,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        self.body.ready().map(String::as_str)
    }

    pub async fn share(&mut self, chat: &ChatClient) -> ApiResult<String> {
        let summary = self
            .summary()
            .ok_or_else(|| ApiError::invalid("Nothing to share yet"))?
            .to_string();
        let url = chat.share_answer(&summary).await.map_err(|e| {
            tracing::warn!("Sharing summary failed: {}", e);
            ApiError::invalid(SHARE_FAILED)
        })?;
        self.share_url = Some(url.clone());
        Ok(url)
    }

    pub fn export_file_name(&self) -> String {
        let name = &self.document.filename;
        let stem = Path::new(name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document");
        format!("{}-summary.txt", stem)
    }

    /// Writes the summary to `dir/<name>-summary.txt`.
    pub fn export(&self, dir: &Path) -> io::Result<PathBuf> {
        let summary = self
            .summary()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "No summary to export"))?;
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.export_file_name());
        std::fs::write(&path, summary)?;
        tracing::info!("Exported summary to {}", path.display());
        Ok(path)
    }
}

#[derive(Debug, Clone)]
pub struct GraphPanel {
    pub document: Document,
    pub body: PanelBody<KnowledgeGraph>,
}

impl GraphPanel {
    pub fn open(document: Document) -> Self {
        Self {
            document,
            body: PanelBody::Loading(SUMMARY_LOADING),
        }
    }

    pub fn apply(&mut self, result: ApiResult<KnowledgeGraph>) {
        self.body = match result {
            Ok(graph) => PanelBody::Ready(graph),
            Err(e) => {
                tracing::warn!("Graph for {} failed: {}", self.document.id, e);
                PanelBody::Failed(GRAPH_FAILED)
            }
        };
    }

    pub async fn load(&mut self, insights: &InsightsClient) {
        let result = insights.entities(&self.document.id).await;
        self.apply(result);
    }

    /// Text rendering: one line per entity, then one per relation.
    pub fn lines(&self) -> Vec<String> {
        match &self.body {
            PanelBody::Loading(text) | PanelBody::Failed(text) => vec![text.to_string()],
            PanelBody::Ready(graph) if graph.is_empty() => vec![GRAPH_EMPTY.to_string()],
            PanelBody::Ready(graph) => {
                let mut lines = Vec::with_capacity(graph.nodes.len() + graph.edges.len() + 3);
                lines.push(format!("Entities ({})", graph.nodes.len()));
                lines.extend(graph.nodes.iter().map(|n| format!("  • {}", n.label)));
                if !graph.edges.is_empty() {
                    lines.push(String::new());
                    lines.push(format!("Relations ({})", graph.edges.len()));
                    lines.extend(graph.edges.iter().map(|e| {
                        let relation = if e.label.is_empty() { "related to" } else { e.label.as_str() };
                        format!(
                            "  {} --{}--> {}",
                            graph.label_of(&e.source),
                            relation,
                            graph.label_of(&e.target)
                        )
                    }));
                }
                lines
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GraphEdge, GraphNode};

    fn document() -> Document {
        Document {
            id: "3".into(),
            filename: "bert.pdf".into(),
            uploaded_at: None,
            created_at: None,
            size: None,
            summary: None,
        }
    }

    #[test]
    fn test_summary_failure_texts() {
        let mut panel = SummaryPanel::open(document());
        assert_eq!(panel.text(), SUMMARY_LOADING);

        panel.apply(Err(ApiError::backend(500, "boom")), false);
        assert_eq!(panel.text(), SUMMARY_FAILED);

        panel.begin_regenerate();
        assert_eq!(panel.text(), SUMMARY_REGENERATING);
        panel.apply(Err(ApiError::backend(500, "boom")), true);
        assert_eq!(panel.text(), REGENERATE_FAILED);
        assert!(panel.summary().is_none());
    }

    #[test]
    fn test_export_writes_named_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut panel = SummaryPanel::open(document());
        assert!(panel.export(dir.path()).is_err());

        panel.apply(Ok("Masked language modelling.".into()), false);
        let path = panel.export(dir.path()).unwrap();
        assert_eq!(path.file_name().unwrap(), "bert-summary.txt");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Masked language modelling.");
    }

    #[test]
    fn test_graph_lines() {
        let mut panel = GraphPanel::open(document());
        panel.apply(Ok(KnowledgeGraph::default()));
        assert_eq!(panel.lines(), vec![GRAPH_EMPTY.to_string()]);

        panel.apply(Ok(KnowledgeGraph {
            nodes: vec![
                GraphNode { id: "a".into(), label: "BERT".into() },
                GraphNode { id: "b".into(), label: "Transformer".into() },
            ],
            edges: vec![GraphEdge { source: "a".into(), target: "b".into(), label: "builds on".into() }],
        }));
        let lines = panel.lines();
        assert_eq!(lines[0], "Entities (2)");
        assert!(lines.contains(&"  BERT --builds on--> Transformer".to_string()));

        panel.apply(Err(ApiError::backend(502, "bad gateway")));
        assert_eq!(panel.lines(), vec![GRAPH_FAILED.to_string()]);
    }
}
