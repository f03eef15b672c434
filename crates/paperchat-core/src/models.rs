//! Wire schemas for backend requests and responses.
//!
//! Every response is decoded into one of these explicit types at the client
//! boundary. Ids are integers in the backend but are carried as strings here,
//! so the deserializers accept either form.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Int(n) => n.to_string(),
            RawId::Text(s) => s,
        }
    }
}

pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(String::from)
}

pub(crate) fn opt_id_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Backend ids go out as integers when they look like one.
pub(crate) fn wire_id(id: &str) -> serde_json::Value {
    id.parse::<i64>()
        .map(serde_json::Value::from)
        .unwrap_or_else(|_| serde_json::Value::from(id))
}

/// Parses the timestamp formats the backend emits (RFC 3339 or naive ISO).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        match (self.first_name.as_deref(), self.last_name.as_deref()) {
            (Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            _ if !self.username.is_empty() => self.username.clone(),
            _ => self.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Registration {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl Registration {
    /// Local checks before sending; the backend repeats them.
    pub fn validate(&self) -> Result<(), String> {
        let required = [
            &self.username,
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.password,
            &self.confirm_password,
        ];
        if required.iter().any(|field| field.trim().is_empty()) {
            return Err("All fields are required".to_string());
        }
        if self.password != self.confirm_password {
            return Err("Passwords do not match".to_string());
        }
        Ok(())
    }
}

/// Fields sent to `PATCH /auth/user`; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

/// Generic `{message}` / `{msg}` acknowledgement body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ack {
    #[serde(default, alias = "msg")]
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, rename = "pdf_size", deserialize_with = "lenient_u64")]
    pub size: Option<u64>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Document {
    /// Display title; the backend has no separate title field.
    pub fn title(&self) -> &str {
        &self.filename
    }

    pub fn uploaded(&self) -> Option<DateTime<Utc>> {
        self.uploaded_at.as_deref().and_then(parse_timestamp)
    }

    pub fn size_label(&self) -> String {
        match self.size {
            Some(bytes) if bytes >= 1024 * 1024 => format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0)),
            Some(bytes) if bytes >= 1024 => format!("{:.0} KB", bytes as f64 / 1024.0),
            Some(bytes) => format!("{} B", bytes),
            None => "-".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DocumentList {
    #[serde(default)]
    pub document: Vec<Document>,
}

/// Newest first, at most `limit` entries.
pub fn recent_documents(documents: &[Document], limit: usize) -> Vec<Document> {
    let mut docs = documents.to_vec();
    docs.sort_by(|a, b| b.uploaded().cmp(&a.uploaded()));
    docs.truncate(limit);
    docs
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    pub pdf_id: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
}

// ---------------------------------------------------------------------------
// Q&A, summaries, graphs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    pub question: String,
    pub pdf_id: serde_json::Value,
    pub llm_model: String,
    pub prompt_style: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryResponse {
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TranscriptionResponse {
    pub transcription: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ShareResponse {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharedAnswer {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUsage {
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Deserialize)]
struct RawNode {
    #[serde(default, deserialize_with = "opt_id_string")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    #[serde(default, deserialize_with = "opt_id_string")]
    source: Option<String>,
    #[serde(default, deserialize_with = "opt_id_string")]
    target: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawGraph {
    #[serde(default)]
    nodes: Vec<RawNode>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphResponse {
    #[serde(default)]
    pub graph: RawGraph,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

/// Entities and relations extracted from one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    /// Drops nodes without an id, duplicate nodes, and edges whose
    /// endpoints are not nodes of the graph.
    pub(crate) fn from_raw(raw: RawGraph) -> Self {
        let mut seen = HashSet::new();
        let nodes: Vec<GraphNode> = raw
            .nodes
            .into_iter()
            .filter_map(|n| {
                let id = n.id.or_else(|| n.name.clone())?;
                let label = n.label.or(n.name).unwrap_or_else(|| id.clone());
                seen.insert(id.clone()).then_some(GraphNode { id, label })
            })
            .collect();

        let edges = raw
            .edges
            .into_iter()
            .filter_map(|e| {
                let source = e.source?;
                let target = e.target?;
                (seen.contains(&source) && seen.contains(&target)).then(|| GraphEdge {
                    source,
                    target,
                    label: e.label.unwrap_or_default(),
                })
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn label_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.label.as_str())
            .unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_accepts_integer_ids() {
        let doc: Document = serde_json::from_str(
            r#"{"id": 7, "filename": "attention.pdf", "uploaded_at": "2024-05-01T10:00:00", "pdf_size": 2048, "summary": ""}"#,
        )
        .unwrap();
        assert_eq!(doc.id, "7");
        assert_eq!(doc.title(), "attention.pdf");
        assert_eq!(doc.size_label(), "2 KB");
        assert!(doc.uploaded().is_some());
    }

    #[test]
    fn test_user_requires_id() {
        let err = serde_json::from_str::<User>(r#"{"msg": "Missing Authorization Header"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_user_display_name() {
        let user: User = serde_json::from_str(
            r#"{"id": 1, "username": "ada", "email": "ada@example.com", "first_name": "Ada", "last_name": "Lovelace"}"#,
        )
        .unwrap();
        assert_eq!(user.display_name(), "Ada Lovelace");

        let bare: User = serde_json::from_str(r#"{"id": "2", "username": "bob"}"#).unwrap();
        assert_eq!(bare.display_name(), "bob");
    }

    #[test]
    fn test_registration_validation() {
        let mut form = Registration {
            username: "ada".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            password: "Secret#123".into(),
            confirm_password: "Secret#124".into(),
        };
        assert_eq!(form.validate().unwrap_err(), "Passwords do not match");
        form.confirm_password = form.password.clone();
        assert!(form.validate().is_ok());
        form.email.clear();
        assert_eq!(form.validate().unwrap_err(), "All fields are required");
    }

    #[test]
    fn test_graph_validation_drops_dangling_edges() {
        let raw: RawGraph = serde_json::from_value(serde_json::json!({
            "nodes": [
                {"id": "transformer", "label": "Transformer"},
                {"name": "attention"},
                {"id": "transformer", "label": "Duplicate"},
                {"label": "no id"}
            ],
            "edges": [
                {"source": "transformer", "target": "attention", "label": "uses"},
                {"source": "transformer", "target": "rnn", "label": "replaces"}
            ]
        }))
        .unwrap();

        let graph = KnowledgeGraph::from_raw(raw);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].label, "attention");
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.label_of("transformer"), "Transformer");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-01-02T03:04:05.678Z").is_some());
        assert!(parse_timestamp("2024-01-02T03:04:05.123456").is_some());
        assert!(parse_timestamp("2024-01-02 03:04:05").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_recent_documents_sorted_newest_first() {
        let doc = |id: &str, at: &str| Document {
            id: id.into(),
            filename: format!("{}.pdf", id),
            uploaded_at: Some(at.into()),
            created_at: None,
            size: None,
            summary: None,
        };
        let docs = vec![
            doc("a", "2024-01-01T00:00:00"),
            doc("b", "2024-03-01T00:00:00"),
            doc("c", "2024-02-01T00:00:00"),
        ];
        let recent = recent_documents(&docs, 2);
        assert_eq!(recent.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
