use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::opt_id_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the chat log, in the shape the history endpoint stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "new_message_id")]
    pub id: String,
    #[serde(rename = "type", alias = "role")]
    pub role: ChatRole,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(rename = "model", default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
    #[serde(
        rename = "pdf_id",
        default,
        deserialize_with = "opt_id_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub document_id: Option<String>,
}

fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, document_id: Option<String>) -> Self {
        Self {
            id: new_message_id(),
            role: ChatRole::User,
            content: content.into(),
            timestamp: now_timestamp(),
            model_id: None,
            sources: None,
            document_id,
        }
    }

    pub fn assistant(content: impl Into<String>, model_id: Option<String>) -> Self {
        Self {
            id: new_message_id(),
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: now_timestamp(),
            model_id,
            sources: None,
            document_id: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == ChatRole::User
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient message for the user (toast in the terminal UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }
}

/// Which documents a question is asked against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DocumentScope {
    #[default]
    All,
    Document(String),
}

impl DocumentScope {
    pub fn document_id(&self) -> Option<&str> {
        match self {
            DocumentScope::All => None,
            DocumentScope::Document(id) => Some(id),
        }
    }
}
