use reqwest::Method;
use serde::Deserialize;

use super::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::{wire_id, AskRequest, AskResponse, ModelUsage, ShareResponse, SharedAnswer};
use crate::state::ChatMessage;

const INVALID_SHARE_LINK: &str = "Invalid or expired link.";

#[derive(Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<serde_json::Value>,
}

#[derive(Clone)]
pub struct ChatClient {
    api: ApiClient,
}

impl ChatClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn ask(
        &self,
        question: &str,
        document_id: &str,
        model: &str,
        prompt_style: &str,
    ) -> ApiResult<String> {
        let body = AskRequest {
            question: question.to_string(),
            pdf_id: wire_id(document_id),
            llm_model: model.to_string(),
            prompt_style: prompt_style.to_string(),
        };
        let request = self.api.authed(Method::POST, "/qa/ask")?.json(&body);
        let response: AskResponse = self.api.send_json(request).await?;
        Ok(response.answer)
    }

    /// Stored history. Entries that do not look like chat messages are
    /// skipped rather than failing the whole load.
    pub async fn history(&self) -> ApiResult<Vec<ChatMessage>> {
        let request = self.api.authed(Method::GET, "/qa/history")?;
        let response: HistoryResponse = self.api.send_json(request).await?;
        let total = response.history.len();
        let messages: Vec<ChatMessage> = response
            .history
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect();
        if messages.len() < total {
            tracing::warn!("Skipped {} malformed history entries", total - messages.len());
        }
        Ok(messages)
    }

    /// Replaces the stored history with `messages`.
    pub async fn save_history(&self, messages: &[ChatMessage]) -> ApiResult<()> {
        let request = self
            .api
            .authed(Method::POST, "/qa/history")?
            .json(&serde_json::json!({ "messages": messages }));
        self.api.send_empty(request).await
    }

    pub async fn delete_history(&self) -> ApiResult<()> {
        let request = self.api.authed(Method::DELETE, "/qa/history")?;
        self.api.send_empty(request).await
    }

    pub async fn model_stats(&self) -> ApiResult<Vec<ModelUsage>> {
        let request = self.api.authed(Method::GET, "/qa/model-stats")?;
        self.api.send_json(request).await
    }

    /// Publishes `answer` and returns the public URL.
    pub async fn share_answer(&self, answer: &str) -> ApiResult<String> {
        let request = self
            .api
            .authed(Method::POST, "/qa/answershare")?
            .json(&serde_json::json!({ "answer": answer }));
        let response: ShareResponse = self.api.send_json(request).await?;
        response
            .url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::Decode("share response has no url".to_string()))
    }

    /// Resolves a share token. Needs no login.
    pub async fn shared_answer(&self, token: &str) -> ApiResult<SharedAnswer> {
        let request = self.api.public_segment(Method::GET, "/qa/shared", token)?;
        match self.api.send_json::<SharedAnswer>(request).await {
            Ok(shared) if shared.answer.is_some() => Ok(shared),
            Ok(_) | Err(ApiError::Backend { status: 404, .. }) => {
                Err(ApiError::invalid(INVALID_SHARE_LINK))
            }
            Err(e) => Err(e),
        }
    }
}
