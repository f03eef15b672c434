use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::{AuthClient, ChatClient, DocumentsClient, InsightsClient, VoiceClient};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::token_store::TokenStore;

/// Shared HTTP plumbing for every backend resource.
///
/// Cloning is cheap; clones share the connection pool and the token store.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        }
    }

    pub fn with_timeout(
        base_url: &str,
        tokens: Arc<dyn TokenStore>,
        timeout: Option<Duration>,
    ) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn from_config(config: &Config, tokens: Arc<dyn TokenStore>) -> ApiResult<Self> {
        Self::with_timeout(
            &config.api_base_url,
            tokens,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn auth(&self) -> AuthClient {
        AuthClient::new(self.clone())
    }

    pub fn documents(&self) -> DocumentsClient {
        DocumentsClient::new(self.clone())
    }

    pub fn chat(&self) -> ChatClient {
        ChatClient::new(self.clone())
    }

    pub fn voice(&self) -> VoiceClient {
        VoiceClient::new(self.clone())
    }

    pub fn insights(&self) -> InsightsClient {
        InsightsClient::new(self.clone())
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request without credentials (login, register, shared answers).
    pub(crate) fn public(&self, method: Method, path: &str) -> RequestBuilder {
        tracing::debug!("{} {}", method, path);
        self.client.request(method, self.url(path))
    }

    /// Like [`public`](Self::public), with `segment` percent-encoded and
    /// appended as one path segment under `prefix`.
    pub(crate) fn public_segment(
        &self,
        method: Method,
        prefix: &str,
        segment: &str,
    ) -> ApiResult<RequestBuilder> {
        let mut url = Url::parse(&self.url(prefix))
            .map_err(|e| ApiError::invalid(format!("invalid backend url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::invalid("backend url cannot take a path"))?
            .pop_if_empty()
            .push(segment);
        tracing::debug!("{} {}", method, url.path());
        Ok(self.client.request(method, url))
    }

    /// Request carrying the stored bearer token. Fails locally when there is
    /// no token, so nothing goes over the wire.
    pub(crate) fn authed(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let token = self.tokens.get().ok_or(ApiError::NotAuthenticated)?;
        Ok(self.public(method, path).bearer_auth(token))
    }

    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = Self::check(request.send().await?).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Response did not match schema: {}", e);
            ApiError::Decode(e.to_string())
        })
    }

    pub(crate) async fn send_empty(&self, request: RequestBuilder) -> ApiResult<()> {
        Self::check(request.send().await?).await?;
        Ok(())
    }

    pub(crate) async fn send_bytes(&self, request: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = normalize_error(status, &body);
        tracing::warn!("Backend returned {}: {}", status, message);
        Err(ApiError::backend(status.as_u16(), message))
    }
}

/// Picks the human-readable message out of a backend error body.
///
/// The backend is inconsistent about the key, so `error`, `msg` and
/// `message` are tried in that order before falling back to the status text.
pub fn normalize_error(status: StatusCode, body: &str) -> String {
    let from_body = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["error", "msg", "message"].iter().find_map(|key| {
                value
                    .get(*key)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .map(str::to_string)
            })
        });

    from_body.unwrap_or_else(|| {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
    })
}

/// Races `fut` against `token`; a cancelled view never sees the result.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> ApiResult<T>
where
    F: Future<Output = ApiResult<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;

    #[test]
    fn test_normalize_error_key_precedence() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(normalize_error(status, r#"{"error": "Invalid credentials"}"#), "Invalid credentials");
        assert_eq!(normalize_error(status, r#"{"msg": "Missing Authorization Header"}"#), "Missing Authorization Header");
        assert_eq!(normalize_error(status, r#"{"message": "Email exists"}"#), "Email exists");
        assert_eq!(normalize_error(status, r#"{"msg": "second", "error": "first"}"#), "first");
        assert_eq!(normalize_error(status, "<html>oops</html>"), "Bad Request");
        assert_eq!(normalize_error(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": ""}"#), "Internal Server Error");
    }

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("http://localhost:5000/api/", Arc::new(MemoryTokenStore::new()));
        assert_eq!(client.url("/pdf/documents"), "http://localhost:5000/api/pdf/documents");
        assert_eq!(client.url("qa/ask"), "http://localhost:5000/api/qa/ask");
    }

    #[test]
    fn test_authed_request_requires_token() {
        let client = ApiClient::new("http://localhost:5000/api", Arc::new(MemoryTokenStore::new()));
        let err = client.authed(Method::GET, "/auth/user").unwrap_err();
        assert!(matches!(err, ApiError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_cancellable_returns_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result: ApiResult<()> = cancellable(&token, std::future::pending()).await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
