use reqwest::multipart::{Form, Part};
use reqwest::Method;

use super::ApiClient;
use crate::audio::AudioPayload;
use crate::error::ApiResult;
use crate::models::TranscriptionResponse;

#[derive(Clone)]
pub struct VoiceClient {
    api: ApiClient,
}

impl VoiceClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn transcribe(&self, payload: &AudioPayload) -> ApiResult<String> {
        let part = Part::bytes(payload.bytes.clone())
            .file_name(payload.filename.clone())
            .mime_str(&payload.mime)?;
        let request = self
            .api
            .authed(Method::POST, "/voice/transcribe")?
            .multipart(Form::new().part("audio", part));
        tracing::debug!("Transcribing {} bytes of {}", payload.bytes.len(), payload.mime);
        let response: TranscriptionResponse = self.api.send_json(request).await?;
        Ok(response.transcription)
    }
}
