//! Microphone capture feeding the transcription endpoint.
//!
//! `Idle -> Recording -> Transcribing -> Idle`. One buffer per recording,
//! concatenated once on stop and then dropped.

mod microphone;

pub use microphone::{ActiveRecording, CommandMicrophone, Microphone, DEFAULT_RECORDER};

use std::time::Instant;

use thiserror::Error;

use crate::api::VoiceClient;
use crate::error::{ApiError, ApiResult};
use crate::state::Notice;

pub const TRANSCRIPTION_FAILED: &str = "Transcription failed";
pub const TRANSCRIPTION_DONE: &str = "Speech converted to text successfully";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Recording,
    Transcribing,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Audio recording is not supported here. Install a recorder such as sox.")]
    Unsupported,

    #[error("Already recording")]
    Busy,

    #[error("Not recording")]
    NotRecording,

    #[error("No audio recorded. Please try again.")]
    NoAudio,

    #[error("Could not access microphone: {0}")]
    Device(#[from] std::io::Error),
}

impl CaptureError {
    /// Capability problems are warnings; the rest are errors.
    pub fn to_notice(&self) -> Notice {
        match self {
            CaptureError::Unsupported | CaptureError::Busy | CaptureError::Device(_) => {
                Notice::warning(self.to_string())
            }
            CaptureError::NotRecording | CaptureError::NoAudio => Notice::error(self.to_string()),
        }
    }
}

/// One complete recording ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub bytes: Vec<u8>,
    pub mime: String,
    pub filename: String,
}

impl AudioPayload {
    pub fn new(bytes: Vec<u8>, mime: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            mime: mime.into(),
            filename: filename.into(),
        }
    }
}

pub struct AudioCapture {
    state: CaptureState,
    chunks: Vec<Vec<u8>>,
    started_at: Option<Instant>,
    mime: String,
    filename: String,
}

impl Default for AudioCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCapture {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Idle,
            chunks: Vec::new(),
            started_at: None,
            mime: "audio/wav".to_string(),
            filename: "voice.wav".to_string(),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    pub fn is_transcribing(&self) -> bool {
        self.state == CaptureState::Transcribing
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started_at.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }

    pub fn start(&mut self, microphone: &dyn Microphone) -> Result<ActiveRecording, CaptureError> {
        if self.state != CaptureState::Idle {
            return Err(CaptureError::Busy);
        }
        if !microphone.is_available() {
            return Err(CaptureError::Unsupported);
        }
        let recording = microphone.open()?;
        self.chunks.clear();
        self.mime = microphone.mime().to_string();
        self.filename = microphone.file_name().to_string();
        self.started_at = Some(Instant::now());
        self.state = CaptureState::Recording;
        Ok(recording)
    }

    /// Zero-length chunks and chunks arriving outside a recording are ignored.
    pub fn push_chunk(&mut self, chunk: Vec<u8>) {
        if self.state == CaptureState::Recording && !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Ends the recording. The buffer is cleared whatever the outcome; an
    /// empty recording goes straight back to idle.
    pub fn stop(&mut self) -> Result<AudioPayload, CaptureError> {
        if self.state != CaptureState::Recording {
            return Err(CaptureError::NotRecording);
        }
        let chunks = std::mem::take(&mut self.chunks);
        self.started_at = None;

        if chunks.is_empty() {
            self.state = CaptureState::Idle;
            tracing::debug!("Recording stopped with no audio");
            return Err(CaptureError::NoAudio);
        }

        self.state = CaptureState::Transcribing;
        let bytes = chunks.concat();
        tracing::debug!("Recording stopped: {} chunks, {} bytes", chunks.len(), bytes.len());
        Ok(AudioPayload::new(bytes, self.mime.clone(), self.filename.clone()))
    }

    /// Applies the transcription result. Success overwrites `input`
    /// entirely; failure leaves it alone. Returns `None` for a cancelled
    /// request.
    pub fn finish_transcription(&mut self, result: ApiResult<String>, input: &mut String) -> Option<Notice> {
        self.state = CaptureState::Idle;
        match result {
            Ok(text) => {
                *input = text;
                Some(Notice::success(TRANSCRIPTION_DONE))
            }
            Err(ApiError::Cancelled) => None,
            Err(e) => {
                tracing::warn!("Transcription failed: {}", e);
                Some(Notice::error(TRANSCRIPTION_FAILED))
            }
        }
    }

    /// Drops the recording without transcribing.
    pub fn abort(&mut self) {
        self.chunks.clear();
        self.started_at = None;
        self.state = CaptureState::Idle;
    }

    /// `stop` followed by the upload, for callers that can await in place.
    pub async fn stop_and_transcribe(&mut self, voice: &VoiceClient, input: &mut String) -> Notice {
        let payload = match self.stop() {
            Ok(payload) => payload,
            Err(e) => return e.to_notice(),
        };
        let result = voice.transcribe(&payload).await;
        self.finish_transcription(result, input)
            .unwrap_or_else(|| Notice::info("Transcription cancelled"))
    }
}
