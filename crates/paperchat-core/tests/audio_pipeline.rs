//! Recording through transcription with a scripted microphone.

use std::io;
use std::sync::Arc;

use paperchat_core::audio::{ActiveRecording, TRANSCRIPTION_DONE, TRANSCRIPTION_FAILED};
use paperchat_core::{
    ApiClient, AudioCapture, CaptureError, CaptureState, MemoryTokenStore, Microphone, NoticeLevel,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Emits a fixed list of chunks and then closes.
struct ScriptedMicrophone {
    chunks: Vec<Vec<u8>>,
}

impl Microphone for ScriptedMicrophone {
    fn is_available(&self) -> bool {
        true
    }

    fn open(&self) -> io::Result<ActiveRecording> {
        let (tx, rx) = tokio::sync::mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            tx.try_send(chunk.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        }
        Ok(ActiveRecording::from_channel(rx))
    }

    fn mime(&self) -> &str {
        "audio/webm"
    }

    fn file_name(&self) -> &str {
        "voice.webm"
    }
}

fn api(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::with_token("tok")))
}

#[tokio::test]
async fn test_recording_is_transcribed_into_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voice/transcribe"))
        .and(body_string_contains("name=\"audio\""))
        .and(body_string_contains("filename=\"voice.webm\""))
        .and(body_string_contains("onetwothree"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transcription": "compare the baselines"})))
        .expect(1)
        .mount(&server)
        .await;

    let mic = ScriptedMicrophone {
        chunks: vec![b"one".to_vec(), Vec::new(), b"two".to_vec(), b"three".to_vec()],
    };
    let mut capture = AudioCapture::new();
    let recording = capture.start(&mic).unwrap();
    for chunk in recording.finish().await {
        capture.push_chunk(chunk);
    }

    let mut input = "half-typed".to_string();
    let notice = capture.stop_and_transcribe(&api(&server).voice(), &mut input).await;

    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.text, TRANSCRIPTION_DONE);
    assert_eq!(input, "compare the baselines");
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[tokio::test]
async fn test_empty_recording_never_calls_transcription() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voice/transcribe"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"transcription": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let mic = ScriptedMicrophone { chunks: vec![Vec::new()] };
    let mut capture = AudioCapture::new();
    let recording = capture.start(&mic).unwrap();
    for chunk in recording.finish().await {
        capture.push_chunk(chunk);
    }

    let mut input = "keep me".to_string();
    let notice = capture.stop_and_transcribe(&api(&server).voice(), &mut input).await;

    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.text, "No audio recorded. Please try again.");
    assert_eq!(input, "keep me");
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[tokio::test]
async fn test_transcription_failure_leaves_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/voice/transcribe"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "whisper crashed"})))
        .mount(&server)
        .await;

    let mic = ScriptedMicrophone { chunks: vec![b"pcm".to_vec()] };
    let mut capture = AudioCapture::new();
    let recording = capture.start(&mic).unwrap();
    for chunk in recording.finish().await {
        capture.push_chunk(chunk);
    }

    let mut input = "draft".to_string();
    let notice = capture.stop_and_transcribe(&api(&server).voice(), &mut input).await;

    assert_eq!(notice.text, TRANSCRIPTION_FAILED);
    assert_eq!(input, "draft");
    assert_eq!(capture.state(), CaptureState::Idle);
}

#[tokio::test]
async fn test_stop_without_recording_is_rejected() {
    let mut capture = AudioCapture::new();
    assert!(matches!(capture.stop(), Err(CaptureError::NotRecording)));
    assert_eq!(capture.state(), CaptureState::Idle);
}
