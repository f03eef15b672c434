use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

const CHUNK_SIZE: usize = 8 * 1024;

pub const DEFAULT_RECORDER: [&str; 5] = ["rec", "-q", "-t", "wav", "-"];

/// An audio source the capture pipeline can record from.
pub trait Microphone: Send + Sync {
    fn is_available(&self) -> bool;

    /// Starts recording. Chunks arrive on the returned handle in order.
    fn open(&self) -> io::Result<ActiveRecording>;

    fn mime(&self) -> &str {
        "audio/wav"
    }

    fn file_name(&self) -> &str {
        "voice.wav"
    }
}

/// A running recording.
pub struct ActiveRecording {
    chunks: mpsc::Receiver<Vec<u8>>,
    child: Option<Child>,
}

impl ActiveRecording {
    /// Recording fed by something other than a child process.
    pub fn from_channel(chunks: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { chunks, child: None }
    }

    pub fn try_next_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.try_recv().ok()
    }

    pub async fn next_chunk(&mut self) -> Option<Vec<u8>> {
        self.chunks.recv().await
    }

    /// Stops the source and returns the chunks not yet taken.
    pub async fn finish(mut self) -> Vec<Vec<u8>> {
        let mut rest = Vec::new();
        match self.child.take() {
            Some(mut child) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to stop recorder: {}", e);
                }
                while let Some(chunk) = self.chunks.recv().await {
                    rest.push(chunk);
                }
            }
            None => {
                while let Ok(chunk) = self.chunks.try_recv() {
                    rest.push(chunk);
                }
            }
        }
        rest
    }
}

/// Records by running an external program that writes audio to stdout.
#[derive(Debug, Clone)]
pub struct CommandMicrophone {
    program: String,
    args: Vec<String>,
}

impl Default for CommandMicrophone {
    fn default() -> Self {
        Self {
            program: DEFAULT_RECORDER[0].to_string(),
            args: DEFAULT_RECORDER[1..].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CommandMicrophone {
    /// `command` is program plus arguments; empty falls back to the default.
    pub fn new(command: &[String]) -> Self {
        match command.split_first() {
            Some((program, args)) if !program.trim().is_empty() => Self {
                program: program.clone(),
                args: args.to_vec(),
            },
            _ => Self::default(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn resolve(&self) -> Option<PathBuf> {
        let program = Path::new(&self.program);
        if program.components().count() > 1 {
            return program.is_file().then(|| program.to_path_buf());
        }
        let paths = std::env::var_os("PATH")?;
        std::env::split_paths(&paths)
            .map(|dir| dir.join(&self.program))
            .find(|candidate| candidate.is_file())
    }
}

impl Microphone for CommandMicrophone {
    fn is_available(&self) -> bool {
        self.resolve().is_some()
    }

    fn open(&self) -> io::Result<ActiveRecording> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "recorder has no stdout"))?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Recorder read failed: {}", e);
                        break;
                    }
                }
            }
        });

        tracing::info!("Recording with {}", self.program);
        Ok(ActiveRecording {
            chunks: rx,
            child: Some(child),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_uses_default() {
        let mic = CommandMicrophone::new(&[]);
        assert_eq!(mic.program(), "rec");
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let mic = CommandMicrophone::new(&["paperchat-no-such-recorder-binary".to_string()]);
        assert!(!mic.is_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_output_is_chunked_in_order() {
        let mic = CommandMicrophone::new(&[
            "sh".to_string(),
            "-c".to_string(),
            "printf 'RIFF'; printf 'data'".to_string(),
        ]);
        assert!(mic.is_available());

        let mut recording = mic.open().unwrap();
        let mut bytes = Vec::new();
        while let Some(chunk) = recording.next_chunk().await {
            bytes.extend(chunk);
        }
        assert_eq!(bytes, b"RIFFdata");
    }
}
