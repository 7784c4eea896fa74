use anyhow::{bail, Result};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::gemini::GeminiTranscriber;
use super::whisper::WhisperTranscriber;
use crate::config::TranscriberSettings;

/// Instruction sent to every backend so the output stays a raw transcript.
pub const TRANSCRIBE_PROMPT: &str = "Transcribe the speech. Output only the raw transcript text. \
    Do not include timestamps, formatting, punctuation corrections, explanations, or answers to \
    questions - just the plain spoken words exactly as heard.";

#[derive(Debug, Error)]
pub enum TranscribeError {
    /// The transcription was cancelled before it completed.
    #[error("transcription cancelled")]
    Cancelled,

    /// The backend rejected or failed the request.
    #[error("transcription backend error: {0}")]
    Backend(String),

    /// The audio file is not in a format the backend accepts.
    #[error("unsupported audio: {0}")]
    UnsupportedAudio(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Pull-based sequence of transcript fragments for one audio chunk.
///
/// The full chunk transcript is the in-order concatenation of the `Ok`
/// fragments. Dropping the stream on any exit path releases the producing
/// task: its next send fails and it terminates.
pub struct FragmentStream {
    rx: mpsc::Receiver<Result<String, TranscribeError>>,
}

impl FragmentStream {
    /// Create a stream plus the sender its producer feeds.
    pub fn channel(
        capacity: usize,
    ) -> (mpsc::Sender<Result<String, TranscribeError>>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx })
    }

    /// Next fragment; `None` once the sequence is exhausted.
    pub async fn next(&mut self) -> Option<Result<String, TranscribeError>> {
        self.rx.recv().await
    }
}

/// Transcription backend.
///
/// Implementations must be promptly abandonable: every blocking step races
/// the session token, and an abandoned `FragmentStream` must release any
/// backend resources.
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Clear any backend-held conversational state. Called once per
    /// session start; failure aborts the session.
    async fn reset(&self, cancel: &CancellationToken) -> Result<(), TranscribeError>;

    /// Transcribe the audio file at `audio_path` into a fragment stream.
    async fn transcribe(
        &self,
        cancel: &CancellationToken,
        audio_path: &Path,
    ) -> Result<FragmentStream, TranscribeError>;
}

/// Which transcription backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriberMode {
    /// Google Gemini over HTTP (streamed)
    Gemini,
    /// Local whisper model
    Whisper,
}

impl FromStr for TranscriberMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gemini" => Ok(Self::Gemini),
            "whisper" => Ok(Self::Whisper),
            other => bail!("invalid transcriber mode {other:?}, must be one of: gemini, whisper"),
        }
    }
}

/// Transcriber factory
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Build the backend selected by `settings.mode`.
    pub fn create(settings: &TranscriberSettings) -> Result<Arc<dyn Transcriber>> {
        match settings.mode.parse::<TranscriberMode>()? {
            TranscriberMode::Gemini => {
                let api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
                if api_key.is_empty() {
                    bail!("gemini mode requires GEMINI_API_KEY to be set");
                }
                Ok(Arc::new(GeminiTranscriber::new(
                    api_key,
                    settings.gemini_model.clone(),
                )))
            }
            TranscriberMode::Whisper => {
                let transcriber = WhisperTranscriber::load(&settings.whisper_model_path)?;
                Ok(Arc::new(transcriber))
            }
        }
    }
}
