use base64::Engine;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::client::{FragmentStream, TranscribeError, Transcriber, TRANSCRIBE_PROMPT};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Streams transcripts from the Gemini API.
///
/// Each chunk is sent as one self-contained request with the audio inlined,
/// so there is no conversational state to reset between sessions.
pub struct GeminiTranscriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiTranscriber {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        }
    }

    fn request_body(&self, audio_bytes: &[u8]) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![
                    Part::Text {
                        text: TRANSCRIBE_PROMPT.to_string(),
                    },
                    Part::InlineData {
                        inline_data: Blob {
                            mime_type: "audio/wav".to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(audio_bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig { temperature: 0.5 },
        }
    }
}

#[async_trait::async_trait]
impl Transcriber for GeminiTranscriber {
    async fn reset(&self, _cancel: &CancellationToken) -> Result<(), TranscribeError> {
        Ok(())
    }

    async fn transcribe(
        &self,
        cancel: &CancellationToken,
        audio_path: &Path,
    ) -> Result<FragmentStream, TranscribeError> {
        let audio_bytes = tokio::fs::read(audio_path).await?;
        let body = self.request_body(&audio_bytes);

        let url = format!(
            "{}/{}:streamGenerateContent?alt=sse",
            API_BASE, self.model
        );

        let send = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(TranscribeError::Cancelled),
            resp = send => resp.map_err(|e| TranscribeError::Backend(e.to_string()))?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(TranscribeError::Backend(format!(
                "gemini returned {status}: {detail}"
            )));
        }

        debug!("Streaming transcript for {}", audio_path.display());

        let (tx, stream) = FragmentStream::channel(32);
        let cancel = cancel.clone();

        tokio::spawn(async move {
            forward_sse(response, tx, cancel).await;
        });

        Ok(stream)
    }
}

/// Read the SSE body and forward each text part as one fragment.
///
/// Exits when the body ends, the session is cancelled, or the consumer
/// drops the fragment stream.
async fn forward_sse(
    response: reqwest::Response,
    tx: mpsc::Sender<Result<String, TranscribeError>>,
    cancel: CancellationToken,
) {
    let mut body = response.bytes_stream();
    let mut buf = String::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = body.next() => chunk,
        };

        match chunk {
            None => return,
            Some(Err(e)) => {
                let _ = tx
                    .send(Err(TranscribeError::Backend(format!("stream error: {e}"))))
                    .await;
                return;
            }
            Some(Ok(bytes)) => {
                buf.push_str(&String::from_utf8_lossy(&bytes));

                while let Some(pos) = buf.find('\n') {
                    let line: String = buf.drain(..=pos).collect();
                    let Some(data) = line.trim_end().strip_prefix("data:") else {
                        continue;
                    };

                    let Ok(resp) = serde_json::from_str::<StreamResponse>(data.trim_start())
                    else {
                        continue;
                    };

                    for text in resp.texts() {
                        let sent = tokio::select! {
                            _ = cancel.cancelled() => return,
                            sent = tx.send(Ok(text)) => sent,
                        };
                        if sent.is_err() {
                            // Consumer abandoned the stream.
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    candidates: Option<Vec<Candidate>>,
}

impl StreamResponse {
    fn texts(self) -> Vec<String> {
        self.candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts.unwrap_or_default())
            .filter_map(|p| p.text)
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}
