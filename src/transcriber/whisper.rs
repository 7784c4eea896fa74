use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::client::{FragmentStream, TranscribeError, Transcriber, TRANSCRIBE_PROMPT};

/// Sample rate the whisper models expect.
const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Local speech-to-text over a GGML whisper model.
///
/// The model weights are loaded once; a fresh decode state is created for
/// every chunk, so the transcriber can be shared without locking and there
/// is no conversational state carried between sessions.
pub struct WhisperTranscriber {
    ctx: Arc<WhisperContext>,
}

impl WhisperTranscriber {
    /// Load a GGML model from `model_path`.
    pub fn load(model_path: impl AsRef<Path>) -> Result<Self> {
        let path = model_path.as_ref();
        let path_str = path
            .to_str()
            .with_context(|| format!("model path is not valid UTF-8: {}", path.display()))?;

        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .with_context(|| format!("failed to load whisper model: {}", path.display()))?;

        info!("Whisper model loaded: {}", path.display());

        Ok(Self { ctx: Arc::new(ctx) })
    }
}

#[async_trait::async_trait]
impl Transcriber for WhisperTranscriber {
    async fn reset(&self, _cancel: &CancellationToken) -> Result<(), TranscribeError> {
        // Decode state is per-chunk; nothing is retained across sessions.
        Ok(())
    }

    async fn transcribe(
        &self,
        cancel: &CancellationToken,
        audio_path: &Path,
    ) -> Result<FragmentStream, TranscribeError> {
        let samples = read_wav_samples(audio_path)?;

        let (tx, stream) = FragmentStream::channel(32);
        let ctx = Arc::clone(&self.ctx);
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || {
            if cancel.is_cancelled() {
                return;
            }

            let segments = match run_inference(&ctx, &samples) {
                Ok(segments) => segments,
                Err(e) => {
                    let _ = tx.blocking_send(Err(TranscribeError::Backend(e.to_string())));
                    return;
                }
            };

            for segment in segments {
                if cancel.is_cancelled() {
                    return;
                }
                if tx.blocking_send(Ok(segment)).is_err() {
                    // Consumer abandoned the stream.
                    return;
                }
            }
        });

        Ok(stream)
    }
}

/// Read a 16kHz mono PCM WAV file into f32 samples.
fn read_wav_samples(path: &Path) -> Result<Vec<f32>, TranscribeError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| TranscribeError::UnsupportedAudio(e.to_string()))?;

    let spec = reader.spec();
    if spec.sample_rate != WHISPER_SAMPLE_RATE {
        return Err(TranscribeError::UnsupportedAudio(format!(
            "unsupported sample rate: {}",
            spec.sample_rate
        )));
    }
    if spec.channels != 1 {
        return Err(TranscribeError::UnsupportedAudio(format!(
            "unsupported number of channels: {}",
            spec.channels
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TranscribeError::UnsupportedAudio(e.to_string()))?;

    Ok(samples
        .into_iter()
        .map(|s| s as f32 / i16::MAX as f32)
        .collect())
}

/// Run one decode pass and return the segment texts in order.
fn run_inference(ctx: &WhisperContext, samples: &[f32]) -> Result<Vec<String>> {
    let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
    params.set_initial_prompt(TRANSCRIBE_PROMPT);
    params.set_temperature(0.5);
    params.set_print_progress(false);
    params.set_print_realtime(false);

    let mut state = ctx
        .create_state()
        .context("failed to create whisper state")?;

    state
        .full(params, samples)
        .context("whisper inference failed")?;

    let n_segments = state
        .full_n_segments()
        .context("failed to read segment count")?;

    let mut segments = Vec::with_capacity(n_segments as usize);
    for i in 0..n_segments {
        let text = state
            .full_get_segment_text(i)
            .with_context(|| format!("failed to read segment {i}"))?;
        segments.push(text);
    }

    Ok(segments)
}
