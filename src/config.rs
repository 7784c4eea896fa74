use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub session: SessionSettings,
    pub transcriber: TranscriberSettings,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// Duration of each captured chunk in seconds
    pub chunk_secs: u64,
    /// Directory for transient audio files (created per session)
    pub scratch_dir: String,
    /// Directory the persisted transcript is written to
    pub output_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriberSettings {
    /// Backend to use: "gemini" or "whisper"
    pub mode: String,
    /// Gemini model name (gemini mode)
    pub gemini_model: String,
    /// Path to a GGML model file (whisper mode)
    pub whisper_model_path: String,
}

impl Config {
    /// Load configuration, layering an optional file over built-in defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("session.chunk_secs", 10i64)?
            .set_default("session.scratch_dir", ".tmp")?
            .set_default("session.output_dir", ".")?
            .set_default("transcriber.mode", "gemini")?
            .set_default("transcriber.gemini_model", "gemini-2.0-flash")?
            .set_default("transcriber.whisper_model_path", "models/ggml-medium.bin")?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
