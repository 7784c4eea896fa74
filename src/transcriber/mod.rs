//! Transcription backends
//!
//! `Transcriber` is the interface the session pipeline consumes: reset any
//! backend-held state at session start, then turn one audio file at a time
//! into a `FragmentStream` of text pieces. Two backends are provided:
//! streamed Gemini over HTTP and a local whisper model.

pub mod client;
pub mod gemini;
pub mod whisper;

pub use client::{
    FragmentStream, TranscribeError, Transcriber, TranscriberFactory, TranscriberMode,
    TRANSCRIBE_PROMPT,
};
pub use gemini::GeminiTranscriber;
pub use whisper::WhisperTranscriber;
