//! Session lifecycle management
//!
//! This module provides the `SessionManager` abstraction that manages:
//! - Chunked audio capture via the record worker
//! - Live transcription via the transcribe worker
//! - The bounded queue and cancellation scope tying the two together
//! - Transcript collection and JSON persistence at stop

pub mod config;
pub mod message;
mod session;
mod transcript;

pub use config::SessionConfig;
pub use session::{SessionError, SessionManager};
pub use transcript::{SessionTranscript, TranscriptEntry};
