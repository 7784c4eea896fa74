pub mod audio;
pub mod config;
pub mod queue;
pub mod session;
pub mod transcriber;

pub use audio::{AudioSource, FfmpegRecorder, Recorder, RecorderError};
pub use config::Config;
pub use queue::{QueueError, WorkItem, WorkQueue};
pub use session::{SessionConfig, SessionError, SessionManager, SessionTranscript, TranscriptEntry};
pub use transcriber::{
    FragmentStream, TranscribeError, Transcriber, TranscriberFactory, TranscriberMode,
};
