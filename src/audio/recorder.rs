use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Handle to a resolved capture source (e.g. a PulseAudio monitor device).
#[derive(Debug, Clone)]
pub struct AudioSource {
    /// Device name understood by the capture backend
    pub name: String,
}

#[derive(Debug, Error)]
pub enum RecorderError {
    /// The capture was cancelled before it completed.
    #[error("capture cancelled")]
    Cancelled,

    /// No usable capture source was found on this system.
    #[error("no monitor source found")]
    NoMonitorSource,

    /// Source discovery produced output we could not interpret.
    #[error("failed to parse source listing: {0:?}")]
    SourceParse(String),

    /// The capture process exited unsuccessfully.
    #[error("capture process exited with {0}")]
    CaptureFailed(std::process::ExitStatus),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Audio capture backend.
///
/// Implementations produce one complete, playable audio file per
/// `capture_chunk` call and must return promptly with
/// `RecorderError::Cancelled` when the session token fires, rather than
/// finishing the capture.
#[async_trait::async_trait]
pub trait Recorder: Send + Sync {
    /// Resolve the capture source. Called once per session, before the
    /// record loop starts; failure aborts the session.
    async fn resolve_source(
        &self,
        cancel: &CancellationToken,
    ) -> Result<AudioSource, RecorderError>;

    /// Capture one chunk of `duration` to `dest`.
    async fn capture_chunk(
        &self,
        cancel: &CancellationToken,
        duration: Duration,
        source: &AudioSource,
        dest: &Path,
    ) -> Result<(), RecorderError>;
}
