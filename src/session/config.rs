use std::path::PathBuf;
use std::time::Duration;

/// Fixed tunables for the session pipeline
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Directory for transient per-chunk audio files; created at session
    /// start and removed at stop
    pub scratch_dir: PathBuf,

    /// Directory the persisted transcript is written to
    pub output_dir: PathBuf,

    /// Capacity of the work queue between the record and transcribe
    /// workers (backpressure bound)
    pub queue_capacity: usize,

    /// How long the record worker may wait for queue capacity before
    /// treating the pipeline as stuck
    pub enqueue_timeout: Duration,

    /// Buffer capacity of the outward text stream; large enough that a
    /// briefly slow consumer does not stall the transcribe worker
    pub stream_capacity: usize,

    /// How long `stop` waits for the workers before proceeding best-effort
    pub stop_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scratch_dir: PathBuf::from(".tmp"),
            output_dir: PathBuf::from("."),
            queue_capacity: 16,
            enqueue_timeout: Duration::from_secs(10),
            stream_capacity: 100,
            stop_grace: Duration::from_secs(5),
        }
    }
}
