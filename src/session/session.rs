use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::message;
use super::transcript::{SessionTranscript, TranscriptEntry};
use crate::audio::{Recorder, RecorderError};
use crate::queue::{QueueError, WorkItem, WorkQueue};
use crate::transcriber::{TranscribeError, Transcriber};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already running")]
    AlreadyRunning,

    #[error("no active session")]
    NoActiveSession,

    #[error("failed to prepare scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("failed to reset transcriber state: {0}")]
    Reset(#[source] TranscribeError),

    #[error("failed to persist transcript: {0}")]
    Persist(#[source] anyhow::Error),
}

/// Owns the capture-and-transcribe session lifecycle.
///
/// One manager guards one live session at a time: `start` spawns a record
/// worker and a transcribe worker over a shared bounded queue under a
/// session-scoped cancellation token, and `stop` cancels the token, waits
/// out a bounded grace period and persists the transcript. The running flag
/// and the transcript entry list are the only two pieces of shared state,
/// each behind its own lock.
pub struct SessionManager {
    recorder: Arc<dyn Recorder>,
    transcriber: Arc<dyn Transcriber>,
    config: SessionConfig,

    /// True from a successful `start` until both workers have exited
    running: Arc<Mutex<bool>>,

    /// Artifacts of the live session, consumed by `stop`
    active: Mutex<Option<ActiveSession>>,
}

struct ActiveSession {
    cancel: CancellationToken,
    transcript: SessionTranscript,
    entries: Arc<Mutex<Vec<TranscriptEntry>>>,
    /// Resolved by the supervisor once both workers have exited
    done: oneshot::Receiver<()>,
}

impl SessionManager {
    pub fn new(
        recorder: Arc<dyn Recorder>,
        transcriber: Arc<dyn Transcriber>,
        config: SessionConfig,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            config,
            running: Arc::new(Mutex::new(false)),
            active: Mutex::new(None),
        }
    }

    /// Start a session and return the live text stream.
    ///
    /// The stream carries transcript fragments as they arrive and closes
    /// when the session ends; if a worker failed, the last item before the
    /// close is an error-formatted line (`message::is_error_line`).
    pub async fn start(
        &self,
        chunk_duration: Duration,
    ) -> Result<mpsc::Receiver<String>, SessionError> {
        let mut running = self.running.lock().await;
        if *running {
            return Err(SessionError::AlreadyRunning);
        }

        fs::create_dir_all(&self.config.scratch_dir)
            .await
            .map_err(SessionError::Scratch)?;

        let cancel = CancellationToken::new();
        if let Err(e) = self.transcriber.reset(&cancel).await {
            cancel.cancel();
            return Err(SessionError::Reset(e));
        }

        let transcript = SessionTranscript::new();
        info!(
            "Starting session {} ({}s chunks)",
            transcript.session_id,
            chunk_duration.as_secs_f64()
        );

        let queue = Arc::new(WorkQueue::new(
            self.config.queue_capacity,
            self.config.enqueue_timeout,
        ));
        let entries: Arc<Mutex<Vec<TranscriptEntry>>> = Arc::new(Mutex::new(Vec::new()));
        let (stream_tx, stream_rx) = mpsc::channel(self.config.stream_capacity);

        let record_handle = tokio::spawn(record_worker(
            Arc::clone(&self.recorder),
            cancel.clone(),
            Arc::clone(&queue),
            stream_tx.clone(),
            self.config.scratch_dir.clone(),
            chunk_duration,
        ));

        let transcribe_handle = tokio::spawn(transcribe_worker(
            Arc::clone(&self.transcriber),
            cancel.clone(),
            Arc::clone(&queue),
            stream_tx,
            Arc::clone(&entries),
        ));

        *running = true;

        // Supervisor: when both workers are done the session is over,
        // whatever the exit reason. A panic in a worker is contained by the
        // task boundary and surfaces here as a join error.
        let (done_tx, done_rx) = oneshot::channel();
        let running_flag = Arc::clone(&self.running);
        tokio::spawn(async move {
            if let Err(e) = record_handle.await {
                error!("Record worker aborted: {e}");
            }
            // A panicked record worker never reached its own close; make
            // sure the transcribe worker still drains to completion.
            queue.close().await;
            if let Err(e) = transcribe_handle.await {
                error!("Transcribe worker aborted: {e}");
            }
            *running_flag.lock().await = false;
            let _ = done_tx.send(());
        });

        *self.active.lock().await = Some(ActiveSession {
            cancel,
            transcript,
            entries,
            done: done_rx,
        });

        Ok(stream_rx)
    }

    /// Stop the running session, persist its transcript and return the
    /// path of the written file.
    ///
    /// Waits for the workers up to the configured grace period, then
    /// proceeds best-effort: a chunk still mid-flight at that point is
    /// absent from the persisted transcript.
    pub async fn stop(&self) -> Result<PathBuf, SessionError> {
        let session = {
            let running = self.running.lock().await;
            if !*running {
                return Err(SessionError::NoActiveSession);
            }
            match self.active.lock().await.take() {
                Some(session) => session,
                None => return Err(SessionError::NoActiveSession),
            }
        };

        session.cancel.cancel();

        if timeout(self.config.stop_grace, session.done).await.is_err() {
            warn!(
                "Workers still busy after {:?} grace period, stopping anyway",
                self.config.stop_grace
            );
        }

        let mut transcript = session.transcript;
        transcript.end_time = Some(Utc::now());
        transcript.transcriptions = session.entries.lock().await.clone();

        let path = transcript
            .save_to(&self.config.output_dir)
            .await
            .map_err(SessionError::Persist)?;

        if let Err(e) = fs::remove_dir_all(&self.config.scratch_dir).await {
            warn!("Failed to remove scratch directory: {e}");
        }

        info!(
            "Session {} saved to {}",
            transcript.session_id,
            path.display()
        );

        Ok(path)
    }
}

/// Worker exit classification: cancellation is the expected outcome of
/// `stop` and is never forwarded to the consumer.
#[derive(Debug)]
enum WorkerError {
    Cancelled,
    Fatal(String),
}

/// Record worker: capture chunks and feed the queue until cancellation or
/// failure. Always closes the queue on exit so the transcribe worker
/// eventually drains to completion instead of hanging.
async fn record_worker(
    recorder: Arc<dyn Recorder>,
    cancel: CancellationToken,
    queue: Arc<WorkQueue>,
    stream_tx: mpsc::Sender<String>,
    scratch_dir: PathBuf,
    chunk_duration: Duration,
) {
    info!("Record worker started");

    let result = run_record_loop(
        recorder.as_ref(),
        &cancel,
        &queue,
        &scratch_dir,
        chunk_duration,
    )
    .await;

    queue.close().await;

    if let Err(WorkerError::Fatal(msg)) = &result {
        error!("Record worker failed: {msg}");
        let _ = stream_tx.send(message::error_line(msg)).await;
    }

    info!("Record worker stopped");
}

async fn run_record_loop(
    recorder: &dyn Recorder,
    cancel: &CancellationToken,
    queue: &WorkQueue,
    scratch_dir: &Path,
    chunk_duration: Duration,
) -> Result<(), WorkerError> {
    let source = recorder.resolve_source(cancel).await.map_err(|e| match e {
        RecorderError::Cancelled => WorkerError::Cancelled,
        e => WorkerError::Fatal(format!("failed to resolve audio source: {e}")),
    })?;

    let mut chunk_index: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(WorkerError::Cancelled);
        }

        chunk_index += 1;
        let audio_path = scratch_dir.join(format!("audio-{chunk_index}.wav"));

        if let Err(e) = recorder
            .capture_chunk(cancel, chunk_duration, &source, &audio_path)
            .await
        {
            return Err(match e {
                RecorderError::Cancelled => WorkerError::Cancelled,
                e => WorkerError::Fatal(format!("recording failed: {e}")),
            });
        }

        let item = WorkItem {
            captured_at: Utc::now(),
            audio_path,
        };

        match queue.enqueue(cancel, item).await {
            Ok(()) => {}
            Err(QueueError::Cancelled) => return Err(WorkerError::Cancelled),
            Err(e) => return Err(WorkerError::Fatal(format!("failed to enqueue chunk: {e}"))),
        }
    }
}

/// Transcribe worker: drain the queue, stream fragments outward, record
/// one transcript entry per chunk. Exits cleanly once the queue is closed
/// and drained; dropping its stream sender is what ends the outward stream.
async fn transcribe_worker(
    transcriber: Arc<dyn Transcriber>,
    cancel: CancellationToken,
    queue: Arc<WorkQueue>,
    stream_tx: mpsc::Sender<String>,
    entries: Arc<Mutex<Vec<TranscriptEntry>>>,
) {
    info!("Transcribe worker started");

    let result = run_transcribe_loop(
        transcriber.as_ref(),
        &cancel,
        &queue,
        &stream_tx,
        &entries,
    )
    .await;

    if let Err(WorkerError::Fatal(msg)) = &result {
        error!("Transcribe worker failed: {msg}");
        let _ = stream_tx.send(message::error_line(msg)).await;
    }

    info!("Transcribe worker stopped");
}

async fn run_transcribe_loop(
    transcriber: &dyn Transcriber,
    cancel: &CancellationToken,
    queue: &WorkQueue,
    stream_tx: &mpsc::Sender<String>,
    entries: &Mutex<Vec<TranscriptEntry>>,
) -> Result<(), WorkerError> {
    loop {
        let item = match queue.dequeue(cancel).await {
            Ok(Some(item)) => item,
            // Queue closed and drained: clean completion.
            Ok(None) => return Ok(()),
            Err(QueueError::Cancelled) => return Err(WorkerError::Cancelled),
            Err(e) => return Err(WorkerError::Fatal(e.to_string())),
        };

        let mut fragments = match transcriber.transcribe(cancel, &item.audio_path).await {
            Ok(stream) => stream,
            Err(TranscribeError::Cancelled) => return Err(WorkerError::Cancelled),
            Err(e) => {
                return Err(WorkerError::Fatal(format!("failed to transcribe audio: {e}")))
            }
        };

        let mut text = String::new();
        let mut chunk_error: Option<String> = None;

        loop {
            let fragment = tokio::select! {
                _ = cancel.cancelled() => return Err(WorkerError::Cancelled),
                fragment = fragments.next() => fragment,
            };

            match fragment {
                None => break,
                Some(Ok(fragment)) => {
                    text.push_str(&fragment);

                    let sent = tokio::select! {
                        _ = cancel.cancelled() => return Err(WorkerError::Cancelled),
                        sent = stream_tx.send(fragment) => sent,
                    };
                    if sent.is_err() {
                        // Consumer went away; keep going so the persisted
                        // transcript stays complete.
                        warn!("Outward stream consumer gone, fragment dropped");
                    }
                }
                // A read error ends this chunk but not the session: it is
                // recorded on the entry and the loop moves on.
                Some(Err(e)) => {
                    chunk_error = Some(e.to_string());
                    let line = message::error_line(&format!("failed to read transcript: {e}"));
                    let _ = tokio::select! {
                        _ = cancel.cancelled() => return Err(WorkerError::Cancelled),
                        sent = stream_tx.send(line) => sent,
                    };
                    break;
                }
            }
        }

        drop(fragments);

        if let Err(e) = fs::remove_file(&item.audio_path).await {
            warn!("Failed to remove {}: {e}", item.audio_path.display());
        }

        let filename = item
            .audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| item.audio_path.display().to_string());

        entries.lock().await.push(TranscriptEntry {
            timestamp: item.captured_at,
            filename,
            text,
            error: chunk_error,
        });
    }
}
