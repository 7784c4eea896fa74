use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// One captured audio chunk awaiting transcription.
///
/// The queue owns the item until it is dequeued; the referenced file is
/// owned by whoever dequeues it and must be deleted after use.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// When the capture of this chunk completed
    pub captured_at: DateTime<Utc>,
    /// Path to the captured audio file
    pub audio_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue was closed; no further items can be enqueued.
    #[error("queue closed")]
    Closed,

    /// The queue stayed full for the whole enqueue timeout.
    #[error("enqueue timed out after {0:?}")]
    Timeout(Duration),

    /// The session was cancelled while waiting on the queue.
    #[error("queue operation cancelled")]
    Cancelled,
}

/// Bounded, closable queue connecting the record worker to the transcribe
/// worker.
///
/// The bounded capacity provides backpressure: a slow transcription backend
/// blocks the producer instead of letting pending audio files pile up
/// without limit. The enqueue timeout turns an indefinitely stuck producer
/// into a reported failure rather than a silent hang.
pub struct WorkQueue {
    tx: Mutex<Option<mpsc::Sender<WorkItem>>>,
    rx: Mutex<mpsc::Receiver<WorkItem>>,
    /// Fires on close so enqueues blocked on a full queue return `Closed`
    closed: CancellationToken,
    enqueue_timeout: Duration,
}

impl WorkQueue {
    pub fn new(capacity: usize, enqueue_timeout: Duration) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
            closed: CancellationToken::new(),
            enqueue_timeout,
        }
    }

    /// Enqueue one item, waiting until the queue accepts it.
    ///
    /// Waits at most the queue's enqueue timeout for capacity; returns
    /// early with an error when the queue is closed or `cancel` fires.
    pub async fn enqueue(
        &self,
        cancel: &CancellationToken,
        item: WorkItem,
    ) -> Result<(), QueueError> {
        // Clone the sender out so the lock is not held across the send.
        let tx = match self.tx.lock().await.as_ref() {
            Some(tx) => tx.clone(),
            None => return Err(QueueError::Closed),
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            _ = self.closed.cancelled() => Err(QueueError::Closed),
            sent = tx.send_timeout(item, self.enqueue_timeout) => match sent {
                Ok(()) => Ok(()),
                Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                    Err(QueueError::Timeout(self.enqueue_timeout))
                }
                Err(mpsc::error::SendTimeoutError::Closed(_)) => Err(QueueError::Closed),
            },
        }
    }

    /// Dequeue the next item.
    ///
    /// `Ok(None)` means the queue was closed and every buffered item has
    /// been drained: clean completion, not a failure. Cancellation while
    /// waiting returns `QueueError::Cancelled`.
    pub async fn dequeue(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<WorkItem>, QueueError> {
        let mut rx = self.rx.lock().await;

        tokio::select! {
            _ = cancel.cancelled() => Err(QueueError::Cancelled),
            item = rx.recv() => Ok(item),
        }
    }

    /// Close the queue. Idempotent and safe to call concurrently.
    ///
    /// Pending dequeues drain any buffered items before observing closure;
    /// enqueue attempts after close fail with `QueueError::Closed`.
    pub async fn close(&self) {
        self.tx.lock().await.take();
        self.closed.cancel();
    }
}
