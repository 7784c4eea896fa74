// Integration tests for the bounded work queue
//
// These tests verify the queue contract the session pipeline depends on:
// ordering, backpressure via the enqueue timeout, drain-then-closed
// semantics, idempotent close and prompt cancellation.

use anyhow::Result;
use chrono::Utc;
use live_scribe::queue::{QueueError, WorkItem, WorkQueue};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn item(name: &str) -> WorkItem {
    WorkItem {
        captured_at: Utc::now(),
        audio_path: PathBuf::from(name),
    }
}

#[tokio::test]
async fn test_items_dequeue_in_enqueue_order() -> Result<()> {
    let queue = WorkQueue::new(4, Duration::from_secs(1));
    let cancel = CancellationToken::new();

    queue.enqueue(&cancel, item("audio-1.wav")).await?;
    queue.enqueue(&cancel, item("audio-2.wav")).await?;
    queue.enqueue(&cancel, item("audio-3.wav")).await?;

    for expected in ["audio-1.wav", "audio-2.wav", "audio-3.wav"] {
        let item = queue.dequeue(&cancel).await?.expect("item expected");
        assert_eq!(item.audio_path, PathBuf::from(expected));
    }

    Ok(())
}

#[tokio::test]
async fn test_dequeue_blocks_until_item_arrives() -> Result<()> {
    let queue = std::sync::Arc::new(WorkQueue::new(4, Duration::from_secs(1)));
    let cancel = CancellationToken::new();

    let producer = {
        let queue = std::sync::Arc::clone(&queue);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue.enqueue(&cancel, item("late.wav")).await
        })
    };

    let item = queue.dequeue(&cancel).await?.expect("item expected");
    assert_eq!(item.audio_path, PathBuf::from("late.wav"));

    producer.await??;
    Ok(())
}

#[tokio::test]
async fn test_close_drains_buffered_items_then_signals_closed() -> Result<()> {
    let queue = WorkQueue::new(4, Duration::from_secs(1));
    let cancel = CancellationToken::new();

    queue.enqueue(&cancel, item("audio-1.wav")).await?;
    queue.enqueue(&cancel, item("audio-2.wav")).await?;
    queue.close().await;

    // Buffered items drain first.
    assert!(queue.dequeue(&cancel).await?.is_some());
    assert!(queue.dequeue(&cancel).await?.is_some());

    // Then closure is observed as clean completion, not an error.
    assert!(queue.dequeue(&cancel).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_close_is_idempotent() -> Result<()> {
    let queue = WorkQueue::new(4, Duration::from_secs(1));
    let cancel = CancellationToken::new();

    queue.close().await;
    queue.close().await;

    assert!(queue.dequeue(&cancel).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_enqueue_after_close_fails() {
    let queue = WorkQueue::new(4, Duration::from_secs(1));
    let cancel = CancellationToken::new();

    queue.close().await;

    let err = queue
        .enqueue(&cancel, item("audio-1.wav"))
        .await
        .expect_err("enqueue into closed queue must fail");
    assert!(matches!(err, QueueError::Closed));
}

#[tokio::test]
async fn test_enqueue_times_out_when_full() {
    let queue = WorkQueue::new(1, Duration::from_millis(50));
    let cancel = CancellationToken::new();

    queue
        .enqueue(&cancel, item("audio-1.wav"))
        .await
        .expect("first enqueue fits");

    let err = queue
        .enqueue(&cancel, item("audio-2.wav"))
        .await
        .expect_err("queue is full and nobody is draining");
    assert!(matches!(err, QueueError::Timeout(_)));
}

#[tokio::test]
async fn test_close_unblocks_pending_enqueue() -> Result<()> {
    let queue = std::sync::Arc::new(WorkQueue::new(1, Duration::from_secs(30)));
    let cancel = CancellationToken::new();

    queue.enqueue(&cancel, item("audio-1.wav")).await?;

    {
        let queue = std::sync::Arc::clone(&queue);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            queue.close().await;
        });
    }

    let err = queue
        .enqueue(&cancel, item("audio-2.wav"))
        .await
        .expect_err("close must win over the long timeout");
    assert!(matches!(err, QueueError::Closed));

    Ok(())
}

#[tokio::test]
async fn test_cancellation_unblocks_dequeue() {
    let queue = std::sync::Arc::new(WorkQueue::new(4, Duration::from_secs(1)));
    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
    }

    let err = queue
        .dequeue(&cancel)
        .await
        .expect_err("cancellation must surface");
    assert!(matches!(err, QueueError::Cancelled));
}

#[tokio::test]
async fn test_cancellation_unblocks_enqueue() {
    let queue = WorkQueue::new(1, Duration::from_secs(30));
    let cancel = CancellationToken::new();

    queue
        .enqueue(&cancel, item("audio-1.wav"))
        .await
        .expect("first enqueue fits");

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
    }

    let err = queue
        .enqueue(&cancel, item("audio-2.wav"))
        .await
        .expect_err("cancellation must win over the long timeout");
    assert!(matches!(err, QueueError::Cancelled));
}
