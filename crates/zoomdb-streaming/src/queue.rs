//! ZoomDB Ingest Queue
//!
//! Multi-producer single-consumer queue between sample producers and the
//! ingest worker. Producers never touch the database directly.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::frame::{IngestMessage, SampleFrame};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};
use zoomdb_common::{IngestConfig, Result, ZoomError};
use zoomdb_timeseries::Sample;

/// Create a connected sender/receiver pair.
///
/// The queue is bounded when `queue_capacity` is set; a full bounded queue
/// makes `send` wait and `try_send` fail with [`ZoomError::QueueFull`].
pub fn ingest_queue(config: &IngestConfig) -> (IngestSender, IngestReceiver) {
    match config.queue_capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.max(1));
            (
                IngestSender { inner: SenderInner::Bounded(tx) },
                IngestReceiver { inner: ReceiverInner::Bounded(rx) },
            )
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                IngestSender { inner: SenderInner::Unbounded(tx) },
                IngestReceiver { inner: ReceiverInner::Unbounded(rx) },
            )
        }
    }
}

// =============================================================================
// Sender
// =============================================================================

#[derive(Debug, Clone)]
enum SenderInner {
    Bounded(mpsc::Sender<IngestMessage>),
    Unbounded(mpsc::UnboundedSender<IngestMessage>),
}

/// Producer half. Cheap to clone, one per producer thread or task.
#[derive(Debug, Clone)]
pub struct IngestSender {
    inner: SenderInner,
}

impl IngestSender {
    /// Enqueue a message, waiting for room on a bounded queue.
    pub async fn send(&self, message: IngestMessage) -> Result<()> {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.send(message).await.map_err(|_| ZoomError::QueueClosed),
            SenderInner::Unbounded(tx) => tx.send(message).map_err(|_| ZoomError::QueueClosed),
        }
    }

    /// Enqueue without waiting. Usable from synchronous producer threads.
    pub fn try_send(&self, message: IngestMessage) -> Result<()> {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.try_send(message).map_err(|err| match err {
                TrySendError::Full(_) => ZoomError::QueueFull,
                TrySendError::Closed(_) => ZoomError::QueueClosed,
            }),
            SenderInner::Unbounded(tx) => tx.send(message).map_err(|_| ZoomError::QueueClosed),
        }
    }

    pub async fn send_sample(&self, name: impl Into<String>, sample: Sample) -> Result<()> {
        self.send(IngestMessage::Sample { name: name.into(), sample }).await
    }

    pub async fn send_samples(&self, name: impl Into<String>, samples: Vec<Sample>) -> Result<()> {
        self.send(IngestMessage::Samples { name: name.into(), samples }).await
    }

    pub async fn send_frame(&self, frame: SampleFrame) -> Result<()> {
        self.send(IngestMessage::Frame(frame)).await
    }

    /// True once the receiver is gone.
    pub fn is_closed(&self) -> bool {
        match &self.inner {
            SenderInner::Bounded(tx) => tx.is_closed(),
            SenderInner::Unbounded(tx) => tx.is_closed(),
        }
    }
}

// =============================================================================
// Receiver
// =============================================================================

#[derive(Debug)]
enum ReceiverInner {
    Bounded(mpsc::Receiver<IngestMessage>),
    Unbounded(mpsc::UnboundedReceiver<IngestMessage>),
}

/// Consumer half, owned by the ingest worker.
#[derive(Debug)]
pub struct IngestReceiver {
    inner: ReceiverInner,
}

impl IngestReceiver {
    /// Wait for the next message. `None` once every sender is dropped and
    /// the queue is empty.
    pub async fn recv(&mut self) -> Option<IngestMessage> {
        match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.recv().await,
            ReceiverInner::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Take a queued message without waiting.
    ///
    /// `Ok(None)` means the queue is momentarily empty; [`ZoomError::QueueClosed`]
    /// means it is empty and no sender remains.
    pub fn try_recv(&mut self) -> Result<Option<IngestMessage>> {
        let received = match &mut self.inner {
            ReceiverInner::Bounded(rx) => rx.try_recv(),
            ReceiverInner::Unbounded(rx) => rx.try_recv(),
        };
        match received {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ZoomError::QueueClosed),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(capacity: usize) -> IngestConfig {
        IngestConfig {
            queue_capacity: Some(capacity),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_unbounded_queue_preserves_order() {
        let (tx, mut rx) = ingest_queue(&IngestConfig::default());
        tx.send_sample("a", Sample::new(0.0, 1.0)).await.expect("send");
        tx.send_samples("a", vec![Sample::new(1.0, 2.0)]).await.expect("send");
        tx.send_frame(SampleFrame::new("b", 0.0, 1.0, vec![1.0])).await.expect("send");

        assert!(matches!(rx.recv().await, Some(IngestMessage::Sample { .. })));
        assert!(matches!(rx.recv().await, Some(IngestMessage::Samples { .. })));
        assert!(matches!(rx.recv().await, Some(IngestMessage::Frame(_))));
        assert!(rx.try_recv().expect("still connected").is_none());
    }

    #[test]
    fn test_bounded_queue_reports_full() {
        let (tx, mut rx) = ingest_queue(&bounded(1));
        let message = IngestMessage::Sample {
            name: "a".to_string(),
            sample: Sample::new(0.0, 0.0),
        };

        tx.try_send(message.clone()).expect("room for one");
        let err = tx.try_send(message.clone()).expect_err("queue full");
        assert!(matches!(err, ZoomError::QueueFull));
        assert!(err.is_retryable());

        assert!(rx.try_recv().expect("connected").is_some());
        tx.try_send(message).expect("room again");
    }

    #[test]
    fn test_closed_queue() {
        let (tx, rx) = ingest_queue(&IngestConfig::default());
        drop(rx);
        assert!(tx.is_closed());
        let err = tx
            .try_send(IngestMessage::Samples {
                name: "a".to_string(),
                samples: Vec::new(),
            })
            .expect_err("receiver dropped");
        assert!(matches!(err, ZoomError::QueueClosed));
    }

    #[test]
    fn test_disconnect_after_drain() {
        let (tx, mut rx) = ingest_queue(&bounded(4));
        tx.try_send(IngestMessage::Sample {
            name: "a".to_string(),
            sample: Sample::new(0.0, 0.0),
        })
        .expect("send");
        drop(tx);

        assert!(rx.try_recv().expect("queued message first").is_some());
        assert!(matches!(rx.try_recv(), Err(ZoomError::QueueClosed)));
    }
}
