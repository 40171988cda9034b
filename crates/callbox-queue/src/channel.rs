//! Bounded hand-off between request handlers and the publisher task.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{SendTimeoutError, TrySendError};

use crate::QueueError;

/// Creates the producer and consumer halves of the outbound queue.
///
/// `capacity` bounds the number of payloads buffered while the broker is slow
/// or unreachable. `enqueue_timeout` bounds how long [`PublisherHandle::send`]
/// waits for a free slot; zero means fail immediately when full.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel(capacity: usize, enqueue_timeout: Duration) -> (PublisherHandle, PublisherReceiver) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        PublisherHandle {
            tx,
            enqueue_timeout,
        },
        PublisherReceiver { rx },
    )
}

/// Producer side of the outbound queue. Cheap to clone and safe to share.
#[derive(Debug, Clone)]
pub struct PublisherHandle {
    tx: mpsc::Sender<Vec<u8>>,
    enqueue_timeout: Duration,
}

impl PublisherHandle {
    /// Hands a serialized payload to the publisher.
    ///
    /// Returns once the payload is buffered, not once the broker has it.
    pub async fn send(&self, payload: Vec<u8>) -> Result<(), QueueError> {
        if self.enqueue_timeout.is_zero() {
            return self.tx.try_send(payload).map_err(|e| match e {
                TrySendError::Full(_) => QueueError::Full,
                TrySendError::Closed(_) => QueueError::Closed,
            });
        }

        self.tx
            .send_timeout(payload, self.enqueue_timeout)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => QueueError::Full,
                SendTimeoutError::Closed(_) => QueueError::Closed,
            })
    }

    /// Returns `true` once the consumer side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer side of the outbound queue, owned by exactly one task.
#[derive(Debug)]
pub struct PublisherReceiver {
    rx: mpsc::Receiver<Vec<u8>>,
}

impl PublisherReceiver {
    /// Waits for the next payload. Returns `None` once every handle is dropped
    /// and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        self.rx.recv().await
    }

    /// Takes a buffered payload without waiting.
    pub fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.rx.try_recv().ok()
    }

    /// Number of payloads currently buffered.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
