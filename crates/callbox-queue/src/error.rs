//! Error types for the outbound queue.

/// Errors raised while enqueueing or publishing a payload.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The channel stayed full for the whole enqueue timeout.
    #[error("outbound queue is full")]
    Full,

    /// The publisher task is gone and nothing will drain the channel.
    #[error("outbound queue is closed")]
    Closed,

    /// The broker connection or channel failed.
    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// The broker refused the published message.
    #[error("broker rejected the message")]
    Nacked,
}
