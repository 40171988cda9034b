//! AMQP delivery of queued payloads.

use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::time::Duration;

use crate::{PublisherReceiver, QueueError};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Persistent delivery mode for published messages.
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// Drains a [`PublisherReceiver`] into a named broker queue.
///
/// Messages go to the default exchange with the queue name as routing key,
/// and each publish waits for the broker's confirm. A failed publish drops
/// the connection, backs off, reconnects and retries the same payload, so
/// payloads leave the channel in order and are never skipped.
#[derive(Debug, Clone)]
pub struct AmqpPublisher {
    uri: String,
    queue: String,
}

impl AmqpPublisher {
    pub fn new(uri: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            queue: queue.into(),
        }
    }

    /// Runs until every [`crate::PublisherHandle`] is dropped and the buffer
    /// has been delivered.
    pub async fn run(self, mut receiver: PublisherReceiver) {
        tracing::info!(queue = %self.queue, "starting outbound publisher");

        let mut session: Option<Session> = None;
        let mut backoff = INITIAL_BACKOFF;

        while let Some(payload) = receiver.recv().await {
            loop {
                let current = match session.take() {
                    Some(s) => s,
                    None => match Session::open(&self.uri, &self.queue).await {
                        Ok(s) => {
                            tracing::info!(queue = %self.queue, "connected to broker");
                            s
                        }
                        Err(e) => {
                            tracing::error!(
                                backoff_ms = backoff.as_millis() as u64,
                                "failed to connect to broker: {}",
                                e
                            );
                            tokio::time::sleep(backoff).await;
                            backoff = next_backoff(backoff);
                            continue;
                        }
                    },
                };

                match current.publish(&self.queue, &payload).await {
                    Ok(()) => {
                        tracing::debug!(bytes = payload.len(), "published recording event");
                        session = Some(current);
                        backoff = INITIAL_BACKOFF;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            backoff_ms = backoff.as_millis() as u64,
                            "publish failed, reconnecting: {}",
                            e
                        );
                        current.close().await;
                        tokio::time::sleep(backoff).await;
                        backoff = next_backoff(backoff);
                    }
                }
            }
        }

        if let Some(s) = session {
            s.close().await;
        }
        tracing::info!(queue = %self.queue, "outbound publisher stopped");
    }
}

/// Doubles the reconnect delay up to [`MAX_BACKOFF`].
pub(crate) fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_BACKOFF)
}

struct Session {
    connection: Connection,
    channel: Channel,
}

impl Session {
    async fn open(uri: &str, queue: &str) -> Result<Self, QueueError> {
        let connection = Connection::connect(uri, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        Ok(Self {
            connection,
            channel,
        })
    }

    async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), QueueError> {
        let confirmation = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_delivery_mode(DELIVERY_MODE_PERSISTENT),
            )
            .await?
            .await?;

        if confirmation.is_nack() {
            return Err(QueueError::Nacked);
        }
        Ok(())
    }

    async fn close(self) {
        if let Err(e) = self.connection.close(200, "closing").await {
            tracing::debug!("broker connection close failed: {}", e);
        }
    }
}
