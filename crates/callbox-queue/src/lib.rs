//! Outbound queue for recording events.
//!
//! Request handlers never talk to the broker. They push serialized payloads
//! into a bounded in-process channel through a [`PublisherHandle`]; a single
//! [`AmqpPublisher`] task owns the receiving side and delivers each payload to
//! the broker, reconnecting as needed.
//!
//! "Enqueued" is the success criterion for a handler. Delivery to the broker
//! happens later and failures there are retried by the publisher task only.

mod amqp;
mod channel;
mod error;

pub use amqp::AmqpPublisher;
pub use channel::{channel, PublisherHandle, PublisherReceiver};
pub use error::QueueError;
