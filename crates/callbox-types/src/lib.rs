//! Core shared types for the Callbox voicemail bridge.
//!
//! The only record that crosses a process boundary is the
//! [`RecordingEvent`]: one completed voicemail, encoded as compact JSON and
//! handed to the outbound queue.

use serde::{Deserialize, Serialize};

/// Default queue that recording events are routed to.
pub const VOICEMAIL_QUEUE: &str = "voicemail";

/// One completed voicemail recording, as reported by the telephony platform.
///
/// Field names on the wire are `From`, `To` and `Url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingEvent {
    /// Caller identifier (usually an E.164 number).
    #[serde(rename = "From")]
    pub from: String,
    /// Callee identifier.
    #[serde(rename = "To")]
    pub to: String,
    /// URL the recording can be fetched from.
    #[serde(rename = "Url")]
    pub url: String,
}

impl RecordingEvent {
    pub fn new(from: impl Into<String>, to: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            url: url.into(),
        }
    }

    /// Encodes the event as compact JSON, the payload format consumed downstream.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
