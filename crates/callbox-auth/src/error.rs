//! Error types for webhook authentication.

/// Reasons a webhook request fails authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The signature header was absent or empty.
    #[error("missing request signature")]
    MissingSignature,

    /// The supplied signature does not match the expected one.
    #[error("request signature mismatch")]
    SignatureMismatch,
}
