//! Webhook request authentication for the Callbox bridge.
//!
//! The telephony platform signs every webhook it sends with the account's
//! auth token. The signature covers, in order:
//!
//! 1. the externally visible base URL of this service,
//! 2. the request target (path plus query string) exactly as received,
//! 3. for POST requests, every form field name followed by its value, with
//!    names sorted ascending and repeated values concatenated.
//!
//! The MAC is HMAC-SHA1, base64 encoded with padding, and travels in the
//! [`SIGNATURE_HEADER`] header.
//!
//! A valid signature can be replayed indefinitely: nothing time-bound is part
//! of the signed material.

mod error;
mod form;
mod signature;

pub use error::AuthError;
pub use form::FormFields;
pub use signature::{verify, SignatureVerifier, SIGNATURE_HEADER};
