//! HMAC-SHA1 request signatures.

use base64::Engine;
use hmac::{Hmac, Mac};
use http::Method;
use sha1::Sha1;
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::{AuthError, FormFields};

/// Header carrying the platform's request signature.
pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

type HmacSha1 = Hmac<Sha1>;

/// Verifies webhook signatures against one shared auth token.
///
/// Holds the public base URL and the token, both fixed for the process
/// lifetime. Cloning shares the same immutable credentials.
#[derive(Clone)]
pub struct SignatureVerifier {
    inner: Arc<Credentials>,
}

struct Credentials {
    host: String,
    auth_token: String,
}

impl SignatureVerifier {
    /// `host` must be the base URL exactly as configured on the platform,
    /// e.g. `https://voicemail.example.com` (no trailing slash).
    pub fn new(host: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Credentials {
                host: host.into(),
                auth_token: auth_token.into(),
            }),
        }
    }

    /// Computes the signature the platform would send for this request.
    pub fn expected_signature(
        &self,
        method: &Method,
        request_uri: &str,
        form: &FormFields,
    ) -> String {
        sign(
            method,
            &self.inner.host,
            request_uri,
            form,
            self.inner.auth_token.as_bytes(),
        )
    }

    /// Checks `supplied` against the expected signature.
    ///
    /// An absent or empty signature is rejected before any MAC is computed.
    pub fn check(
        &self,
        method: &Method,
        request_uri: &str,
        form: &FormFields,
        supplied: Option<&str>,
    ) -> Result<(), AuthError> {
        let supplied = match supplied {
            Some(s) if !s.is_empty() => s,
            _ => return Err(AuthError::MissingSignature),
        };

        let expected = self.expected_signature(method, request_uri, form);

        if bool::from(expected.as_bytes().ct_eq(supplied.as_bytes())) {
            Ok(())
        } else {
            Err(AuthError::SignatureMismatch)
        }
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("host", &self.inner.host)
            .field("auth_token", &"[REDACTED]")
            .finish()
    }
}

/// Returns `true` only when `supplied` is the exact signature of the request.
pub fn verify(
    method: &Method,
    request_uri: &str,
    form: &FormFields,
    supplied: Option<&str>,
    host: &str,
    secret: &str,
) -> bool {
    SignatureVerifier::new(host, secret)
        .check(method, request_uri, form, supplied)
        .is_ok()
}

fn sign(method: &Method, host: &str, request_uri: &str, form: &FormFields, key: &[u8]) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC key length is valid");
    mac.update(host.as_bytes());
    mac.update(request_uri.as_bytes());

    // Form fields are only part of the signed material for POST requests.
    if *method == Method::POST {
        for name in form.sorted_names() {
            mac.update(name);
            mac.update(&form.joined_bytes(name));
        }
    }

    base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}
