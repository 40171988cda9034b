//! Telephony webhook handlers: call start and recording done.
//!
//! Both stages share the same gate. A request is handled only when it is a
//! POST carrying a valid platform signature; anything else is rejected with
//! an explicit status and nothing else happens.

use crate::{twiml, AppState};
use axum::{
    body::Bytes,
    extract::{Extension, OriginalUri},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use callbox_auth::{AuthError, FormFields, SIGNATURE_HEADER};
use callbox_queue::{PublisherHandle, QueueError};
use callbox_types::RecordingEvent;
use std::sync::Arc;
use thiserror::Error;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Which webhook a request arrived on. Used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStage {
    Start,
    Done,
}

impl CallStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Done => "done",
        }
    }
}

/// Webhook error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("method {0} not allowed")]
    MethodNotAllowed(Method),
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] AuthError),
    #[error("failed to serialize recording: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to enqueue recording: {0}")]
    Enqueue(#[from] QueueError),
}

impl IntoResponse for CallError {
    fn into_response(self) -> Response {
        let status = match &self {
            CallError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            CallError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            CallError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CallError::Enqueue(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let body = Json(serde_json::json!({
            "error": self.to_string()
        }));

        let mut response = (status, body).into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// The parts of an inbound webhook that matter for signing and handling.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    /// HTTP method.
    pub method: Method,
    /// Path plus query string, as received.
    ///
    /// An absolute-form request target (`http://host/path?q`) is reduced to
    /// its path and query, so its scheme and authority are not signed. The
    /// platform sends origin-form targets, where nothing is lost.
    pub request_uri: String,
    /// Value of the signature header, if present and readable.
    pub signature: Option<String>,
    /// Fields from a url-encoded POST body. These are the signed fields.
    pub form: FormFields,
    /// Fields from the query string.
    pub query: FormFields,
}

impl WebhookRequest {
    pub fn from_parts(method: Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Self {
        let request_uri = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        let signature = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let form = if method == Method::POST && is_form_body(headers) {
            FormFields::parse(body)
        } else {
            FormFields::new()
        };

        let query = uri
            .query()
            .map(|q| FormFields::parse(q.as_bytes()))
            .unwrap_or_default();

        Self {
            method,
            request_uri,
            signature,
            form,
            query,
        }
    }

    /// Value of a field, body values first then query values, all concatenated.
    ///
    /// Invalid UTF-8 is replaced by U+FFFD.
    pub fn field(&self, name: &str) -> String {
        let mut value = self.form.joined_bytes(name.as_bytes());
        value.extend(self.query.joined_bytes(name.as_bytes()));
        String::from_utf8_lossy(&value).into_owned()
    }
}

fn is_form_body(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

/// Accepts only signed POST requests.
pub fn authorize(
    state: &AppState,
    stage: CallStage,
    request: &WebhookRequest,
) -> Result<(), CallError> {
    if request.method != Method::POST {
        tracing::warn!(
            stage = stage.as_str(),
            method = %request.method,
            "rejected webhook with unsupported method"
        );
        return Err(CallError::MethodNotAllowed(request.method.clone()));
    }

    state
        .verifier
        .check(
            &request.method,
            &request.request_uri,
            &request.form,
            request.signature.as_deref(),
        )
        .map_err(|e| {
            tracing::warn!(
                stage = stage.as_str(),
                uri = %request.request_uri,
                reason = %e,
                "rejected unauthenticated webhook"
            );
            CallError::from(e)
        })
}

/// Handler for the call-start webhook.
///
/// Answers with TwiML that greets the caller and records a message, sending
/// the recording to the done webhook.
pub async fn start_handler(
    Extension(state): Extension<Arc<AppState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, CallError> {
    let request = WebhookRequest::from_parts(method, &uri, &headers, &body);
    authorize(&state, CallStage::Start, &request)?;

    let document = twiml::record_voicemail(&state.webhook.greeting, &state.webhook.done_url());

    Ok((
        [(header::CONTENT_TYPE, twiml::TWIML_CONTENT_TYPE)],
        document,
    )
        .into_response())
}

/// Handler for the recording-done webhook.
///
/// Forwards the recording to the outbound queue and answers `204 No Content`.
pub async fn done_handler(
    Extension(state): Extension<Arc<AppState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, CallError> {
    let request = WebhookRequest::from_parts(method, &uri, &headers, &body);
    let recording = accept_recording(&state, &request)?;

    tracing::info!(from = %recording.from, url = %recording.url, "received recording");

    forward_recording(&state.publisher, &recording).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Authenticates a done webhook and extracts the recording it reports.
pub fn accept_recording(
    state: &AppState,
    request: &WebhookRequest,
) -> Result<RecordingEvent, CallError> {
    authorize(state, CallStage::Done, request)?;

    Ok(RecordingEvent::new(
        request.field("From"),
        request.field("To"),
        request.field("RecordingUrl"),
    ))
}

/// Serializes a recording and hands it to the publisher.
///
/// Success means the payload is buffered for delivery. Nothing is sent when
/// serialization fails.
pub async fn forward_recording(
    publisher: &PublisherHandle,
    recording: &RecordingEvent,
) -> Result<(), CallError> {
    let payload = recording.to_json_bytes().map_err(|e| {
        tracing::error!(from = %recording.from, "failed to serialize recording: {}", e);
        CallError::from(e)
    })?;

    publisher.send(payload).await.map_err(|e| {
        tracing::error!(from = %recording.from, url = %recording.url, "failed to enqueue recording: {}", e);
        CallError::from(e)
    })
}
