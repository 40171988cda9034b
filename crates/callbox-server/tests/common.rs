#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use callbox_auth::{FormFields, SignatureVerifier, SIGNATURE_HEADER};
use callbox_queue::PublisherReceiver;
use callbox_server::{app, config::Config, AppState};
use std::time::Duration;

pub const HOST: &str = "http://example.com";
pub const TOKEN: &str = "secret";

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.webhook.public_url = HOST.to_string();
    config.webhook.auth_token = TOKEN.to_string();
    config
}

/// Router plus the consumer side of its outbound queue.
pub fn test_app(config: &Config, capacity: usize, enqueue_timeout: Duration) -> (Router, PublisherReceiver) {
    let (publisher, receiver) = callbox_queue::channel(capacity, enqueue_timeout);
    (app(AppState::new(config, publisher)), receiver)
}

pub fn default_app() -> (Router, PublisherReceiver) {
    test_app(&test_config(), 128, Duration::from_millis(200))
}

pub fn encode_form(pairs: &[(&str, &str)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

pub fn sign(uri: &str, pairs: &[(&str, &str)]) -> String {
    SignatureVerifier::new(HOST, TOKEN).expected_signature(
        &Method::POST,
        uri,
        &FormFields::from_pairs(pairs.iter().copied()),
    )
}

/// A form POST carrying the given signature header, if any.
pub fn form_post(uri: &str, pairs: &[(&str, &str)], signature: Option<&str>) -> Request<Body> {
    raw_form_post(uri, encode_form(pairs), signature)
}

/// A form POST with an already encoded body.
pub fn raw_form_post(uri: &str, body: impl Into<Body>, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(body.into()).unwrap()
}

/// A form POST signed the way the platform would sign it.
pub fn signed_post(uri: &str, pairs: &[(&str, &str)]) -> Request<Body> {
    let signature = sign(uri, pairs);
    form_post(uri, pairs, Some(&signature))
}

pub async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
