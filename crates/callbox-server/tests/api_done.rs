mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use callbox_auth::{FormFields, SignatureVerifier, SIGNATURE_HEADER};
use common::*;
use std::time::Duration;
use tower::ServiceExt;

const DONE_FIELDS: &[(&str, &str)] = &[
    ("From", "+15551230000"),
    ("To", "+15559990000"),
    ("RecordingUrl", "http://rec.example/abc123"),
];

const EXPECTED_PAYLOAD: &str =
    r#"{"From":"+15551230000","To":"+15559990000","Url":"http://rec.example/abc123"}"#;

#[tokio::test]
async fn verified_done_enqueues_exactly_one_payload() {
    let (app, mut receiver) = default_app();

    let response = app.oneshot(signed_post("/done", DONE_FIELDS)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    assert!(body_string(response).await.is_empty());

    let payload = receiver.try_recv().expect("one payload should be queued");
    assert_eq!(std::str::from_utf8(&payload).unwrap(), EXPECTED_PAYLOAD);
    assert!(receiver.try_recv().is_none());
}

#[tokio::test]
async fn platform_extra_fields_are_signed_but_not_forwarded() {
    let (app, mut receiver) = default_app();
    let fields = [
        ("AccountSid", "AC0000"),
        ("CallSid", "CA1234"),
        ("From", "+15551230000"),
        ("RecordingDuration", "12"),
        ("RecordingUrl", "http://rec.example/abc123"),
        ("To", "+15559990000"),
    ];

    let response = app.oneshot(signed_post("/done", &fields)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let payload = receiver.try_recv().unwrap();
    assert_eq!(std::str::from_utf8(&payload).unwrap(), EXPECTED_PAYLOAD);
}

#[tokio::test]
async fn missing_signature_enqueues_nothing() {
    let (app, receiver) = default_app();

    let response = app
        .oneshot(form_post("/done", DONE_FIELDS, None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(receiver.is_empty());
}

#[tokio::test]
async fn tampered_recording_url_enqueues_nothing() {
    let (app, receiver) = default_app();

    let signature = sign("/done", DONE_FIELDS);
    let tampered = [
        ("From", "+15551230000"),
        ("To", "+15559990000"),
        ("RecordingUrl", "http://evil.example/abc123"),
    ];
    let response = app
        .oneshot(form_post("/done", &tampered, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(receiver.is_empty());
}

#[tokio::test]
async fn signature_for_other_endpoint_is_rejected() {
    let (app, receiver) = default_app();

    let signature = sign("/start", DONE_FIELDS);
    let response = app
        .oneshot(form_post("/done", DONE_FIELDS, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(receiver.is_empty());
}

#[tokio::test]
async fn submission_order_does_not_matter() {
    let (app, mut receiver) = default_app();

    // Signed over the canonical set, submitted in a different order.
    let signature = sign("/done", DONE_FIELDS);
    let reordered = [
        ("RecordingUrl", "http://rec.example/abc123"),
        ("From", "+15551230000"),
        ("To", "+15559990000"),
    ];
    let response = app
        .oneshot(form_post("/done", &reordered, Some(&signature)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let payload = receiver.try_recv().unwrap();
    assert_eq!(std::str::from_utf8(&payload).unwrap(), EXPECTED_PAYLOAD);
}

#[tokio::test]
async fn repeated_fields_are_concatenated() {
    let (app, mut receiver) = default_app();
    let fields = [
        ("From", "+1555"),
        ("To", "+15559990000"),
        ("From", "1230000"),
        ("RecordingUrl", "http://rec.example/abc123"),
    ];

    let response = app.oneshot(signed_post("/done", &fields)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let payload = receiver.try_recv().unwrap();
    assert_eq!(std::str::from_utf8(&payload).unwrap(), EXPECTED_PAYLOAD);
}

#[tokio::test]
async fn absent_fields_are_forwarded_as_empty_strings() {
    let (app, mut receiver) = default_app();

    let response = app
        .oneshot(signed_post("/done", &[("RecordingUrl", "http://rec.example/x")]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let payload = receiver.try_recv().unwrap();
    assert_eq!(
        std::str::from_utf8(&payload).unwrap(),
        r#"{"From":"","To":"","Url":"http://rec.example/x"}"#
    );
}

#[tokio::test]
async fn non_utf8_field_is_verified_on_raw_bytes() {
    let (app, mut receiver) = default_app();

    let mut fields = FormFields::new();
    fields.push("From", vec![0xFFu8]);
    fields.push("RecordingUrl", "http://rec.example/abc123");
    let signature =
        SignatureVerifier::new(HOST, TOKEN).expected_signature(&Method::POST, "/done", &fields);

    let request = raw_form_post(
        "/done",
        "From=%FF&RecordingUrl=http%3A%2F%2Frec.example%2Fabc123",
        Some(&signature),
    );
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let payload = receiver.try_recv().expect("one payload should be queued");
    let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(json["From"], "\u{FFFD}");
    assert_eq!(json["Url"], "http://rec.example/abc123");
}

#[tokio::test]
async fn query_values_follow_body_values() {
    let (app, mut receiver) = default_app();

    let response = app
        .oneshot(signed_post("/done?To=-ext42", DONE_FIELDS))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let payload = receiver.try_recv().unwrap();
    let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
    assert_eq!(json["To"], "+15559990000-ext42");
}

#[tokio::test]
async fn non_form_body_is_not_parsed() {
    let (app, mut receiver) = default_app();

    // Without a form content type the body contributes no fields, so the
    // platform would have signed the bare URL.
    let signature = sign("/done", &[]);
    let request = Request::builder()
        .method(Method::POST)
        .uri("/done")
        .header(header::CONTENT_TYPE, "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(encode_form(DONE_FIELDS)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let payload = receiver.try_recv().unwrap();
    assert_eq!(
        std::str::from_utf8(&payload).unwrap(),
        r#"{"From":"","To":"","Url":""}"#
    );
}

#[tokio::test]
async fn non_post_done_enqueues_nothing() {
    let (app, receiver) = default_app();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/done")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header(SIGNATURE_HEADER, sign("/done", DONE_FIELDS))
        .body(Body::from(encode_form(DONE_FIELDS)))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(receiver.is_empty());
}

#[tokio::test]
async fn full_queue_returns_service_unavailable() {
    let (app, receiver) = test_app(&test_config(), 1, Duration::from_millis(20));

    let first = app
        .clone()
        .oneshot(signed_post("/done", DONE_FIELDS))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::NO_CONTENT);

    let second = app.oneshot(signed_post("/done", DONE_FIELDS)).await.unwrap();
    assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(receiver.len(), 1);
}

#[tokio::test]
async fn closed_queue_returns_service_unavailable() {
    let (app, receiver) = default_app();
    drop(receiver);

    let response = app.oneshot(signed_post("/done", DONE_FIELDS)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_string(response).await.contains("closed"));
}

#[tokio::test]
async fn oversized_body_is_rejected() {
    let (app, receiver) = default_app();
    let huge = "x".repeat(70 * 1024);
    let fields = [("From", huge.as_str())];

    let response = app.oneshot(signed_post("/done", &fields)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(receiver.is_empty());
}
