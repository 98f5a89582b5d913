// crates/flux-schnell-mcp/src/gateway/tests.rs
// ============================================================================
// Module: Gateway Tests
// Description: Unit tests for the blocking Replicate client.
// Purpose: Verify pass-through, error normalization, and transport failures.
// Dependencies: tiny_http
// ============================================================================

//! Unit tests for the upstream gateway against a local HTTP fixture.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::mpsc;
use std::thread;

use flux_schnell_contract::GenerateImageArgs;
use serde_json::Value;
use serde_json::json;
use tiny_http::Response;
use tiny_http::Server;

use super::*;
use crate::config::UpstreamConfig;

/// Captured details of one upstream request handled by the fixture.
struct CapturedRequest {
    /// Request path including the model segment.
    path: String,
    /// Authorization header value.
    authorization: Option<String>,
    /// Prefer header value.
    prefer: Option<String>,
    /// Parsed JSON request body.
    body: Value,
}

/// Spawns a one-shot HTTP fixture answering with the given status and body.
fn spawn_fixture(status: u16, body: String) -> (UpstreamConfig, mpsc::Receiver<CapturedRequest>) {
    let server = Server::http("127.0.0.1:0").expect("fixture binds");
    let addr = server.server_addr().to_ip().expect("fixture has ip address");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut request = server.recv().expect("fixture receives request");
        let header_value = |name: &'static str| {
            request
                .headers()
                .iter()
                .find(|header| header.field.equiv(name))
                .map(|header| header.value.as_str().to_string())
        };
        let authorization = header_value("Authorization");
        let prefer = header_value("Prefer");
        let path = request.url().to_string();
        let mut raw = String::new();
        request.as_reader().read_to_string(&mut raw).expect("fixture reads body");
        let parsed: Value = serde_json::from_str(&raw).expect("fixture body is json");
        tx.send(CapturedRequest {
            path,
            authorization,
            prefer,
            body: parsed,
        })
        .expect("fixture reports capture");
        let response = Response::from_string(body).with_status_code(status);
        request.respond(response).expect("fixture responds");
    });
    let config = UpstreamConfig {
        base_url: format!("http://{addr}"),
        allow_insecure_http: true,
        ..UpstreamConfig::default()
    };
    (config, rx)
}

/// Builds a test credential without touching process environment.
fn test_credential() -> UpstreamCredential {
    UpstreamCredential::from_lookup("REPLICATE_API_TOKEN", |_| Some("r8_test".to_string()))
        .expect("test credential resolves")
}

/// Decodes an argument bag for test requests.
fn args(payload: Value) -> GenerateImageArgs {
    GenerateImageArgs::decode(payload).expect("test args decode")
}

#[test]
fn create_prediction_passes_response_through_verbatim() {
    let upstream_body = json!({
        "id": "pred-123",
        "status": "succeeded",
        "output": ["https://replicate.delivery/out.webp"]
    });
    let (config, rx) = spawn_fixture(201, upstream_body.to_string());
    let client =
        ReplicateClient::from_config(&config, test_credential()).expect("client builds");
    let request = PredictionRequest::from_args(args(json!({"prompt": "a red fox"})));
    let result = client.create_prediction(&request).expect("prediction succeeds");
    assert_eq!(result, upstream_body);
    let captured = rx.recv().expect("fixture captured request");
    assert_eq!(captured.path, "/models/black-forest-labs/flux-schnell/predictions");
    assert_eq!(captured.authorization.as_deref(), Some("Bearer r8_test"));
    assert_eq!(captured.prefer.as_deref(), Some("wait"));
    assert_eq!(captured.body["input"]["prompt"], json!("a red fox"));
    assert_eq!(captured.body["input"]["go_fast"], json!(true));
    assert_eq!(captured.body["input"]["num_outputs"], json!(1));
    assert_eq!(captured.body["input"]["output_quality"], json!(80));
}

#[test]
fn create_prediction_surfaces_upstream_detail() {
    let (config, _rx) = spawn_fixture(422, json!({"detail": "bad prompt"}).to_string());
    let client =
        ReplicateClient::from_config(&config, test_credential()).expect("client builds");
    let request = PredictionRequest::from_args(args(json!({"prompt": "a red fox"})));
    let err = client.create_prediction(&request).expect_err("prediction fails");
    match err {
        GatewayError::Upstream(message) => assert_eq!(message, "bad prompt"),
        GatewayError::Internal(message) => panic!("unexpected internal error: {message}"),
    }
}

#[test]
fn create_prediction_falls_back_to_status_text() {
    let (config, _rx) = spawn_fixture(500, "not json".to_string());
    let client =
        ReplicateClient::from_config(&config, test_credential()).expect("client builds");
    let request = PredictionRequest::from_args(args(json!({"prompt": "a red fox"})));
    let err = client.create_prediction(&request).expect_err("prediction fails");
    match err {
        GatewayError::Upstream(message) => assert!(message.contains("500")),
        GatewayError::Internal(message) => panic!("unexpected internal error: {message}"),
    }
}

#[test]
fn create_prediction_reports_transport_failures() {
    // Port 1 on loopback is never listening; the connect must fail.
    let config = UpstreamConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        allow_insecure_http: true,
        ..UpstreamConfig::default()
    };
    let client =
        ReplicateClient::from_config(&config, test_credential()).expect("client builds");
    let request = PredictionRequest::from_args(args(json!({"prompt": "a red fox"})));
    let err = client.create_prediction(&request).expect_err("prediction fails");
    match err {
        GatewayError::Upstream(message) => assert!(!message.is_empty()),
        GatewayError::Internal(message) => panic!("unexpected internal error: {message}"),
    }
}

#[test]
fn create_prediction_rejects_invalid_upstream_json() {
    let (config, _rx) = spawn_fixture(200, "not json".to_string());
    let client =
        ReplicateClient::from_config(&config, test_credential()).expect("client builds");
    let request = PredictionRequest::from_args(args(json!({"prompt": "a red fox"})));
    let err = client.create_prediction(&request).expect_err("prediction fails");
    match err {
        GatewayError::Upstream(message) => assert!(message.contains("invalid json")),
        GatewayError::Internal(message) => panic!("unexpected internal error: {message}"),
    }
}

#[test]
fn upstream_error_message_prefers_detail_field() {
    let bytes = json!({"detail": "quota exceeded"}).to_string();
    let message =
        upstream_error_message(StatusCode::UNPROCESSABLE_ENTITY, bytes.as_bytes());
    assert_eq!(message, "quota exceeded");
}

#[test]
fn upstream_error_message_ignores_empty_detail() {
    let bytes = json!({"detail": ""}).to_string();
    let message = upstream_error_message(StatusCode::BAD_GATEWAY, bytes.as_bytes());
    assert!(message.contains("502"));
}

#[test]
fn request_serializes_input_envelope() {
    let request = PredictionRequest::from_args(args(json!({"prompt": "a red fox"})));
    let value = serde_json::to_value(&request).expect("request serializes");
    assert!(value.get("input").is_some());
    assert_eq!(value["input"]["prompt"], json!("a red fox"));
}
