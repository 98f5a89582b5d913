// crates/flux-schnell-mcp/src/tools/tests.rs
// ============================================================================
// Module: Tool Router Tests
// Description: Unit tests for tool routing and validation gating.
// Purpose: Verify invalid calls never reach the backend seam.
// Dependencies: serde_json
// ============================================================================

//! Unit tests for the tool router against a recording stub backend.

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

use std::sync::Mutex;

use serde_json::json;

use super::*;

/// Recording backend stub that replays a fixed outcome.
struct RecordingBackend {
    /// Requests seen by the stub.
    requests: Mutex<Vec<PredictionRequest>>,
    /// Outcome replayed for each call.
    outcome: Result<Value, GatewayError>,
}

impl RecordingBackend {
    /// Creates a stub replaying the given outcome.
    fn new(outcome: Result<Value, GatewayError>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            outcome,
        })
    }

    /// Returns the number of requests the stub has seen.
    fn calls(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    /// Returns the last request seen by the stub.
    fn last_request(&self) -> Option<PredictionRequest> {
        self.requests.lock().ok().and_then(|requests| requests.last().cloned())
    }
}

impl PredictionBackend for RecordingBackend {
    fn create_prediction(&self, request: &PredictionRequest) -> Result<Value, GatewayError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        match &self.outcome {
            Ok(value) => Ok(value.clone()),
            Err(GatewayError::Upstream(message)) => {
                Err(GatewayError::Upstream(message.clone()))
            }
            Err(GatewayError::Internal(message)) => {
                Err(GatewayError::Internal(message.clone()))
            }
        }
    }
}

#[test]
fn list_tools_exposes_generate_image() {
    let backend = RecordingBackend::new(Ok(json!({})));
    let router = ToolRouter::new(backend);
    let tools = router.list_tools();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0].name, ToolName::GenerateImage);
}

#[test]
fn unknown_tool_makes_no_backend_call() {
    let backend = RecordingBackend::new(Ok(json!({})));
    let router = ToolRouter::new(backend.clone());
    let err = router
        .handle_tool_call("generate_video", json!({"prompt": "a red fox"}))
        .expect_err("unknown tool rejected");
    assert!(matches!(err, ToolError::UnknownTool));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn invalid_params_make_no_backend_call() {
    let backend = RecordingBackend::new(Ok(json!({})));
    let router = ToolRouter::new(backend.clone());
    let err = router
        .handle_tool_call("generate_image", json!({"prompt": 7}))
        .expect_err("mistyped prompt rejected");
    assert!(matches!(err, ToolError::InvalidParams(_)));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn empty_prompt_makes_no_backend_call() {
    let backend = RecordingBackend::new(Ok(json!({})));
    let router = ToolRouter::new(backend.clone());
    let err = router
        .handle_tool_call("generate_image", json!({"prompt": ""}))
        .expect_err("empty prompt rejected");
    assert!(matches!(err, ToolError::InvalidParams(_)));
    assert_eq!(backend.calls(), 0);
}

#[test]
fn valid_call_issues_exactly_one_backend_call() {
    let prediction = json!({"id": "pred-1", "status": "succeeded"});
    let backend = RecordingBackend::new(Ok(prediction.clone()));
    let router = ToolRouter::new(backend.clone());
    let result = router
        .handle_tool_call("generate_image", json!({"prompt": "a red fox"}))
        .expect("call succeeds");
    assert_eq!(result, prediction);
    assert_eq!(backend.calls(), 1);
}

#[test]
fn absent_fields_resolve_to_defaults_before_dispatch() {
    let backend = RecordingBackend::new(Ok(json!({})));
    let router = ToolRouter::new(backend.clone());
    router
        .handle_tool_call("generate_image", json!({"prompt": "a red fox"}))
        .expect("call succeeds");
    let request = backend.last_request().expect("request recorded");
    let input = serde_json::to_value(&request.input).expect("input serializes");
    assert_eq!(input["go_fast"], json!(true));
    assert_eq!(input["megapixels"], json!("1"));
    assert_eq!(input["num_outputs"], json!(1));
    assert_eq!(input["aspect_ratio"], json!("1:1"));
    assert_eq!(input["output_format"], json!("webp"));
    assert_eq!(input["output_quality"], json!(80));
    assert_eq!(input["num_inference_steps"], json!(4));
}

#[test]
fn explicit_fields_survive_dispatch() {
    let backend = RecordingBackend::new(Ok(json!({})));
    let router = ToolRouter::new(backend.clone());
    router
        .handle_tool_call(
            "generate_image",
            json!({
                "prompt": "a red fox",
                "aspect_ratio": "16:9",
                "output_format": "png",
                "num_outputs": 3
            }),
        )
        .expect("call succeeds");
    let request = backend.last_request().expect("request recorded");
    let input = serde_json::to_value(&request.input).expect("input serializes");
    assert_eq!(input["aspect_ratio"], json!("16:9"));
    assert_eq!(input["output_format"], json!("png"));
    assert_eq!(input["num_outputs"], json!(3));
}

#[test]
fn upstream_errors_pass_through_unchanged() {
    let backend =
        RecordingBackend::new(Err(GatewayError::Upstream("bad prompt".to_string())));
    let router = ToolRouter::new(backend);
    let err = router
        .handle_tool_call("generate_image", json!({"prompt": "a red fox"}))
        .expect_err("upstream failure surfaces");
    match err {
        ToolError::Upstream(message) => assert_eq!(message, "bad prompt"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn internal_errors_map_to_internal() {
    let backend =
        RecordingBackend::new(Err(GatewayError::Internal("seam broke".to_string())));
    let router = ToolRouter::new(backend);
    let err = router
        .handle_tool_call("generate_image", json!({"prompt": "a red fox"}))
        .expect_err("internal failure surfaces");
    assert!(matches!(err, ToolError::Internal(_)));
}
