// crates/flux-schnell-mcp/src/gateway.rs
// ============================================================================
// Module: Upstream Gateway
// Description: Blocking client for the Replicate prediction endpoint.
// Purpose: Turn validated arguments into exactly one upstream call.
// Dependencies: flux-schnell-contract, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The gateway resolves validated arguments into a fully defaulted prediction
//! request and forwards it as a single blocking HTTP call. The upstream call
//! carries a `Prefer: wait` directive, so the request blocks until the remote
//! job finishes or the client timeout elapses; there is no polling path and
//! no retry. Upstream failures surface the remote `detail` field when
//! present, else the transport error's own message. Anything that is not a
//! transport condition is an internal defect and propagates unchanged.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Read;
use std::time::Duration;

use flux_schnell_contract::GenerateImageArgs;
use flux_schnell_contract::PredictionInput;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::config::UpstreamCredential;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of upstream prediction responses (bytes).
const MAX_PREDICTION_RESPONSE_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Request Shape
// ============================================================================

/// Outbound payload for the prediction endpoint.
///
/// # Invariants
/// - `input` always carries all eight resolved fields; absent caller fields
///   were replaced by their declared defaults and are never forwarded as
///   null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRequest {
    /// Resolved model input.
    pub input: PredictionInput,
}

impl PredictionRequest {
    /// Builds the upstream request from validated arguments, substituting
    /// declared defaults for absent fields.
    #[must_use]
    pub fn from_args(args: GenerateImageArgs) -> Self {
        Self {
            input: args.resolve(),
        }
    }
}

// ============================================================================
// SECTION: Backend Seam
// ============================================================================

/// Backend seam for issuing prediction requests.
///
/// The production implementation is [`ReplicateClient`]; tests substitute
/// recording stubs to assert that invalid calls never reach the network.
pub trait PredictionBackend: Send + Sync {
    /// Issues one blocking prediction call and returns the raw response body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] when the upstream call fails.
    fn create_prediction(&self, request: &PredictionRequest) -> Result<Value, GatewayError>;
}

// ============================================================================
// SECTION: Replicate Client
// ============================================================================

/// Blocking HTTP client for the Replicate prediction endpoint.
///
/// # Invariants
/// - Endpoint, credential, and timeouts are fixed at construction and
///   immutable afterwards; concurrent use requires no synchronization.
#[derive(Debug)]
pub struct ReplicateClient {
    /// Fixed prediction endpoint URL.
    endpoint: String,
    /// Bearer credential for upstream authentication.
    credential: UpstreamCredential,
    /// HTTP client with configured timeouts.
    client: Client,
}

impl ReplicateClient {
    /// Builds a client from upstream configuration and a resolved credential.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] when the HTTP client cannot be
    /// constructed.
    pub fn from_config(
        config: &UpstreamConfig,
        credential: UpstreamCredential,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|err| GatewayError::Internal(format!("http client build failed: {err}")))?;
        Ok(Self {
            endpoint: config.prediction_endpoint(),
            credential,
            client,
        })
    }
}

impl PredictionBackend for ReplicateClient {
    fn create_prediction(&self, request: &PredictionRequest) -> Result<Value, GatewayError> {
        let mut response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.credential.expose())
            .header("Prefer", "wait")
            .json(request)
            .send()
            .map_err(|err| GatewayError::Upstream(err.to_string()))?;
        let status = response.status();
        let bytes = read_http_body(&mut response, MAX_PREDICTION_RESPONSE_BYTES)?;
        if !status.is_success() {
            return Err(GatewayError::Upstream(upstream_error_message(status, &bytes)));
        }
        serde_json::from_slice(&bytes)
            .map_err(|_| GatewayError::Upstream("invalid json in upstream response".to_string()))
    }
}

// ============================================================================
// SECTION: Response Handling
// ============================================================================

/// Extracts the best-effort error message from a failed upstream response.
///
/// The upstream `detail` field wins when present; otherwise the status line
/// stands in for the transport error text.
fn upstream_error_message(status: StatusCode, bytes: &[u8]) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(bytes)
        && let Some(detail) = value.get("detail").and_then(Value::as_str)
        && !detail.is_empty()
    {
        return detail.to_string();
    }
    format!("request failed with status {status}")
}

/// Reads an HTTP response body with a maximum size limit.
fn read_http_body(
    response: &mut reqwest::blocking::Response,
    max_bytes: usize,
) -> Result<Vec<u8>, GatewayError> {
    let max_bytes_u64 = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if let Some(length) = response.content_length()
        && length > max_bytes_u64
    {
        return Err(GatewayError::Upstream("upstream response too large".to_string()));
    }
    let mut limited = response.take(max_bytes_u64.saturating_add(1));
    let mut buf = Vec::new();
    limited
        .read_to_end(&mut buf)
        .map_err(|err| GatewayError::Upstream(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(GatewayError::Upstream("upstream response too large".to_string()));
    }
    Ok(buf)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Upstream gateway errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The remote call failed or returned an error status.
    #[error("upstream error: {0}")]
    Upstream(String),
    /// A defect in the gateway itself, not an upstream condition.
    #[error("internal gateway error: {0}")]
    Internal(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
