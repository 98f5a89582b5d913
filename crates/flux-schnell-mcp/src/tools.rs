// crates/flux-schnell-mcp/src/tools.rs
// ============================================================================
// Module: MCP Tool Router
// Description: Tool routing for the Flux Schnell MCP server.
// Purpose: Gate malformed calls and dispatch valid ones to the gateway.
// Dependencies: flux-schnell-contract, serde_json
// ============================================================================

//! ## Overview
//! The tool router dispatches MCP tool calls to the upstream gateway. Each
//! invocation passes through exactly two states, validating then executing:
//! an unknown tool name or a malformed argument bag fails before any network
//! I/O; a validated call issues exactly one upstream request. The router
//! holds no mutable state, so concurrent invocations are safe by
//! construction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use flux_schnell_contract::GenerateImageArgs;
use flux_schnell_contract::ToolDefinition;
use flux_schnell_contract::ToolName;
use flux_schnell_contract::tool_definitions;
use serde_json::Value;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::gateway::PredictionBackend;
use crate::gateway::PredictionRequest;

// ============================================================================
// SECTION: Tool Router
// ============================================================================

/// Tool router for MCP requests.
#[derive(Clone)]
pub struct ToolRouter {
    /// Backend used for prediction requests.
    backend: Arc<dyn PredictionBackend>,
}

impl ToolRouter {
    /// Creates a new tool router over the given backend.
    #[must_use]
    pub fn new(backend: Arc<dyn PredictionBackend>) -> Self {
        Self {
            backend,
        }
    }

    /// Lists the MCP tools supported by this server.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        tool_definitions()
    }

    /// Handles a tool call by name with JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when routing, validation, or the upstream call
    /// fails.
    pub fn handle_tool_call(&self, name: &str, payload: Value) -> Result<Value, ToolError> {
        let tool = ToolName::parse(name).ok_or(ToolError::UnknownTool)?;
        match tool {
            ToolName::GenerateImage => self.handle_generate_image(payload),
        }
    }

    /// Handles a `generate_image` tool call.
    fn handle_generate_image(&self, payload: Value) -> Result<Value, ToolError> {
        let args = GenerateImageArgs::decode(payload)
            .map_err(|err| ToolError::InvalidParams(err.to_string()))?;
        let request = PredictionRequest::from_args(args);
        let prediction = self.backend.create_prediction(&request)?;
        Ok(prediction)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Tool routing errors.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The caller requested a tool this server does not implement.
    #[error("unknown tool")]
    UnknownTool,
    /// The argument bag failed type or enum validation.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// The upstream call failed or returned an error.
    #[error("{0}")]
    Upstream(String),
    /// A defect outside the upstream path; propagated unchanged.
    #[error("internal error: {0}")]
    Internal(String),
    /// Response payload serialization failed.
    #[error("serialization failed")]
    Serialization,
}

impl From<GatewayError> for ToolError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Upstream(message) => Self::Upstream(message),
            GatewayError::Internal(message) => Self::Internal(message),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
