// crates/flux-schnell-mcp/src/lib.rs
// ============================================================================
// Module: Flux Schnell MCP
// Description: MCP server and upstream gateway for the Flux Schnell model.
// Purpose: Expose the generate_image tool over stdio JSON-RPC.
// Dependencies: flux-schnell-contract, reqwest, serde_json, tokio
// ============================================================================

//! ## Overview
//! This crate implements the Flux Schnell MCP server: a stdio JSON-RPC
//! transport, a router for the single `generate_image` tool, and a gateway
//! that forwards each validated call as one blocking request to the Replicate
//! inference API. Calls hold no cross-call state; the only shared value is
//! the immutable upstream client configuration built at startup.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod gateway;
pub mod server;
pub mod telemetry;
pub mod tools;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::FluxSchnellConfig;
pub use config::UpstreamCredential;
pub use gateway::GatewayError;
pub use gateway::PredictionBackend;
pub use gateway::PredictionRequest;
pub use gateway::ReplicateClient;
pub use server::McpServer;
pub use server::McpServerError;
pub use telemetry::MCP_LATENCY_BUCKETS_MS;
pub use telemetry::McpMethod;
pub use telemetry::McpMetricEvent;
pub use telemetry::McpMetrics;
pub use telemetry::McpOutcome;
pub use telemetry::NoopMetrics;
pub use tools::ToolError;
pub use tools::ToolRouter;
