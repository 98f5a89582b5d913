// crates/flux-schnell-contract/src/lib.rs
// ============================================================================
// Module: Flux Schnell Contract
// Description: Canonical MCP tool contract for the Flux Schnell server.
// Purpose: Provide tool naming, schemas, and typed argument decoding.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! This crate defines the external contract surface of the Flux Schnell MCP
//! server: the canonical tool name, the published tool definition with its
//! JSON schema, and the typed argument decoder that gates malformed calls
//! before any network I/O occurs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod args;
pub mod tooling;
pub mod types;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use args::ArgsError;
pub use args::AspectRatio;
pub use args::GenerateImageArgs;
pub use args::Megapixels;
pub use args::OutputFormat;
pub use args::PredictionInput;
pub use tooling::tool_contracts;
pub use tooling::tool_definitions;
pub use types::ToolContract;
pub use types::ToolDefinition;
pub use types::ToolExample;
pub use types::ToolName;
