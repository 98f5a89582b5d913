// crates/flux-schnell-contract/src/tooling.rs
// ============================================================================
// Module: MCP Tool Contracts
// Description: Canonical MCP tool definitions and schemas for Flux Schnell.
// Purpose: Provide tool contracts for MCP listing and documentation.
// Dependencies: serde_json, flux-schnell-contract::types
// ============================================================================

//! ## Overview
//! This module defines the canonical MCP tool surface: a single
//! `generate_image` tool with a strict, deterministic input schema. The
//! numeric bounds in the schema document the upstream contract for clients;
//! server-side validation checks types and enum membership only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;
use serde_json::json;

use crate::types::ToolContract;
use crate::types::ToolDefinition;
use crate::types::ToolExample;
use crate::types::ToolName;

// ============================================================================
// SECTION: Tool Contracts
// ============================================================================

/// Returns the canonical MCP tool contracts.
#[must_use]
pub fn tool_contracts() -> Vec<ToolContract> {
    vec![generate_image_contract()]
}

/// Returns the MCP tool definitions for tool listing.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let contracts = tool_contracts();
    let mut definitions = Vec::with_capacity(contracts.len());
    for contract in contracts {
        definitions.push(ToolDefinition {
            name: contract.name,
            description: contract.description,
            input_schema: contract.input_schema,
        });
    }
    definitions
}

/// Builds the tool contract for `generate_image`.
fn generate_image_contract() -> ToolContract {
    ToolContract {
        name: ToolName::GenerateImage,
        description: "Generate an image using the Flux Schnell model".to_string(),
        input_schema: generate_image_input_schema(),
        output_schema: generate_image_output_schema(),
        examples: generate_image_examples(),
        notes: vec![
            "Requires only prompt; every other field falls back to its documented default."
                .to_string(),
            "Numeric bounds are declared for client guidance; the upstream service enforces them."
                .to_string(),
            "The call blocks until the upstream prediction completes or fails.".to_string(),
        ],
    }
}

/// Builds the input schema for `generate_image`.
#[must_use]
fn generate_image_input_schema() -> Value {
    tool_input_schema(
        &json!({
            "prompt": {
                "type": "string",
                "description": "Text prompt describing the desired image"
            },
            "go_fast": {
                "type": "boolean",
                "description": "Enable fast mode",
                "default": true
            },
            "megapixels": {
                "type": "string",
                "enum": ["1", "0.25"],
                "description": "Image resolution in megapixels",
                "default": "1"
            },
            "num_outputs": {
                "type": "number",
                "minimum": 1,
                "maximum": 4,
                "description": "Number of images to generate",
                "default": 1
            },
            "aspect_ratio": {
                "type": "string",
                "enum": ["1:1", "4:3", "16:9"],
                "description": "Image aspect ratio",
                "default": "1:1"
            },
            "output_format": {
                "type": "string",
                "enum": ["webp", "png", "jpeg"],
                "description": "Output image format",
                "default": "webp"
            },
            "output_quality": {
                "type": "number",
                "minimum": 1,
                "maximum": 100,
                "description": "Output image quality",
                "default": 80
            },
            "num_inference_steps": {
                "type": "number",
                "minimum": 4,
                "maximum": 4,
                "description": "Number of inference steps",
                "default": 4
            }
        }),
        &["prompt"],
    )
}

/// Builds the output schema for `generate_image`.
///
/// The upstream prediction payload is opaque and passed through verbatim, so
/// the schema constrains only the top-level shape.
#[must_use]
fn generate_image_output_schema() -> Value {
    with_schema(json!({
        "type": "object",
        "description": "Raw prediction payload returned by the upstream inference API.",
        "additionalProperties": true
    }))
}

/// Returns worked examples for `generate_image`.
fn generate_image_examples() -> Vec<ToolExample> {
    vec![ToolExample {
        description: "Minimal call relying on declared defaults.".to_string(),
        input: json!({ "prompt": "a lighthouse at dusk, oil painting" }),
        output: json!({
            "id": "p9q8r7",
            "status": "succeeded",
            "output": ["https://replicate.delivery/example/out-0.webp"]
        }),
    }]
}

// ============================================================================
// SECTION: Schema Helpers
// ============================================================================

/// Builds a standard tool input schema wrapper.
#[must_use]
fn tool_input_schema(properties: &Value, required: &[&str]) -> Value {
    with_schema(object_schema(properties, required))
}

/// Builds an object schema without the top-level `$schema` annotation.
#[must_use]
fn object_schema(properties: &Value, required: &[&str]) -> Value {
    let required_values: Vec<Value> =
        required.iter().map(|value| Value::String((*value).to_string())).collect();
    json!({
        "type": "object",
        "required": required_values,
        "properties": properties,
        "additionalProperties": false
    })
}

/// Adds a `$schema` header to a top-level JSON schema.
#[must_use]
fn with_schema(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return schema;
    };
    map.insert(
        String::from("$schema"),
        Value::String(String::from("https://json-schema.org/draft/2020-12/schema")),
    );
    Value::Object(map)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
