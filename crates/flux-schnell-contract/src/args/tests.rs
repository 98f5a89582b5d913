// crates/flux-schnell-contract/src/args/tests.rs
// ============================================================================
// Module: Argument Decoding Unit Tests
// Description: Unit tests for generate_image argument decoding.
// Purpose: Validate closed-record decoding and default resolution.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Exercises the typed decoder against well-formed, malformed, and
//! default-relying argument bags.

// ============================================================================
// SECTION: Lint Configuration
// ============================================================================

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions favor direct unwrap/expect for clarity."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Number;
use serde_json::json;

use super::*;

// ============================================================================
// SECTION: Decoding
// ============================================================================

#[test]
fn decode_accepts_prompt_only() {
    let args = GenerateImageArgs::decode(json!({ "prompt": "a red fox" })).expect("decode");
    assert_eq!(args.prompt, "a red fox");
    assert!(args.go_fast.is_none());
    assert!(args.megapixels.is_none());
}

#[test]
fn decode_accepts_fully_specified_bag() {
    let args = GenerateImageArgs::decode(json!({
        "prompt": "a red fox",
        "go_fast": false,
        "megapixels": "0.25",
        "num_outputs": 2,
        "aspect_ratio": "16:9",
        "output_format": "png",
        "output_quality": 95,
        "num_inference_steps": 4
    }))
    .expect("decode");
    assert_eq!(args.go_fast, Some(false));
    assert_eq!(args.megapixels, Some(Megapixels::Quarter));
    assert_eq!(args.aspect_ratio, Some(AspectRatio::SixteenNine));
    assert_eq!(args.output_format, Some(OutputFormat::Png));
}

#[test]
fn decode_rejects_missing_prompt() {
    let result = GenerateImageArgs::decode(json!({ "go_fast": true }));
    assert!(matches!(result, Err(ArgsError::Invalid(_))));
}

#[test]
fn decode_rejects_non_string_prompt() {
    let result = GenerateImageArgs::decode(json!({ "prompt": 42 }));
    assert!(matches!(result, Err(ArgsError::Invalid(_))));
}

#[test]
fn decode_rejects_empty_prompt() {
    let result = GenerateImageArgs::decode(json!({ "prompt": "" }));
    assert!(matches!(result, Err(ArgsError::EmptyPrompt)));
}

#[test]
fn decode_rejects_enum_value_outside_declared_set() {
    let result = GenerateImageArgs::decode(json!({
        "prompt": "a red fox",
        "aspect_ratio": "21:9"
    }));
    assert!(matches!(result, Err(ArgsError::Invalid(_))));
}

#[test]
fn decode_rejects_mistyped_boolean() {
    let result = GenerateImageArgs::decode(json!({
        "prompt": "a red fox",
        "go_fast": "yes"
    }));
    assert!(matches!(result, Err(ArgsError::Invalid(_))));
}

#[test]
fn decode_rejects_unknown_keys() {
    let result = GenerateImageArgs::decode(json!({
        "prompt": "a red fox",
        "seed": 7
    }));
    assert!(matches!(result, Err(ArgsError::Invalid(_))));
}

#[test]
fn decode_does_not_enforce_numeric_bounds() {
    // Bounds are declared for clients; the upstream service enforces them.
    let args = GenerateImageArgs::decode(json!({
        "prompt": "a red fox",
        "num_outputs": 9,
        "output_quality": 400
    }))
    .expect("decode");
    assert_eq!(args.num_outputs, Some(Number::from(9_u64)));
    assert_eq!(args.output_quality, Some(Number::from(400_u64)));
}

// ============================================================================
// SECTION: Default Resolution
// ============================================================================

#[test]
fn resolve_fills_every_declared_default() {
    let input =
        GenerateImageArgs::decode(json!({ "prompt": "x" })).expect("decode").resolve();
    assert_eq!(input.prompt, "x");
    assert!(input.go_fast);
    assert_eq!(input.megapixels, Megapixels::Full);
    assert_eq!(input.num_outputs, Number::from(1_u64));
    assert_eq!(input.aspect_ratio, AspectRatio::Square);
    assert_eq!(input.output_format, OutputFormat::Webp);
    assert_eq!(input.output_quality, Number::from(80_u64));
    assert_eq!(input.num_inference_steps, Number::from(4_u64));
}

#[test]
fn resolve_is_idempotent_with_explicit_defaults() {
    let implicit =
        GenerateImageArgs::decode(json!({ "prompt": "x" })).expect("decode").resolve();
    let explicit = GenerateImageArgs::decode(json!({
        "prompt": "x",
        "go_fast": true,
        "megapixels": "1",
        "num_outputs": 1,
        "aspect_ratio": "1:1",
        "output_format": "webp",
        "output_quality": 80,
        "num_inference_steps": 4
    }))
    .expect("decode")
    .resolve();
    assert_eq!(
        serde_json::to_value(&implicit).expect("serialize"),
        serde_json::to_value(&explicit).expect("serialize")
    );
}

#[test]
fn resolve_preserves_caller_overrides() {
    let input = GenerateImageArgs::decode(json!({
        "prompt": "x",
        "go_fast": false,
        "output_format": "jpeg"
    }))
    .expect("decode")
    .resolve();
    assert!(!input.go_fast);
    assert_eq!(input.output_format, OutputFormat::Jpeg);
    assert_eq!(input.megapixels, Megapixels::Full);
}

#[test]
fn resolved_input_serializes_in_declaration_order() {
    let input =
        GenerateImageArgs::decode(json!({ "prompt": "x" })).expect("decode").resolve();
    let text = serde_json::to_string(&input).expect("serialize");
    let keys = [
        "\"prompt\"",
        "\"go_fast\"",
        "\"megapixels\"",
        "\"num_outputs\"",
        "\"aspect_ratio\"",
        "\"output_format\"",
        "\"output_quality\"",
        "\"num_inference_steps\"",
    ];
    let positions: Vec<usize> =
        keys.iter().map(|key| text.find(key).expect("key present")).collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
}
