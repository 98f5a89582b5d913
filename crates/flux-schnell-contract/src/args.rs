// crates/flux-schnell-contract/src/args.rs
// ============================================================================
// Module: Argument Decoding
// Description: Typed decoder for generate_image tool arguments.
// Purpose: Gate malformed calls and resolve declared defaults.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The untyped JSON argument bag of a `generate_image` call is parsed into a
//! closed record at the protocol boundary. Unknown keys and type or enum
//! mismatches fail closed before any network I/O. Numeric fields are carried
//! as raw JSON numbers: the schema declares their bounds for client guidance,
//! but the upstream service is the source of truth and values are forwarded
//! verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default fast-mode flag applied when `go_fast` is absent.
pub const DEFAULT_GO_FAST: bool = true;
/// Default resolution applied when `megapixels` is absent.
pub const DEFAULT_MEGAPIXELS: Megapixels = Megapixels::Full;
/// Default output count applied when `num_outputs` is absent.
pub const DEFAULT_NUM_OUTPUTS: u64 = 1;
/// Default aspect ratio applied when `aspect_ratio` is absent.
pub const DEFAULT_ASPECT_RATIO: AspectRatio = AspectRatio::Square;
/// Default output format applied when `output_format` is absent.
pub const DEFAULT_OUTPUT_FORMAT: OutputFormat = OutputFormat::Webp;
/// Default output quality applied when `output_quality` is absent.
pub const DEFAULT_OUTPUT_QUALITY: u64 = 80;
/// Default inference step count applied when `num_inference_steps` is absent.
pub const DEFAULT_NUM_INFERENCE_STEPS: u64 = 4;

// ============================================================================
// SECTION: Enumerated Fields
// ============================================================================

/// Image resolution selection in megapixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Megapixels {
    /// Full one-megapixel resolution.
    #[serde(rename = "1")]
    Full,
    /// Quarter-megapixel resolution.
    #[serde(rename = "0.25")]
    Quarter,
}

impl Megapixels {
    /// Returns the wire literal for the resolution.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "1",
            Self::Quarter => "0.25",
        }
    }
}

/// Image aspect ratio selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    /// Square output.
    #[serde(rename = "1:1")]
    Square,
    /// Four-by-three output.
    #[serde(rename = "4:3")]
    FourThree,
    /// Sixteen-by-nine output.
    #[serde(rename = "16:9")]
    SixteenNine,
}

impl AspectRatio {
    /// Returns the wire literal for the aspect ratio.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::FourThree => "4:3",
            Self::SixteenNine => "16:9",
        }
    }
}

/// Output image format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// WebP output.
    Webp,
    /// PNG output.
    Png,
    /// JPEG output.
    Jpeg,
}

impl OutputFormat {
    /// Returns the wire literal for the output format.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

// ============================================================================
// SECTION: Validated Arguments
// ============================================================================

/// Validated arguments for a `generate_image` call.
///
/// # Invariants
/// - `prompt` is non-empty.
/// - Present optional fields already passed type and enum checks; absent
///   fields are resolved to declared defaults by [`Self::resolve`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenerateImageArgs {
    /// Text prompt describing the desired image.
    pub prompt: String,
    /// Fast-mode flag.
    #[serde(default)]
    pub go_fast: Option<bool>,
    /// Image resolution in megapixels.
    #[serde(default)]
    pub megapixels: Option<Megapixels>,
    /// Number of images to generate.
    #[serde(default)]
    pub num_outputs: Option<Number>,
    /// Image aspect ratio.
    #[serde(default)]
    pub aspect_ratio: Option<AspectRatio>,
    /// Output image format.
    #[serde(default)]
    pub output_format: Option<OutputFormat>,
    /// Output image quality.
    #[serde(default)]
    pub output_quality: Option<Number>,
    /// Number of inference steps.
    #[serde(default)]
    pub num_inference_steps: Option<Number>,
}

impl GenerateImageArgs {
    /// Decodes an untyped argument bag into validated arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ArgsError`] when the bag has unknown keys, a missing or
    /// empty `prompt`, or a field that fails its type or enum check.
    pub fn decode(payload: Value) -> Result<Self, ArgsError> {
        let args: Self =
            serde_json::from_value(payload).map_err(|err| ArgsError::Invalid(err.to_string()))?;
        if args.prompt.is_empty() {
            return Err(ArgsError::EmptyPrompt);
        }
        Ok(args)
    }

    /// Resolves absent optional fields to their declared defaults.
    #[must_use]
    pub fn resolve(self) -> PredictionInput {
        PredictionInput {
            prompt: self.prompt,
            go_fast: self.go_fast.unwrap_or(DEFAULT_GO_FAST),
            megapixels: self.megapixels.unwrap_or(DEFAULT_MEGAPIXELS),
            num_outputs: self.num_outputs.unwrap_or_else(|| Number::from(DEFAULT_NUM_OUTPUTS)),
            aspect_ratio: self.aspect_ratio.unwrap_or(DEFAULT_ASPECT_RATIO),
            output_format: self.output_format.unwrap_or(DEFAULT_OUTPUT_FORMAT),
            output_quality: self
                .output_quality
                .unwrap_or_else(|| Number::from(DEFAULT_OUTPUT_QUALITY)),
            num_inference_steps: self
                .num_inference_steps
                .unwrap_or_else(|| Number::from(DEFAULT_NUM_INFERENCE_STEPS)),
        }
    }
}

// ============================================================================
// SECTION: Resolved Input
// ============================================================================

/// Resolved model input with every field present.
///
/// # Invariants
/// - Field order matches the schema declaration order for deterministic
///   payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionInput {
    /// Text prompt describing the desired image.
    pub prompt: String,
    /// Fast-mode flag.
    pub go_fast: bool,
    /// Image resolution in megapixels.
    pub megapixels: Megapixels,
    /// Number of images to generate.
    pub num_outputs: Number,
    /// Image aspect ratio.
    pub aspect_ratio: AspectRatio,
    /// Output image format.
    pub output_format: OutputFormat,
    /// Output image quality.
    pub output_quality: Number,
    /// Number of inference steps.
    pub num_inference_steps: Number,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Argument decoding errors.
#[derive(Debug, Error)]
pub enum ArgsError {
    /// The argument bag failed type, enum, or unknown-key checks.
    #[error("invalid parameters for generate_image: {0}")]
    Invalid(String),
    /// The prompt was present but empty.
    #[error("prompt must be non-empty")]
    EmptyPrompt,
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests;
