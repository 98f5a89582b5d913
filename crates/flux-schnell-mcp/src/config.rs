// crates/flux-schnell-mcp/src/config.rs
// ============================================================================
// Module: Flux Schnell Configuration
// Description: Configuration loading and validation for the MCP server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! An explicitly named config path must exist; when only the implicit default
//! filename is absent, built-in defaults apply. The upstream bearer
//! credential is read once from the environment at startup, is required, and
//! is never logged or serialized.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "flux-schnell.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "FLUX_SCHNELL_CONFIG";
/// Default environment variable holding the upstream bearer credential.
pub const DEFAULT_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the upstream bearer credential.
pub(crate) const MAX_TOKEN_LENGTH: usize = 256;
/// Default maximum framed request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Minimum allowed framed request body size in bytes.
const MIN_MAX_BODY_BYTES: usize = 1024;
/// Maximum allowed framed request body size in bytes.
const MAX_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;
/// Default upstream base URL.
const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";
/// Default upstream model path (`owner/name`).
const DEFAULT_MODEL: &str = "black-forest-labs/flux-schnell";
/// Default upstream connect timeout in milliseconds.
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 1_000;
/// Default upstream request timeout in milliseconds.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 120_000;
/// Minimum upstream connect timeout in milliseconds.
const MIN_CONNECT_TIMEOUT_MS: u64 = 100;
/// Maximum upstream connect timeout in milliseconds.
const MAX_CONNECT_TIMEOUT_MS: u64 = 10_000;
/// Minimum upstream request timeout in milliseconds.
const MIN_REQUEST_TIMEOUT_MS: u64 = 500;
/// Maximum upstream request timeout in milliseconds.
///
/// The `Prefer: wait` contract means a prediction may take the full upstream
/// hold time; the ceiling stays generous so slow jobs surface as upstream
/// timeouts rather than client misconfiguration.
const MAX_REQUEST_TIMEOUT_MS: u64 = 600_000;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Flux Schnell MCP configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FluxSchnellConfig {
    /// Server transport configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upstream inference API configuration.
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Server transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Maximum allowed framed request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Upstream inference API configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Base URL of the inference API.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model path in `owner/name` form.
    #[serde(default = "default_model")]
    pub model: String,
    /// Environment variable holding the bearer credential.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Request timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Allow insecure HTTP base URLs (local test servers only).
    #[serde(default)]
    pub allow_insecure_http: bool,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            token_env: default_token_env(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            allow_insecure_http: false,
        }
    }
}

// ============================================================================
// SECTION: Serde Defaults
// ============================================================================

/// Returns the default framed body size limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default upstream base URL.
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

/// Returns the default upstream model path.
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Returns the default credential environment variable name.
fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}

/// Returns the default connect timeout.
const fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Returns the default request timeout.
const fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

// ============================================================================
// SECTION: Loading and Validation
// ============================================================================

impl FluxSchnellConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// An explicit path (argument or `FLUX_SCHNELL_CONFIG`) must exist. When
    /// only the implicit default filename is absent, built-in defaults apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.exists() {
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.upstream.validate()?;
        Ok(())
    }
}

impl ServerConfig {
    /// Validates server transport limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes < MIN_MAX_BODY_BYTES || self.max_body_bytes > MAX_MAX_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "server.max_body_bytes must be between {MIN_MAX_BODY_BYTES} and \
                 {MAX_MAX_BODY_BYTES}"
            )));
        }
        Ok(())
    }
}

impl UpstreamConfig {
    /// Validates upstream endpoint and timeout settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream.base_url must be non-empty".to_string()));
        }
        if !self.base_url.starts_with("https://") {
            if !self.base_url.starts_with("http://") {
                return Err(ConfigError::Invalid(
                    "upstream.base_url must use http or https".to_string(),
                ));
            }
            if !self.allow_insecure_http {
                return Err(ConfigError::Invalid(
                    "insecure http disabled for upstream.base_url".to_string(),
                ));
            }
        }
        validate_model_path(&self.model)?;
        validate_env_var_name(&self.token_env)?;
        if self.connect_timeout_ms < MIN_CONNECT_TIMEOUT_MS
            || self.connect_timeout_ms > MAX_CONNECT_TIMEOUT_MS
        {
            return Err(ConfigError::Invalid(format!(
                "upstream.connect_timeout_ms must be between {MIN_CONNECT_TIMEOUT_MS} and \
                 {MAX_CONNECT_TIMEOUT_MS}"
            )));
        }
        if self.request_timeout_ms < MIN_REQUEST_TIMEOUT_MS
            || self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS
        {
            return Err(ConfigError::Invalid(format!(
                "upstream.request_timeout_ms must be between {MIN_REQUEST_TIMEOUT_MS} and \
                 {MAX_REQUEST_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the fixed prediction endpoint for the configured model.
    #[must_use]
    pub fn prediction_endpoint(&self) -> String {
        format!("{}/models/{}/predictions", self.base_url.trim_end_matches('/'), self.model)
    }
}

/// Validates an `owner/name` model path.
fn validate_model_path(model: &str) -> Result<(), ConfigError> {
    let mut segments = model.split('/');
    let (Some(owner), Some(name), None) = (segments.next(), segments.next(), segments.next())
    else {
        return Err(ConfigError::Invalid(
            "upstream.model must use the owner/name form".to_string(),
        ));
    };
    for segment in [owner, name] {
        if segment.is_empty()
            || !segment
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.')
        {
            return Err(ConfigError::Invalid(
                "upstream.model segments must be non-empty ASCII identifiers".to_string(),
            ));
        }
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_var_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty()
        || !name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    {
        return Err(ConfigError::Invalid(
            "upstream.token_env must be a plain environment variable name".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Credential
// ============================================================================

/// Upstream bearer credential resolved once at startup.
///
/// # Invariants
/// - The wrapped token is non-empty and within length limits.
/// - The token never appears in `Debug` output and is never serialized.
#[derive(Clone)]
pub struct UpstreamCredential(String);

impl UpstreamCredential {
    /// Resolves the credential from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Credential`] when the variable is absent,
    /// empty, or exceeds the length limit.
    pub fn from_env(var: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(var, |key| env::var(key).ok())
    }

    /// Resolves the credential through an injected lookup.
    ///
    /// The lookup seam allows tests to supply credentials without mutating
    /// process-wide environment state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Credential`] when the variable is absent,
    /// empty, or exceeds the length limit.
    pub fn from_lookup(
        var: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let Some(token) = lookup(var) else {
            return Err(ConfigError::Credential(format!(
                "{var} environment variable is required"
            )));
        };
        if token.is_empty() {
            return Err(ConfigError::Credential(format!("{var} must be non-empty")));
        }
        if token.len() > MAX_TOKEN_LENGTH {
            return Err(ConfigError::Credential(format!(
                "{var} exceeds the {MAX_TOKEN_LENGTH} byte limit"
            )));
        }
        Ok(Self(token))
    }

    /// Returns the raw token for request authentication.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UpstreamCredential {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("UpstreamCredential(<redacted>)")
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Filesystem errors while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parse errors.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
    /// Missing or malformed upstream credential.
    #[error("credential error: {0}")]
    Credential(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path and whether it was explicitly requested.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
