//! Shared errors and result types for the chorus dispatch engine.
//!
//! This crate provides the foundational types used across all other chorus crates:
//! - `ChorusError`: caller-input and configuration errors
//! - `FailureKind`: the per-provider failure taxonomy
//! - `ProviderFailure`: a classified failure with its vendor-supplied detail
//! - `ProviderResult`: the outcome of asking one provider for a completion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error type for chorus library code.
///
/// Per-provider failures are never reported through this type; they travel
/// inside [`ProviderResult::Failure`] so that sibling providers are unaffected.
#[derive(Debug, thiserror::Error)]
pub enum ChorusError {
    // === Caller input ===
    #[error("Prompt must not be empty")]
    EmptyPrompt,

    #[error("At least one provider must be selected")]
    NoProviders,

    #[error("Invalid option '{name}': {message}")]
    InvalidOption { name: String, message: String },

    #[error("Invalid provider spec '{spec}': {message}")]
    InvalidSpec { spec: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ChorusError {
    /// Returns `true` if the error was caused by the caller's input rather than
    /// by configuration or the environment.
    pub fn is_caller_input(&self) -> bool {
        matches!(
            self,
            ChorusError::EmptyPrompt
                | ChorusError::NoProviders
                | ChorusError::InvalidOption { .. }
                | ChorusError::InvalidSpec { .. }
        )
    }
}

/// A convenience alias for `Result<T, ChorusError>`.
pub type Result<T> = std::result::Result<T, ChorusError>;

// ---------------------------------------------------------------------------
// FailureKind
// ---------------------------------------------------------------------------

/// Category of a single provider's failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No usable credential was configured for the vendor.
    MissingCredential,
    /// The requested variant is not known for the vendor.
    UnknownVariant,
    /// Connection failure, timeout, or non-2xx HTTP status.
    Transport,
    /// The vendor reported an error inside a successful HTTP response.
    ApiError,
    /// Successful response whose shape violates the vendor's contract.
    MalformedResponse,
    /// The adapter itself crashed while handling the request.
    Internal,
}

impl FailureKind {
    /// Failures detected before any network call is attempted.
    pub fn is_configuration(&self) -> bool {
        matches!(self, FailureKind::MissingCredential | FailureKind::UnknownVariant)
    }

    /// Human-readable category used when presenting a failure.
    pub fn label(&self) -> &'static str {
        match self {
            FailureKind::MissingCredential => "missing credential",
            FailureKind::UnknownVariant => "unknown model variant",
            FailureKind::Transport => "transport error",
            FailureKind::ApiError => "API error",
            FailureKind::MalformedResponse => "malformed response",
            FailureKind::Internal => "internal error",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// ProviderFailure
// ---------------------------------------------------------------------------

/// A classified failure from one provider, with the detail message shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProviderFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_credential(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MissingCredential, message)
    }

    pub fn unknown_variant(message: impl Into<String>) -> Self {
        Self::new(FailureKind::UnknownVariant, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transport, message)
    }

    pub fn api_error(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ApiError, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }
}

// ---------------------------------------------------------------------------
// ProviderResult
// ---------------------------------------------------------------------------

/// Outcome of one dispatch attempt against one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProviderResult {
    Success { text: String },
    Failure { kind: FailureKind, message: String },
}

impl ProviderResult {
    pub fn success(text: impl Into<String>) -> Self {
        ProviderResult::Success { text: text.into() }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResult::Success { .. })
    }

    /// The failure kind, or `None` on success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ProviderResult::Success { .. } => None,
            ProviderResult::Failure { kind, .. } => Some(*kind),
        }
    }

    /// The generated text, or `None` on failure.
    pub fn text(&self) -> Option<&str> {
        match self {
            ProviderResult::Success { text } => Some(text),
            ProviderResult::Failure { .. } => None,
        }
    }
}

impl From<ProviderFailure> for ProviderResult {
    fn from(failure: ProviderFailure) -> Self {
        ProviderResult::Failure {
            kind: failure.kind,
            message: failure.message,
        }
    }
}

impl From<std::result::Result<String, ProviderFailure>> for ProviderResult {
    fn from(result: std::result::Result<String, ProviderFailure>) -> Self {
        match result {
            Ok(text) => ProviderResult::Success { text },
            Err(failure) => failure.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
