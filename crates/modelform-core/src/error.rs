//! Core error types for the modelform workspace.
//!
//! [`ModelFormError`] covers every failure category of the form-binding
//! layer. Two families exist:
//!
//! - **recoverable** errors (`Coercion`, `InvalidChoice`, `Integrity`,
//!   `ValidationError`) describe bad user input. The forms layer converts
//!   them into per-field or form-level messages and never lets them escape
//!   `validate()`.
//! - **fatal** errors (`State`, `NotFound`, `Unsupported`, `DatabaseError`,
//!   `ConfigurationError`, `IoError`) describe a broken programming contract
//!   or a failing collaborator and abort the request.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A single validation failure with a message and a machine-readable code.
///
/// # Examples
///
/// ```
/// use modelform_core::error::ValidationError;
///
/// let err = ValidationError::new("This field is required.", "required");
/// assert_eq!(err.to_string(), "This field is required.");
/// assert_eq!(err.code, "required");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The user-facing error message.
    pub message: String,
    /// A short code identifying the failure (e.g. "required", "invalid_choice").
    pub code: String,
    /// Additional parameters providing context for the message.
    pub params: HashMap<String, String>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
        }
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for the modelform workspace.
///
/// Each variant maps to an HTTP status code via [`ModelFormError::status_code`]
/// so a web controller can turn fatal errors into responses directly.
#[derive(Error, Debug)]
pub enum ModelFormError {
    // ── Recoverable (user input) ─────────────────────────────────────

    /// A submitted token could not be parsed into the field's value type.
    #[error("Coercion error: {0}")]
    Coercion(String),

    /// A parsed value is not among the resolved candidates of a field.
    #[error("Invalid choice: {0}")]
    InvalidChoice(String),

    /// The instance-level integrity check rejected the instance.
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// A field failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Fatal (programming contract) ─────────────────────────────────

    /// An operation was invoked in the wrong lifecycle state
    /// (e.g. `save()` without a successful `validate()`).
    #[error("State error: {0}")]
    State(String),

    /// A referenced object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested feature is deliberately not supported.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The model layer failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ModelFormError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `Coercion`, `InvalidChoice`, `Integrity`, `ValidationError` -> 400
    /// - `NotFound` -> 404
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Coercion(_)
            | Self::InvalidChoice(_)
            | Self::Integrity(_)
            | Self::ValidationError(_) => 400,
            Self::NotFound(_) => 404,
            Self::State(_)
            | Self::Unsupported(_)
            | Self::DatabaseError(_)
            | Self::ConfigurationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns `true` for errors caused by user input rather than a broken contract.
    pub const fn is_recoverable(&self) -> bool {
        self.status_code() == 400
    }
}

impl From<ValidationError> for ModelFormError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, ModelFormError>`.
pub type ModelFormResult<T> = Result<T, ModelFormError>;
