//! Core error types.

use thiserror::Error;

/// Error returned when a category name does not belong to the closed set.
#[derive(Debug, Clone, Error)]
#[error("unrecognized PII category '{0}'")]
pub struct CategoryParseError(pub String);

/// Errors from policy validation.
#[derive(Debug, Clone, Error)]
pub enum PolicyError {
    /// A per-category confidence threshold is outside `[0, 1]`.
    #[error("confidence threshold {value} for category {category} is outside [0, 1]")]
    InvalidThreshold {
        /// Canonical category name.
        category: String,
        /// The rejected value.
        value: f64,
    },

    /// A custom pattern's confidence is outside `[0, 1]`.
    #[error("confidence {value} for pattern '{name}' is outside [0, 1]")]
    InvalidConfidence {
        /// Pattern name.
        name: String,
        /// The rejected value.
        value: f64,
    },

    /// A custom or denylist pattern is empty.
    #[error("pattern '{name}' has an empty expression")]
    EmptyPattern {
        /// Pattern name.
        name: String,
    },
}

impl PolicyError {
    /// Returns a stable error code for logs and transports.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidThreshold { .. } => "INVALID_THRESHOLD",
            Self::InvalidConfidence { .. } => "INVALID_CONFIDENCE",
            Self::EmptyPattern { .. } => "EMPTY_PATTERN",
        }
    }
}
