//! Pipeline error types.

use thiserror::Error;

/// Anonymization result type.
pub type AnonymizeResult<T> = Result<T, AnonymizeError>;

/// Anonymization pipeline errors.
#[derive(Error, Debug)]
pub enum AnonymizeError {
    /// Policy failed validation.
    #[error("invalid policy: {0}")]
    Policy(#[from] veil_core::PolicyError),

    /// Vault operation failed.
    #[error("vault error: {0}")]
    Crypto(#[from] veil_crypto::CryptoError),

    /// A custom or deny pattern failed to compile.
    #[error("pattern compilation error: {0}")]
    PatternCompilation(String),

    /// The external recognizer failed.
    #[error("recognizer error: {0}")]
    Recognizer(String),
}

impl AnonymizeError {
    /// Returns the error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Policy(_) => "ANON_INVALID_POLICY",
            Self::Crypto(_) => "ANON_VAULT_ERROR",
            Self::PatternCompilation(_) => "ANON_PATTERN_COMPILATION",
            Self::Recognizer(_) => "ANON_RECOGNIZER_ERROR",
        }
    }
}

impl From<regex::Error> for AnonymizeError {
    fn from(e: regex::Error) -> Self {
        Self::PatternCompilation(e.to_string())
    }
}
