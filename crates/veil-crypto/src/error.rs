//! Cryptographic error types.

use thiserror::Error;

/// Result alias for vault operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors from the vault and key handling.
///
/// `InvalidKeyLength` and `AuthenticationFailed` are fatal and raised
/// immediately; the vault never returns partially decrypted data.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The key is not exactly the required length.
    #[error("invalid key length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Required key length in bytes.
        expected: usize,
        /// Length of the supplied key.
        actual: usize,
    },

    /// Decryption rejected the ciphertext (wrong key or tampered data).
    #[error("authentication failed: ciphertext rejected")]
    AuthenticationFailed,

    /// The cipher failed to produce ciphertext.
    #[error("encryption failed")]
    EncryptionFailed,

    /// The initialization vector has the wrong length.
    #[error("invalid nonce length: expected {expected} bytes, got {actual}")]
    InvalidNonce {
        /// Required nonce length in bytes.
        expected: usize,
        /// Length of the supplied nonce.
        actual: usize,
    },

    /// The authentication tag has the wrong length.
    #[error("invalid authentication tag length: expected {expected} bytes, got {actual}")]
    InvalidTag {
        /// Required tag length in bytes.
        expected: usize,
        /// Length of the supplied tag.
        actual: usize,
    },

    /// Passphrase-based key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// The key provider does not support rotation.
    #[error("key rotation is not supported by this provider")]
    RotationUnsupported,

    /// Base64 decoding of a transport field failed.
    #[error("base64 decoding failed: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The plaintext map could not be serialized or parsed.
    #[error("map serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CryptoError {
    /// Returns a stable error code for logs and transports.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidKeyLength { .. } => "INVALID_KEY_LENGTH",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILURE",
            Self::EncryptionFailed => "ENCRYPTION_FAILURE",
            Self::InvalidNonce { .. } => "INVALID_NONCE",
            Self::InvalidTag { .. } => "INVALID_TAG",
            Self::KeyDerivation(_) => "KEY_DERIVATION_FAILURE",
            Self::RotationUnsupported => "ROTATION_UNSUPPORTED",
            Self::Encoding(_) => "ENCODING_FAILURE",
            Self::Serialization(_) => "SERIALIZATION_FAILURE",
        }
    }
}

impl From<aes_gcm::Error> for CryptoError {
    fn from(_: aes_gcm::Error) -> Self {
        Self::AuthenticationFailed
    }
}
