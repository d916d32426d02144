//! # Veil Crypto
//!
//! Cryptographic side-channel for the Veil PII tagging pipeline:
//! - AES-256-GCM sealing of the plaintext original-value map
//! - Key wrapper with zeroize-on-drop and redacted debug output
//! - Argon2id passphrase derivation
//! - A minimal key-provider contract

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod key;
pub mod vault;

pub use error::{CryptoError, CryptoResult};
pub use key::{derive_key, KeyProvider, SecureKey, StaticKeyProvider};
pub use vault::{EncryptedMap, PiiVault, KEY_LEN, NONCE_LEN, TAG_LEN};
