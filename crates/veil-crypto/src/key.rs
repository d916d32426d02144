//! Key material, derivation, and sourcing.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};
use crate::vault::KEY_LEN;

/// Argon2id memory cost in KiB.
const ARGON2_MEMORY_KIB: u32 = 65_536;
/// Argon2id iteration count.
const ARGON2_ITERATIONS: u32 = 3;
/// Argon2id lane count.
const ARGON2_LANES: u32 = 4;

/// Key bytes with zeroize-on-drop semantics.
///
/// Length is not enforced at construction; the vault rejects anything other
/// than [`KEY_LEN`] bytes before touching the cipher. There is no equality
/// impl: derived comparison over secret bytes is not constant-time, so
/// callers that must compare keys do it explicitly on [`Self::as_bytes`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureKey(Vec<u8>);

impl SecureKey {
    /// Wraps existing key bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Generates a random 32-byte key.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true for an empty key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecureKey([REDACTED, {} bytes])", self.0.len())
    }
}

/// Derives a 32-byte key from a passphrase and salt using Argon2id.
///
/// Deterministic: the same passphrase and salt always produce the same key.
///
/// # Errors
/// Returns `KeyDerivation` if the parameters are rejected (for example a
/// salt shorter than 8 bytes).
pub fn derive_key(password: &[u8], salt: &[u8]) -> CryptoResult<SecureKey> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_LANES,
        Some(KEY_LEN),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = vec![0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(SecureKey::from_bytes(output))
}

/// Key sourcing contract for the vault.
///
/// `rotate` is optional; providers backed by immutable key material keep the
/// default implementation.
pub trait KeyProvider: Send + Sync {
    /// Returns the active key.
    ///
    /// # Errors
    /// Returns an error if the key cannot be sourced.
    fn key(&self) -> CryptoResult<SecureKey>;

    /// Replaces the active key with a fresh one and returns it.
    ///
    /// # Errors
    /// Returns `RotationUnsupported` unless the provider overrides this.
    fn rotate(&self) -> CryptoResult<SecureKey> {
        Err(CryptoError::RotationUnsupported)
    }
}

/// In-process key provider holding a single key.
#[derive(Debug)]
pub struct StaticKeyProvider {
    key: Mutex<SecureKey>,
}

impl StaticKeyProvider {
    /// Wraps an existing key.
    #[must_use]
    pub fn new(key: SecureKey) -> Self {
        Self {
            key: Mutex::new(key),
        }
    }

    /// Creates a provider with a freshly generated 32-byte key.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(SecureKey::generate())
    }

    /// Creates a provider with a key derived from a passphrase and salt.
    ///
    /// # Errors
    /// Returns `KeyDerivation` if derivation fails.
    pub fn from_passphrase(password: &[u8], salt: &[u8]) -> CryptoResult<Self> {
        Ok(Self::new(derive_key(password, salt)?))
    }
}

impl KeyProvider for StaticKeyProvider {
    fn key(&self) -> CryptoResult<SecureKey> {
        let guard = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(guard.clone())
    }

    fn rotate(&self) -> CryptoResult<SecureKey> {
        let fresh = SecureKey::generate();
        let mut guard = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = fresh.clone();
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_has_required_length() {
        assert_eq!(SecureKey::generate().len(), KEY_LEN);
    }

    #[test]
    fn test_debug_redacts_key_bytes() {
        let key = SecureKey::from_bytes(vec![0xAA; 32]);
        let rendered = format!("{key:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("aa"));
        assert!(!rendered.contains("AA"));
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let a = derive_key(b"correct horse battery staple", b"0123456789abcdef").unwrap();
        let b = derive_key(b"correct horse battery staple", b"0123456789abcdef").unwrap();
        let c = derive_key(b"correct horse battery staple", b"fedcba9876543210").unwrap();

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
        assert_eq!(a.len(), KEY_LEN);
    }

    #[test]
    fn test_derive_key_rejects_short_salt() {
        assert!(derive_key(b"pw", b"salt").is_err());
    }

    #[test]
    fn test_static_provider_returns_same_key() {
        let provider = StaticKeyProvider::generate();
        let first = provider.key().unwrap();
        let second = provider.key().unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_static_provider_rotation_replaces_key() {
        let provider = StaticKeyProvider::generate();
        let before = provider.key().unwrap();
        let rotated = provider.rotate().unwrap();

        assert_ne!(before.as_bytes(), rotated.as_bytes());
        assert_eq!(provider.key().unwrap().as_bytes(), rotated.as_bytes());
    }

    #[test]
    fn test_default_rotation_is_unsupported() {
        struct Fixed(SecureKey);
        impl KeyProvider for Fixed {
            fn key(&self) -> CryptoResult<SecureKey> {
                Ok(self.0.clone())
            }
        }

        let provider = Fixed(SecureKey::generate());
        assert!(matches!(
            provider.rotate(),
            Err(CryptoError::RotationUnsupported)
        ));
    }
}
