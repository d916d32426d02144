//! AES-256-GCM vault for plaintext maps.
//!
//! The map is serialized to JSON, sealed under a fresh random nonce, and the
//! 16-byte authentication tag is carried separately so the wire form exposes
//! `ciphertext`, `iv`, and `auth_tag` as three base64 fields.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use veil_core::PlaintextMap;

use crate::error::{CryptoError, CryptoResult};
use crate::key::SecureKey;

/// Required key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;
/// Nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;
/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// Sealed plaintext map plus the parameters needed to open it again.
///
/// All three fields serialize as base64 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedMap {
    /// Ciphertext without the trailing authentication tag.
    #[serde(with = "base64_serde")]
    pub ciphertext: Vec<u8>,
    /// Nonce used for this encryption, unique per call.
    #[serde(with = "base64_serde")]
    pub iv: Vec<u8>,
    /// GCM authentication tag.
    #[serde(with = "base64_serde")]
    pub auth_tag: Vec<u8>,
}

impl EncryptedMap {
    /// Returns `(ciphertext, iv, auth_tag)` as base64 strings.
    #[must_use]
    pub fn to_parts(&self) -> (String, String, String) {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        (
            STANDARD.encode(&self.ciphertext),
            STANDARD.encode(&self.iv),
            STANDARD.encode(&self.auth_tag),
        )
    }

    /// Rebuilds an encrypted map from base64 parts.
    ///
    /// # Errors
    /// Returns `Encoding` if any part is not valid base64.
    pub fn from_parts(ciphertext: &str, iv: &str, auth_tag: &str) -> CryptoResult<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine as _};
        Ok(Self {
            ciphertext: STANDARD.decode(ciphertext)?,
            iv: STANDARD.decode(iv)?,
            auth_tag: STANDARD.decode(auth_tag)?,
        })
    }
}

/// Serializes byte fields as standard base64 strings.
mod base64_serde {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

/// Encrypts and decrypts plaintext maps with AES-256-GCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiiVault;

impl PiiVault {
    /// Creates a vault.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Seals a plaintext map under the given key with a fresh random nonce.
    ///
    /// The intermediate JSON buffer is zeroized before this returns.
    ///
    /// # Errors
    /// Returns `InvalidKeyLength` for keys that are not 32 bytes,
    /// `Serialization` if the map cannot be encoded, and `EncryptionFailed`
    /// if the cipher rejects the input.
    pub fn encrypt(&self, map: &PlaintextMap, key: &SecureKey) -> CryptoResult<EncryptedMap> {
        validate_key(key)?;

        let mut plaintext = serde_json::to_vec(map)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: key.len(),
            }
        })?;

        let mut iv = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        let sealed = cipher.encrypt(Nonce::from_slice(&iv), plaintext.as_slice());
        plaintext.zeroize();
        let mut ciphertext = sealed.map_err(|_| CryptoError::EncryptionFailed)?;

        let tag_start = ciphertext.len() - TAG_LEN;
        let auth_tag = ciphertext.split_off(tag_start);

        Ok(EncryptedMap {
            ciphertext,
            iv: iv.to_vec(),
            auth_tag,
        })
    }

    /// Opens a sealed map, authenticating ciphertext, nonce, and tag.
    ///
    /// The intermediate JSON buffer is zeroized before this returns.
    ///
    /// # Errors
    /// Returns `InvalidKeyLength`, `InvalidNonce`, or `InvalidTag` for
    /// malformed inputs, `AuthenticationFailed` if the key is wrong or any
    /// part was tampered with, and `Serialization` if the decrypted bytes
    /// are not a valid map.
    pub fn decrypt(&self, encrypted: &EncryptedMap, key: &SecureKey) -> CryptoResult<PlaintextMap> {
        validate_key(key)?;
        if encrypted.iv.len() != NONCE_LEN {
            return Err(CryptoError::InvalidNonce {
                expected: NONCE_LEN,
                actual: encrypted.iv.len(),
            });
        }
        if encrypted.auth_tag.len() != TAG_LEN {
            return Err(CryptoError::InvalidTag {
                expected: TAG_LEN,
                actual: encrypted.auth_tag.len(),
            });
        }

        let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: key.len(),
            }
        })?;

        let mut sealed = Vec::with_capacity(encrypted.ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&encrypted.ciphertext);
        sealed.extend_from_slice(&encrypted.auth_tag);

        let mut plaintext = cipher.decrypt(Nonce::from_slice(&encrypted.iv), sealed.as_slice())?;
        let map = serde_json::from_slice(&plaintext);
        plaintext.zeroize();
        Ok(map?)
    }
}

fn validate_key(key: &SecureKey) -> CryptoResult<()> {
    if key.len() != KEY_LEN {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: key.len(),
        });
    }
    Ok(())
}
