//! Encryption for LucidBot access tokens at rest.
//!
//! Tokens are sealed with XChaCha20-Poly1305. Each encryption draws a fresh
//! 24-byte nonce; the stored blob is `base64(nonce || ciphertext)`.

use base64::{Engine, engine::general_purpose::STANDARD};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;

/// Errors produced by [`TokenCipher`].
#[derive(Debug, Error)]
pub enum CipherError {
    /// The configured key is not base64 for exactly 32 bytes.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// The stored blob is not valid base64 or is too short to hold a nonce.
    #[error("malformed ciphertext")]
    Malformed,

    /// Authentication failed (wrong key or tampered blob).
    #[error("decryption failed")]
    Decrypt,

    /// The plaintext is not UTF-8.
    #[error("decrypted token is not valid UTF-8")]
    Encoding,

    #[error("encryption failed")]
    Encrypt,
}

/// Symmetric cipher for stored access tokens.
#[derive(Clone)]
pub struct TokenCipher {
    cipher: XChaCha20Poly1305,
}

impl std::fmt::Debug for TokenCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl TokenCipher {
    /// Build a cipher from a base64-encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::InvalidKey` if the key does not decode to 32 bytes.
    pub fn from_base64_key(key: &SecretString) -> Result<Self, CipherError> {
        let bytes = STANDARD
            .decode(key.expose_secret().trim())
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(&bytes)),
        })
    }

    /// Generate a fresh random key, base64-encoded.
    #[must_use]
    pub fn generate_key() -> String {
        let mut key = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut key);
        STANDARD.encode(key)
    }

    /// Encrypt a token for storage.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::Encrypt` if the AEAD rejects the input.
    pub fn encrypt(&self, token: &str) -> Result<String, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce), token.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(blob))
    }

    /// Decrypt a stored token.
    ///
    /// # Errors
    ///
    /// Returns `CipherError::Malformed` for undecodable blobs,
    /// `CipherError::Decrypt` when authentication fails, and
    /// `CipherError::Encoding` for non-UTF-8 plaintext.
    pub fn decrypt(&self, blob: &str) -> Result<String, CipherError> {
        let raw = STANDARD.decode(blob).map_err(|_| CipherError::Malformed)?;
        if raw.len() <= NONCE_LEN {
            return Err(CipherError::Malformed);
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Decrypt)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::Encoding)
    }
}
