//! AES-256-GCM entry encryption and Argon2id key derivation.
//!
//! Key derivation: Argon2id(password, [`KEY_SALT`]) → 32-byte key.
//! Neither dialect header carries a per-archive salt field, so the salt
//! is a fixed context constant.
//!
//! Encrypted payload layout: `[ nonce (12 B) | ciphertext | GCM tag (16 B) ]`.
//!
//! The nonce is not random: it is the first 12 bytes of
//! `blake3(key ‖ plaintext)`.  Serialization must be byte-identical
//! across runs and machines, and a random nonce cannot satisfy that.
//! The synthetic nonce reveals only whether two entries under the same
//! key hold identical plaintext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

/// Byte length of the nonce prepended to every encrypted payload.
pub const NONCE_LEN: usize = 12;

/// Fixed Argon2id salt; 16 bytes.
pub const KEY_SALT: &[u8; 16] = b"farc.container.1";

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed")]
    EncryptionFailed,
    #[error("Decryption failed — wrong key or corrupted data")]
    DecryptionFailed,
    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("Encrypted payload too short (minimum {NONCE_LEN} bytes)")]
    TooShort,
    #[error("Entry is encrypted but no key was provided")]
    MissingKey,
}

/// Derive a 256-bit key from a password with Argon2id.
pub fn derive_key(password: &str) -> Result<[u8; 32], CryptoError> {
    let params = Params::new(64 * 1024, 3, 1, Some(32))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = [0u8; 32];
    argon2
        .hash_password_into(password.as_bytes(), KEY_SALT, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

fn synth_nonce(key: &[u8; 32], plaintext: &[u8]) -> [u8; NONCE_LEN] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(key);
    hasher.update(plaintext);
    let digest = hasher.finalize();
    digest.as_bytes()[..NONCE_LEN].try_into().unwrap()
}

/// Encrypt `plaintext`; returns `nonce || ciphertext || tag`.
pub fn encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::EncryptionFailed)?;
    let nonce_bytes = synth_nonce(key, plaintext);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt a payload produced by [`encrypt`].
pub fn decrypt(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_LEN {
        return Err(CryptoError::TooShort);
    }
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::DecryptionFailed)?;
    let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
    cipher
        .decrypt(nonce, &data[NONCE_LEN..])
        .map_err(|_| CryptoError::DecryptionFailed)
}
