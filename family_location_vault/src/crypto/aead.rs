//! AEAD transforms - AES-256-GCM and XChaCha20-Poly1305

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce as AesNonce,
};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use super::kdf::DerivedKey;
use crate::error::{DecryptError, LocationVaultError, Result};

/// Poly1305 / GCM tag length
pub const TAG_LEN: usize = 16;

/// AEAD cipher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadCipher {
    /// AES-256-GCM (12-byte nonce)
    Aes256Gcm,
    /// XChaCha20-Poly1305 (24-byte nonce)
    XChaCha20Poly1305,
}

impl AeadCipher {
    pub fn nonce_len(&self) -> usize {
        match self {
            Self::Aes256Gcm => 12,
            Self::XChaCha20Poly1305 => 24,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Aes256Gcm => "AES-256-GCM",
            Self::XChaCha20Poly1305 => "XChaCha20-Poly1305",
        }
    }
}

/// Fresh random nonce of the cipher's length
fn generate_nonce(cipher: AeadCipher) -> Result<Vec<u8>> {
    let mut nonce = vec![0u8; cipher.nonce_len()];
    OsRng
        .try_fill_bytes(&mut nonce)
        .map_err(|e| LocationVaultError::EncryptionFailed(format!("RNG failed: {e}")))?;
    Ok(nonce)
}

/// Encrypts `plaintext`, returning `(nonce, ciphertext || tag)`
pub fn seal(cipher: AeadCipher, key: &DerivedKey, plaintext: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let nonce = generate_nonce(cipher)?;

    let ciphertext = match cipher {
        AeadCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key.expose())
            .map_err(|e| LocationVaultError::EncryptionFailed(e.to_string()))?
            .encrypt(AesNonce::from_slice(&nonce), plaintext),
        AeadCipher::XChaCha20Poly1305 => XChaCha20Poly1305::new_from_slice(key.expose())
            .map_err(|e| LocationVaultError::EncryptionFailed(e.to_string()))?
            .encrypt(XNonce::from_slice(&nonce), plaintext),
    }
    .map_err(|_| LocationVaultError::EncryptionFailed(format!("{} seal failed", cipher.name())))?;

    Ok((nonce, ciphertext))
}

/// Authenticates and decrypts `ciphertext || tag`.
///
/// Any failure (wrong key, flipped bit, short input) is `AuthenticationFailed`.
pub fn open(
    cipher: AeadCipher,
    key: &DerivedKey,
    nonce: &[u8],
    ciphertext: &[u8],
) -> std::result::Result<Zeroizing<Vec<u8>>, DecryptError> {
    if nonce.len() != cipher.nonce_len() || ciphertext.len() < TAG_LEN {
        return Err(DecryptError::AuthenticationFailed);
    }

    let plaintext = match cipher {
        AeadCipher::Aes256Gcm => Aes256Gcm::new_from_slice(key.expose())
            .map_err(|_| DecryptError::AuthenticationFailed)?
            .decrypt(AesNonce::from_slice(nonce), ciphertext),
        AeadCipher::XChaCha20Poly1305 => XChaCha20Poly1305::new_from_slice(key.expose())
            .map_err(|_| DecryptError::AuthenticationFailed)?
            .decrypt(XNonce::from_slice(nonce), ciphertext),
    }
    .map_err(|_| DecryptError::AuthenticationFailed)?;

    Ok(Zeroizing::new(plaintext))
}
