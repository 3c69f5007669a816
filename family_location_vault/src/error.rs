//! Error types for the location vault

use thiserror::Error;

/// Malformed envelope strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Prefix is not a known tag, including input with no separator at all
    #[error("Unknown envelope version: {0}")]
    UnknownVersion(String),

    #[error("Envelope body is not valid base64: {0}")]
    Encoding(String),

    #[error("Envelope truncated: {version} needs at least {expected} bytes, got {actual}")]
    Truncated {
        version: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Failures of the authenticated decryption step.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecryptError {
    #[error("Authentication failed - wrong shared secret or tampered envelope")]
    AuthenticationFailed,

    /// Only reachable through non-AEAD cipher modes.
    #[error("Invalid padding - wrong shared secret or tampered envelope")]
    PaddingInvalid,

    #[error("Decrypted plaintext is not a location payload")]
    MalformedPlaintext,
}

impl DecryptError {
    /// Padding and tag failures mean the same thing to callers.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::AuthenticationFailed | Self::PaddingInvalid)
    }
}

/// Errors raised by the family directory collaborator.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("Family not found: {0}")]
    FamilyNotFound(String),

    #[error("Directory backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum LocationVaultError {
    // ═══════════════════════════════════════════════════════════════
    // KEY ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Invalid shared secret - must not be empty")]
    InvalidSecret,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // ═══════════════════════════════════════════════════════════════
    // CRYPTO ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Invalid location payload: {0}")]
    InvalidPayload(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    // ═══════════════════════════════════════════════════════════════
    // GLUE ERRORS
    // ═══════════════════════════════════════════════════════════════
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LocationVaultError>;

impl LocationVaultError {
    /// Wrong key or tampered ciphertext.
    pub fn is_security_critical(&self) -> bool {
        matches!(self, Self::Decrypt(e) if e.is_authentication_failure())
    }

    /// Errors the compatibility resolver absorbs as "no location".
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Format(_) | Self::Decrypt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padding_counts_as_authentication_failure() {
        let err = LocationVaultError::from(DecryptError::PaddingInvalid);
        assert!(err.is_security_critical());
        assert!(err.is_recoverable());
    }

    #[test]
    fn invalid_secret_is_fatal() {
        let err = LocationVaultError::InvalidSecret;
        assert!(!err.is_recoverable());
        assert!(!err.is_security_critical());
    }

    #[test]
    fn malformed_plaintext_is_not_security_critical() {
        let err = LocationVaultError::from(DecryptError::MalformedPlaintext);
        assert!(!err.is_security_critical());
        assert!(err.is_recoverable());
    }
}
