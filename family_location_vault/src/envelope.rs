//! Versioned ciphertext envelope
//!
//! Wire format:
//! ```text
//! <version-tag> ":" base64(nonce || ciphertext || tag)
//!
//! v1  AES-256-GCM         nonce 12B  tag 16B
//! v2  XChaCha20-Poly1305  nonce 24B  tag 16B
//! ```
//! Base64 uses the standard padded alphabet.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::crypto::AeadCipher;
use crate::error::FormatError;

/// Separator between version tag and body
pub const SEPARATOR: char = ':';

/// Characters of an unrecognized prefix echoed back in `UnknownVersion`
const MAX_PREFIX_ECHO: usize = 16;

/// Envelope format revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeVersion {
    #[default]
    V1,
    V2,
}

impl EnvelopeVersion {
    /// Every version a reader accepts
    pub const ALL: [EnvelopeVersion; 2] = [Self::V1, Self::V2];

    pub fn tag(&self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::V2 => "v2",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.tag() == tag)
    }

    pub fn cipher(&self) -> AeadCipher {
        match self {
            Self::V1 => AeadCipher::Aes256Gcm,
            Self::V2 => AeadCipher::XChaCha20Poly1305,
        }
    }

    pub fn nonce_len(&self) -> usize {
        self.cipher().nonce_len()
    }

    /// Version whose `tag:` prefix starts `raw`, if any
    pub fn detect(raw: &str) -> Option<Self> {
        let (tag, _) = raw.split_once(SEPARATOR)?;
        Self::from_tag(tag)
    }
}

impl std::fmt::Display for EnvelopeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Parsed envelope. Self-contained: the shared secret is the only other input
/// needed to open it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub version: EnvelopeVersion,
    pub nonce: Vec<u8>,
    /// Ciphertext with the AEAD tag appended
    pub ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(version: EnvelopeVersion, nonce: Vec<u8>, ciphertext: Vec<u8>) -> Self {
        Self {
            version,
            nonce,
            ciphertext,
        }
    }

    /// Serialize to the wire string
    pub fn encode(&self) -> String {
        encode(self.version, &self.nonce, &self.ciphertext)
    }

    /// Parse a wire string
    pub fn decode(raw: &str) -> Result<Self, FormatError> {
        decode(raw)
    }
}

/// Build `tag:base64(nonce || ciphertext)`
pub fn encode(version: EnvelopeVersion, nonce: &[u8], ciphertext: &[u8]) -> String {
    let mut body = Vec::with_capacity(nonce.len() + ciphertext.len());
    body.extend_from_slice(nonce);
    body.extend_from_slice(ciphertext);

    let mut out = String::with_capacity(version.tag().len() + 1 + body.len().div_ceil(3) * 4);
    out.push_str(version.tag());
    out.push(SEPARATOR);
    STANDARD.encode_string(&body, &mut out);
    out
}

/// Split a wire string back into version, nonce and ciphertext.
///
/// The version tag is checked before anything else is looked at; input with
/// no separator has no known tag either. The body is decoded byte-exact, so
/// surrounding whitespace is an encoding error.
pub fn decode(raw: &str) -> Result<Envelope, FormatError> {
    let (tag, body) = raw
        .split_once(SEPARATOR)
        .ok_or_else(|| FormatError::UnknownVersion(raw.chars().take(MAX_PREFIX_ECHO).collect()))?;

    let version =
        EnvelopeVersion::from_tag(tag).ok_or_else(|| FormatError::UnknownVersion(tag.to_string()))?;

    let mut bytes = STANDARD
        .decode(body)
        .map_err(|e| FormatError::Encoding(e.to_string()))?;

    let nonce_len = version.nonce_len();
    if bytes.len() < nonce_len {
        return Err(FormatError::Truncated {
            version: version.tag(),
            expected: nonce_len,
            actual: bytes.len(),
        });
    }

    let ciphertext = bytes.split_off(nonce_len);
    Ok(Envelope::new(version, bytes, ciphertext))
}
