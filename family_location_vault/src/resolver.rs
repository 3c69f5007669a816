//! Backward-compatible reading of stored location fields.
//!
//! The store may hold a plain structured record written before encryption
//! existed, an envelope string, a JSON string, or nothing. This is the only
//! place where errors turn into `None`, so one bad record cannot stop a
//! stream of good ones.

use serde_json::{Map, Value};

use crate::engine::LocationCipher;
use crate::envelope::EnvelopeVersion;
use crate::payload::LocationPayload;

/// Shape of a value read from the document store
#[derive(Debug, Clone, PartialEq)]
pub enum StorageValue {
    /// Legacy plaintext object
    Structured(Map<String, Value>),
    /// Envelope or legacy JSON text
    Text(String),
    Absent,
}

impl From<Value> for StorageValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::Object(map) => Self::Structured(map),
            Value::String(text) => Self::Text(text),
            // Scalars and arrays fall through to the legacy parse, which rejects them.
            other => Self::Text(other.to_string()),
        }
    }
}

impl From<Option<Value>> for StorageValue {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Absent, Self::from)
    }
}

impl From<String> for StorageValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for StorageValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<&LocationPayload> for StorageValue {
    fn from(payload: &LocationPayload) -> Self {
        match serde_json::to_value(payload) {
            Ok(Value::Object(map)) => Self::Structured(map),
            _ => Self::Absent,
        }
    }
}

/// Resolve a stored value into a location, auto-detecting its format
pub fn resolve(
    cipher: &LocationCipher,
    raw: &StorageValue,
    secret: &str,
) -> Option<LocationPayload> {
    match raw {
        StorageValue::Absent => None,

        StorageValue::Structured(map) => match LocationPayload::from_legacy_map(map) {
            Ok(payload) => Some(payload),
            Err(_) => {
                tracing::warn!(fields = map.len(), "legacy location record has unexpected shape");
                None
            }
        },

        StorageValue::Text(text) => match EnvelopeVersion::detect(text) {
            Some(version) => match cipher.decrypt(secret, text) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(%version, error = %e, "dropping unreadable location envelope");
                    None
                }
            },
            None => match serde_json::from_str::<LocationPayload>(text) {
                Ok(payload) => Some(payload),
                Err(_) => {
                    tracing::debug!(len = text.len(), "stored text is neither envelope nor legacy JSON");
                    None
                }
            },
        },
    }
}
