//! Location plaintext and its canonical byte form

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use zeroize::Zeroizing;

use crate::error::{LocationVaultError, Result};

/// One location reading.
///
/// Serialized field order is fixed: latitude, longitude, timestamp, address.
/// `lat`, `lng` and `lon` are accepted on read for records written before the
/// field names were settled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPayload {
    #[serde(alias = "lat")]
    pub latitude: f64,

    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,

    /// ISO-8601 timestamp, kept verbatim. Older records may carry epoch
    /// millis or a store-native object; those are kept as their JSON text.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl LocationPayload {
    pub fn new(
        latitude: f64,
        longitude: f64,
        timestamp: impl Into<String>,
        address: Option<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: timestamp.into(),
            address,
        }
    }

    /// Reading stamped with the current UTC time
    pub fn now(latitude: f64, longitude: f64, address: Option<String>) -> Self {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::new(latitude, longitude, timestamp, address)
    }

    /// Coordinates must survive JSON exactly; NaN and infinities do not.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(LocationVaultError::InvalidPayload(
                "coordinates must be finite numbers".into(),
            ));
        }
        Ok(())
    }

    /// Canonical JSON bytes, wiped on drop
    pub fn to_canonical_bytes(&self) -> Result<Zeroizing<Vec<u8>>> {
        self.validate()?;
        Ok(Zeroizing::new(serde_json::to_vec(self)?))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Legacy structured record as stored before encryption existed
    pub fn from_legacy_map(map: &serde_json::Map<String, Value>) -> Result<Self> {
        let payload: Self = serde_json::from_value(Value::Object(map.clone()))?;
        payload.validate()?;
        Ok(payload)
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
