//! Engine configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::KdfConfig;
use crate::envelope::EnvelopeVersion;
use crate::error::Result;

/// Engine parameters.
///
/// Every device of a family must agree on `kdf`. `active_version` only
/// governs new writes; readers accept all known versions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kdf: KdfConfig,
    pub active_version: EnvelopeVersion,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }
}
