//! Family Directory Service collaborator and the publish/fetch glue around it.
//!
//! The engine never does I/O; a directory implementation owns the document
//! store and hands back raw field values.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::engine::LocationCipher;
use crate::error::{DirectoryError, Result};
use crate::payload::LocationPayload;
use crate::resolver::StorageValue;

/// Document-store access as seen by the engine
pub trait FamilyDirectory: Send + Sync {
    fn shared_secret_for_family(&self, family_id: &str) -> std::result::Result<String, DirectoryError>;

    fn read_location_field(&self, family_id: &str) -> std::result::Result<StorageValue, DirectoryError>;

    fn write_location_field(
        &self,
        family_id: &str,
        value: StorageValue,
    ) -> std::result::Result<(), DirectoryError>;
}

/// In-process directory for tests and the diagnostic binary
#[derive(Default)]
pub struct InMemoryFamilyDirectory {
    secrets: RwLock<HashMap<String, String>>,
    locations: RwLock<HashMap<String, StorageValue>>,
}

impl InMemoryFamilyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_family(&self, family_id: &str, shared_secret: &str) {
        self.secrets
            .write()
            .insert(family_id.to_string(), shared_secret.to_string());
    }

    /// What the untrusted store would see
    pub fn raw_location(&self, family_id: &str) -> StorageValue {
        self.locations
            .read()
            .get(family_id)
            .cloned()
            .unwrap_or(StorageValue::Absent)
    }
}

impl FamilyDirectory for InMemoryFamilyDirectory {
    fn shared_secret_for_family(&self, family_id: &str) -> std::result::Result<String, DirectoryError> {
        self.secrets
            .read()
            .get(family_id)
            .cloned()
            .ok_or_else(|| DirectoryError::FamilyNotFound(family_id.to_string()))
    }

    fn read_location_field(&self, family_id: &str) -> std::result::Result<StorageValue, DirectoryError> {
        Ok(self.raw_location(family_id))
    }

    fn write_location_field(
        &self,
        family_id: &str,
        value: StorageValue,
    ) -> std::result::Result<(), DirectoryError> {
        self.locations.write().insert(family_id.to_string(), value);
        Ok(())
    }
}

/// Producer and consumer side of location sharing for one directory
pub struct LocationShare<D: FamilyDirectory> {
    directory: D,
    cipher: LocationCipher,
}

impl<D: FamilyDirectory> LocationShare<D> {
    pub fn new(directory: D, cipher: LocationCipher) -> Self {
        Self { directory, cipher }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn cipher(&self) -> &LocationCipher {
        &self.cipher
    }

    /// Encrypt and store the family's latest location
    pub fn publish(&self, family_id: &str, payload: &LocationPayload) -> Result<()> {
        let secret = self.directory.shared_secret_for_family(family_id)?;
        let envelope = self.cipher.encrypt(&secret, payload)?;
        self.directory
            .write_location_field(family_id, StorageValue::Text(envelope))?;
        tracing::info!(family_id, "location published");
        Ok(())
    }

    /// Read the family's latest location.
    ///
    /// Directory failures are errors; an unreadable record is `Ok(None)`.
    pub fn fetch(&self, family_id: &str) -> Result<Option<LocationPayload>> {
        let secret = self.directory.shared_secret_for_family(family_id)?;
        let raw = self.directory.read_location_field(family_id)?;
        Ok(self.cipher.resolve(&raw, &secret))
    }
}
