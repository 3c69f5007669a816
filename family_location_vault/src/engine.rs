//! Encrypt / decrypt location payloads under a family shared secret

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::crypto::{open, seal, KeyCache};
use crate::envelope::{Envelope, EnvelopeVersion};
use crate::error::{DecryptError, Result};
use crate::payload::LocationPayload;
use crate::resolver::{self, StorageValue};

/// The location encryption engine.
///
/// New envelopes are written with `active_version`; every known version is
/// readable. Keys come from the attached [`KeyCache`], so only the first call
/// per shared secret pays for the KDF.
#[derive(Clone)]
pub struct LocationCipher {
    cache: Arc<KeyCache>,
    active_version: EnvelopeVersion,
}

impl LocationCipher {
    /// Engine with its own, isolated key cache
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_cache(
            Arc::new(KeyCache::new(config.kdf.clone())),
            config.active_version,
        )
    }

    pub fn with_cache(cache: Arc<KeyCache>, active_version: EnvelopeVersion) -> Self {
        Self {
            cache,
            active_version,
        }
    }

    /// Engine backed by the process-wide key cache
    pub fn shared() -> Self {
        Self::with_cache(KeyCache::global(), EnvelopeVersion::default())
    }

    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    pub fn active_version(&self) -> EnvelopeVersion {
        self.active_version
    }

    /// Encrypt into a parsed envelope
    pub fn encrypt_envelope(&self, secret: &str, payload: &LocationPayload) -> Result<Envelope> {
        let plaintext = payload.to_canonical_bytes()?;
        let key = self.cache.get_or_derive(secret)?;

        let version = self.active_version;
        let (nonce, ciphertext) = seal(version.cipher(), &key, &plaintext)?;

        tracing::debug!(%version, bytes = ciphertext.len(), "location encrypted");
        Ok(Envelope::new(version, nonce, ciphertext))
    }

    /// Encrypt into the wire string
    pub fn encrypt(&self, secret: &str, payload: &LocationPayload) -> Result<String> {
        Ok(self.encrypt_envelope(secret, payload)?.encode())
    }

    /// Open a parsed envelope
    pub fn decrypt_envelope(&self, secret: &str, envelope: &Envelope) -> Result<LocationPayload> {
        let key = self.cache.get_or_derive(secret)?;
        let plaintext = open(
            envelope.version.cipher(),
            &key,
            &envelope.nonce,
            &envelope.ciphertext,
        )?;

        LocationPayload::from_bytes(&plaintext)
            .map_err(|_| DecryptError::MalformedPlaintext.into())
    }

    /// Open a wire string. Format errors surface before any key is derived.
    pub fn decrypt(&self, secret: &str, envelope: &str) -> Result<LocationPayload> {
        let envelope = Envelope::decode(envelope)?;
        self.decrypt_envelope(secret, &envelope)
    }

    /// Read whatever the store holds, encrypted or legacy. Never fails.
    pub fn resolve(&self, raw: &StorageValue, secret: &str) -> Option<LocationPayload> {
        resolver::resolve(self, raw, secret)
    }

    /// Forget all derived keys (family change, test isolation)
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

impl Default for LocationCipher {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KdfConfig;
    use crate::error::{FormatError, LocationVaultError};

    fn cipher(version: EnvelopeVersion) -> LocationCipher {
        LocationCipher::new(&EngineConfig {
            kdf: KdfConfig::fast_for_tests(),
            active_version: version,
        })
    }

    fn myeongdong() -> LocationPayload {
        LocationPayload::new(
            37.5665,
            126.9780,
            "2024-05-01T09:30:00.000Z",
            Some("서울특별시 중구 명동".into()),
        )
    }

    #[test]
    fn test_roundtrip_v1() {
        let c = cipher(EnvelopeVersion::V1);
        let env = c.encrypt("ABC123", &myeongdong()).unwrap();
        assert!(env.starts_with("v1:"));
        assert_eq!(c.decrypt("ABC123", &env).unwrap(), myeongdong());
    }

    #[test]
    fn test_roundtrip_v2() {
        let c = cipher(EnvelopeVersion::V2);
        let env = c.encrypt("ABC123", &myeongdong()).unwrap();
        assert!(env.starts_with("v2:"));
        assert_eq!(c.decrypt("ABC123", &env).unwrap(), myeongdong());
    }

    #[test]
    fn test_reader_accepts_older_version() {
        let writer = cipher(EnvelopeVersion::V1);
        let reader = LocationCipher::with_cache(Arc::clone(writer.cache()), EnvelopeVersion::V2);
        let env = writer.encrypt("ABC123", &myeongdong()).unwrap();
        assert_eq!(reader.decrypt("ABC123", &env).unwrap(), myeongdong());
    }

    #[test]
    fn test_same_payload_different_envelopes() {
        let c = cipher(EnvelopeVersion::V1);
        let a = c.encrypt("ABC123", &myeongdong()).unwrap();
        let b = c.encrypt("ABC123", &myeongdong()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_secret() {
        let c = cipher(EnvelopeVersion::V1);
        let env = c.encrypt("ABC123", &myeongdong()).unwrap();
        assert!(matches!(
            c.decrypt("WRONG1", &env),
            Err(LocationVaultError::Decrypt(DecryptError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_tampered_byte_rejected() {
        let c = cipher(EnvelopeVersion::V1);
        let env = c.encrypt_envelope("ABC123", &myeongdong()).unwrap();

        for i in 0..env.ciphertext.len() {
            let mut tampered = env.clone();
            tampered.ciphertext[i] ^= 0x01;
            let result = c.decrypt("ABC123", &tampered.encode());
            assert!(
                matches!(
                    result,
                    Err(LocationVaultError::Decrypt(DecryptError::AuthenticationFailed))
                ),
                "byte {i} flip was accepted"
            );
        }

        let mut tampered = env.clone();
        tampered.nonce[0] ^= 0x80;
        assert!(c.decrypt_envelope("ABC123", &tampered).is_err());
    }

    #[test]
    fn test_truncated_ciphertext_rejected() {
        let c = cipher(EnvelopeVersion::V1);
        let mut env = c.encrypt_envelope("ABC123", &myeongdong()).unwrap();
        env.ciphertext.truncate(env.ciphertext.len() - 1);
        assert!(matches!(
            c.decrypt_envelope("ABC123", &env),
            Err(LocationVaultError::Decrypt(DecryptError::AuthenticationFailed))
        ));
    }

    #[test]
    fn test_format_error_skips_kdf() {
        let c = cipher(EnvelopeVersion::V1);
        assert!(matches!(
            c.decrypt("ABC123", "v7:AAAA"),
            Err(LocationVaultError::Format(FormatError::UnknownVersion(_)))
        ));
        assert!(c.cache().is_empty());
    }

    #[test]
    fn test_empty_secret() {
        let c = cipher(EnvelopeVersion::V1);
        assert!(matches!(
            c.encrypt("", &myeongdong()),
            Err(LocationVaultError::InvalidSecret)
        ));
    }

    #[test]
    fn test_cache_reused_across_calls() {
        let c = cipher(EnvelopeVersion::V1);
        let env = c.encrypt("ABC123", &myeongdong()).unwrap();
        c.decrypt("ABC123", &env).unwrap();
        assert_eq!(c.cache().len(), 1);

        c.clear_cache();
        assert!(c.cache().is_empty());
        assert_eq!(c.decrypt("ABC123", &env).unwrap(), myeongdong());
    }
}
