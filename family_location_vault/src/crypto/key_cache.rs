//! Memoization of derived keys, one entry per shared secret.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use super::kdf::{derive_key, DerivedKey, KdfConfig};
use crate::error::Result;

/// Shared secret -> derived key map.
///
/// Lookups take a read lock. A miss derives the key outside any lock and then
/// inserts under the write lock; if two threads race on the same secret the
/// first insert wins and both observe the same key.
pub struct KeyCache {
    config: KdfConfig,
    entries: RwLock<HashMap<String, Arc<DerivedKey>>>,
}

static GLOBAL: OnceLock<Arc<KeyCache>> = OnceLock::new();

impl KeyCache {
    pub fn new(config: KdfConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide cache with default KDF parameters
    pub fn global() -> Arc<KeyCache> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(KeyCache::new(KdfConfig::default()))))
    }

    pub fn config(&self) -> &KdfConfig {
        &self.config
    }

    /// Returns the cached key or runs the KDF once for a new secret
    pub fn get_or_derive(&self, secret: &str) -> Result<Arc<DerivedKey>> {
        if let Some(key) = self.entries.read().get(secret) {
            tracing::trace!("key cache hit");
            return Ok(Arc::clone(key));
        }

        let derived = Arc::new(derive_key(secret, &self.config)?);

        let mut entries = self.entries.write();
        let key = Arc::clone(
            entries
                .entry(secret.to_owned())
                .or_insert_with(|| Arc::clone(&derived)),
        );
        tracing::debug!(entries = entries.len(), "derived key for shared secret");
        Ok(key)
    }

    /// Drops every cached key
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "key cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for KeyCache {
    fn default() -> Self {
        Self::new(KdfConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LocationVaultError;
    use std::thread;

    fn cache() -> KeyCache {
        KeyCache::new(KdfConfig::fast_for_tests())
    }

    #[test]
    fn test_hit_returns_same_key() {
        let cache = cache();
        let k1 = cache.get_or_derive("ABC123").unwrap();
        let k2 = cache.get_or_derive("ABC123").unwrap();
        assert!(Arc::ptr_eq(&k1, &k2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cached_key_matches_kdf() {
        let cache = cache();
        let cached = cache.get_or_derive("ABC123").unwrap();
        let direct = derive_key("ABC123", cache.config()).unwrap();
        assert_eq!(cached.expose(), direct.expose());
    }

    #[test]
    fn test_clear_drops_entries() {
        let cache = cache();
        let before = cache.get_or_derive("ABC123").unwrap();
        cache.get_or_derive("XYZ789").unwrap();
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());

        let after = cache.get_or_derive("ABC123").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.expose(), after.expose());
    }

    #[test]
    fn test_invalid_secret_not_cached() {
        let cache = cache();
        assert!(matches!(
            cache.get_or_derive(""),
            Err(LocationVaultError::InvalidSecret)
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_isolated_instances() {
        let a = cache();
        let b = cache();
        a.get_or_derive("ABC123").unwrap();
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn test_concurrent_first_use() {
        let cache = Arc::new(cache());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get_or_derive("ABC123").unwrap())
            })
            .collect();

        let keys: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.len(), 1);
        for key in &keys[1..] {
            assert!(Arc::ptr_eq(&keys[0], key));
        }
    }
}
