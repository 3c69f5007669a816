//! Crypto core - shared-secret KDF, key cache, AEAD primitives

mod aead;
mod kdf;
mod key_cache;

pub use aead::{open, seal, AeadCipher, TAG_LEN};
pub use kdf::{derive_key, DerivedKey, KdfConfig, DEFAULT_DOMAIN, DEFAULT_ITERATIONS, KEY_LEN};
pub use key_cache::KeyCache;
