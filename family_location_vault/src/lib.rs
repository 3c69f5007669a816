//! # Family Location Vault
//!
//! Encryption engine for location readings shared between family devices
//! through a document store that must never see plaintext coordinates.
//!
//! ## Architecture
//!
//! ```text
//!  producer                                             consumer
//!  (secret, payload)                                    (secret, stored value)
//!        │                                                     │
//!        ▼                                                     ▼
//!  ┌─────────────┐   ┌───────────┐                     ┌──────────────┐
//!  │ LocationCi- │──▶│ KeyCache  │◀────────────────────│  resolver    │
//!  │ pher        │   │  + KDF    │                     │ (legacy/env) │
//!  └──────┬──────┘   └───────────┘                     └──────┬───────┘
//!         ▼                                                   ▼
//!   envelope "v1:base64(nonce‖ct‖tag)"  ──── store ────▶  envelope decode
//! ```
//!
//! ## Security Model
//!
//! - Key = iterated SHA-256 of the family shared secret only; no device data
//! - AES-256-GCM (v1) or XChaCha20-Poly1305 (v2), fresh random nonce per call
//! - Tampering or a wrong secret is always an error, never garbled plaintext
//! - Only the resolver degrades errors to "no location"

pub mod config;
pub mod crypto;
pub mod directory;
pub mod engine;
pub mod envelope;
pub mod error;
pub mod payload;
pub mod resolver;
pub mod selftest;

pub use config::EngineConfig;
pub use crypto::{DerivedKey, KdfConfig, KeyCache};
pub use directory::{FamilyDirectory, InMemoryFamilyDirectory, LocationShare};
pub use engine::LocationCipher;
pub use envelope::{Envelope, EnvelopeVersion};
pub use error::{DecryptError, DirectoryError, FormatError, LocationVaultError, Result};
pub use payload::LocationPayload;
pub use resolver::StorageValue;
pub use selftest::SelfTestReport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
