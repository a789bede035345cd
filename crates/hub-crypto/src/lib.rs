//! # hub-crypto
//!
//! Cryptographic primitives behind the hub's "SAML codec & crypto"
//! collaborator, built on aws-lc-rs.
//!
//! - ECDSA P-384 with SHA-384 for message and assertion signatures
//! - AES-256-GCM for assertion encryption
//! - SHA-384 for key identifiers
//!
//! Keys come in sets: metadata may publish several concurrently valid signing
//! keys for one entity during rollover, and the hub may hold several
//! decryption keys. Verification succeeds if any candidate key verifies.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod encryption;
pub mod error;
pub mod hash;
pub mod signature;

pub use encryption::{EncryptionKey, SealedPayload};
pub use error::{CryptoError, CryptoResult};
pub use hash::{key_id, sha384};
pub use signature::{verify_with_any, SigningKey, VerificationKey};
