//! # Shared Crypto
//!
//! Primitives used to authenticate pushes and endorsements.
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Node signatures on push notes, pusher signatures on tx details |
//! | `bls` | BLS12-381 (min_pk) | Host endorsement signatures |
//! | `hashing` | BLAKE3 | Push key IDs, namespace hashes |
//! | `encoding` | Base58 | Textual push signatures |
//!
//! ## Security Properties
//!
//! - **Ed25519**: Deterministic nonces, no RNG dependency
//! - **BLS**: Proof-of-possession ciphersuite, keys and signatures group-checked on decode
//! - **BLAKE3**: Push key IDs are the first 20 bytes of the digest

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bls;
pub mod encoding;
pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use bls::{BlsKeyPair, BlsPublicKey, BlsSignature};
pub use encoding::{decode_base58, encode_base58};
pub use errors::CryptoError;
pub use hashing::{blake3_hash, hash_namespace, push_key_id};
pub use signatures::{verify_ed25519, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
