//! Key material derived from fingerprints
//!
//! Every key starts as a [`KeySeed`]: the SHA-256 digest of a canonical
//! minutiae string. From there [`derive`] branches on [`OutputMode`]:
//!
//! - **Raw digest**: the seed is the key, encoded as lowercase hex
//! - **Asymmetric keypair**: the seed is a big-endian secp256k1 private
//!   scalar, the public key is the uncompressed point without its tag byte
//!
//! # Scalar range
//!
//! Seeds that are zero or not below the group order are rejected with
//! [`InvalidSeedError`]. They are never reduced modulo the order, since that
//! would silently map two fingerprints onto the same key. Callers that would
//! rather get *some* key can opt into [`derive_with_resalt`], which records
//! the counter that produced the key.

mod derive;
mod keys;
mod seed;

pub use derive::{
    derive, derive_with_resalt, CurveId, EncodedKey, InvalidSeedError, KeyMaterial, OutputMode,
    ParseOutputModeError,
};
pub use keys::{KeyError, PrivateKey, PublicKey, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};
pub use seed::{KeySeed, SEED_SIZE};
