//! Key seeds: SHA-256 over a canonical minutiae string

use std::fmt;

use sha2::{Digest, Sha256};

use crate::minutiae::CanonicalMinutiae;

use super::keys::KeyError;

/// Size of a key seed in bytes (SHA-256 output)
pub const SEED_SIZE: usize = 32;

/// 32-byte digest that roots all key material derived from a fingerprint
///
/// A seed is a pure function of the canonical minutiae string. Two runs over
/// the same image always produce the same seed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct KeySeed([u8; SEED_SIZE]);

impl KeySeed {
    /// `SHA-256(canonical string)`
    pub fn from_canonical(canonical: &CanonicalMinutiae) -> Self {
        Self::digest(canonical.as_bytes())
    }

    /// `SHA-256(bytes)`
    pub fn digest(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Explicit re-salting: `SHA-256(seed || counter)`, counter as big-endian u32.
    ///
    /// Only used when the caller opts in, for seeds that are not a valid
    /// private scalar. A resalted key is a different key; records carry the
    /// counter that produced them.
    pub fn resalt(&self, counter: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(self.0);
        hasher.update(counter.to_be_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; SEED_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a seed from lowercase or uppercase hex, with or without `0x`
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;
        Self::try_from(bytes.as_slice())
    }
}

impl From<[u8; SEED_SIZE]> for KeySeed {
    fn from(bytes: [u8; SEED_SIZE]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for KeySeed {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; SEED_SIZE] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
            expected: SEED_SIZE,
            got: bytes.len(),
        })?;
        Ok(Self(bytes))
    }
}

// seeds are secret in raw digest mode, keep them out of logs
impl fmt::Debug for KeySeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("KeySeed(..)")
    }
}
