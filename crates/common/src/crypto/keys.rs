use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::FieldBytes;

use super::seed::KeySeed;
use super::{CurveId, InvalidSeedError};

/// Size of a secp256k1 private scalar in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of an uncompressed secp256k1 point without the SEC1 tag byte (`X || Y`)
pub const PUBLIC_KEY_SIZE: usize = 64;

/// SEC1 tag for an uncompressed point
const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// Errors that can occur while decoding keys
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("invalid key size, expected {expected}, got {got}")]
    InvalidLength { expected: usize, got: usize },
    #[error("hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("bytes are not a point on the curve")]
    InvalidPoint,
    #[error(transparent)]
    InvalidScalar(#[from] InvalidSeedError),
    #[error("public key does not belong to the private key")]
    Mismatch,
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N], KeyError> {
    bytes.try_into().map_err(|_| KeyError::InvalidLength {
        expected: N,
        got: bytes.len(),
    })
}

/// A secp256k1 private key
///
/// A thin wrapper around `k256::SecretKey`. Construction goes through the
/// scalar range check: zero and values at or above the group order are
/// rejected, never reduced.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey(k256::SecretKey);

impl PrivateKey {
    /// Interpret a seed as a big-endian private scalar
    ///
    /// # Errors
    ///
    /// Returns [`InvalidSeedError`] if the scalar is zero or not below the
    /// curve order.
    pub fn from_seed(seed: &KeySeed) -> Result<Self, InvalidSeedError> {
        Self::from_bytes(seed.as_bytes())
    }

    pub fn from_bytes(bytes: &[u8; PRIVATE_KEY_SIZE]) -> Result<Self, InvalidSeedError> {
        k256::SecretKey::from_bytes(&FieldBytes::from(*bytes))
            .map(Self)
            .map_err(|_| InvalidSeedError {
                curve: CurveId::Secp256k1,
            })
    }

    /// Derive the public point `scalar * G`
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.public_key())
    }

    /// Fixed-width big-endian scalar
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        let mut out = [0u8; PRIVATE_KEY_SIZE];
        out.copy_from_slice(&self.0.to_bytes());
        out
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = BASE64.decode(encoded)?;
        Ok(Self::from_bytes(&fixed(&bytes)?)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;
        Ok(Self::from_bytes(&fixed(&bytes)?)?)
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// A secp256k1 public point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(k256::PublicKey);

impl PublicKey {
    /// Parse `X || Y`, each coordinate 32 bytes big-endian
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_SIZE]) -> Result<Self, KeyError> {
        let mut sec1 = [0u8; PUBLIC_KEY_SIZE + 1];
        sec1[0] = SEC1_UNCOMPRESSED_TAG;
        sec1[1..].copy_from_slice(bytes);
        k256::PublicKey::from_sec1_bytes(&sec1)
            .map(Self)
            .map_err(|_| KeyError::InvalidPoint)
    }

    /// Fixed-width `X || Y`, no tag byte
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        let point = self.0.to_encoded_point(false);
        let mut out = [0u8; PUBLIC_KEY_SIZE];
        // uncompressed SEC1 is the tag followed by X || Y
        out.copy_from_slice(&point.as_bytes()[1..]);
        out
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, KeyError> {
        let bytes = BASE64.decode(encoded)?;
        Self::from_bytes(&fixed(&bytes)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Accepts both plain hex and "0x"-prefixed hex strings.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(hex)?;
        Self::from_bytes(&fixed(&bytes)?)
    }
}
