//! Key derivation from a seed
//!
//! Two output modes share one seed:
//!
//! - [`OutputMode::RawDigest`]: the seed is the key, stored as hex
//! - [`OutputMode::AsymmetricKeypair`]: the seed is a private scalar on the
//!   named curve, the public key is `scalar * G`, both stored as base64 of
//!   their fixed-width big-endian bytes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::keys::{KeyError, PrivateKey, PublicKey};
use super::seed::KeySeed;

/// Named elliptic curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveId {
    #[serde(rename = "SECP256k1")]
    Secp256k1,
}

impl CurveId {
    /// The constant written to `curve_type` in key records
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveId::Secp256k1 => "SECP256k1",
        }
    }
}

impl fmt::Display for CurveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seed is zero or not below the curve order. It is never reduced.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("seed is not a valid {curve} private scalar (zero or not below the group order)")]
pub struct InvalidSeedError {
    pub curve: CurveId,
}

/// Which key material to derive from a seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OutputMode {
    RawDigest,
    AsymmetricKeypair(CurveId),
}

impl Default for OutputMode {
    fn default() -> Self {
        OutputMode::AsymmetricKeypair(CurveId::Secp256k1)
    }
}

impl OutputMode {
    /// File name suffix of the stored record, `<id><suffix>`
    pub fn record_suffix(&self) -> &'static str {
        match self {
            OutputMode::RawDigest => "_key.json",
            OutputMode::AsymmetricKeypair(_) => "_keypair.json",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown output mode {0:?}, expected \"raw\" or \"keypair\"")]
pub struct ParseOutputModeError(String);

impl FromStr for OutputMode {
    type Err = ParseOutputModeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "raw-digest" | "digest" => Ok(OutputMode::RawDigest),
            "keypair" | "secp256k1" | "keypair:secp256k1" => {
                Ok(OutputMode::AsymmetricKeypair(CurveId::Secp256k1))
            }
            _ => Err(ParseOutputModeError(s.to_string())),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::RawDigest => f.write_str("raw"),
            OutputMode::AsymmetricKeypair(CurveId::Secp256k1) => f.write_str("keypair"),
        }
    }
}

impl TryFrom<String> for OutputMode {
    type Error = ParseOutputModeError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<OutputMode> for String {
    fn from(mode: OutputMode) -> Self {
        mode.to_string()
    }
}

/// Key material derived from a seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    RawDigest(KeySeed),
    Keypair {
        curve: CurveId,
        private: PrivateKey,
        public: PublicKey,
    },
}

/// Transport encoding of key material, as it appears in a key record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedKey {
    pub private_key: String,
    pub public_key: Option<String>,
    pub curve: Option<CurveId>,
}

impl KeyMaterial {
    pub fn mode(&self) -> OutputMode {
        match self {
            KeyMaterial::RawDigest(_) => OutputMode::RawDigest,
            KeyMaterial::Keypair { curve, .. } => OutputMode::AsymmetricKeypair(*curve),
        }
    }

    /// Hex for a raw digest, base64 of the fixed-width bytes for a keypair
    pub fn encode(&self) -> EncodedKey {
        match self {
            KeyMaterial::RawDigest(seed) => EncodedKey {
                private_key: seed.to_hex(),
                public_key: None,
                curve: None,
            },
            KeyMaterial::Keypair {
                curve,
                private,
                public,
            } => EncodedKey {
                private_key: private.to_base64(),
                public_key: Some(public.to_base64()),
                curve: Some(*curve),
            },
        }
    }
}

impl EncodedKey {
    /// Recover the key material, checking lengths, the scalar range and that
    /// the public key matches the private key.
    pub fn decode(&self) -> Result<KeyMaterial, KeyError> {
        match (&self.curve, &self.public_key) {
            (None, _) => Ok(KeyMaterial::RawDigest(KeySeed::from_hex(&self.private_key)?)),
            (Some(curve), Some(public)) => {
                let private = PrivateKey::from_base64(&self.private_key)?;
                let public = PublicKey::from_base64(public)?;
                if private.public() != public {
                    return Err(KeyError::Mismatch);
                }
                Ok(KeyMaterial::Keypair {
                    curve: *curve,
                    private,
                    public,
                })
            }
            (Some(curve), None) => {
                let private = PrivateKey::from_base64(&self.private_key)?;
                Ok(KeyMaterial::Keypair {
                    curve: *curve,
                    public: private.public(),
                    private,
                })
            }
        }
    }
}

/// Derive key material from a seed without any re-salting
///
/// # Errors
///
/// Returns [`InvalidSeedError`] in keypair mode if the seed is not a valid
/// private scalar. Raw digest mode cannot fail.
pub fn derive(seed: &KeySeed, mode: OutputMode) -> Result<KeyMaterial, InvalidSeedError> {
    match mode {
        OutputMode::RawDigest => Ok(KeyMaterial::RawDigest(seed.clone())),
        OutputMode::AsymmetricKeypair(CurveId::Secp256k1) => {
            let private = PrivateKey::from_seed(seed)?;
            Ok(KeyMaterial::Keypair {
                curve: CurveId::Secp256k1,
                public: private.public(),
                private,
            })
        }
    }
}

/// Derive key material, falling back to explicit re-salting.
///
/// The plain seed is tried first. If it is rejected and `max_resalt > 0`,
/// `seed.resalt(1)`, `seed.resalt(2)`, ... up to `max_resalt` are tried in
/// order. Returns the material and the counter that produced it (`None` for
/// the plain seed). With `max_resalt == 0` this is exactly [`derive`].
pub fn derive_with_resalt(
    seed: &KeySeed,
    mode: OutputMode,
    max_resalt: u32,
) -> Result<(KeyMaterial, Option<u32>), InvalidSeedError> {
    let err = match derive(seed, mode) {
        Ok(material) => return Ok((material, None)),
        Err(err) => err,
    };
    for counter in 1..=max_resalt {
        match derive(&seed.resalt(counter), mode) {
            Ok(material) => {
                tracing::warn!(counter, "seed was not a valid scalar, used resalted seed");
                return Ok((material, Some(counter)));
            }
            Err(_) => continue,
        }
    }
    Err(err)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::minutiae::MinutiaeSet;

    const VECTOR_PUBLIC_HEX: &str = "deb55279ed68f6d9d6c7f91ff93d8c337665c59b559cf7ba3b6523d76aacd99e\
                                     4b01095f957fd80d87b57f9ca797c954ca1ab916a2f802fe1bbe958b8c8f679f";

    fn vector_seed() -> KeySeed {
        let set = MinutiaeSet {
            endings: vec![(10, 20)],
            bifurcations: vec![(15, 15)],
        };
        KeySeed::from_canonical(&set.canonicalize())
    }

    #[test]
    fn test_known_vector_public_point() {
        let material = derive(&vector_seed(), OutputMode::default()).unwrap();
        let KeyMaterial::Keypair {
            curve,
            private,
            public,
        } = &material
        else {
            panic!("expected a keypair");
        };
        assert_eq!(*curve, CurveId::Secp256k1);
        assert_eq!(
            private.to_hex(),
            "29747afbd145da50c4de0ed8a5422666a08837a720a652bdc70b09c4e44c05a3"
        );
        assert_eq!(public.to_hex(), VECTOR_PUBLIC_HEX);

        let encoded = material.encode();
        assert_eq!(
            encoded.private_key,
            "KXR6+9FF2lDE3g7YpUImZqCIN6cgplK9xwsJxORMBaM="
        );
        assert_eq!(
            encoded.public_key.as_deref(),
            Some("3rVSee1o9tnWx/kf+T2MM3ZlxZtVnPe6O2Uj12qs2Z5LAQlflX/YDYe1f5ynl8lUyhq5FqL4Av4bvpWLjI9nnw==")
        );
        assert_eq!(encoded.curve, Some(CurveId::Secp256k1));
    }

    #[test]
    fn test_raw_digest_mode() {
        let material = derive(&vector_seed(), OutputMode::RawDigest).unwrap();
        let encoded = material.encode();
        assert_eq!(
            encoded.private_key,
            "29747afbd145da50c4de0ed8a5422666a08837a720a652bdc70b09c4e44c05a3"
        );
        assert_eq!(encoded.public_key, None);
        assert_eq!(encoded.curve, None);
        assert_eq!(material.mode(), OutputMode::RawDigest);
    }

    #[test]
    fn test_encoded_round_trip() {
        for mode in [OutputMode::RawDigest, OutputMode::default()] {
            let material = derive(&vector_seed(), mode).unwrap();
            assert_eq!(material.encode().decode().unwrap(), material);
        }
    }

    #[test]
    fn test_decode_detects_mismatched_public_key() {
        let mut encoded = derive(&vector_seed(), OutputMode::default())
            .unwrap()
            .encode();
        let other = derive(&KeySeed::digest(b"other"), OutputMode::default())
            .unwrap()
            .encode();
        encoded.public_key = other.public_key;
        assert!(matches!(encoded.decode(), Err(KeyError::Mismatch)));
    }

    #[test]
    fn test_zero_seed_fails_without_reduction() {
        let zero = KeySeed::from([0u8; 32]);
        let err = derive(&zero, OutputMode::default()).unwrap_err();
        assert_eq!(err.curve, CurveId::Secp256k1);
        // raw mode has no range
        assert!(derive(&zero, OutputMode::RawDigest).is_ok());
    }

    #[test]
    fn test_resalt_is_opt_in() {
        let too_big = KeySeed::from([0xff; 32]);
        assert!(derive_with_resalt(&too_big, OutputMode::default(), 0).is_err());

        let (material, counter) = derive_with_resalt(&too_big, OutputMode::default(), 3).unwrap();
        assert_eq!(counter, Some(1));
        assert_eq!(material, derive(&too_big.resalt(1), OutputMode::default()).unwrap());
    }

    #[test]
    fn test_valid_seed_is_never_resalted() {
        let (material, counter) =
            derive_with_resalt(&vector_seed(), OutputMode::default(), 5).unwrap();
        assert_eq!(counter, None);
        assert_eq!(material, derive(&vector_seed(), OutputMode::default()).unwrap());
    }

    #[test]
    fn test_output_mode_strings() {
        assert_eq!("raw".parse::<OutputMode>().unwrap(), OutputMode::RawDigest);
        assert_eq!("KEYPAIR".parse::<OutputMode>().unwrap(), OutputMode::default());
        assert!("rsa".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::RawDigest.to_string(), "raw");
        assert_eq!(OutputMode::default().to_string(), "keypair");
        assert_eq!(OutputMode::RawDigest.record_suffix(), "_key.json");
        assert_eq!(OutputMode::default().record_suffix(), "_keypair.json");
    }

    #[test]
    fn test_curve_serializes_as_constant() {
        assert_eq!(
            serde_json::to_string(&CurveId::Secp256k1).unwrap(),
            "\"SECP256k1\""
        );
        assert_eq!(
            serde_json::to_string(&OutputMode::RawDigest).unwrap(),
            "\"raw\""
        );
    }
}
