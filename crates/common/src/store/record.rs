use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::{CurveId, EncodedKey, KeyError, KeyMaterial, OutputMode};
use crate::minutiae::MinutiaeCount;

/// The durable result of deriving a key from one fingerprint
///
/// Field order is the on-disk order. `public_key` and `curve_type` are only
/// present for keypairs, `resalt_counter` only when explicit re-salting
/// produced the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    pub fingerprint_id: String,
    pub generated_at: DateTime<Utc>,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
    pub minutiae_count: MinutiaeCount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve_type: Option<CurveId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resalt_counter: Option<u32>,
}

impl KeyRecord {
    pub fn new(
        fingerprint_id: impl Into<String>,
        material: &KeyMaterial,
        minutiae_count: MinutiaeCount,
    ) -> Self {
        let encoded = material.encode();
        Self {
            fingerprint_id: fingerprint_id.into(),
            generated_at: Utc::now(),
            private_key: encoded.private_key,
            public_key: encoded.public_key,
            minutiae_count,
            curve_type: encoded.curve,
            resalt_counter: None,
        }
    }

    pub fn with_resalt_counter(mut self, counter: Option<u32>) -> Self {
        self.resalt_counter = counter;
        self
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn mode(&self) -> OutputMode {
        match self.curve_type {
            Some(curve) => OutputMode::AsymmetricKeypair(curve),
            None => OutputMode::RawDigest,
        }
    }

    /// `<id>_key.json` or `<id>_keypair.json`
    pub fn file_name(&self) -> String {
        record_file_name(&self.fingerprint_id, self.mode())
    }

    pub fn encoded_key(&self) -> EncodedKey {
        EncodedKey {
            private_key: self.private_key.clone(),
            public_key: self.public_key.clone(),
            curve: self.curve_type,
        }
    }

    /// Decode and validate the stored key fields
    pub fn key_material(&self) -> Result<KeyMaterial, KeyError> {
        self.encoded_key().decode()
    }
}

pub fn record_file_name(id: &str, mode: OutputMode) -> String {
    format!("{}{}", id, mode.record_suffix())
}
