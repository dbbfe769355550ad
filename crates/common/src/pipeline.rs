//! One fingerprint image in, one key record out
//!
//! ```text
//! image -> binary -> skeleton -> minutiae -> canonical string -> seed -> key material -> record
//! ```
//!
//! The pipeline holds no state beyond its options, so a single instance can
//! be shared by every batch worker.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::artifacts::write_artifacts;
use crate::crypto::{derive_with_resalt, InvalidSeedError, KeySeed, OutputMode};
use crate::imaging::{
    load_image, preprocess, skeletonize, BinaryImage, InputError, PreprocessOptions, SkeletonImage,
};
use crate::minutiae::{extract_minutiae, CanonicalMinutiae, ExtractionError, MinutiaeSet};
use crate::store::{validate_id, KeyRecord, KeyStore, PersistenceError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeriveOptions {
    pub mode: OutputMode,
    #[serde(default)]
    pub preprocess: PreprocessOptions,
    /// Explicit re-salting attempts for out-of-range seeds, 0 disables it
    #[serde(default)]
    pub max_resalt: u32,
    /// Write debug images here when set
    #[serde(default)]
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    InvalidSeed(#[from] InvalidSeedError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("worker failed: {0}")]
    Worker(String),
}

/// Intermediate results of feature extraction for one image
#[derive(Debug, Clone)]
pub struct Features {
    pub binary: BinaryImage,
    pub skeleton: SkeletonImage,
    pub minutiae: MinutiaeSet,
}

impl Features {
    pub fn canonical(&self) -> CanonicalMinutiae {
        self.minutiae.canonicalize()
    }

    pub fn seed(&self) -> KeySeed {
        KeySeed::from_canonical(&self.canonical())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: DeriveOptions,
}

impl Pipeline {
    pub fn new(options: DeriveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    /// Preprocess, thin and extract minutiae
    pub fn extract(&self, image: &DynamicImage) -> Result<Features, DeriveError> {
        let binary = preprocess(image, &self.options.preprocess)?;
        Ok(self.extract_binary(binary))
    }

    /// Thin an already binarized image and extract minutiae
    pub fn extract_binary(&self, binary: BinaryImage) -> Features {
        let skeleton = skeletonize(&binary);
        let minutiae = extract_minutiae(&skeleton);
        Features {
            binary,
            skeleton,
            minutiae,
        }
    }

    /// Derive from a pre-binarized row-major ridge mask, skipping preprocessing
    pub fn record_from_mask(
        &self,
        id: &str,
        width: u32,
        height: u32,
        mask: Vec<bool>,
    ) -> Result<KeyRecord, DeriveError> {
        let binary = BinaryImage::from_pixels(width, height, mask)?;
        self.record_from_features(id, &self.extract_binary(binary))
    }

    /// Derive the key record for an extracted feature set
    pub fn record_from_features(
        &self,
        id: &str,
        features: &Features,
    ) -> Result<KeyRecord, DeriveError> {
        self.record_from_seed(id, &features.seed(), features)
    }

    /// Artifacts are only written once the seed has produced a key
    fn record_from_seed(
        &self,
        id: &str,
        seed: &KeySeed,
        features: &Features,
    ) -> Result<KeyRecord, DeriveError> {
        validate_id(id)?;
        let (material, resalt_counter) =
            derive_with_resalt(seed, self.options.mode, self.options.max_resalt)?;

        if let Some(dir) = &self.options.artifacts_dir {
            write_artifacts(
                dir,
                id,
                &features.binary,
                &features.skeleton,
                &features.minutiae,
            )?;
        }
        Ok(KeyRecord::new(id, &material, features.minutiae.count())
            .with_resalt_counter(resalt_counter))
    }

    /// Derive the key record for a decoded image
    pub fn derive_record(&self, id: &str, image: &DynamicImage) -> Result<KeyRecord, DeriveError> {
        validate_id(id)?;
        let features = self.extract(image)?;
        self.record_from_features(id, &features)
    }

    /// Load an image from disk and derive its key record
    #[tracing::instrument(skip(self, path), fields(path = %path.display(), mode = %self.options.mode))]
    pub fn derive(&self, id: &str, path: &Path) -> Result<KeyRecord, DeriveError> {
        let image = load_image(path)?;
        let record = self.derive_record(id, &image)?;
        tracing::debug!(
            endings = record.minutiae_count.endings,
            bifurcations = record.minutiae_count.bifurcations,
            resalt_counter = ?record.resalt_counter,
            "derived key"
        );
        Ok(record)
    }

    /// Derive and persist, returning the record and where it was written
    pub fn derive_and_store(
        &self,
        id: &str,
        path: &Path,
        store: &dyn KeyStore,
    ) -> Result<(KeyRecord, PathBuf), DeriveError> {
        let record = self.derive(id, path)?;
        let location = store.write(&record)?;
        Ok((record, location))
    }
}
