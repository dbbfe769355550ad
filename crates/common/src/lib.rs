/**
 * Debug images of intermediate stages,
 *  written only when a directory is configured.
 */
pub mod artifacts;
/**
 * Batch derivation over a corpus on a bounded
 *  pool of blocking workers, with per-id
 *  failure isolation.
 */
pub mod batch;
/**
 * Exact id to image path resolution
 *  over a corpus directory.
 */
pub mod corpus;
/**
 * Seeds, secp256k1 keys and the raw / keypair
 *  output modes.
 */
pub mod crypto;
/**
 * Raster stages: grayscale, smoothing, Otsu
 *  binarization and Guo-Hall thinning.
 */
pub mod imaging;
/**
 * Crossing-number minutiae and the canonical
 *  string every key is derived from.
 */
pub mod minutiae;
/**
 * Image to key record, composing the stages above.
 */
pub mod pipeline;
/**
 * Key records and the stores that persist them.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::batch::{BatchReport, BatchRunner};
    pub use crate::corpus::FingerprintIndex;
    pub use crate::crypto::{CurveId, KeyMaterial, KeySeed, OutputMode};
    pub use crate::imaging::{InputError, PreprocessOptions, RidgePolarity};
    pub use crate::minutiae::{CanonicalMinutiae, MinutiaeCount, MinutiaeSet};
    pub use crate::pipeline::{DeriveError, DeriveOptions, Pipeline};
    pub use crate::store::{FsKeyStore, KeyRecord, KeyStore, MemoryKeyStore, PersistenceError};
    pub use crate::version::BuildInfo;
}
