//! Exact id to image resolution over a corpus directory
//!
//! A file named `<prefix><id>.<anything>.<ext>` maps to `id`: the optional
//! prefix is stripped and the id runs up to the first `.`. Only image
//! extensions are indexed, case-insensitively. Lookups are exact, so id `1`
//! never resolves to the image for id `10`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::imaging::InputError;

/// Extensions the corpus scan picks up
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintIndex {
    root: PathBuf,
    entries: BTreeMap<String, Vec<PathBuf>>,
}

impl FingerprintIndex {
    /// Scan `dir` once and index every image by id
    pub fn build(dir: &Path, prefix: Option<&str>) -> Result<Self, InputError> {
        let corpus_err = |source| InputError::Corpus {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
        for entry in std::fs::read_dir(dir).map_err(corpus_err)? {
            let entry = entry.map_err(corpus_err)?;
            if !entry.file_type().map_err(corpus_err)?.is_file() {
                continue;
            }
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(|n| id_for_file_name(n, prefix)) else {
                continue;
            };
            entries.entry(id).or_default().push(entry.path());
        }
        for paths in entries.values_mut() {
            paths.sort();
        }

        let ambiguous = entries.values().filter(|paths| paths.len() > 1).count();
        tracing::info!(
            dir = %dir.display(),
            ids = entries.len(),
            ambiguous,
            "indexed fingerprint corpus"
        );
        Ok(Self {
            root: dir.to_path_buf(),
            entries,
        })
    }

    /// Resolve an id to its single image
    pub fn lookup(&self, id: &str) -> Result<&Path, InputError> {
        match self.entries.get(id).map(Vec::as_slice) {
            Some([path]) => Ok(path),
            Some(candidates) if !candidates.is_empty() => Err(InputError::AmbiguousId {
                id: id.to_string(),
                candidates: candidates.to_vec(),
            }),
            _ => Err(InputError::UnknownId(id.to_string())),
        }
    }

    /// Exact existence check for an id
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Every indexed id, sorted
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The id a corpus file name maps to, or `None` if the file is not indexed
pub fn id_for_file_name(name: &str, prefix: Option<&str>) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }
    let rest = match prefix {
        Some(prefix) if !prefix.is_empty() => name.strip_prefix(prefix)?,
        _ => name,
    };
    let id = rest.split('.').next()?;
    if id.is_empty() {
        return None;
    }
    Some(id.to_string())
}
