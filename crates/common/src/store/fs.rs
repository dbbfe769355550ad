use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::crypto::{CurveId, OutputMode};

use super::{record_file_name, validate_id, KeyRecord, KeyStore, PersistenceError};

const JSON_INDENT: &[u8] = b"    ";

/// Every mode a record file can be named for
const RECORD_MODES: [OutputMode; 2] = [
    OutputMode::AsymmetricKeypair(CurveId::Secp256k1),
    OutputMode::RawDigest,
];

/// Replace `path` with `bytes` in one step.
///
/// Writes a temporary file next to the destination, syncs it, then renames
/// it over the destination. Readers see the old file or the new one, never a
/// partial write. Missing parent directories are created.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistenceError> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| PersistenceError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PersistenceError::io(dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| PersistenceError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| PersistenceError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| PersistenceError::io(path, e.error))?;
    Ok(())
}

/// Key records as pretty-printed JSON files in one directory
///
/// The file name carries the output mode (`<id>_key.json` or
/// `<id>_keypair.json`), but an id owns at most one of them: publishing a
/// record removes the file left by the other mode.
#[derive(Debug, Clone)]
pub struct FsKeyStore {
    keys_dir: PathBuf,
}

impl FsKeyStore {
    pub fn new(keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys_dir: keys_dir.into(),
        }
    }

    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    pub fn record_path(&self, id: &str, mode: OutputMode) -> Result<PathBuf, PersistenceError> {
        validate_id(id)?;
        Ok(self.keys_dir.join(record_file_name(id, mode)))
    }

    fn read_path(&self, path: PathBuf) -> Result<Option<KeyRecord>, PersistenceError> {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PersistenceError::io(path, e)),
        };
        let record =
            serde_json::from_slice(&bytes).map_err(|source| PersistenceError::Json { path, source })?;
        Ok(Some(record))
    }
}

fn remove_if_present(path: &Path) -> Result<bool, PersistenceError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(PersistenceError::io(path, e)),
    }
}

fn to_pretty_json(record: &KeyRecord, path: &Path) -> Result<Vec<u8>, PersistenceError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(JSON_INDENT);
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    record
        .serialize(&mut ser)
        .map_err(|source| PersistenceError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(buf)
}

/// Id encoded in a record file name, if it is one
fn id_from_file_name(name: &str) -> Option<&str> {
    RECORD_MODES
        .iter()
        .find_map(|mode| name.strip_suffix(mode.record_suffix()))
        .filter(|id| validate_id(id).is_ok())
}

impl KeyStore for FsKeyStore {
    fn write(&self, record: &KeyRecord) -> Result<PathBuf, PersistenceError> {
        let mode = record.mode();
        let path = self.record_path(&record.fingerprint_id, mode)?;
        let bytes = to_pretty_json(record, &path)?;
        write_atomic(&path, &bytes)?;

        for other in RECORD_MODES.iter().filter(|m| **m != mode) {
            let stale = self.record_path(&record.fingerprint_id, *other)?;
            if remove_if_present(&stale)? {
                tracing::debug!(path = %stale.display(), "removed replaced key record");
            }
        }
        tracing::debug!(path = %path.display(), "wrote key record");
        Ok(path)
    }

    fn read(&self, id: &str) -> Result<Option<KeyRecord>, PersistenceError> {
        let mut found: Option<KeyRecord> = None;
        for mode in RECORD_MODES {
            let Some(record) = self.read_path(self.record_path(id, mode)?)? else {
                continue;
            };
            // both files only coexist after an interrupted replace, the newer one wins
            match &found {
                Some(current) if current.generated_at >= record.generated_at => {}
                _ => found = Some(record),
            }
        }
        Ok(found)
    }

    fn list(&self) -> Result<Vec<String>, PersistenceError> {
        let entries = match std::fs::read_dir(&self.keys_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.keys_dir, e)),
        };

        let mut ids = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|e| PersistenceError::io(&self.keys_dir, e))?;
            let name = entry.file_name();
            if let Some(id) = name.to_str().and_then(id_from_file_name) {
                ids.insert(id.to_string());
            }
        }
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::{derive, KeySeed};
    use crate::minutiae::MinutiaeCount;
    use tempfile::TempDir;

    fn record(id: &str, mode: OutputMode) -> KeyRecord {
        let material = derive(&KeySeed::digest(id.as_bytes()), mode).unwrap();
        KeyRecord::new(
            id,
            &material,
            MinutiaeCount {
                endings: 2,
                bifurcations: 1,
            },
        )
    }

    fn dir_names(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_write_then_read() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path().join("keys"));
        let written = record("12", OutputMode::default());

        let path = store.write(&written).unwrap();
        assert_eq!(path, tmp.path().join("keys").join("12_keypair.json"));
        assert_eq!(store.read("12").unwrap(), Some(written));
        assert_eq!(store.read("13").unwrap(), None);
    }

    #[test]
    fn test_json_uses_four_space_indent() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path());
        let path = store.write(&record("3", OutputMode::RawDigest)).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("{\n    \"fingerprint_id\": \"3\",\n"));
        assert!(text.contains("\n    \"minutiae_count\": {\n        \"endings\": 2,"));
    }

    #[test]
    fn test_overwrite_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path());
        let first = record("5", OutputMode::default());
        let path = store.write(&first).unwrap();
        let before = std::fs::read(&path).unwrap();

        store.write(&first).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
        assert_eq!(dir_names(tmp.path()), vec!["5_keypair.json"]);
    }

    #[test]
    fn test_no_temp_files_remain() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path());
        for id in ["1", "2", "10"] {
            store.write(&record(id, OutputMode::default())).unwrap();
        }
        store.write(&record("2", OutputMode::RawDigest)).unwrap();
        assert_eq!(
            dir_names(tmp.path()),
            vec!["10_keypair.json", "1_keypair.json", "2_key.json"]
        );
        assert_eq!(store.list().unwrap(), vec!["1", "10", "2"]);
    }

    #[test]
    fn test_invalid_ids_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path());
        let mut bad = record("x", OutputMode::default());
        bad.fingerprint_id = "../escape".to_string();
        assert!(matches!(
            store.write(&bad),
            Err(PersistenceError::InvalidId(_))
        ));
        assert!(matches!(
            store.read("a/b"),
            Err(PersistenceError::InvalidId(_))
        ));
        assert!(dir_names(tmp.path()).is_empty());
    }

    #[test]
    fn test_list_ignores_unrelated_files() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "x").unwrap();
        std::fs::write(tmp.path().join(".tmpabc"), "x").unwrap();
        let store = FsKeyStore::new(tmp.path());
        store.write(&record("9", OutputMode::RawDigest)).unwrap();
        assert_eq!(store.list().unwrap(), vec!["9"]);
    }

    #[test]
    fn test_missing_dir_lists_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.read("1").unwrap(), None);
    }

    #[test]
    fn test_malformed_record_is_an_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("4_key.json"), "{not json").unwrap();
        let store = FsKeyStore::new(tmp.path());
        assert!(matches!(
            store.read("4"),
            Err(PersistenceError::Json { .. })
        ));
    }

    #[test]
    fn test_new_mode_replaces_old_record() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path());
        store.write(&record("7", OutputMode::RawDigest)).unwrap();
        let pair = record("7", OutputMode::default());
        let path = store.write(&pair).unwrap();

        assert!(path.ends_with("7_keypair.json"));
        assert_eq!(dir_names(tmp.path()), vec!["7_keypair.json"]);
        assert_eq!(store.read("7").unwrap(), Some(pair));

        let raw = record("7", OutputMode::RawDigest);
        store.write(&raw).unwrap();
        assert_eq!(dir_names(tmp.path()), vec!["7_key.json"]);
        assert_eq!(
            store.read("7").unwrap().map(|r| r.mode()),
            Some(OutputMode::RawDigest)
        );
        assert_eq!(store.list().unwrap(), vec!["7"]);
    }

    #[test]
    fn test_leftover_sibling_resolves_to_newer_record() {
        let tmp = TempDir::new().unwrap();
        let store = FsKeyStore::new(tmp.path());
        let older = record("8", OutputMode::default())
            .with_generated_at("2024-01-01T00:00:00Z".parse().unwrap());
        let newer = record("8", OutputMode::RawDigest)
            .with_generated_at("2024-06-01T00:00:00Z".parse().unwrap());
        // lay both files down directly, as an interrupted replace would
        for r in [&older, &newer] {
            let path = store.record_path("8", r.mode()).unwrap();
            write_atomic(&path, &to_pretty_json(r, &path).unwrap()).unwrap();
        }
        assert_eq!(store.read("8").unwrap(), Some(newer));
    }
}
