use std::path::{Path, PathBuf};
use std::{fs, io};

use common::crypto::OutputMode;
use common::imaging::{PreprocessOptions, RidgePolarity};
use common::pipeline::DeriveOptions;
use common::store::FsKeyStore;
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "fingerkey";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const INPUT_DIR_NAME: &str = "fingerprints";
pub const KEYS_DIR_NAME: &str = "keys";

/// Contents of `config.toml`. Relative paths resolve against the config directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Corpus directory (defaults to `<config dir>/fingerprints`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_dir: Option<PathBuf>,
    /// Output directory for key records (defaults to `<config dir>/keys`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys_dir: Option<PathBuf>,
    /// Prefix stripped from corpus file names, e.g. `min_`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_prefix: Option<String>,
    #[serde(default)]
    pub mode: OutputMode,
    /// Batch workers (defaults to available parallelism)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default)]
    pub polarity: RidgePolarity,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
    /// Debug images are written here when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts_dir: Option<PathBuf>,
    /// Explicit re-salting attempts, 0 disables re-salting
    #[serde(default)]
    pub max_resalt: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input_dir: None,
            keys_dir: None,
            file_prefix: None,
            mode: OutputMode::default(),
            workers: None,
            polarity: RidgePolarity::default(),
            log_level: default_log_level(),
            log_dir: None,
            artifacts_dir: None,
            max_resalt: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the fingerkey directory (~/.fingerkey)
    pub fingerkey_dir: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the fingerkey directory path (custom or default ~/.fingerkey)
    pub fn fingerkey_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new fingerkey directory with its config and keys directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let fingerkey_dir = Self::fingerkey_dir(custom_path)?;
        let config_path = fingerkey_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&fingerkey_dir)?;

        let config = config.unwrap_or_default();
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        let state = Self {
            fingerkey_dir,
            config_path,
            config,
        };
        fs::create_dir_all(state.keys_dir())?;
        Ok(state)
    }

    /// Load existing state from the fingerkey directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let fingerkey_dir = Self::fingerkey_dir(custom_path)?;

        if !fingerkey_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let config_path = fingerkey_dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            fingerkey_dir,
            config_path,
            config,
        })
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.fingerkey_dir.join(path)
        }
    }

    pub fn input_dir(&self) -> PathBuf {
        match &self.config.input_dir {
            Some(dir) => self.resolve(dir),
            None => self.fingerkey_dir.join(INPUT_DIR_NAME),
        }
    }

    pub fn keys_dir(&self) -> PathBuf {
        match &self.config.keys_dir {
            Some(dir) => self.resolve(dir),
            None => self.fingerkey_dir.join(KEYS_DIR_NAME),
        }
    }

    pub fn log_dir(&self) -> Option<PathBuf> {
        self.config.log_dir.as_deref().map(|dir| self.resolve(dir))
    }

    pub fn artifacts_dir(&self) -> Option<PathBuf> {
        self.config.artifacts_dir.as_deref().map(|dir| self.resolve(dir))
    }

    pub fn file_prefix(&self) -> Option<&str> {
        self.config.file_prefix.as_deref()
    }

    pub fn key_store(&self) -> FsKeyStore {
        FsKeyStore::new(self.keys_dir())
    }

    /// Pipeline options from the config, with an optional per-invocation mode
    pub fn derive_options(&self, mode: Option<OutputMode>) -> DeriveOptions {
        DeriveOptions {
            mode: mode.unwrap_or(self.config.mode),
            preprocess: PreprocessOptions {
                polarity: self.config.polarity,
            },
            max_resalt: self.config.max_resalt,
            artifacts_dir: self.artifacts_dir(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("fingerkey directory not initialized. Run 'fingerkey init' first")]
    NotInitialized,

    #[error("fingerkey directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
