use std::path::PathBuf;

use clap::Args;
use common::crypto::OutputMode;
use common::imaging::RidgePolarity;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Corpus directory (default: <config dir>/fingerprints)
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Output directory for key records (default: <config dir>/keys)
    #[arg(long)]
    pub keys_dir: Option<PathBuf>,

    /// Prefix stripped from corpus file names, e.g. min_
    #[arg(long)]
    pub prefix: Option<String>,

    /// Default output mode: raw or keypair
    #[arg(long, default_value_t = OutputMode::default())]
    pub mode: OutputMode,

    /// Which side of the threshold holds the ridges: bright or dark
    #[arg(long, value_enum, default_value_t = Polarity::Bright)]
    pub polarity: Polarity,

    /// Write debug images of each stage to this directory
    #[arg(long)]
    pub artifacts_dir: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum Polarity {
    Bright,
    Dark,
}

impl From<Polarity> for RidgePolarity {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::Bright => RidgePolarity::Bright,
            Polarity::Dark => RidgePolarity::Dark,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            input_dir: self.input_dir.clone(),
            keys_dir: self.keys_dir.clone(),
            file_prefix: self.prefix.clone(),
            mode: self.mode,
            polarity: self.polarity.into(),
            artifacts_dir: self.artifacts_dir.clone(),
            ..Default::default()
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized fingerkey directory at: {}\n\
             - Config: {}\n\
             - Input: {}\n\
             - Keys: {}\n\
             - Mode: {}\n\
             - File prefix: {}",
            state.fingerkey_dir.display(),
            state.config_path.display(),
            state.input_dir().display(),
            state.keys_dir().display(),
            state.config.mode,
            state.file_prefix().unwrap_or("(none)"),
        );

        Ok(output)
    }
}
