use std::fmt;
use std::path::PathBuf;

use clap::Args;
use common::corpus::{id_for_file_name, FingerprintIndex};
use common::crypto::OutputMode;
use common::imaging::InputError;
use common::pipeline::{DeriveError as PipelineError, Pipeline};
use common::store::KeyRecord;

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
#[command(group(
    clap::ArgGroup::new("source")
        .required(true)
        .multiple(true)
        .args(["id", "image"]),
))]
pub struct Derive {
    /// Fingerprint id to look up in the input directory
    #[arg(long)]
    pub id: Option<String>,

    /// Derive from this image instead of the input directory
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Output mode for this invocation: raw or keypair
    #[arg(long)]
    pub mode: Option<OutputMode>,
}

#[derive(Debug)]
pub struct DeriveOutput {
    pub record: KeyRecord,
    pub location: PathBuf,
}

impl fmt::Display for DeriveOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = &self.record;
        writeln!(
            f,
            "Generated {} key for {}",
            record.mode(),
            record.fingerprint_id
        )?;
        writeln!(f, "  record: {}", self.location.display())?;
        if let Some(public) = &record.public_key {
            writeln!(f, "  public key: {}", public)?;
        }
        if let Some(counter) = record.resalt_counter {
            writeln!(f, "  resalt counter: {}", counter)?;
        }
        write!(
            f,
            "  minutiae: {} endings, {} bifurcations",
            record.minutiae_count.endings, record.minutiae_count.bifurcations
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DeriveError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("cannot infer a fingerprint id from {0}, pass --id")]
    NoId(PathBuf),
    #[error("derivation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<InputError> for DeriveError {
    fn from(e: InputError) -> Self {
        DeriveError::Pipeline(e.into())
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Derive {
    type Error = DeriveError;
    type Output = DeriveOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;

        let (id, path) = match &self.image {
            Some(image) => {
                let id = match &self.id {
                    Some(id) => id.clone(),
                    None => image
                        .file_name()
                        .and_then(|name| name.to_str())
                        .and_then(|name| id_for_file_name(name, state.file_prefix()))
                        .ok_or_else(|| DeriveError::NoId(image.clone()))?,
                };
                (id, image.clone())
            }
            None => {
                // the source group makes --id present here
                let id = self.id.clone().unwrap_or_default();
                let index = FingerprintIndex::build(&state.input_dir(), state.file_prefix())?;
                let path = index.lookup(&id)?.to_path_buf();
                (id, path)
            }
        };

        let pipeline = Pipeline::new(state.derive_options(self.mode));
        let store = state.key_store();
        let (record, location) = tokio::task::spawn_blocking(move || {
            pipeline.derive_and_store(&id, &path, &store)
        })
        .await??;

        Ok(DeriveOutput { record, location })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{Op, OpContext};
    use crate::state::{AppConfig, AppState};
    use tempfile::TempDir;

    /// SHA-256 of the canonical string of an image without ridges
    const EMPTY_SET_SEED: &str = "15013ec77f8e4f1cfce40b272cd3f680c2791843e643e85fba218eaabe862739";

    fn init(tmp: &TempDir, config: AppConfig) -> (AppState, OpContext) {
        let state = AppState::init(Some(tmp.path().to_path_buf()), Some(config)).unwrap();
        (state, OpContext::new(Some(tmp.path().to_path_buf())))
    }

    fn blank_png(path: &std::path::Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::GrayImage::new(16, 16).save(path).unwrap();
    }

    #[tokio::test]
    async fn test_id_is_inferred_from_image_name() {
        let tmp = TempDir::new().unwrap();
        let (state, ctx) = init(
            &tmp,
            AppConfig {
                file_prefix: Some("min_".to_string()),
                ..Default::default()
            },
        );
        let image = tmp.path().join("scans").join("min_42.png");
        blank_png(&image);

        let output = Derive {
            id: None,
            image: Some(image),
            mode: Some(OutputMode::RawDigest),
        }
        .execute(&ctx)
        .await
        .unwrap();

        assert_eq!(output.record.fingerprint_id, "42");
        assert_eq!(output.record.private_key, EMPTY_SET_SEED);
        assert_eq!(output.location, state.keys_dir().join("42_key.json"));
        assert!(output.location.is_file());
    }

    #[tokio::test]
    async fn test_explicit_id_overrides_image_name() {
        let tmp = TempDir::new().unwrap();
        let (state, ctx) = init(&tmp, AppConfig::default());
        let image = tmp.path().join("scan.png");
        blank_png(&image);

        let output = Derive {
            id: Some("7".to_string()),
            image: Some(image),
            mode: None,
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(output.record.fingerprint_id, "7");
        assert_eq!(output.location, state.keys_dir().join("7_keypair.json"));
    }

    #[tokio::test]
    async fn test_image_name_without_id() {
        let tmp = TempDir::new().unwrap();
        let (_, ctx) = init(
            &tmp,
            AppConfig {
                file_prefix: Some("min_".to_string()),
                ..Default::default()
            },
        );
        let image = tmp.path().join("other_3.png");
        blank_png(&image);

        let err = Derive {
            id: None,
            image: Some(image.clone()),
            mode: None,
        }
        .execute(&ctx)
        .await
        .unwrap_err();
        assert!(matches!(err, DeriveError::NoId(path) if path == image));
    }

    #[tokio::test]
    async fn test_id_is_looked_up_in_input_dir() {
        let tmp = TempDir::new().unwrap();
        let (state, ctx) = init(&tmp, AppConfig::default());
        blank_png(&state.input_dir().join("10.png"));

        let output = Derive {
            id: Some("10".to_string()),
            image: None,
            mode: Some(OutputMode::RawDigest),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert_eq!(output.record.private_key, EMPTY_SET_SEED);

        let err = Derive {
            id: Some("1".to_string()),
            image: None,
            mode: None,
        }
        .execute(&ctx)
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            DeriveError::Pipeline(PipelineError::Input(InputError::UnknownId(id))) if id == "1"
        ));
    }
}
