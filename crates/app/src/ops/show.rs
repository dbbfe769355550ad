use std::fmt;

use clap::Args;
use common::crypto::OutputMode;
use common::store::{KeyRecord, KeyStore, PersistenceError};

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Show {
    /// Fingerprint id of the stored record
    #[arg(long)]
    pub id: String,
}

/// A stored record and the mode that produced it
#[derive(Debug)]
pub struct ShowOutput {
    pub mode: OutputMode,
    pub json: String,
}

impl fmt::Display for ShowOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "mode: {}", self.mode)?;
        write!(f, "{}", self.json)
    }
}

impl ShowOutput {
    fn new(record: &KeyRecord) -> Result<Self, serde_json::Error> {
        Ok(Self {
            mode: record.mode(),
            json: serde_json::to_string_pretty(record)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShowError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("no key record for {0}")]
    NotFound(String),
    #[error("failed to render key record: {0}")]
    Render(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::op::Op for Show {
    type Error = ShowError;
    type Output = ShowOutput;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let record = state
            .key_store()
            .read(&self.id)?
            .ok_or_else(|| ShowError::NotFound(self.id.clone()))?;
        Ok(ShowOutput::new(&record)?)
    }
}
