use std::sync::Arc;

use clap::Args;
use common::batch::{BatchReport, BatchRunner};
use common::corpus::FingerprintIndex;
use common::crypto::OutputMode;
use common::imaging::InputError;
use common::pipeline::Pipeline;

use crate::state::StateError;

#[derive(Args, Debug, Clone)]
pub struct Batch {
    /// Number of concurrent workers (default: config, then available parallelism)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Output mode for this batch: raw or keypair
    #[arg(long)]
    pub mode: Option<OutputMode>,
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("{failed} of {total} keys failed\n{report}")]
    Incomplete {
        failed: usize,
        total: usize,
        report: BatchReport,
    },
}

#[async_trait::async_trait]
impl crate::op::Op for Batch {
    type Error = BatchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = ctx.state()?;
        let index = FingerprintIndex::build(&state.input_dir(), state.file_prefix())?;

        let mut runner = BatchRunner::new(
            Pipeline::new(state.derive_options(self.mode)),
            Arc::new(state.key_store()),
        );
        if let Some(workers) = self.workers.or(state.config.workers) {
            runner = runner.with_workers(workers);
        }

        let report = runner.run(&index).await;
        let keys_dir = state.keys_dir();
        if !report.is_success() {
            let stats = report.statistics();
            return Err(BatchError::Incomplete {
                failed: stats.failed,
                total: stats.total,
                report,
            });
        }
        Ok(format!("{}\nKeys are stored in: {}", report, keys_dir.display()))
    }
}
