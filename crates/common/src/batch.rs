//! Key derivation over a whole corpus
//!
//! Every id is an independent unit of work: resolve, load, derive, write.
//! Jobs run on tokio's blocking pool, at most `workers` at a time. A failing
//! or panicking job is recorded against its id and the batch carries on.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::corpus::FingerprintIndex;
use crate::minutiae::MinutiaeCount;
use crate::pipeline::{DeriveError, Pipeline};
use crate::store::KeyStore;

/// Available parallelism, or 1 if it cannot be determined
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSuccess {
    pub fingerprint_id: String,
    pub location: PathBuf,
    pub minutiae_count: MinutiaeCount,
    pub resalt_counter: Option<u32>,
}

#[derive(Debug, thiserror::Error)]
#[error("{fingerprint_id}: {error}")]
pub struct BatchFailure {
    pub fingerprint_id: String,
    #[source]
    pub error: DeriveError,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchStatistics {
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
    pub average_endings: f64,
    pub average_bifurcations: f64,
}

/// Outcome of a batch, both lists sorted by id
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<BatchSuccess>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn statistics(&self) -> BatchStatistics {
        let succeeded = self.succeeded.len();
        let (endings, bifurcations) = self.succeeded.iter().fold((0, 0), |(e, b), s| {
            (
                e + s.minutiae_count.endings,
                b + s.minutiae_count.bifurcations,
            )
        });
        let average = |sum: usize| {
            if succeeded == 0 {
                0.0
            } else {
                sum as f64 / succeeded as f64
            }
        };
        BatchStatistics {
            succeeded,
            failed: self.failures.len(),
            total: succeeded + self.failures.len(),
            average_endings: average(endings),
            average_bifurcations: average(bifurcations),
        }
    }

    fn sort(&mut self) {
        self.succeeded
            .sort_by(|a, b| a.fingerprint_id.cmp(&b.fingerprint_id));
        self.failures
            .sort_by(|a, b| a.fingerprint_id.cmp(&b.fingerprint_id));
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.statistics();
        writeln!(f, "Key generation summary:")?;
        writeln!(f, "  succeeded: {}", stats.succeeded)?;
        writeln!(f, "  failed:    {}", stats.failed)?;
        writeln!(f, "  total:     {}", stats.total)?;
        writeln!(f, "  average endings:      {:.2}", stats.average_endings)?;
        write!(f, "  average bifurcations: {:.2}", stats.average_bifurcations)?;
        for failure in &self.failures {
            write!(f, "\n  failed {}", failure)?;
        }
        Ok(())
    }
}

pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    store: Arc<dyn KeyStore>,
    workers: usize,
}

impl BatchRunner {
    pub fn new(pipeline: Pipeline, store: Arc<dyn KeyStore>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store,
            workers: default_workers(),
        }
    }

    /// Bound the number of jobs in flight, at least one
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Derive and store a key for every id in the index
    pub async fn run(&self, index: &FingerprintIndex) -> BatchReport {
        tracing::info!(ids = index.len(), workers = self.workers, "starting batch");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut jobs = JoinSet::new();
        let mut report = BatchReport::default();

        for id in index.ids() {
            let path = match index.lookup(id) {
                Ok(path) => path.to_path_buf(),
                Err(e) => {
                    record_failure(&mut report, id.to_string(), e.into());
                    continue;
                }
            };
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    record_failure(&mut report, id.to_string(), DeriveError::Worker(e.to_string()));
                    continue;
                }
            };

            let id = id.to_string();
            let pipeline = self.pipeline.clone();
            let store = self.store.clone();
            jobs.spawn(async move {
                let _permit = permit;
                let job_id = id.clone();
                let result = tokio::task::spawn_blocking(move || {
                    pipeline.derive_and_store(&job_id, &path, store.as_ref())
                })
                .await
                .unwrap_or_else(|e| Err(DeriveError::Worker(e.to_string())));
                (id, result)
            });
        }

        while let Some(joined) = jobs.join_next().await {
            match joined {
                Ok((id, Ok((record, location)))) => {
                    tracing::info!(id = %id, location = %location.display(), "stored key");
                    report.succeeded.push(BatchSuccess {
                        fingerprint_id: id,
                        location,
                        minutiae_count: record.minutiae_count,
                        resalt_counter: record.resalt_counter,
                    });
                }
                Ok((id, Err(error))) => record_failure(&mut report, id, error),
                // the job future only awaits its blocking task, whose panics are caught above
                Err(e) => tracing::error!("batch job aborted: {}", e),
            }
        }

        report.sort();
        let stats = report.statistics();
        tracing::info!(
            succeeded = stats.succeeded,
            failed = stats.failed,
            "batch finished"
        );
        report
    }
}

fn record_failure(report: &mut BatchReport, fingerprint_id: String, error: DeriveError) {
    tracing::warn!(id = %fingerprint_id, "key derivation failed: {}", error);
    report.failures.push(BatchFailure {
        fingerprint_id,
        error,
    });
}
