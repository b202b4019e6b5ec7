//! Parallel transfer executor
//!
//! Runs one listing page worth of transfer tasks on a bounded set of tokio
//! workers. The first failure fails the page: tasks that have not started
//! yet are skipped, tasks already running are detached and left to finish
//! on their own. Nothing is rolled back, so a failed copy leaves an
//! unspecified subset of the page at the destination.

use crate::copy::TransferTask;
use crate::error::{PathmanError, Result};
use crate::storage::{LocalFs, ObjectStore};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// A single-object transfer operation
#[async_trait]
pub trait Transfer: Send + Sync {
    /// Copy one object. Returns the number of bytes moved.
    async fn transfer(&self, task: &TransferTask) -> Result<u64>;
}

/// Downloads objects into local files, creating parent directories on demand
pub struct Download {
    store: Arc<dyn ObjectStore>,
    local: LocalFs,
}

impl Download {
    /// Create a download operation
    pub fn new(store: Arc<dyn ObjectStore>, local: LocalFs) -> Self {
        Self { store, local }
    }
}

#[async_trait]
impl Transfer for Download {
    async fn transfer(&self, task: &TransferTask) -> Result<u64> {
        let (bucket, key) = task.source.location()?;
        let local_path = task.destination.to_local_path();

        // concurrent workers may race on the same parent; mkdir_all tolerates that
        if let Some(parent) = local_path.parent() {
            self.local.mkdir_all(parent).await?;
        }

        let bytes = self.store.download_file(bucket, key, &local_path).await?;
        tracing::debug!("Downloaded {} -> {} ({} bytes)", task.source, task.destination, bytes);
        Ok(bytes)
    }
}

/// Outcome of one successfully executed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Objects transferred
    pub objects: u64,
    /// Bytes transferred
    pub bytes: u64,
}

/// Bounded worker pool for one batch of transfers
#[derive(Debug, Clone, Copy)]
pub struct ParallelExecutor {
    max_concurrency: usize,
}

impl ParallelExecutor {
    /// Create an executor running at most `max_concurrency` transfers at once
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Worker limit
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Run every task and wait for all of them, or for the first failure.
    ///
    /// The error of the first failing task is returned as
    /// [`PathmanError::TransferFailure`].
    pub async fn execute(&self, tasks: Vec<TransferTask>, transfer: Arc<dyn Transfer>) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();
        if tasks.is_empty() {
            return Ok(outcome);
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let aborted = Arc::new(AtomicBool::new(false));
        let mut workers = JoinSet::new();

        for task in tasks {
            let semaphore = Arc::clone(&semaphore);
            let aborted = Arc::clone(&aborted);
            let transfer = Arc::clone(&transfer);

            workers.spawn(run_task(task, semaphore, aborted, transfer));
        }

        while let Some(joined) = workers.join_next().await {
            let result = joined
                .map_err(|e| PathmanError::Join(e.to_string()))
                .and_then(|r| r);

            match result {
                Ok(Some(bytes)) => {
                    outcome.objects += 1;
                    outcome.bytes += bytes;
                }
                Ok(None) => {}
                Err(e) => {
                    aborted.store(true, Ordering::SeqCst);
                    tracing::warn!(
                        "Transfer failed, abandoning batch ({} tasks not awaited): {}",
                        workers.len(),
                        e
                    );
                    workers.detach_all();
                    return Err(e);
                }
            }
        }

        Ok(outcome)
    }
}

/// Run one task once a worker slot is free, unless the batch was abandoned
async fn run_task(
    task: TransferTask,
    semaphore: Arc<Semaphore>,
    aborted: Arc<AtomicBool>,
    transfer: Arc<dyn Transfer>,
) -> Result<Option<u64>> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| PathmanError::Join(format!("worker pool closed: {}", e)))?;

    if aborted.load(Ordering::SeqCst) {
        return Ok(None);
    }

    match transfer.transfer(&task).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) => {
            aborted.store(true, Ordering::SeqCst);
            Err(PathmanError::transfer(
                task.source.as_str(),
                task.destination.as_str(),
                e,
            ))
        }
    }
}
