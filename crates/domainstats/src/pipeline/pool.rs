//! Worker pool for parallel domain extraction.
//!
//! This module defines [`WorkerPool`], which owns the join handles of a fixed
//! set of extractor workers, and [`RowDispatcher`], which owns the sending
//! end of the row queue they all pull from.
//!
//! There is exactly one row queue per run, so at most `buffer_size` rows are
//! queued no matter how many workers exist. All workers share a clone of one
//! result sender; the pool drops its own copy at spawn time so the result
//! queue closes exactly when the last worker exits.

use super::{
    queue::{self, QueueSender},
    worker::{WorkerStats, worker_loop},
};
use crate::{Error, ParserConfig, Result, Row};
use std::sync::Arc;
use tokio::{runtime::Handle, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// Handles of the running workers. Consumed by [`WorkerPool::join`].
pub struct WorkerPool {
    handles: Vec<JoinHandle<WorkerStats>>,
}

/// Sending side of the row queue.
///
/// Dropping the dispatcher closes the row queue, which is how workers learn
/// the input is exhausted.
pub struct RowDispatcher {
    rows: QueueSender<Row>,
    runtime: Handle,
}

impl WorkerPool {
    /// Starts exactly `config.worker_count` workers.
    ///
    /// `results` is cloned into every worker and then dropped, so the caller
    /// must not keep another sender alive if it wants the result queue to
    /// close at the end of the run.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        config: &ParserConfig,
        results: QueueSender<String>,
        cancel: &CancellationToken,
    ) -> (RowDispatcher, Self) {
        let (rows_tx, rows_rx) = queue::bounded(config);
        let rows_rx = queue::shared(rows_rx);

        let handles: Vec<_> = (0..config.worker_count)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&rows_rx),
                    results.clone(),
                    cancel.clone(),
                ))
            })
            .collect();
        drop(results);

        tracing::debug!(
            "Spawned {} workers on one row queue of {} slots",
            handles.len(),
            config.queue_capacity()
        );

        let dispatcher = RowDispatcher {
            rows: rows_tx,
            runtime: Handle::current(),
        };
        (dispatcher, Self { handles })
    }

    /// Number of workers in the pool.
    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Waits for every worker to exit and sums their counters.
    ///
    /// All handles are awaited even if one of them failed, so no worker is
    /// left running when this returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskFailed`] if any worker panicked.
    pub async fn join(self) -> Result<WorkerStats> {
        let outcomes = futures::future::join_all(self.handles).await;

        let mut total = WorkerStats::default();
        let mut failure = None;
        for (worker_id, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(stats) => total = total.merge(stats),
                Err(e) => {
                    tracing::error!("Worker {worker_id} failed: {e}");
                    if failure.is_none() {
                        failure = Some(Error::from(e));
                    }
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => {
                tracing::debug!("All workers joined");
                Ok(total)
            }
        }
    }
}

impl RowDispatcher {
    /// Hands `row` to whichever worker is free first, blocking the current
    /// thread while the queue is full.
    ///
    /// Must only be called from a blocking context (e.g. inside
    /// [`tokio::task::spawn_blocking`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if the row queue is closed, which only
    /// happens once every worker has been cancelled or has failed.
    pub fn blocking_send(&self, row: Row) -> Result<()> {
        self.runtime
            .block_on(self.rows.send(row))
            .map_err(|_| Error::ChannelError {
                context: "Row queue closed, no worker left".to_string(),
            })
    }
}
