//! Concurrent extraction and aggregation pipeline.
//!
//! ```text
//! RecordSource ──► feed_rows ──► row queue ──► worker_loop × N
//!  (blocking thread, single reader)                  │
//!                                                    ▼
//!        Vec<DomainCount> ◄── finalize ◄── Aggregator ◄── result queue
//! ```
//!
//! ## Structure
//!
//! - [`dispatch`] - Single-reader fan-out from the record source.
//! - [`pool`] - Worker spawning, row distribution and the join barrier.
//! - [`queue`] - Bounded queues, including the unbuffered handoff.
//! - [`worker`] - Per-worker extraction loop.
//! - [`aggregator`] - Single-owner counting of extracted domains.
//! - [`finalize`] - Domain-sorted result construction.
//!
//! [`Parser`] wires these together and owns the lifecycle of a run.

pub mod aggregator;
pub mod dispatch;
pub mod finalize;
pub mod pool;
pub mod queue;
pub mod worker;

#[cfg(test)]
mod tests;

use crate::{DomainCount, Error, ParserConfig, RecordSource, Report, Result, RunStatus};
use aggregator::Aggregator;
use dispatch::feed_rows;
use pool::WorkerPool;
use std::{io, path::Path, time::Instant};
use tokio_util::sync::CancellationToken;
use worker::WorkerStats;

/// Counts customers per email domain over a delimited input.
///
/// A `Parser` holds only configuration. Every call is an independent run
/// with its own queues, workers and aggregate state, so one parser may be
/// shared across concurrent runs.
///
/// All methods must be called from within a Tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Returns the domain-sorted customer counts of the file at `path`.
    ///
    /// # Errors
    ///
    /// See [`Parser::report`].
    pub async fn domain_counts(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<Vec<DomainCount>> {
        self.report(path, cancel).await.map(|report| report.counts)
    }

    /// Runs the pipeline over the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if the configuration is unusable.
    /// - [`Error::Cancelled`] if `cancel` fired before the run completed.
    /// - [`Error::FileUnavailable`] if the file cannot be opened.
    /// - [`Error::MissingHeader`] or [`Error::StructuralDecode`] if the input
    ///   cannot be decoded.
    /// - [`Error::TaskFailed`] if a pipeline task panicked.
    #[tracing::instrument(
        name = "domain_counts",
        skip_all,
        fields(path = %path.as_ref().display())
    )]
    pub async fn report(
        &self,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<Report> {
        self.config.validate()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let path = path.as_ref().to_path_buf();
        let source = open_blocking(move || RecordSource::from_path(path)).await?;
        self.run(source, cancel).await
    }

    /// Returns the domain-sorted customer counts of `reader`.
    ///
    /// # Errors
    ///
    /// See [`Parser::report_from_reader`].
    pub async fn domain_counts_from_reader<R>(
        &self,
        reader: R,
        cancel: &CancellationToken,
    ) -> Result<Vec<DomainCount>>
    where
        R: io::Read + Send + 'static,
    {
        self.report_from_reader(reader, cancel)
            .await
            .map(|report| report.counts)
    }

    /// Runs the pipeline over an arbitrary readable record stream.
    ///
    /// The reader is moved onto the dispatch thread and dropped before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Same as [`Parser::report`], minus [`Error::FileUnavailable`].
    #[tracing::instrument(name = "domain_counts", skip_all)]
    pub async fn report_from_reader<R>(
        &self,
        reader: R,
        cancel: &CancellationToken,
    ) -> Result<Report>
    where
        R: io::Read + Send + 'static,
    {
        self.config.validate()?;
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let source = open_blocking(move || RecordSource::new(reader)).await?;
        self.run(source, cancel).await
    }

    /// Owns one run from spawn to join.
    ///
    /// Every task spawned here is awaited before returning, on every path.
    /// A structural failure cancels an internal child of `cancel`, never
    /// `cancel` itself.
    async fn run<R>(&self, source: RecordSource<R>, cancel: &CancellationToken) -> Result<Report>
    where
        R: io::Read + Send + 'static,
    {
        let start = Instant::now();
        let abort = cancel.child_token();
        tracing::info!(
            status = %RunStatus::Running,
            "Starting run with {} workers, buffer size {}",
            self.config.worker_count,
            self.config.buffer_size
        );

        let (results_tx, results_rx) = queue::bounded(&self.config);
        let (dispatcher, pool) = WorkerPool::spawn(&self.config, results_tx, &abort);
        let aggregator = tokio::spawn(Aggregator::new().run(results_rx, abort.clone()));
        let feeder = {
            let abort = abort.clone();
            tokio::task::spawn_blocking(move || feed_rows(source, dispatcher, &abort))
        };

        let fed = feeder.await.map_err(Error::from).and_then(|r| r);
        if fed.is_err() {
            abort.cancel();
        }
        let workers = pool.join().await;
        let aggregated = aggregator.await.map_err(Error::from).and_then(|r| r);

        let outcome = if cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            settle(fed, workers, aggregated).map(|(rows_read, stats, aggregator)| Report {
                counts: aggregator.finalize(),
                rows_read,
                malformed_rows: stats.malformed,
            })
        };

        let elapsed_ms = start.elapsed().as_millis();
        match &outcome {
            Ok(report) => tracing::info!(
                status = %RunStatus::Succeeded,
                "Counted {} rows into {} domains ({} malformed) in {elapsed_ms}ms",
                report.rows_read,
                report.counts.len(),
                report.malformed_rows
            ),
            Err(e) => tracing::warn!(
                status = %RunStatus::of(&outcome),
                "Run ended without a result after {elapsed_ms}ms: {e}"
            ),
        }
        outcome
    }
}

/// Opens the input and reads its header off the runtime threads.
async fn open_blocking<R, F>(open: F) -> Result<RecordSource<R>>
where
    R: Send + 'static,
    F: FnOnce() -> Result<RecordSource<R>> + Send + 'static,
{
    tokio::task::spawn_blocking(open)
        .await
        .map_err(Error::from)
        .and_then(|r| r)
}

/// Picks the error that explains a failed run.
///
/// A structural error reported by the dispatcher wins, then a failed task.
/// Channel errors are usually a symptom of one of those and come last.
fn settle(
    fed: Result<u64>,
    workers: Result<WorkerStats>,
    aggregated: Result<Aggregator>,
) -> Result<(u64, WorkerStats, Aggregator)> {
    match (fed, workers, aggregated) {
        (Ok(rows), Ok(stats), Ok(aggregator)) => Ok((rows, stats, aggregator)),
        (Err(e @ Error::StructuralDecode { .. }), _, _) => Err(e),
        (_, Err(e), _) | (_, _, Err(e @ Error::TaskFailed { .. })) => Err(e),
        (Err(e), _, _) | (_, _, Err(e)) => Err(e),
    }
}
