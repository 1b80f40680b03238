use super::queue::{QueueSender, SharedReceiver};
use crate::{Row, extract_domain};
use tokio_util::sync::CancellationToken;

/// Per-worker counters returned when a worker exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Rows this worker pulled off its queue.
    pub rows: u64,
    /// Rows rejected by the extractor.
    pub malformed: u64,
}

impl WorkerStats {
    pub const fn merge(self, other: Self) -> Self {
        Self {
            rows: self.rows + other.rows,
            malformed: self.malformed + other.malformed,
        }
    }
}

/// Worker task that turns [`Row`]s into domains.
///
/// Every worker pulls from the one shared row queue and holds a clone of the
/// result sender. It runs until one of:
///
/// - its row queue is closed and drained (end of input),
/// - `cancel` fires,
/// - the result queue is closed (the aggregator is gone).
///
/// Malformed rows are logged and skipped. Every wait is raced against
/// `cancel`, so a cancelled run never leaves a worker parked on a queue.
pub async fn worker_loop(
    worker_id: usize,
    rows: SharedReceiver<Row>,
    results: QueueSender<String>,
    cancel: CancellationToken,
) -> WorkerStats {
    tracing::trace!("Worker {worker_id} started");
    let mut stats = WorkerStats::default();

    loop {
        let row = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Worker {worker_id} cancelled");
                break;
            }
            row = async { rows.lock().await.recv().await } => match row {
                Some(row) => row,
                None => break,
            },
        };
        stats.rows += 1;

        match extract_domain(&row) {
            Ok(domain) => {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        tracing::debug!("Worker {worker_id} cancelled while forwarding");
                        break;
                    }
                    sent = results.send(domain) => {
                        if sent.is_err() {
                            tracing::debug!("Worker {worker_id} result queue closed");
                            break;
                        }
                    }
                }
            }
            Err(reason) => {
                stats.malformed += 1;
                let line = row.position().map(csv::Position::line);
                tracing::warn!(
                    worker_id,
                    ?line,
                    fields = row.len(),
                    "Skipping malformed row: {reason}"
                );
            }
        }
    }

    tracing::trace!(
        "Worker {worker_id} stopped after {} rows ({} malformed)",
        stats.rows,
        stats.malformed
    );
    stats
}
