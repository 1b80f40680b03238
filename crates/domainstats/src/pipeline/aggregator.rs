use super::finalize::finalize;
use crate::{DomainCount, Error, Result};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Sole owner of the domain -> count mapping.
///
/// The aggregator is the only consumer of the result queue and the only
/// writer of its map, so counting needs no lock.
#[derive(Debug, Default)]
pub struct Aggregator {
    counts: HashMap<String, u64>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one occurrence of `domain`.
    pub fn record(&mut self, domain: String) {
        *self.counts.entry(domain).or_insert(0) += 1;
    }

    /// Number of distinct domains seen so far.
    pub fn distinct_domains(&self) -> usize {
        self.counts.len()
    }

    /// Drains `results` until every sender has been dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires first. The partial
    /// counts are discarded.
    pub async fn run(
        mut self,
        mut results: mpsc::Receiver<String>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(
                        "Aggregator cancelled with {} domains",
                        self.distinct_domains()
                    );
                    return Err(Error::Cancelled);
                }
                domain = results.recv() => match domain {
                    Some(domain) => self.record(domain),
                    None => break,
                },
            }
        }

        tracing::debug!("Aggregator drained, {} distinct domains", self.distinct_domains());
        Ok(self)
    }

    /// Converts the final state into a domain-sorted result.
    pub fn finalize(self) -> Vec<DomainCount> {
        finalize(self.counts)
    }
}
