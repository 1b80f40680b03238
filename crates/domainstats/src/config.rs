use crate::{Error, Result};

/// Tuning knobs for a pipeline run.
///
/// - `worker_count`: number of concurrent extractor workers. Must be at least
///   one.
/// - `buffer_size`: capacity of each intermediary queue. Zero means
///   synchronous handoff, see [`ParserConfig::is_rendezvous`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserConfig {
    pub worker_count: usize,
    pub buffer_size: usize,
}

impl ParserConfig {
    /// Creates a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `worker_count` is zero.
    pub fn new(worker_count: usize, buffer_size: usize) -> Result<Self> {
        let config = Self {
            worker_count,
            buffer_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants a run relies on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `worker_count` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.worker_count == 0 {
            return Err(Error::InvalidConfig {
                reason: "worker_count must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Channel capacity backing every bounded queue of a run.
    ///
    /// Tokio's bounded channels need room for at least one message, so a
    /// `buffer_size` of zero is backed by a single slot.
    pub const fn queue_capacity(&self) -> usize {
        if self.buffer_size == 0 {
            1
        } else {
            self.buffer_size
        }
    }

    /// Whether a send must wait until the receiver has taken the item.
    pub const fn is_rendezvous(&self) -> bool {
        self.buffer_size == 0
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            buffer_size: 10,
        }
    }
}
