use crate::Result;
use core::fmt;

/// Lifecycle state of a pipeline run.
///
/// A run moves `Idle -> Running` when invoked and then into exactly one
/// terminal state:
///
/// - [`RunStatus::Succeeded`]: the finalizer produced a result.
/// - [`RunStatus::Failed`]: the file could not be opened, the stream could not
///   be decoded, or an internal task failed.
/// - [`RunStatus::Cancelled`]: the cancellation token fired first.
///
/// # Example
///
/// ```
/// use domainstats::{Error, RunStatus};
///
/// let outcome: domainstats::Result<()> = Err(Error::Cancelled);
/// assert_eq!(RunStatus::of(&outcome), RunStatus::Cancelled);
/// assert!(RunStatus::of(&outcome).is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunStatus {
    /// Maps the outcome of a finished run to its terminal state.
    pub fn of<T>(outcome: &Result<T>) -> Self {
        match outcome {
            Ok(_) => Self::Succeeded,
            Err(e) if e.is_cancelled() => Self::Cancelled,
            Err(_) => Self::Failed,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
