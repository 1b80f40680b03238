//! Error types for the domain statistics pipeline.
//!
//! This module defines the central `Error` enum, which captures every
//! run-level failure of a pipeline invocation. Row-level problems are not
//! errors at this level: they are reported as [`crate::MalformedRow`] and
//! never abort a run.
//!
//! ## Error Cases
//! - `FileUnavailable`: The input file could not be opened.
//! - `MissingHeader`: The input contained no header record.
//! - `StructuralDecode`: The record stream itself could not be decoded. The
//!   cause is a [`DecodeFailure`].
//! - `Cancelled`: The governing cancellation token fired before completion.
//! - `ChannelError`: An internal queue closed unexpectedly.
//! - `TaskFailed`: A spawned worker, dispatcher, or aggregator task panicked.
//! - `InvalidConfig`: The pipeline was configured with unusable values.

use std::path::PathBuf;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for a pipeline run.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The input file could not be opened.
    #[error("Input file unavailable: {}: {source}", .path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input ended before a header record could be read.
    #[error("Input has no header record")]
    MissingHeader,

    /// The record stream is malformed beyond a single row (bad quoting,
    /// invalid UTF-8, I/O failure mid-stream).
    #[error("Structural decode error{}: {source}", fmt_line(.line))]
    StructuralDecode {
        line: Option<u64>,
        #[source]
        source: DecodeFailure,
    },

    /// The run was told to stop before it completed.
    #[error("Run cancelled")]
    Cancelled,

    /// Internal channel send/receive failure.
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// A spawned task panicked or was aborted.
    #[error("Task failed: {context}")]
    TaskFailed { context: String },

    /// The pipeline configuration was rejected.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Returns `true` if the run stopped because it was cancelled rather than
    /// because something broke.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub(crate) fn structural(source: csv::Error) -> Self {
        let line = source.position().map(csv::Position::line);
        Self::StructuralDecode {
            line,
            source: DecodeFailure::Csv(source),
        }
    }
}

/// Why a record stream could not be decoded.
#[derive(thiserror::Error, Debug)]
pub enum DecodeFailure {
    /// Rejected by the decoder itself (invalid UTF-8, I/O failure).
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// A decoded field contains a quote character, either a bare `"` in an
    /// unquoted field or an escaped one.
    #[error("field {field} contains a stray quote")]
    StrayQuote { field: usize },

    /// A decoded field contains a line break. Records never span lines, so
    /// this is a quoted field whose closing quote is missing.
    #[error("field {field} spans lines, quote is never closed")]
    UnterminatedQuote { field: usize },
}

#[allow(clippy::ref_option)]
fn fmt_line(line: &Option<u64>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_cancelled() {
            Self::TaskFailed {
                context: "task was aborted".to_string(),
            }
        } else {
            Self::TaskFailed {
                context: format!("task panicked: {err}"),
            }
        }
    }
}
