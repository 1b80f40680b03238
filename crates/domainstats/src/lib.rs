#![doc = include_str!("../README.md")]

mod config;
mod error;
mod extract;
pub mod pipeline;
mod source;
mod status;
mod types;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::extract::*;
pub use crate::pipeline::Parser;
pub use crate::pipeline::worker::WorkerStats;
pub use crate::source::*;
pub use crate::status::*;
pub use crate::types::*;
// Re-exported so callers can build a token without naming `tokio-util`.
pub use tokio_util::sync::CancellationToken;
