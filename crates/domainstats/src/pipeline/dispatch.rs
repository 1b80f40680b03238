use super::pool::RowDispatcher;
use crate::{Error, RecordSource, Result};
use std::io;
use tokio_util::sync::CancellationToken;

/// Reads every remaining row from `source` and hands each one to a worker.
///
/// This is the only reader of the input. It runs on a blocking thread since
/// record decoding is synchronous I/O.
///
/// # Behavior
///
/// - Checks `cancel` before every row and stops producing once it fires.
/// - Returns the first structural decode error immediately; the stream is not
///   read past it.
/// - Consumes `dispatcher`, so the row queue is closed on return no matter
///   how the function exits.
///
/// Returns the number of rows dispatched.
///
/// # Errors
///
/// - [`Error::Cancelled`] if `cancel` fired.
/// - [`Error::StructuralDecode`] if the stream could not be decoded.
/// - [`Error::ChannelError`] if the row queue closed while the run was live.
pub fn feed_rows<R: io::Read>(
    mut source: RecordSource<R>,
    dispatcher: RowDispatcher,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut dispatched = 0_u64;

    loop {
        if cancel.is_cancelled() {
            tracing::debug!("Dispatch cancelled after {dispatched} rows");
            return Err(Error::Cancelled);
        }

        let row = match source.next_row() {
            Ok(Some(row)) => row,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Aborting dispatch after {dispatched} rows: {e}");
                return Err(e);
            }
        };

        if let Err(e) = dispatcher.blocking_send(row) {
            // The queue only closes once every worker has unwound.
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }
            return Err(e);
        }
        dispatched += 1;
    }

    tracing::debug!("End of input after {dispatched} rows, closing row queue");
    Ok(dispatched)
}
