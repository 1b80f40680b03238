//! Bounded queues connecting the pipeline stages.
//!
//! Both intermediary queues of a run are plain tokio channels created with
//! [`bounded`]. A `buffer_size` of zero cannot be expressed as a tokio
//! channel, so it becomes a single slot plus a rendezvous: after each send the
//! sender waits until the slot is free again. With one slot, a free slot means
//! the item just sent has been received, so a send only returns once a
//! consumer has taken the item.
//!
//! The row queue has several consumers. [`SharedReceiver`] lets every worker
//! pull from the one receiver, one worker at a time.

use crate::{Error, ParserConfig, Result};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// Receiving end of a queue shared by several consumers.
pub type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// Sending end of a pipeline queue.
#[derive(Debug)]
pub struct QueueSender<T> {
    tx: mpsc::Sender<T>,
    rendezvous: bool,
}

// Derived `Clone` would require `T: Clone`.
impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rendezvous: self.rendezvous,
        }
    }
}

/// Creates a queue holding at most `config.buffer_size` items.
pub fn bounded<T>(config: &ParserConfig) -> (QueueSender<T>, mpsc::Receiver<T>) {
    let (tx, rx) = mpsc::channel(config.queue_capacity());
    let sender = QueueSender {
        tx,
        rendezvous: config.is_rendezvous(),
    };
    (sender, rx)
}

/// Wraps `rx` so it can be handed to several consumers.
pub fn shared<T>(rx: mpsc::Receiver<T>) -> SharedReceiver<T> {
    Arc::new(Mutex::new(rx))
}

impl<T> QueueSender<T> {
    /// Sends `item`, waiting for free space.
    ///
    /// On a rendezvous queue this also waits until a consumer has taken
    /// `item`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelError`] if every receiver is gone.
    pub async fn send(&self, item: T) -> Result<()> {
        self.tx.send(item).await.map_err(|_| closed())?;
        if self.rendezvous {
            // The permit is released on drop, leaving the slot free.
            drop(self.tx.reserve().await.map_err(|_| closed())?);
        }
        Ok(())
    }
}

fn closed() -> Error {
    Error::ChannelError {
        context: "queue receiver dropped".to_string(),
    }
}
