//! Cancellation signals for call contexts

use async_channel::{Receiver, Sender};
use thiserror::Error;

/// Why a context is done
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancelled {
    /// The context was cancelled through its [`CancelHandle`]
    #[error("context canceled")]
    ByHandle,

    /// The context deadline passed
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Handle returned by [`Context::with_cancel`](crate::Context::with_cancel)
///
/// Dropping the handle does not cancel the context; only [`cancel`](Self::cancel) does.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Sender<()>,
}

impl CancelHandle {
    /// Cancel the associated context and every context derived from it
    pub fn cancel(&self) {
        if self.tx.close() {
            tracing::trace!("context cancelled");
        }
    }
}

/// Receiving side of a cancellation, stored in the context
///
/// The signal keeps its own sender so the channel stays open after the
/// handle is dropped. Nothing is ever sent; closing the channel is the signal.
#[derive(Debug, Clone)]
pub(crate) struct CancelSignal {
    _tx: Sender<()>,
    rx: Receiver<()>,
}

impl CancelSignal {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.rx.is_closed()
    }

    pub(crate) async fn cancelled(&self) {
        // recv only returns once the channel is closed
        let _ = self.rx.recv().await;
    }
}

pub(crate) fn pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = async_channel::bounded(1);
    (
        CancelHandle { tx: tx.clone() },
        CancelSignal { _tx: tx, rx },
    )
}
