//! External cancellation.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Poll;

use futures::future::poll_fn;
use futures::task::AtomicWaker;

#[derive(Debug, Default)]
struct Shared {
    cancelled: AtomicBool,
    waker: AtomicWaker,
}

/// Requests cancellation of a render.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

/// Observed by the renderer between boundary completions.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    shared: Arc<Shared>,
}

/// Create a connected handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let shared = Arc::new(Shared::default());
    (
        CancelHandle {
            shared: shared.clone(),
        },
        CancelSignal { shared },
    )
}

impl CancelHandle {
    /// Cancel the render. Idempotent.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.waker.wake();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }
}

impl CancelSignal {
    /// A signal that is never cancelled.
    pub fn never() -> Self {
        Self {
            shared: Arc::new(Shared::default()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::SeqCst)
    }

    /// Completes once cancellation is requested.
    pub fn cancelled(&self) -> impl Future<Output = ()> + '_ {
        poll_fn(move |cx| {
            if self.is_cancelled() {
                return Poll::Ready(());
            }
            self.shared.waker.register(cx.waker());
            // Re-check after registering so a concurrent cancel is not missed.
            if self.is_cancelled() {
                Poll::Ready(())
            } else {
                Poll::Pending
            }
        })
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use futures::FutureExt;

    #[test]
    fn test_cancel_is_observed() {
        let (handle, signal) = cancel_pair();
        assert!(!signal.is_cancelled());
        assert!(signal.cancelled().now_or_never().is_none());

        handle.cancel();
        handle.cancel();
        assert!(signal.is_cancelled());
        assert!(handle.is_cancelled());
        block_on(signal.cancelled());
    }

    #[test]
    fn test_never_signal_stays_pending() {
        let signal = CancelSignal::never();
        assert!(signal.cancelled().now_or_never().is_none());
    }

    #[test]
    fn test_cancel_wakes_waiting_task() {
        let (handle, signal) = cancel_pair();
        block_on(async {
            let wait = signal.cancelled();
            let trigger = async {
                handle.cancel();
            };
            futures::join!(wait, trigger);
        });
    }
}
