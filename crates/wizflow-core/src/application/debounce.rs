//! Trailing-edge debounce
//!
//! Every [`Debouncer::trigger`] restarts the quiet period. When the period
//! elapses without another trigger the callback runs once with the last
//! value. Once the callback has started it runs to completion: a later
//! trigger only schedules the next invocation.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Callback invoked with the last triggered value
pub type DebouncedCallback<T> = Arc<dyn Fn(T) -> BoxFuture<'static, ()> + Send + Sync>;

struct Pending<T> {
    timer: JoinHandle<()>,
    value: Arc<Mutex<Option<T>>>,
}

/// Debounces calls to an async callback
pub struct Debouncer<T: Send + 'static> {
    quiet: Duration,
    callback: DebouncedCallback<T>,
    pending: Mutex<Option<Pending<T>>>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer with the given quiet period
    pub fn new(quiet: Duration, callback: DebouncedCallback<T>) -> Self {
        Self {
            quiet,
            callback,
            pending: Mutex::new(None),
        }
    }

    /// The configured quiet period
    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Schedule the callback with `value`, replacing any pending value.
    ///
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, value: T) {
        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.timer.abort();
        }

        let slot = Arc::new(Mutex::new(Some(value)));
        let timer_slot = slot.clone();
        let callback = self.callback.clone();
        let quiet = self.quiet;

        let timer = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let value = timer_slot.lock().take();
            if let Some(value) = value {
                trace!("Debounce quiet period elapsed");
                // Detached so that a later trigger cannot abort a running call
                tokio::spawn(callback(value));
            }
        });

        *pending = Some(Pending { timer, value: slot });
    }

    /// Whether a value is waiting for its quiet period to elapse
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|p| p.value.lock().is_some())
            .unwrap_or(false)
    }

    /// Drop the pending invocation, if any
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.timer.abort();
            previous.value.lock().take();
        }
    }

    /// Run the pending invocation now instead of waiting
    pub async fn flush(&self) {
        let value = match self.pending.lock().take() {
            Some(previous) => {
                previous.timer.abort();
                let value = previous.value.lock().take();
                value
            }
            None => None,
        };

        if let Some(value) = value {
            (self.callback)(value).await;
        }
    }
}

impl<T: Send + 'static> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(previous) = self.pending.get_mut().take() {
            previous.timer.abort();
        }
    }
}
