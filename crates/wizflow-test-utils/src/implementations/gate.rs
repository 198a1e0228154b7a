//! Holds a fake call open until the test releases it.

use std::sync::Arc;
use tokio::sync::Notify;

/// Suspension point shared between a fake and the test driving it
#[derive(Clone, Default)]
pub struct Gate {
    started: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    /// Creates a closed gate
    pub fn new() -> Self {
        Self::default()
    }

    /// Called by the fake: signal arrival, then wait for release
    pub async fn pass(&self) {
        self.started.notify_one();
        self.release.notified().await;
    }

    /// Wait until a call has reached the gate
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }

    /// Let the waiting call continue
    pub fn release(&self) {
        self.release.notify_one();
    }
}
