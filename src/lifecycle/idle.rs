//! Idle-driven shutdown timer.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::lifecycle::Shutdown;

/// Single process-wide countdown that triggers shutdown when it elapses.
///
/// `reset` replaces the running countdown with a fresh one; it is called
/// concurrently from every connection task, so the slot holding the
/// countdown task is behind its own lock. The lock is never held across an
/// await. With a zero timeout the timer is inert and never arms.
#[derive(Debug)]
pub struct IdleTimer {
    timeout: Option<Duration>,
    shutdown: Shutdown,
    armed: Mutex<Option<JoinHandle<()>>>,
}

impl IdleTimer {
    pub fn new(timeout: Duration, shutdown: Shutdown) -> Self {
        Self {
            timeout: (!timeout.is_zero()).then_some(timeout),
            shutdown,
            armed: Mutex::new(None),
        }
    }

    /// Restart the countdown. Called on server start, on every accepted
    /// connection, and after every successfully processed request.
    pub fn reset(&self) {
        let Some(timeout) = self.timeout else {
            return;
        };

        let shutdown = self.shutdown.clone();
        let countdown = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::info!("idle timeout reached, shutting down");
            shutdown.trigger();
        });

        let mut slot = self.armed.lock().expect("idle timer lock poisoned");
        if let Some(previous) = slot.replace(countdown) {
            previous.abort();
        }
    }
}

impl Drop for IdleTimer {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.armed.lock() {
            if let Some(countdown) = slot.take() {
                countdown.abort();
            }
        }
    }
}
