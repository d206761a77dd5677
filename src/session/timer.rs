//! Countdown timer for an active lockout.
//!
//! The timer thread only reports ticks; the owner applies them. Cancelling
//! joins the thread, so no tick is delivered after `cancel` returns.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::engine::activity_key::ActivityKey;

/// Receives ticks from the timer thread. Returning false stops the timer.
pub type TickSink = Arc<dyn Fn(ActivityKey) -> bool + Send + Sync>;

pub struct LockTimer {
    key: ActivityKey,
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LockTimer {
    pub fn start(key: ActivityKey, interval: Duration, sink: TickSink) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if !sink(key) {
                            return;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                }
            }
        });
        debug!(target: "glance", %key, "lock timer started");
        Self {
            key,
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    pub fn key(&self) -> ActivityKey {
        self.key
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn cancel(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        drop(self.stop.take());
        let _ = handle.join();
        debug!(target: "glance", key = %self.key, "lock timer cancelled");
    }
}

impl Drop for LockTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
