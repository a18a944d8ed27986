use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};

use crate::alerting::domain::announcer::{AnnounceError, Announcer};
use crate::shared::constants::ANNOUNCE_QUEUE_CAPACITY;

/// Moves announcements off the caller's thread.
///
/// Messages go into a small bounded queue drained by one worker thread.
/// When the queue is full the message is rejected instead of blocking the
/// frame loop; the alert gate logs the rejection like any other failure.
pub struct BackgroundAnnouncer {
    tx: Option<Sender<String>>,
    worker: Option<JoinHandle<()>>,
}

impl BackgroundAnnouncer {
    pub fn new(inner: Arc<dyn Announcer>) -> Self {
        Self::with_capacity(inner, ANNOUNCE_QUEUE_CAPACITY)
    }

    pub fn with_capacity(inner: Arc<dyn Announcer>, capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<String>(capacity);
        let worker = std::thread::spawn(move || {
            for message in rx {
                if let Err(e) = inner.announce(&message) {
                    log::warn!("Announcement '{message}' failed: {e}");
                }
            }
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }
}

impl Announcer for BackgroundAnnouncer {
    fn announce(&self, message: &str) -> Result<(), AnnounceError> {
        let tx = self.tx.as_ref().ok_or("announcer is shut down")?;
        match tx.try_send(message.to_string()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err("announcement queue is full".into()),
            Err(TrySendError::Disconnected(_)) => Err("announcement worker stopped".into()),
        }
    }
}

impl Drop for BackgroundAnnouncer {
    fn drop(&mut self) {
        self.tx = None;
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                log::warn!("Announcement worker panicked");
            }
        }
    }
}
