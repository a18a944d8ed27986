use crate::alerting::domain::announcer::{AnnounceError, Announcer};

/// Writes alerts to the log instead of speaking them.
pub struct LogAnnouncer;

impl Announcer for LogAnnouncer {
    fn announce(&self, message: &str) -> Result<(), AnnounceError> {
        log::warn!("ALERT: {message}");
        Ok(())
    }
}
