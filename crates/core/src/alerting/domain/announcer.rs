pub type AnnounceError = Box<dyn std::error::Error + Send + Sync>;

/// Delivers a short spoken (or otherwise user-facing) alert.
///
/// Implementations should return promptly; slow back-ends belong behind a
/// queue so the caller never waits on speech synthesis.
pub trait Announcer: Send + Sync {
    fn announce(&self, message: &str) -> Result<(), AnnounceError>;
}

/// Discards every message.
pub struct SilentAnnouncer;

impl Announcer for SilentAnnouncer {
    fn announce(&self, _message: &str) -> Result<(), AnnounceError> {
        Ok(())
    }
}
