use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::alerting::domain::announcer::{Announcer, SilentAnnouncer};

use super::background_announcer::BackgroundAnnouncer;
use super::command_announcer::CommandAnnouncer;
use super::log_announcer::LogAnnouncer;

/// Alert delivery back-end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnnouncerKind {
    /// Text-to-speech through `espeak`.
    Espeak,
    Log,
    None,
}

impl FromStr for AnnouncerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "espeak" => Ok(Self::Espeak),
            "log" => Ok(Self::Log),
            "none" => Ok(Self::None),
            other => Err(format!(
                "announcer must be one of: espeak, log, none, got '{other}'"
            )),
        }
    }
}

impl fmt::Display for AnnouncerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Espeak => "espeak",
            Self::Log => "log",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// Builds the announcer for `kind`. Speech runs behind a bounded
/// background queue so the frame loop never waits on it.
pub fn create_announcer(kind: AnnouncerKind) -> Arc<dyn Announcer> {
    log::info!("Using {kind} announcer");
    match kind {
        AnnouncerKind::Espeak => Arc::new(BackgroundAnnouncer::new(Arc::new(
            CommandAnnouncer::espeak(),
        ))),
        AnnouncerKind::Log => Arc::new(LogAnnouncer),
        AnnouncerKind::None => Arc::new(SilentAnnouncer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("espeak", AnnouncerKind::Espeak)]
    #[case("LOG", AnnouncerKind::Log)]
    #[case("none", AnnouncerKind::None)]
    fn test_parse(#[case] input: &str, #[case] expected: AnnouncerKind) {
        assert_eq!(input.parse::<AnnouncerKind>().unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("festival".parse::<AnnouncerKind>().is_err());
    }

    #[test]
    fn test_silent_and_log_announcers_succeed() {
        assert!(create_announcer(AnnouncerKind::None).announce("x").is_ok());
        assert!(create_announcer(AnnouncerKind::Log).announce("x").is_ok());
    }
}
