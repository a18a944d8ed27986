use std::process::{Command, Stdio};

use crate::alerting::domain::announcer::{AnnounceError, Announcer};

pub const DEFAULT_SPEECH_PROGRAM: &str = "espeak";

/// Speaks messages by running an external text-to-speech program with the
/// message as its final argument.
pub struct CommandAnnouncer {
    program: String,
    args: Vec<String>,
}

impl CommandAnnouncer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn espeak() -> Self {
        Self::new(DEFAULT_SPEECH_PROGRAM, Vec::new())
    }
}

impl Announcer for CommandAnnouncer {
    fn announce(&self, message: &str) -> Result<(), AnnounceError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(message)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| format!("failed to run {}: {e}", self.program))?;
        if !status.success() {
            return Err(format!("{} exited with {status}", self.program).into());
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_successful_command() {
        let announcer = CommandAnnouncer::new("true", Vec::new());
        assert!(announcer.announce("hello").is_ok());
    }

    #[test]
    fn test_non_zero_exit_is_error() {
        let announcer = CommandAnnouncer::new("false", Vec::new());
        assert!(announcer.announce("hello").is_err());
    }

    #[test]
    fn test_missing_program_is_error() {
        let announcer = CommandAnnouncer::new("nearsight-no-such-tts", Vec::new());
        let err = announcer.announce("hello").unwrap_err();
        assert!(err.to_string().contains("nearsight-no-such-tts"));
    }
}
