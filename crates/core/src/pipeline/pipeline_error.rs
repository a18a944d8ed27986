use thiserror::Error;

/// Failures surfaced by the proximity loop.
///
/// Only `SourceRead` and `Setup` end a session; everything else is scoped
/// to the frame or request it happened in.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("failed to read from source: {0}")]
    SourceRead(String),

    #[error("detector failed on frame {frame_index}: {message}")]
    Detector { frame_index: usize, message: String },

    #[error("detector exceeded {deadline_ms} ms on frame {frame_index}")]
    DetectorTimeout { frame_index: usize, deadline_ms: u128 },

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to annotate frame {frame_index}: {message}")]
    Annotate { frame_index: usize, message: String },

    #[error("failed to encode frame {frame_index}: {message}")]
    Encode { frame_index: usize, message: String },

    #[error("output sink closed")]
    SinkClosed,

    #[error("setup failed: {0}")]
    Setup(String),
}

impl PipelineError {
    /// Stable machine-readable name, used in JSON error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::SourceRead(_) => "source_read",
            PipelineError::Detector { .. } => "detector",
            PipelineError::DetectorTimeout { .. } => "detector_timeout",
            PipelineError::Decode(_) => "decode",
            PipelineError::Annotate { .. } => "annotate",
            PipelineError::Encode { .. } => "encode",
            PipelineError::SinkClosed => "sink_closed",
            PipelineError::Setup(_) => "setup",
        }
    }

    /// True for failures that end the whole session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineError::SourceRead(_) | PipelineError::Setup(_))
    }
}
