use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::proximity_session::SessionSummary;
use crate::proximity::domain::proximity_reading::ProximityReading;
use crate::shared::frame::Frame;

/// An annotated frame together with the readings drawn on it.
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    pub frame: Frame,
    pub readings: Vec<ProximityReading>,
}

/// Destination for loop output.
///
/// Frames are moved in as soon as they are annotated. Returning
/// [`PipelineError::SinkClosed`] tells the session the consumer is gone and
/// it should stop; any other error only affects the current frame.
pub trait OutputSink: Send {
    fn emit_frame(&mut self, frame: AnnotatedFrame) -> Result<(), PipelineError>;

    /// Reports a frame that could not be processed.
    fn emit_error(&mut self, frame_index: usize, error: &PipelineError)
        -> Result<(), PipelineError>;

    /// Called once when the session reaches a terminal state.
    fn finish(&mut self, _summary: &SessionSummary) -> Result<(), PipelineError> {
        Ok(())
    }
}
