use crate::pipeline::output_sink::{AnnotatedFrame, OutputSink};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::proximity_report::ProximityReport;
use crate::shared::frame::Frame;

/// Collects the outcome of a single-shot request.
///
/// Holds at most one result; a later emission replaces an earlier one.
#[derive(Default)]
pub struct ReportSink {
    report: Option<ProximityReport>,
    annotated: Option<Frame>,
}

impl ReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected report, or an empty one if nothing was emitted.
    pub fn into_parts(self) -> (ProximityReport, Option<Frame>) {
        (self.report.unwrap_or_default(), self.annotated)
    }
}

impl OutputSink for ReportSink {
    fn emit_frame(&mut self, frame: AnnotatedFrame) -> Result<(), PipelineError> {
        self.report = Some(ProximityReport::from_readings(&frame.readings));
        self.annotated = Some(frame.frame);
        Ok(())
    }

    fn emit_error(&mut self, _frame_index: usize, error: &PipelineError) -> Result<(), PipelineError> {
        self.report = Some(ProximityReport::failed(error));
        self.annotated = None;
        Ok(())
    }
}
