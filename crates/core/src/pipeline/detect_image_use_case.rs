use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::infrastructure::report_sink::ReportSink;
use crate::pipeline::output_sink::{AnnotatedFrame, OutputSink};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::proximity_report::ProximityReport;
use crate::shared::frame::Frame;
use crate::video::infrastructure::image_decoder::decode_image;

/// Outcome of one single-shot request.
#[derive(Debug)]
pub struct DetectionOutcome {
    pub report: ProximityReport,
    /// Present only when the frame was processed successfully.
    pub annotated: Option<Frame>,
}

/// Single-image pipeline: decode → detect → measure → alert → annotate.
///
/// Failures never escape as `Err`: they are folded into the report's
/// `error` field so request/response callers always get a structured
/// answer.
pub struct DetectImageUseCase {
    processor: FrameProcessor,
}

impl DetectImageUseCase {
    pub fn new(processor: FrameProcessor) -> Self {
        Self { processor }
    }

    /// Runs the pipeline on an encoded image (PNG, JPEG, ...).
    pub fn execute(&mut self, image_bytes: &[u8]) -> DetectionOutcome {
        let mut sink = ReportSink::new();
        match decode_image(image_bytes, 0) {
            Ok(frame) => self.run(&frame, &mut sink),
            Err(e) => {
                let err = PipelineError::Decode(e.to_string());
                log::warn!("{err}");
                deliver(sink.emit_error(0, &err));
            }
        }
        outcome(sink)
    }

    /// Runs the pipeline on an already-decoded frame.
    pub fn execute_frame(&mut self, frame: &Frame) -> DetectionOutcome {
        let mut sink = ReportSink::new();
        self.run(frame, &mut sink);
        outcome(sink)
    }

    fn run(&mut self, frame: &Frame, sink: &mut dyn OutputSink) {
        match self.processor.process(frame) {
            Ok(processed) => deliver(sink.emit_frame(AnnotatedFrame {
                frame: processed.annotated,
                readings: processed.readings,
            })),
            Err(e) => {
                log::warn!("Single-shot detection failed: {e}");
                deliver(sink.emit_error(frame.index(), &e));
            }
        }
    }
}

fn deliver(result: Result<(), PipelineError>) {
    if let Err(e) = result {
        log::warn!("Failed to record result: {e}");
    }
}

fn outcome(sink: ReportSink) -> DetectionOutcome {
    let (report, annotated) = sink.into_parts();
    DetectionOutcome { report, annotated }
}
