use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::output_sink::{AnnotatedFrame, OutputSink};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::video::domain::video_reader::VideoReader;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Ready,
    Running,
    Stopped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub state: SessionState,
    pub frames_read: usize,
    pub frames_emitted: usize,
    pub frame_errors: usize,
    pub alerts_emitted: usize,
    pub failure: Option<String>,
}

impl SessionSummary {
    fn new() -> Self {
        Self {
            state: SessionState::Running,
            frames_read: 0,
            frames_emitted: 0,
            frame_errors: 0,
            alerts_emitted: 0,
            failure: None,
        }
    }
}

/// One run of the proximity loop over one opened source.
///
/// `Ready → Running → Stopped | Failed`. The session ends `Stopped` when
/// the source is exhausted, the sink closes, or `cancelled` is set; it ends
/// `Failed` only on a source read error. Detector, annotation and encoding
/// failures are reported per frame and the loop carries on.
pub struct ProximitySession {
    processor: FrameProcessor,
    logger: Box<dyn PipelineLogger>,
    cancelled: Arc<AtomicBool>,
    target_size: Option<(u32, u32)>,
    frame_interval: Option<Duration>,
    state: SessionState,
}

impl ProximitySession {
    pub fn new(
        processor: FrameProcessor,
        logger: Box<dyn PipelineLogger>,
        cancelled: Option<Arc<AtomicBool>>,
    ) -> Self {
        Self {
            processor,
            logger,
            cancelled: cancelled.unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
            target_size: None,
            frame_interval: None,
            state: SessionState::Ready,
        }
    }

    /// Resize every frame to `(width, height)` before detection.
    pub fn with_target_size(mut self, size: Option<(u32, u32)>) -> Self {
        self.target_size = size;
        self
    }

    /// Emit at most one frame per `interval`.
    pub fn with_frame_interval(mut self, interval: Option<Duration>) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Drives the loop until a terminal state. `reader` must already be
    /// opened; it is closed before returning. `total_frames` is only used
    /// for progress reporting (0 when unknown).
    pub fn run(
        &mut self,
        reader: &mut dyn VideoReader,
        total_frames: usize,
        sink: &mut dyn OutputSink,
    ) -> SessionSummary {
        let mut summary = SessionSummary::new();
        if self.state != SessionState::Ready {
            summary.state = SessionState::Failed;
            summary.failure = Some(PipelineError::Setup("session already ran".into()).to_string());
            return summary;
        }
        self.state = SessionState::Running;

        let mut next_slot = Instant::now();
        {
            let mut frames = reader.frames();
            loop {
                if self.cancelled.load(Ordering::Relaxed) {
                    self.logger.info("Session cancelled");
                    break;
                }
                let Some(next) = frames.next() else {
                    break;
                };
                let frame = match next {
                    Ok(frame) => frame,
                    Err(e) => {
                        let err = PipelineError::SourceRead(e.to_string());
                        log::error!("{err}");
                        summary.state = SessionState::Failed;
                        summary.failure = Some(err.to_string());
                        break;
                    }
                };
                summary.frames_read += 1;

                let frame = match self.target_size {
                    Some((w, h)) => frame.resized(w, h),
                    None => frame,
                };
                let frame_index = frame.index();

                // A frame counts as one error however many steps fail on it.
                let (outcome, counted) = match self.processor.process_at(
                    &frame,
                    Instant::now(),
                    self.logger.as_mut(),
                ) {
                    Ok(processed) => {
                        summary.alerts_emitted += processed.alerts_emitted;
                        let t0 = Instant::now();
                        let emitted = sink.emit_frame(AnnotatedFrame {
                            frame: processed.annotated,
                            readings: processed.readings,
                        });
                        self.logger
                            .timing("emit", t0.elapsed().as_secs_f64() * 1000.0);
                        if emitted.is_ok() {
                            summary.frames_emitted += 1;
                        }
                        (emitted, false)
                    }
                    Err(e) => {
                        log::warn!("Frame {frame_index} skipped: {e}");
                        summary.frame_errors += 1;
                        (sink.emit_error(frame_index, &e), true)
                    }
                };

                match outcome {
                    Ok(()) => {}
                    Err(PipelineError::SinkClosed) => {
                        self.logger.info("Output closed by consumer");
                        break;
                    }
                    Err(e) => {
                        log::warn!("Frame {frame_index} not delivered: {e}");
                        if !counted {
                            summary.frame_errors += 1;
                        }
                    }
                }

                self.logger.progress(summary.frames_read, total_frames);

                if let Some(interval) = self.frame_interval {
                    next_slot += interval;
                    let now = Instant::now();
                    if next_slot > now {
                        std::thread::sleep(next_slot - now);
                    } else {
                        next_slot = now;
                    }
                }
            }
        }
        reader.close();

        if summary.state != SessionState::Failed {
            summary.state = SessionState::Stopped;
        }
        self.state = summary.state;

        if let Err(e) = sink.finish(&summary) {
            log::warn!("Failed to finalise output: {e}");
        }
        self.logger.summary();
        summary
    }
}
