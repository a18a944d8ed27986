use std::sync::Arc;

use nearsight_core::alerting::domain::alert_gate::AlertGate;
use nearsight_core::alerting::domain::announcer::Announcer;
use nearsight_core::annotation::infrastructure::overlay_annotator::OverlayAnnotator;
use nearsight_core::detection::infrastructure::shared_detector::SharedDetector;
use nearsight_core::pipeline::frame_processor::FrameProcessor;
use nearsight_core::shared::proximity_config::ProximityConfig;

/// Process-wide collaborators. Every request and stream shares the same
/// detector, alert gate and announcer, so the cooldown holds across
/// clients.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProximityConfig>,
    pub detector: SharedDetector,
    pub gate: Arc<AlertGate>,
    pub announcer: Arc<dyn Announcer>,
    pub annotator: Arc<OverlayAnnotator>,
    /// Locator opened by `/detect` and `/video_feed`.
    pub source: Arc<str>,
    pub jpeg_quality: u8,
}

impl AppState {
    /// A processor for one request or stream, wired to the shared parts.
    pub fn processor(&self) -> FrameProcessor {
        FrameProcessor::from_config(
            &self.config,
            Box::new(self.detector.clone()),
            self.gate.clone(),
            self.announcer.clone(),
            Box::new(self.annotator.clone()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nearsight_core::alerting::domain::announcer::SilentAnnouncer;
    use nearsight_core::detection::domain::detection::{BoundingBox, Detection};
    use nearsight_core::detection::domain::object_detector::ObjectDetector;
    use nearsight_core::shared::frame::Frame;
    use std::time::{Duration, Instant};

    struct OneChair;

    impl ObjectDetector for OneChair {
        fn detect(
            &mut self,
            _frame: &Frame,
            _min_confidence: f64,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok(vec![Detection::new(
                "chair",
                0.9,
                BoundingBox::new(0, 0, 70, 20).unwrap(),
            )])
        }
    }

    fn state() -> AppState {
        AppState {
            config: Arc::new(ProximityConfig::default()),
            detector: SharedDetector::new(Box::new(OneChair)),
            gate: Arc::new(AlertGate::new(Duration::from_secs(60))),
            announcer: Arc::new(SilentAnnouncer),
            annotator: Arc::new(OverlayAnnotator::new()),
            source: Arc::from("0"),
            jpeg_quality: 80,
        }
    }

    #[test]
    fn test_processors_share_one_alert_gate() {
        let state = state();
        let frame = Frame::new(vec![0u8; 80 * 40 * 3], 80, 40, 0);
        let now = Instant::now();
        let mut logger = nearsight_core::pipeline::pipeline_logger::NullPipelineLogger;

        let first = state
            .processor()
            .process_at(&frame, now, &mut logger)
            .unwrap();
        let second = state
            .processor()
            .process_at(&frame, now + Duration::from_secs(1), &mut logger)
            .unwrap();

        assert_eq!(first.alerts_emitted, 1);
        assert_eq!(second.alerts_emitted, 0);
        assert!(state.gate.last_emission().is_some());
    }
}
