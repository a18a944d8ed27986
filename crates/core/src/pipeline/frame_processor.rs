use std::sync::Arc;
use std::time::Instant;

use crate::alerting::domain::alert_gate::AlertGate;
use crate::alerting::domain::announcer::Announcer;
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::detection::infrastructure::deadline_detector::DetectionTimeout;
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use crate::proximity::domain::distance_estimator::DistanceEstimator;
use crate::proximity::domain::proximity_reading::ProximityReading;
use crate::proximity::domain::safety_classifier::SafetyClassifier;
use crate::shared::frame::Frame;
use crate::shared::proximity_config::ProximityConfig;

/// Result of running one frame through detect → measure → alert → annotate.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub annotated: Frame,
    pub readings: Vec<ProximityReading>,
    pub alerts_emitted: usize,
}

/// The per-frame work shared by streaming sessions and single-shot requests.
pub struct FrameProcessor {
    detector: Box<dyn ObjectDetector>,
    estimator: DistanceEstimator,
    classifier: SafetyClassifier,
    gate: Arc<AlertGate>,
    announcer: Arc<dyn Announcer>,
    annotator: Box<dyn FrameAnnotator>,
    min_confidence: f64,
}

impl FrameProcessor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        estimator: DistanceEstimator,
        classifier: SafetyClassifier,
        gate: Arc<AlertGate>,
        announcer: Arc<dyn Announcer>,
        annotator: Box<dyn FrameAnnotator>,
        min_confidence: f64,
    ) -> Self {
        Self {
            detector,
            estimator,
            classifier,
            gate,
            announcer,
            annotator,
            min_confidence,
        }
    }

    /// Wires calibration, threshold and confidence floor from `config`.
    pub fn from_config(
        config: &ProximityConfig,
        detector: Box<dyn ObjectDetector>,
        gate: Arc<AlertGate>,
        announcer: Arc<dyn Announcer>,
        annotator: Box<dyn FrameAnnotator>,
    ) -> Self {
        Self::new(
            detector,
            DistanceEstimator::new(config.known_width_cm, config.focal_length_px),
            SafetyClassifier::new(config.safe_distance_cm),
            gate,
            announcer,
            annotator,
            config.min_confidence,
        )
    }

    /// Estimates and classifies each detection, preserving detector order.
    pub fn measure(&self, detections: Vec<Detection>) -> Vec<ProximityReading> {
        detections
            .into_iter()
            .map(|detection| {
                let estimate = self.estimator.estimate(detection.bbox.width());
                let status = self.classifier.classify(estimate.distance_cm);
                ProximityReading {
                    detection,
                    estimate,
                    status,
                }
            })
            .collect()
    }

    pub fn process(&mut self, frame: &Frame) -> Result<ProcessedFrame, PipelineError> {
        self.process_at(frame, Instant::now(), &mut NullPipelineLogger)
    }

    /// Processes `frame` using `now` as the alert timestamp for every
    /// detection in it.
    pub fn process_at(
        &mut self,
        frame: &Frame,
        now: Instant,
        logger: &mut dyn PipelineLogger,
    ) -> Result<ProcessedFrame, PipelineError> {
        let t0 = Instant::now();
        let detections = self
            .detector
            .detect(frame, self.min_confidence)
            .map_err(|e| detector_error(frame.index(), e))?;
        logger.timing("detect", t0.elapsed().as_secs_f64() * 1000.0);

        let readings = self.measure(detections);
        let alerts_emitted = readings
            .iter()
            .filter(|r| {
                self.gate
                    .try_emit(now, &r.announcement(), self.announcer.as_ref())
            })
            .count();

        let t1 = Instant::now();
        let annotated = self
            .annotator
            .annotate(frame, &readings)
            .map_err(|e| PipelineError::Annotate {
                frame_index: frame.index(),
                message: e.to_string(),
            })?;
        logger.timing("annotate", t1.elapsed().as_secs_f64() * 1000.0);
        logger.metric("detections", readings.len() as f64);
        logger.metric("alerts", alerts_emitted as f64);

        Ok(ProcessedFrame {
            annotated,
            readings,
            alerts_emitted,
        })
    }
}

fn detector_error(frame_index: usize, err: Box<dyn std::error::Error>) -> PipelineError {
    match err.downcast_ref::<DetectionTimeout>() {
        Some(timeout) => PipelineError::DetectorTimeout {
            frame_index: timeout.frame_index,
            deadline_ms: timeout.deadline.as_millis(),
        },
        None => PipelineError::Detector {
            frame_index,
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::domain::announcer::AnnounceError;
    use crate::detection::domain::detection::BoundingBox;
    use crate::proximity::domain::safety_classifier::SafetyStatus;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FixedDetector {
        detections: Vec<Detection>,
    }

    impl ObjectDetector for FixedDetector {
        fn detect(
            &mut self,
            _frame: &Frame,
            _min_confidence: f64,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok(self.detections.clone())
        }
    }

    struct TimingOutDetector;

    impl ObjectDetector for TimingOutDetector {
        fn detect(
            &mut self,
            frame: &Frame,
            _min_confidence: f64,
        ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Err(Box::new(DetectionTimeout {
                frame_index: frame.index(),
                deadline: Duration::from_millis(100),
            }))
        }
    }

    #[derive(Default)]
    struct RecordingAnnouncer {
        messages: Mutex<Vec<String>>,
    }

    impl Announcer for RecordingAnnouncer {
        fn announce(&self, message: &str) -> Result<(), AnnounceError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct CopyAnnotator;

    impl FrameAnnotator for CopyAnnotator {
        fn annotate(
            &self,
            frame: &Frame,
            _readings: &[ProximityReading],
        ) -> Result<Frame, Box<dyn std::error::Error>> {
            Ok(frame.clone())
        }
    }

    fn detection(label: &str, width: i32) -> Detection {
        Detection::new(label, 0.9, BoundingBox::new(0, 0, width, 40).unwrap())
    }

    fn processor(
        detector: Box<dyn ObjectDetector>,
        announcer: Arc<RecordingAnnouncer>,
    ) -> FrameProcessor {
        FrameProcessor::from_config(
            &ProximityConfig::default(),
            detector,
            Arc::new(AlertGate::new(Duration::from_secs(2))),
            announcer,
            Box::new(CopyAnnotator),
        )
    }

    fn frame(index: usize) -> Frame {
        Frame::new(vec![0u8; 8 * 8 * 3], 8, 8, index)
    }

    #[test]
    fn test_readings_follow_detector_order() {
        let detector = FixedDetector {
            detections: vec![
                detection("cup", 70),
                detection("chair", 50),
                detection("bottle", 100),
            ],
        };
        let announcer = Arc::new(RecordingAnnouncer::default());
        let mut processor = processor(Box::new(detector), announcer);

        let out = processor.process(&frame(0)).unwrap();

        let summary: Vec<_> = out
            .readings
            .iter()
            .map(|r| (r.detection.label.as_str(), r.estimate.whole_cm(), r.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("cup", 100, SafetyStatus::Safe),
                ("chair", 140, SafetyStatus::Safe),
                ("bottle", 70, SafetyStatus::NotSafe),
            ]
        );
    }

    #[test]
    fn test_only_first_detection_in_frame_alerts() {
        let detector = FixedDetector {
            detections: vec![detection("bottle", 100), detection("chair", 50)],
        };
        let announcer = Arc::new(RecordingAnnouncer::default());
        let mut processor = processor(Box::new(detector), announcer.clone());

        let out = processor.process(&frame(0)).unwrap();

        assert_eq!(out.alerts_emitted, 1);
        assert_eq!(
            *announcer.messages.lock().unwrap(),
            vec!["Warning! bottle too close."]
        );
    }

    #[test]
    fn test_safe_announcement_consumes_cooldown() {
        let detector = FixedDetector {
            detections: vec![detection("chair", 50)],
        };
        let announcer = Arc::new(RecordingAnnouncer::default());
        let mut processor = processor(Box::new(detector), announcer.clone());
        let t0 = Instant::now();

        let first = processor
            .process_at(&frame(0), t0, &mut NullPipelineLogger)
            .unwrap();
        let second = processor
            .process_at(&frame(1), t0 + Duration::from_secs(1), &mut NullPipelineLogger)
            .unwrap();

        assert_eq!(first.alerts_emitted, 1);
        assert_eq!(second.alerts_emitted, 0);
        assert_eq!(
            *announcer.messages.lock().unwrap(),
            vec!["chair at safe distance."]
        );
    }

    #[test]
    fn test_timeout_maps_to_timeout_error() {
        let announcer = Arc::new(RecordingAnnouncer::default());
        let mut processor = processor(Box::new(TimingOutDetector), announcer);

        let err = processor.process(&frame(3)).unwrap_err();
        assert_eq!(
            err,
            PipelineError::DetectorTimeout {
                frame_index: 3,
                deadline_ms: 100
            }
        );
    }

    #[test]
    fn test_no_detections_passes_frame_through() {
        let announcer = Arc::new(RecordingAnnouncer::default());
        let mut processor = processor(
            Box::new(FixedDetector {
                detections: Vec::new(),
            }),
            announcer.clone(),
        );
        let input = frame(2);

        let out = processor.process(&input).unwrap();

        assert_eq!(out.annotated, input);
        assert!(out.readings.is_empty());
        assert!(announcer.messages.lock().unwrap().is_empty());
    }
}
