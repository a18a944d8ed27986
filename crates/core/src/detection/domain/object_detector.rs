use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for object detection.
///
/// Implementations may hold mutable inference state, hence `&mut self`.
/// Detections below `min_confidence` are dropped; the remaining order is the
/// order the pipeline processes and draws them in.
pub trait ObjectDetector: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
