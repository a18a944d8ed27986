use std::sync::{Arc, Mutex};

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::frame::Frame;

/// Lets several sessions share one loaded model.
///
/// Calls are serialised on a mutex, so concurrent sessions take turns on
/// the detector instead of each loading their own copy.
#[derive(Clone)]
pub struct SharedDetector {
    inner: Arc<Mutex<Box<dyn ObjectDetector>>>,
}

impl SharedDetector {
    pub fn new(inner: Box<dyn ObjectDetector>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }
}

impl ObjectDetector for SharedDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let mut detector = self
            .inner
            .lock()
            .map_err(|_| "shared detector poisoned by a panicking session")?;
        detector.detect(frame, min_confidence)
    }
}
