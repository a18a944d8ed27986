use std::sync::Arc;

use crate::proximity::domain::proximity_reading::ProximityReading;
use crate::shared::frame::Frame;

/// Renders proximity readings onto a frame.
///
/// Implementations return a new frame and leave `frame` untouched, so the
/// caller can still hand the raw frame to other consumers.
pub trait FrameAnnotator: Send + Sync {
    fn annotate(
        &self,
        frame: &Frame,
        readings: &[ProximityReading],
    ) -> Result<Frame, Box<dyn std::error::Error>>;
}

impl<T: FrameAnnotator + ?Sized> FrameAnnotator for Arc<T> {
    fn annotate(
        &self,
        frame: &Frame,
        readings: &[ProximityReading],
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        (**self).annotate(frame, readings)
    }
}
