use serde::Serialize;

use crate::detection::domain::detection::Detection;
use crate::proximity::domain::distance_estimator::DistanceEstimate;
use crate::proximity::domain::safety_classifier::SafetyStatus;

/// A detection together with its distance and safety verdict.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProximityReading {
    pub detection: Detection,
    pub estimate: DistanceEstimate,
    pub status: SafetyStatus,
}

impl ProximityReading {
    /// Overlay text, e.g. `"chair: 70 cm (NOT SAFE)"`.
    pub fn caption(&self) -> String {
        format!(
            "{}: {} cm ({})",
            self.detection.label,
            self.estimate.whole_cm(),
            self.status
        )
    }

    pub fn announcement(&self) -> String {
        self.status.announcement(&self.detection.label)
    }
}
