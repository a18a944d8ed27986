use serde::{Deserialize, Serialize};

use crate::detection::domain::detection::BoundingBox;
use crate::pipeline::pipeline_error::PipelineError;
use crate::proximity::domain::proximity_reading::ProximityReading;
use crate::proximity::domain::safety_classifier::SafetyStatus;

/// One object in a single-shot result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub label: String,
    /// Rounded to two decimals.
    pub confidence: f64,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    pub distance_cm: i64,
    pub status: SafetyStatus,
}

fn round_confidence(confidence: f64) -> f64 {
    (confidence * 100.0).round() / 100.0
}

/// Structured single-shot result: the readings in detector order, or an
/// error explaining why there are none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProximityReport {
    pub detections: Vec<ReportEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProximityReport {
    pub fn from_readings(readings: &[ProximityReading]) -> Self {
        Self {
            detections: readings
                .iter()
                .map(|r| ReportEntry {
                    label: r.detection.label.clone(),
                    confidence: round_confidence(r.detection.confidence),
                    bbox: r.detection.bbox,
                    distance_cm: r.estimate.whole_cm(),
                    status: r.status,
                })
                .collect(),
            error: None,
        }
    }

    pub fn failed(error: &PipelineError) -> Self {
        Self {
            detections: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
