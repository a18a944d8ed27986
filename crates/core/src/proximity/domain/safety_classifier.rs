use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyStatus {
    Safe,
    NotSafe,
}

impl SafetyStatus {
    /// Spoken alert for an object in this state.
    pub fn announcement(&self, label: &str) -> String {
        match self {
            SafetyStatus::NotSafe => format!("Warning! {label} too close."),
            SafetyStatus::Safe => format!("{label} at safe distance."),
        }
    }
}

impl fmt::Display for SafetyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyStatus::Safe => write!(f, "SAFE"),
            SafetyStatus::NotSafe => write!(f, "NOT SAFE"),
        }
    }
}

/// Compares a distance against the safe-distance threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SafetyClassifier {
    threshold_cm: f64,
}

impl SafetyClassifier {
    pub fn new(threshold_cm: f64) -> Self {
        Self { threshold_cm }
    }

    pub fn threshold_cm(&self) -> f64 {
        self.threshold_cm
    }

    /// Strictly closer than the threshold is not safe; the threshold itself is safe.
    pub fn classify(&self, distance_cm: f64) -> SafetyStatus {
        classify(distance_cm, self.threshold_cm)
    }
}

pub fn classify(distance_cm: f64, threshold_cm: f64) -> SafetyStatus {
    if distance_cm < threshold_cm {
        SafetyStatus::NotSafe
    } else {
        SafetyStatus::Safe
    }
}
