pub mod distance_estimator;
pub mod proximity_reading;
pub mod safety_classifier;
