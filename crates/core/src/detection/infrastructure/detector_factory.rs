use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::constants::YOLO_MODEL_NAME;
use crate::shared::proximity_config::ProximityConfig;

use super::deadline_detector::DeadlineDetector;
use super::model_resolver::{self, ProgressFn};
use super::onnx_yolo_detector::OnnxYoloDetector;

/// Resolves the model and builds the detector described by `config`,
/// bounded by the per-frame deadline when one is configured.
pub fn create_detector(
    config: &ProximityConfig,
    progress: Option<ProgressFn>,
) -> Result<Box<dyn ObjectDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        config.model_path.as_deref(),
        YOLO_MODEL_NAME,
        config.model_url.as_deref(),
        progress,
    )?;
    log::info!("Loading detector from {}", model_path.display());
    let base: Box<dyn ObjectDetector> = Box::new(OnnxYoloDetector::new(&model_path)?);

    match config.detect_timeout() {
        Some(deadline) => {
            log::info!("Detection deadline: {} ms", deadline.as_millis());
            Ok(Box::new(DeadlineDetector::new(base, deadline)))
        }
        None => Ok(base),
    }
}
