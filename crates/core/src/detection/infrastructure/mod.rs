pub mod deadline_detector;
pub mod detector_factory;
pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_yolo_detector;
pub mod shared_detector;
