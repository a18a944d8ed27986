pub mod detect_image_use_case;
pub mod frame_processor;
pub mod infrastructure;
pub mod output_sink;
pub mod pipeline_error;
pub mod pipeline_logger;
pub mod proximity_report;
pub mod proximity_session;
