pub mod constants;
pub mod frame;
pub mod proximity_config;
pub mod video_metadata;
