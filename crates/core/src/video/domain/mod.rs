pub mod frame_encoder;
pub mod image_writer;
pub mod video_reader;
