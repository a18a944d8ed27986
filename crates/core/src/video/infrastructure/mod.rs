pub mod ffmpeg_reader;
pub mod image_decoder;
pub mod image_file_writer;
pub mod jpeg_encoder;
pub mod prefetching_reader;
