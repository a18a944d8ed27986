pub mod multipart_stream_sink;
pub mod report_sink;
