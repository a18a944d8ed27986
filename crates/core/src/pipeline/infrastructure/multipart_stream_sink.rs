use std::io::Write;

use serde_json::json;

use crate::pipeline::output_sink::{AnnotatedFrame, OutputSink};
use crate::pipeline::pipeline_error::PipelineError;
use crate::shared::constants::STREAM_BOUNDARY;
use crate::video::domain::frame_encoder::FrameEncoder;

/// `Content-Type` header value for the stream this sink writes.
pub fn stream_content_type() -> String {
    format!("multipart/x-mixed-replace; boundary={STREAM_BOUNDARY}")
}

/// Writes one multipart part per frame:
///
/// ```text
/// --frame\r\n
/// Content-Type: image/jpeg\r\n
/// Content-Length: N\r\n
/// \r\n
/// <N bytes>\r\n
/// ```
///
/// Failed frames are skipped silently unless error parts are enabled, in
/// which case a JSON part describing the failure is written instead. Any
/// write failure means the consumer went away and is reported as
/// [`PipelineError::SinkClosed`].
pub struct MultipartStreamSink<W: Write + Send> {
    out: W,
    encoder: Box<dyn FrameEncoder>,
    error_parts: bool,
}

impl<W: Write + Send> MultipartStreamSink<W> {
    pub fn new(out: W, encoder: Box<dyn FrameEncoder>) -> Self {
        Self {
            out,
            encoder,
            error_parts: false,
        }
    }

    pub fn with_error_parts(mut self, enabled: bool) -> Self {
        self.error_parts = enabled;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_part(&mut self, content_type: &str, body: &[u8]) -> Result<(), PipelineError> {
        let header = format!(
            "--{STREAM_BOUNDARY}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );
        write_framed(&mut self.out, header.as_bytes(), body).map_err(|e| {
            log::debug!("Stream write failed: {e}");
            PipelineError::SinkClosed
        })
    }
}

fn write_framed(out: &mut impl Write, header: &[u8], body: &[u8]) -> std::io::Result<()> {
    out.write_all(header)?;
    out.write_all(body)?;
    out.write_all(b"\r\n")?;
    out.flush()
}

impl<W: Write + Send> OutputSink for MultipartStreamSink<W> {
    fn emit_frame(&mut self, frame: AnnotatedFrame) -> Result<(), PipelineError> {
        let index = frame.frame.index();
        let bytes = self
            .encoder
            .encode(&frame.frame)
            .map_err(|e| PipelineError::Encode {
                frame_index: index,
                message: e.to_string(),
            })?;
        let content_type = self.encoder.content_type();
        self.write_part(content_type, &bytes)
    }

    fn emit_error(&mut self, frame_index: usize, error: &PipelineError) -> Result<(), PipelineError> {
        if !self.error_parts {
            return Ok(());
        }
        let body = json!({
            "frame": frame_index,
            "kind": error.kind(),
            "error": error.to_string(),
        })
        .to_string();
        self.write_part("application/json", body.as_bytes())
    }
}
