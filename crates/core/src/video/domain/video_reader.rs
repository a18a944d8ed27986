use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

pub type FrameResult = Result<Frame, Box<dyn std::error::Error>>;

/// Reads frames from a video file, camera device, or network stream.
///
/// Implementations handle I/O details (codec, container, transport) while
/// the pipeline works with the abstract `Frame` and `VideoMetadata` types.
pub trait VideoReader: Send {
    /// Opens a source locator (file path, device path, or URL) and returns
    /// its metadata.
    fn open(&mut self, source: &str) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order. The iterator ends
    /// when the source is exhausted; a read failure is yielded as `Err`.
    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
