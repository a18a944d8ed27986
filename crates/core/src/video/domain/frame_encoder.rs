use crate::shared::frame::Frame;

/// Compresses a frame into a transferable byte payload.
pub trait FrameEncoder: Send {
    /// MIME type of the encoded payload, e.g. `image/jpeg`.
    fn content_type(&self) -> &'static str;

    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, Box<dyn std::error::Error>>;
}
