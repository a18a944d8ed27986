/// Describes an opened frame source.
///
/// Images are represented as a single-frame source with `fps = 0`.
/// Live sources (cameras, network streams) report `total_frames = 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source: Option<String>,
}

impl VideoMetadata {
    /// True when the source does not advertise a frame count.
    pub fn is_unbounded(&self) -> bool {
        self.total_frames == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(fps: f64, total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 640,
            height: 480,
            fps,
            total_frames,
            codec: "h264".to_string(),
            source: Some("/tmp/walk.mp4".to_string()),
        }
    }

    #[test]
    fn test_construction() {
        let m = meta(30.0, 900);
        assert_eq!(m.width, 640);
        assert_eq!(m.height, 480);
        assert_eq!(m.total_frames, 900);
        assert_eq!(m.source.as_deref(), Some("/tmp/walk.mp4"));
        assert!(!m.is_unbounded());
    }

    #[test]
    fn test_live_source_is_unbounded() {
        assert!(meta(30.0, 0).is_unbounded());
    }

    #[test]
    fn test_image_metadata() {
        let m = meta(0.0, 1);
        assert_eq!(m.total_frames, 1);
        assert_eq!(m.fps, 0.0);
    }
}
