use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameResult, VideoReader};

type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Decodes on a background thread so frame acquisition overlaps with
/// detection.
///
/// At most `capacity` decoded frames wait in the channel; the decode thread
/// blocks once it is full. Setting `cancelled` (or calling `close`) makes
/// the thread stop at the next frame boundary.
pub struct PrefetchingReader {
    inner: Option<Box<dyn VideoReader>>,
    capacity: usize,
    cancelled: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<Box<dyn VideoReader>>>,
}

impl PrefetchingReader {
    pub fn new(inner: Box<dyn VideoReader>, capacity: usize, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            inner: Some(inner),
            capacity: capacity.max(1),
            cancelled,
            stop: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    fn join(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(reader) => self.inner = Some(reader),
                Err(_) => log::warn!("Frame reader thread panicked"),
            }
        }
    }
}

fn spawn_reader(
    mut reader: Box<dyn VideoReader>,
    frame_tx: crossbeam_channel::Sender<Result<Frame, SendError>>,
    cancelled: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Box<dyn VideoReader>> {
    std::thread::spawn(move || {
        for frame_result in reader.frames() {
            if cancelled.load(Ordering::Relaxed) || stop.load(Ordering::Relaxed) {
                break;
            }
            let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
            let failed = mapped.is_err();
            if frame_tx.send(mapped).is_err() || failed {
                break;
            }
        }
        reader.close();
        reader
    })
}

impl VideoReader for PrefetchingReader {
    fn open(&mut self, source: &str) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        self.join();
        self.stop.store(false, Ordering::Relaxed);
        let inner = self
            .inner
            .as_mut()
            .ok_or("PrefetchingReader: inner reader lost")?;
        inner.open(source)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        let Some(reader) = self.inner.take() else {
            return Box::new(std::iter::once(Err(
                "PrefetchingReader: frames already consumed".into(),
            )));
        };
        let (frame_tx, frame_rx) = crossbeam_channel::bounded(self.capacity);
        self.handle = Some(spawn_reader(
            reader,
            frame_tx,
            self.cancelled.clone(),
            self.stop.clone(),
        ));
        Box::new(
            frame_rx
                .into_iter()
                .map(|r| r.map_err(|e| -> Box<dyn std::error::Error> { e })),
        )
    }

    fn close(&mut self) {
        self.join();
        if let Some(inner) = self.inner.as_mut() {
            inner.close();
        }
    }
}

impl Drop for PrefetchingReader {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ScriptedReader {
        frames: usize,
        fail_at: Option<usize>,
        closed: Arc<AtomicBool>,
    }

    impl VideoReader for ScriptedReader {
        fn open(&mut self, source: &str) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 2,
                height: 2,
                fps: 30.0,
                total_frames: self.frames,
                codec: "raw".into(),
                source: Some(source.to_string()),
            })
        }

        fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
            let fail_at = self.fail_at;
            Box::new((0..self.frames).map(move |i| -> FrameResult {
                if Some(i) == fail_at {
                    Err("device unplugged".into())
                } else {
                    Ok(Frame::new(vec![i as u8; 12], 2, 2, i))
                }
            }))
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::Relaxed);
        }
    }

    fn scripted(frames: usize, fail_at: Option<usize>) -> (ScriptedReader, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        (
            ScriptedReader {
                frames,
                fail_at,
                closed: closed.clone(),
            },
            closed,
        )
    }

    #[test]
    fn test_yields_all_frames_in_order() {
        let (inner, closed) = scripted(5, None);
        let mut reader =
            PrefetchingReader::new(Box::new(inner), 2, Arc::new(AtomicBool::new(false)));
        reader.open("scripted").unwrap();

        let indices: Vec<usize> = reader.frames().map(|f| f.unwrap().index()).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);

        reader.close();
        assert!(closed.load(Ordering::Relaxed));
    }

    #[test]
    fn test_error_ends_stream() {
        let (inner, _) = scripted(5, Some(2));
        let mut reader =
            PrefetchingReader::new(Box::new(inner), 2, Arc::new(AtomicBool::new(false)));
        reader.open("scripted").unwrap();

        let results: Vec<_> = reader.frames().collect();
        assert_eq!(results.len(), 3);
        assert!(results[2]
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("device unplugged"));
    }

    #[test]
    fn test_cancelled_before_start_yields_nothing() {
        let (inner, _) = scripted(100, None);
        let cancelled = Arc::new(AtomicBool::new(true));
        let mut reader = PrefetchingReader::new(Box::new(inner), 2, cancelled);
        reader.open("scripted").unwrap();
        assert_eq!(reader.frames().count(), 0);
    }

    #[test]
    fn test_close_after_partial_read_does_not_hang() {
        let (inner, closed) = scripted(1000, None);
        let mut reader =
            PrefetchingReader::new(Box::new(inner), 1, Arc::new(AtomicBool::new(false)));
        reader.open("scripted").unwrap();
        {
            let mut frames = reader.frames();
            assert!(frames.next().is_some());
        }
        reader.close();
        assert!(closed.load(Ordering::Relaxed));
    }
}
