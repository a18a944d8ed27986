use ffmpeg_next as ff;
use ff::software::scaling;
use ff::util::frame::video::Video as RawFrame;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::{FrameResult, VideoReader};

/// Frame source backed by ffmpeg: video files, V4L2 cameras and network
/// streams (RTSP, HTTP).
///
/// Every decoded picture is converted to packed RGB24. A bare number as the
/// source (`"0"`) selects the matching `/dev/videoN` camera.
pub struct FfmpegReader {
    opened: Option<OpenedSource>,
}

struct OpenedSource {
    input: ff::format::context::Input,
    stream_index: usize,
    decoder: ff::decoder::Video,
    to_rgb: scaling::Context,
    width: u32,
    height: u32,
}

// Safety: the ffmpeg contexts are owned exclusively by this reader and
// only touched by whichever thread currently owns it.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { opened: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a camera index to its device node; other locators pass through.
pub fn resolve_locator(source: &str) -> String {
    if !source.is_empty() && source.bytes().all(|b| b.is_ascii_digit()) {
        format!("/dev/video{source}")
    } else {
        source.to_string()
    }
}

fn frames_per_second(rate: ff::Rational) -> f64 {
    if rate.denominator() == 0 {
        0.0
    } else {
        f64::from(rate.numerator()) / f64::from(rate.denominator())
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, source: &str) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ff::init()?;
        ff::device::register_all();

        let locator = resolve_locator(source);
        let input = ff::format::input(&locator)
            .map_err(|e| format!("cannot open source '{locator}': {e}"))?;

        let (stream_index, fps, total_frames, decoder) = {
            let stream = input
                .streams()
                .best(ff::media::Type::Video)
                .ok_or_else(|| format!("'{locator}' has no video stream"))?;
            let decoder = ff::codec::context::Context::from_parameters(stream.parameters())?
                .decoder()
                .video()?;
            (
                stream.index(),
                frames_per_second(stream.rate()),
                usize::try_from(stream.frames()).unwrap_or(0),
                decoder,
            )
        };

        let (width, height) = (decoder.width(), decoder.height());
        let to_rgb = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ff::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source: Some(locator),
        };
        log::debug!(
            "Opened {:?} ({}, {}x{}, {:.2} fps, {} frames)",
            metadata.source,
            metadata.codec,
            width,
            height,
            fps,
            total_frames
        );

        self.opened = Some(OpenedSource {
            input,
            stream_index,
            decoder,
            to_rgb,
            width,
            height,
        });
        Ok(metadata)
    }

    fn frames(&mut self) -> Box<dyn Iterator<Item = FrameResult> + '_> {
        match self.opened.as_mut() {
            Some(source) => Box::new(DecodedFrames {
                source,
                next_index: 0,
                phase: Phase::Reading,
            }),
            None => Box::new(std::iter::once(Err("FfmpegReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.opened = None;
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Phase {
    Reading,
    Draining,
    Done,
}

/// Pulls packets lazily, one decoded frame per `next()`, so live sources
/// never buffer more than the decoder itself does.
struct DecodedFrames<'a> {
    source: &'a mut OpenedSource,
    next_index: usize,
    phase: Phase,
}

impl DecodedFrames<'_> {
    fn receive(&mut self) -> Option<FrameResult> {
        let mut decoded = RawFrame::empty();
        self.source.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = RawFrame::empty();
        if let Err(e) = self.source.to_rgb.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }
        let (width, height) = (self.source.width, self.source.height);
        let frame = Frame::new(packed_rgb(&rgb, width, height), width, height, self.next_index);
        self.next_index += 1;
        Some(Ok(frame))
    }

    /// Feeds the next packet of our stream to the decoder. `Ok(false)` at
    /// end of input.
    fn feed(&mut self) -> Result<bool, ff::Error> {
        let source = &mut *self.source;
        loop {
            let mut packet = ff::Packet::empty();
            match classify_read(packet.read(&mut source.input)) {
                PacketRead::Ready => {}
                PacketRead::Retry => continue,
                PacketRead::End => return Ok(false),
                PacketRead::Failed(e) => return Err(e),
            }
            if packet.stream() != source.stream_index {
                continue;
            }
            // Corrupt packets are dropped; the next keyframe resynchronises.
            if source.decoder.send_packet(&packet).is_ok() {
                return Ok(true);
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum PacketRead {
    Ready,
    Retry,
    End,
    Failed(ff::Error),
}

/// Only end-of-file ends the stream cleanly. Any other demuxer error
/// (dropped connection, unplugged camera) is a failure.
fn classify_read(result: Result<(), ff::Error>) -> PacketRead {
    match result {
        Ok(()) => PacketRead::Ready,
        Err(ff::Error::Eof) => PacketRead::End,
        Err(ff::Error::Other { errno }) if errno == ff::error::EAGAIN => PacketRead::Retry,
        Err(e) => PacketRead::Failed(e),
    }
}

impl Iterator for DecodedFrames<'_> {
    type Item = FrameResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.phase {
                Phase::Done => return None,
                Phase::Draining => {
                    let frame = self.receive();
                    if frame.is_none() {
                        self.phase = Phase::Done;
                    }
                    return frame;
                }
                Phase::Reading => {
                    if let Some(frame) = self.receive() {
                        return Some(frame);
                    }
                    match self.feed() {
                        Ok(true) => {}
                        Ok(false) => {
                            let _ = self.source.decoder.send_eof();
                            self.phase = Phase::Draining;
                        }
                        Err(e) => {
                            self.phase = Phase::Done;
                            return Some(Err(format!("demuxing failed: {e}").into()));
                        }
                    }
                }
            }
        }
    }
}

/// Drops per-row stride padding from an RGB24 picture.
fn packed_rgb(picture: &RawFrame, width: u32, height: u32) -> Vec<u8> {
    let row_bytes = width as usize * 3;
    picture
        .data(0)
        .chunks(picture.stride(0))
        .take(height as usize)
        .flat_map(|row| row[..row_bytes].iter().copied())
        .collect()
}
