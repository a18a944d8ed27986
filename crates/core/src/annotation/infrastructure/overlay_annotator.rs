use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::detection::domain::detection::BoundingBox;
use crate::proximity::domain::proximity_reading::ProximityReading;
use crate::proximity::domain::safety_classifier::SafetyStatus;
use crate::shared::frame::Frame;

const BOX_THICKNESS: u32 = 2;
const LABEL_SCALE: f32 = 18.0;
const LABEL_PADDING: u32 = 2;

/// DejaVu Sans, used for captions unless another font is configured.
const BUNDLED_FONT: &[u8] = include_bytes!("../../../assets/DejaVuSans.ttf");

pub fn status_color(status: SafetyStatus) -> Rgb<u8> {
    match status {
        SafetyStatus::Safe => Rgb([0, 255, 0]),
        SafetyStatus::NotSafe => Rgb([255, 0, 0]),
    }
}

fn bundled_font() -> Option<FontArc> {
    match FontArc::try_from_slice(BUNDLED_FONT) {
        Ok(font) => Some(font),
        Err(e) => {
            log::warn!("Bundled caption font is unusable ({e}); drawing boxes only");
            None
        }
    }
}

/// Draws a colored rectangle per reading with a caption such as
/// `chair: 70 cm (NOT SAFE)` above it.
#[derive(Clone)]
pub struct OverlayAnnotator {
    font: Option<FontArc>,
    scale: PxScale,
}

impl OverlayAnnotator {
    /// Captions in the bundled font.
    pub fn new() -> Self {
        Self {
            font: bundled_font(),
            scale: PxScale::from(LABEL_SCALE),
        }
    }

    /// Rectangles without captions.
    pub fn boxes_only() -> Self {
        Self {
            font: None,
            scale: PxScale::from(LABEL_SCALE),
        }
    }

    pub fn with_font(font: FontArc) -> Self {
        Self {
            font: Some(font),
            scale: PxScale::from(LABEL_SCALE),
        }
    }

    /// Loads a TrueType/OpenType font for captions.
    pub fn from_font_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("cannot read font {}: {e}", path.display()))?;
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| format!("invalid font {}: {e}", path.display()))?;
        Ok(Self::with_font(font))
    }

    /// `font_path` overrides the bundled font.
    pub fn from_optional_font(
        font_path: Option<&Path>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        match font_path {
            Some(path) => {
                log::info!("Caption font: {}", path.display());
                Self::from_font_file(path)
            }
            None => Ok(Self::new()),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_caption(&self, img: &mut RgbImage, bbox: &BoundingBox, text: &str, color: Rgb<u8>) {
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let (text_w, text_h) = text_size(self.scale, font, text);
        if text_w == 0 || text_h == 0 {
            return;
        }
        let plate_w = text_w + 2 * LABEL_PADDING;
        let plate_h = text_h + 2 * LABEL_PADDING;

        // Above the box when there is room, otherwise just inside its top edge.
        let y = if bbox.ymin >= plate_h as i32 {
            bbox.ymin - plate_h as i32
        } else {
            bbox.ymin.max(0)
        };
        let x = bbox.xmin.max(0);

        draw_filled_rect_mut(img, Rect::at(x, y).of_size(plate_w, plate_h), color);
        draw_text_mut(
            img,
            Rgb([0, 0, 0]),
            x + LABEL_PADDING as i32,
            y + LABEL_PADDING as i32,
            self.scale,
            font,
            text,
        );
    }
}

impl Default for OverlayAnnotator {
    fn default() -> Self {
        Self::new()
    }
}

/// Strokes `thickness` nested one-pixel outlines inward from the box edge.
fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    for t in 0..thickness {
        let inset = 2 * t;
        if bbox.width() <= inset || bbox.height() <= inset {
            break;
        }
        let rect = Rect::at(bbox.xmin + t as i32, bbox.ymin + t as i32)
            .of_size(bbox.width() - inset, bbox.height() - inset);
        draw_hollow_rect_mut(img, rect, color);
    }
}

impl FrameAnnotator for OverlayAnnotator {
    fn annotate(
        &self,
        frame: &Frame,
        readings: &[ProximityReading],
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        if readings.is_empty() {
            return Ok(frame.clone());
        }
        let mut img = frame
            .to_rgb_image()
            .ok_or("frame buffer does not match its dimensions")?;

        for reading in readings {
            let color = status_color(reading.status);
            let bbox = &reading.detection.bbox;
            draw_box(&mut img, bbox, color, BOX_THICKNESS);
            self.draw_caption(&mut img, bbox, &reading.caption(), color);
        }

        Ok(Frame::from_rgb_image(img, frame.index()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::Detection;
    use crate::proximity::domain::distance_estimator::DistanceEstimate;
    use std::io::Write;

    fn black_frame(width: u32, height: u32) -> Frame {
        Frame::new(vec![0u8; (width * height * 3) as usize], width, height, 7)
    }

    fn reading(bbox: BoundingBox, status: SafetyStatus) -> ProximityReading {
        ProximityReading {
            detection: Detection::new("chair", 0.9, bbox),
            estimate: DistanceEstimate {
                pixel_width: bbox.width(),
                distance_cm: 70.0,
            },
            status,
        }
    }

    fn pixel(frame: &Frame, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * frame.width() + x) * 3) as usize;
        [frame.data()[i], frame.data()[i + 1], frame.data()[i + 2]]
    }

    #[test]
    fn test_no_readings_returns_identical_frame() {
        let frame = black_frame(16, 16);
        let out = OverlayAnnotator::new().annotate(&frame, &[]).unwrap();
        assert_eq!(out, frame);
    }

    #[test]
    fn test_input_frame_is_not_mutated() {
        let frame = black_frame(50, 50);
        let before = frame.clone();
        let readings = [reading(
            BoundingBox::new(10, 10, 30, 30).unwrap(),
            SafetyStatus::NotSafe,
        )];
        let out = OverlayAnnotator::boxes_only().annotate(&frame, &readings).unwrap();
        assert_eq!(frame, before);
        assert_ne!(out, frame);
        assert_eq!(out.index(), 7);
    }

    #[test]
    fn test_box_color_follows_status() {
        let frame = black_frame(60, 60);
        let readings = [
            reading(
                BoundingBox::new(5, 5, 25, 25).unwrap(),
                SafetyStatus::NotSafe,
            ),
            reading(BoundingBox::new(30, 30, 55, 55).unwrap(), SafetyStatus::Safe),
        ];
        let out = OverlayAnnotator::boxes_only().annotate(&frame, &readings).unwrap();

        assert_eq!(pixel(&out, 5, 5), [255, 0, 0]);
        assert_eq!(pixel(&out, 6, 6), [255, 0, 0]);
        assert_eq!(pixel(&out, 15, 15), [0, 0, 0]);
        assert_eq!(pixel(&out, 30, 30), [0, 255, 0]);
        assert_eq!(pixel(&out, 31, 40), [0, 255, 0]);
        assert_eq!(pixel(&out, 42, 42), [0, 0, 0]);
    }

    #[test]
    fn test_box_touching_frame_edge_is_clipped() {
        let frame = black_frame(20, 20);
        let readings = [reading(
            BoundingBox::new(0, 0, 20, 20).unwrap(),
            SafetyStatus::Safe,
        )];
        let out = OverlayAnnotator::boxes_only().annotate(&frame, &readings).unwrap();
        assert_eq!(pixel(&out, 0, 0), [0, 255, 0]);
        assert_eq!(pixel(&out, 19, 19), [0, 255, 0]);
    }

    #[test]
    fn test_one_pixel_box_does_not_panic() {
        let frame = black_frame(10, 10);
        let readings = [reading(
            BoundingBox::new(3, 3, 4, 4).unwrap(),
            SafetyStatus::NotSafe,
        )];
        let out = OverlayAnnotator::boxes_only().annotate(&frame, &readings).unwrap();
        assert_eq!(pixel(&out, 3, 3), [255, 0, 0]);
    }

    #[test]
    fn test_invalid_font_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a font").unwrap();
        assert!(OverlayAnnotator::from_font_file(file.path()).is_err());
        assert!(OverlayAnnotator::from_font_file(Path::new("/nonexistent/font.ttf")).is_err());
    }

    fn non_black_in_rows(frame: &Frame, rows: std::ops::Range<u32>) -> usize {
        rows.flat_map(|y| (0..frame.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(frame, x, y) != [0, 0, 0])
            .count()
    }

    #[test]
    fn test_default_annotator_draws_caption_above_box() {
        let frame = black_frame(200, 200);
        let readings = [ProximityReading {
            detection: Detection::new("bottle", 0.9, BoundingBox::new(50, 80, 150, 180).unwrap()),
            estimate: DistanceEstimate {
                pixel_width: 100,
                distance_cm: 70.0,
            },
            status: SafetyStatus::NotSafe,
        }];
        let annotator = OverlayAnnotator::from_optional_font(None).unwrap();
        assert!(annotator.has_font());

        let out = annotator.annotate(&frame, &readings).unwrap();

        assert!(non_black_in_rows(&out, 0..80) > 0);
        // Bottom padding row of the plate, just above the box.
        assert_eq!(pixel(&out, 50, 79), [255, 0, 0]);
        // Glyphs are drawn in black over the red plate.
        let glyph_pixels = (60..79)
            .flat_map(|y| (52..150).map(move |x| (x, y)))
            .filter(|&(x, y)| pixel(&out, x, y) != [255, 0, 0])
            .count();
        assert!(glyph_pixels > 0);
    }

    #[test]
    fn test_boxes_only_leaves_area_above_box_untouched() {
        let frame = black_frame(200, 200);
        let readings = [reading(
            BoundingBox::new(50, 80, 150, 180).unwrap(),
            SafetyStatus::NotSafe,
        )];
        let out = OverlayAnnotator::boxes_only().annotate(&frame, &readings).unwrap();
        assert_eq!(non_black_in_rows(&out, 0..80), 0);
    }

    #[test]
    fn test_caption_near_top_edge_stays_inside_frame() {
        let frame = black_frame(120, 60);
        let readings = [reading(
            BoundingBox::new(0, 0, 100, 50).unwrap(),
            SafetyStatus::Safe,
        )];
        let plate_pixels = |annotator: OverlayAnnotator| {
            let out = annotator.annotate(&frame, &readings).unwrap();
            (2..10)
                .flat_map(|y| (3..40).map(move |x| (x, y)))
                .filter(|&(x, y)| pixel(&out, x, y) == [0, 255, 0])
                .count()
        };
        assert!(plate_pixels(OverlayAnnotator::new()) > 0);
        assert_eq!(plate_pixels(OverlayAnnotator::boxes_only()), 0);
    }
}
