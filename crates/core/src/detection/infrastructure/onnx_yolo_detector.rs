//! YOLOv8 object detector using ONNX Runtime via `ort`.
//!
//! Letterboxes the frame into the model's square input, decodes the
//! `[1, 4 + classes, anchors]` output and applies per-class NMS. Boxes come
//! back in original frame coordinates.

use std::path::Path;

use ndarray::Array4;
use ort::session::Session;
use ort::value::{Tensor, ValueType};

use crate::detection::domain::detection::{BoundingBox, Detection};
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::constants::COCO_LABELS;
use crate::shared::frame::Frame;

use super::execution_provider::preferred_execution_providers;

/// Used when the model's input shape is dynamic.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// Leading values per anchor: cx, cy, w, h.
const BOX_VALUES: usize = 4;

/// Letterbox padding value (114/255 grey).
const PAD_VALUE: f32 = 114.0 / 255.0;

pub struct OnnxYoloDetector {
    session: Session,
    labels: Vec<String>,
    input_size: u32,
}

impl OnnxYoloDetector {
    /// Loads a YOLOv8 model trained on COCO.
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_labels(model_path, COCO_LABELS.iter().map(|l| l.to_string()).collect())
    }

    /// Loads a model whose class `i` is named `labels[i]`.
    pub fn with_labels(
        model_path: &Path,
        labels: Vec<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        // NCHW; square inputs only, so H is enough.
        let input_size = match session.inputs().first().map(|input| input.dtype()) {
            Some(ValueType::Tensor { shape, .. }) if shape.len() == 4 && shape[2] > 0 => {
                shape[2] as u32
            }
            _ => DEFAULT_INPUT_SIZE,
        };

        log::info!(
            "Loaded detector {} ({} classes, input {input_size}px)",
            model_path.display(),
            labels.len()
        );
        Ok(Self {
            session,
            labels,
            input_size,
        })
    }

    fn label_for(&self, class_id: usize) -> String {
        match self.labels.get(class_id) {
            Some(label) => label.clone(),
            None => format!("class_{class_id}"),
        }
    }
}

impl ObjectDetector for OnnxYoloDetector {
    fn detect(
        &mut self,
        frame: &Frame,
        min_confidence: f64,
    ) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        let fit = Letterbox::fit(frame.width(), frame.height(), self.input_size);
        let input = Tensor::from_array(fit.tensor(frame))?;
        let outputs = self.session.run(ort::inputs![input])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let output = outputs[0].try_extract_array::<f32>()?;
        let shape = output.shape().to_vec();
        let [_, a, b] = shape[..] else {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        };

        // Official exports are [1, features, anchors]; some tools transpose.
        let features_first = a < b;
        let (anchors, features) = if features_first { (b, a) } else { (a, b) };
        if features <= BOX_VALUES {
            return Err(format!("YOLO output has no class scores: {shape:?}").into());
        }

        let data = output.as_slice().ok_or("YOLO output is not contiguous")?;
        let value = |anchor: usize, feature: usize| -> f64 {
            let i = if features_first {
                feature * anchors + anchor
            } else {
                anchor * features + feature
            };
            f64::from(data[i])
        };

        let mut candidates = Vec::new();
        for anchor in 0..anchors {
            let Some((class_id, confidence)) = (BOX_VALUES..features)
                .map(|f| (f - BOX_VALUES, value(anchor, f)))
                .max_by(|x, y| x.1.total_cmp(&y.1))
            else {
                continue;
            };
            if confidence < min_confidence {
                continue;
            }
            let (cx, cy) = (value(anchor, 0), value(anchor, 1));
            let (half_w, half_h) = (value(anchor, 2) / 2.0, value(anchor, 3) / 2.0);
            let (x1, y1) = fit.to_source(cx - half_w, cy - half_h);
            let (x2, y2) = fit.to_source(cx + half_w, cy + half_h);
            candidates.push(Candidate {
                corners: [x1, y1, x2, y2],
                confidence,
                class_id,
            });
        }

        drop(outputs);

        let (fw, fh) = (f64::from(frame.width()), f64::from(frame.height()));
        Ok(suppress_overlaps(candidates, NMS_IOU_THRESH)
            .into_iter()
            .filter_map(|c| {
                let [x1, y1, x2, y2] = c.corners;
                let bbox = BoundingBox::from_corners(
                    x1.clamp(0.0, fw),
                    y1.clamp(0.0, fh),
                    x2.clamp(0.0, fw),
                    y2.clamp(0.0, fh),
                )?;
                Some(Detection::new(self.label_for(c.class_id), c.confidence, bbox))
            })
            .collect())
    }
}

/// Uniform scale plus centring offsets mapping a frame into a square
/// model input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    size: u32,
    scale: f64,
    scaled_w: u32,
    scaled_h: u32,
    pad_x: u32,
    pad_y: u32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (f64::from(size) / f64::from(width)).min(f64::from(size) / f64::from(height));
        let scaled_w = ((f64::from(width) * scale).round() as u32).min(size);
        let scaled_h = ((f64::from(height) * scale).round() as u32).min(size);
        Self {
            size,
            scale,
            scaled_w,
            scaled_h,
            pad_x: (size - scaled_w) / 2,
            pad_y: (size - scaled_h) / 2,
        }
    }

    /// Model-input coordinates back to frame coordinates.
    fn to_source(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - f64::from(self.pad_x)) / self.scale,
            (y - f64::from(self.pad_y)) / self.scale,
        )
    }

    /// Nearest-neighbour resize into a normalised NCHW tensor.
    fn tensor(&self, frame: &Frame) -> Array4<f32> {
        let pixels = frame.as_ndarray();
        let (max_x, max_y) = (frame.width() as usize - 1, frame.height() as usize - 1);
        let side = self.size as usize;
        let (pad_x, pad_y) = (self.pad_x as usize, self.pad_y as usize);
        let (end_x, end_y) = (pad_x + self.scaled_w as usize, pad_y + self.scaled_h as usize);

        Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            if x < pad_x || x >= end_x || y < pad_y || y >= end_y {
                return PAD_VALUE;
            }
            let sx = (((x - pad_x) as f64 / self.scale) as usize).min(max_x);
            let sy = (((y - pad_y) as f64 / self.scale) as usize).min(max_y);
            f32::from(pixels[[sy, sx, c]]) / 255.0
        })
    }
}

#[derive(Clone, Debug)]
struct Candidate {
    corners: [f64; 4],
    confidence: f64,
    class_id: usize,
}

impl Candidate {
    fn iou(&self, other: &Candidate) -> f64 {
        let [ax1, ay1, ax2, ay2] = self.corners;
        let [bx1, by1, bx2, by2] = other.corners;
        let overlap_w = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
        let overlap_h = (ay2.min(by2) - ay1.max(by1)).max(0.0);
        let inter = overlap_w * overlap_h;
        if inter <= 0.0 {
            return 0.0;
        }
        let union = (ax2 - ax1) * (ay2 - ay1) + (bx2 - bx1) * (by2 - by1) - inter;
        inter / union
    }
}

/// Greedy per-class NMS. Output is ordered by descending confidence.
fn suppress_overlaps(mut candidates: Vec<Candidate>, iou_thresh: f64) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let overlaps_kept = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_thresh);
        if !overlaps_kept {
            kept.push(candidate);
        }
    }
    kept
}
