use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates of the frame it was detected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: i32,
    pub ymin: i32,
    pub xmax: i32,
    pub ymax: i32,
}

impl BoundingBox {
    /// Builds a box, rejecting empty or inverted extents.
    pub fn new(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Option<Self> {
        if xmin < xmax && ymin < ymax {
            Some(Self {
                xmin,
                ymin,
                xmax,
                ymax,
            })
        } else {
            None
        }
    }

    /// Builds a box from detector output, truncating towards zero.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Self> {
        Self::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32)
    }

    pub fn width(&self) -> u32 {
        (self.xmax - self.xmin).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.ymax - self.ymin).max(0) as u32
    }
}

/// One object instance found in a single frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f64, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
        }
    }
}
