use serde::Serialize;

/// Distance derived from one bounding-box width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DistanceEstimate {
    pub pixel_width: u32,
    pub distance_cm: f64,
}

impl DistanceEstimate {
    /// Distance truncated to whole centimetres, as shown to users.
    pub fn whole_cm(&self) -> i64 {
        self.distance_cm as i64
    }
}

/// Single-plane pinhole approximation: an object of known width appears
/// narrower in inverse proportion to its distance from the camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceEstimator {
    known_width_cm: f64,
    focal_length_px: f64,
}

impl DistanceEstimator {
    pub fn new(known_width_cm: f64, focal_length_px: f64) -> Self {
        Self {
            known_width_cm,
            focal_length_px,
        }
    }

    /// A zero-width box carries no signal and maps to distance 0.
    pub fn estimate(&self, pixel_width: u32) -> DistanceEstimate {
        let distance_cm = if pixel_width == 0 {
            0.0
        } else {
            (self.known_width_cm * self.focal_length_px) / pixel_width as f64
        };
        DistanceEstimate {
            pixel_width,
            distance_cm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn reference() -> DistanceEstimator {
        DistanceEstimator::new(7.0, 1000.0)
    }

    #[rstest]
    #[case::boundary(70, 100.0)]
    #[case::far(50, 140.0)]
    #[case::near(100, 70.0)]
    fn test_reference_calibration(#[case] width: u32, #[case] expected_cm: f64) {
        let estimate = reference().estimate(width);
        assert_eq!(estimate.pixel_width, width);
        assert_relative_eq!(estimate.distance_cm, expected_cm);
    }

    #[test]
    fn test_zero_width_maps_to_zero() {
        assert_eq!(reference().estimate(0).distance_cm, 0.0);
    }

    #[test]
    fn test_strictly_decreasing_in_width() {
        let estimator = reference();
        let mut previous = estimator.estimate(1).distance_cm;
        for width in 2..=4096 {
            let current = estimator.estimate(width).distance_cm;
            assert!(current < previous, "width {width}: {current} !< {previous}");
            previous = current;
        }
    }

    #[test]
    fn test_whole_cm_truncates() {
        // 7000 / 90 = 77.78
        assert_eq!(reference().estimate(90).whole_cm(), 77);
    }
}
