//! Body-centred polar mapping of a single joint.
//!
//! A raw landmark is shifted by the calibration offset and then expressed as
//! an angle and a radial distance around that centre.

use serde::{Deserialize, Serialize};

/// Distance scale: centered frame fractions → thousandths of the frame.
///
/// All distance thresholds (activation deadzone, expression full-scale) are
/// expressed in these per-mille units.
pub const DISTANCE_SCALE: f32 = 1000.0;

// ════════════════════════════════════════════════════════════════════════════
// CalibrationOffset
// ════════════════════════════════════════════════════════════════════════════

/// Centre of the body frame in normalized frame coordinates.
///
/// An unset offset is the identity: raw positions pass through unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct CalibrationOffset {
    pub center_x: f32,
    pub center_y: f32,
    pub is_set: bool,
}

impl CalibrationOffset {
    /// The identity offset used before the first calibration.
    pub const UNSET: CalibrationOffset =
        CalibrationOffset { center_x: 0.0, center_y: 0.0, is_set: false };

    /// Geometric centre of the frame.
    pub const FRAME_CENTER: (f32, f32) = (0.5, 0.5);

    pub fn at(center_x: f32, center_y: f32) -> Self {
        CalibrationOffset { center_x, center_y, is_set: true }
    }

    /// The `(x, y)` actually subtracted from raw positions.
    pub fn shift(&self) -> (f32, f32) {
        if self.is_set { (self.center_x, self.center_y) } else { (0.0, 0.0) }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PolarSample
// ════════════════════════════════════════════════════════════════════════════

/// Result of mapping one joint position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolarSample {
    /// Centered x, normalized frame units.
    pub x: f32,
    /// Centered y, normalized frame units (grows downward, as in the image).
    pub y: f32,
    /// Radial distance in per-mille units (see [`DISTANCE_SCALE`]).
    pub distance: f32,
    /// Angle in degrees, `[0, 360)`.
    pub angle_deg: f32,
}

/// Map a raw `(x, y)` through `offset` into body-centred polar form.
pub fn map_position(raw_x: f32, raw_y: f32, offset: &CalibrationOffset) -> PolarSample {
    let (cx, cy) = offset.shift();
    let x = raw_x - cx;
    let y = raw_y - cy;
    let distance = (x * x + y * y).sqrt() * DISTANCE_SCALE;
    let angle_deg = normalize_degrees(y.atan2(x).to_degrees());
    PolarSample { x, y, distance, angle_deg }
}

/// Fold an angle in degrees into `[0, 360)`.
pub fn normalize_degrees(deg: f32) -> f32 {
    let d = (deg + 360.0) % 360.0;
    // (−ε + 360) rounds to exactly 360.0 in f32
    if d >= 360.0 { 0.0 } else { d }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn unset_offset_is_identity() {
        let s = map_position(0.3, 0.4, &CalibrationOffset::UNSET);
        assert_eq!((s.x, s.y), (0.3, 0.4));
        assert_abs_diff_eq!(s.distance, 500.0, epsilon = 1e-3);
    }

    #[test]
    fn position_at_center_maps_to_origin() {
        let offset = CalibrationOffset::at(0.42, 0.61);
        let s = map_position(0.42, 0.61, &offset);
        assert_eq!((s.x, s.y), (0.0, 0.0));
        assert_eq!(s.distance, 0.0);
        assert_eq!(s.angle_deg, 0.0);
    }

    #[test]
    fn offset_fields_ignored_until_set() {
        let mut offset = CalibrationOffset::at(0.5, 0.5);
        offset.is_set = false;
        let s = map_position(0.6, 0.5, &offset);
        assert_eq!(s.x, 0.6);
    }

    #[test]
    fn quadrant_angles() {
        let o = CalibrationOffset::at(0.5, 0.5);
        assert_abs_diff_eq!(map_position(0.6, 0.5, &o).angle_deg, 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(map_position(0.5, 0.6, &o).angle_deg, 90.0, epsilon = 1e-3);
        assert_abs_diff_eq!(map_position(0.4, 0.5, &o).angle_deg, 180.0, epsilon = 1e-3);
        assert_abs_diff_eq!(map_position(0.5, 0.4, &o).angle_deg, 270.0, epsilon = 1e-3);
    }

    #[test]
    fn mapping_is_pure() {
        let o = CalibrationOffset::at(0.48, 0.52);
        assert_eq!(map_position(0.71, 0.33, &o), map_position(0.71, 0.33, &o));
    }

    #[test]
    fn distance_grows_with_norm() {
        let o = CalibrationOffset::at(0.5, 0.5);
        let mut last = -1.0;
        for step in 0..20 {
            let r = step as f32 * 0.02;
            let d = map_position(0.5 + r * 0.6, 0.5 - r * 0.8, &o).distance;
            assert!(d >= 0.0);
            assert!(d > last);
            last = d;
        }
    }

    #[test]
    fn normalize_folds_negative_and_full_turn() {
        assert_abs_diff_eq!(normalize_degrees(-90.0), 270.0);
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert_eq!(normalize_degrees(-1e-6), 0.0);
        assert!(normalize_degrees(-1e-6) < 360.0);
    }
}
