//! Angular slice quantization.
//!
//! The circle around the body centre is cut into `n` equal sectors.  Sector
//! `k` covers the half-open interval `[k·360/n, (k+1)·360/n)`.

/// Default number of slices: one per scale degree plus the octave.
pub const DEFAULT_SLICE_COUNT: usize = 8;

/// Map an angle in degrees (`[0, 360)`) to its slice index in `[0, n-1]`.
///
/// Angles outside the range are folded first; a value that rounds up to a
/// full turn lands in the last slice.  `n` must be at least 1.
pub fn quantize(angle_deg: f32, n: usize) -> usize {
    debug_assert!(n > 0, "slice count must be positive");
    let n = n.max(1);
    let angle = angle_deg.rem_euclid(360.0);
    let width = 360.0 / n as f32;
    let k = (angle / width).floor() as usize;
    k.min(n - 1)
}

/// Start angle of slice `k` in degrees.
pub fn slice_start_deg(k: usize, n: usize) -> f32 {
    k as f32 * 360.0 / n.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_for_eight_slices() {
        assert_eq!(quantize(0.0, 8), 0);
        assert_eq!(quantize(44.999, 8), 0);
        assert_eq!(quantize(45.0, 8), 1);
        assert_eq!(quantize(359.999, 8), 7);
    }

    #[test]
    fn boundary_belongs_to_upper_slice() {
        for k in 0..8 {
            assert_eq!(quantize(slice_start_deg(k, 8), 8), k);
        }
    }

    #[test]
    fn always_in_range_and_monotonic() {
        for n in 1..=16 {
            let mut last = 0;
            let mut a = 0.0f32;
            while a < 360.0 {
                let k = quantize(a, n);
                assert!(k < n, "quantize({}, {}) = {}", a, n, k);
                assert!(k >= last, "not monotonic at {} for n={}", a, n);
                last = k;
                a += 0.25;
            }
            assert_eq!(last, n - 1);
        }
    }

    #[test]
    fn wraps_once_at_full_turn() {
        assert_eq!(quantize(360.0, 8), 0);
        assert_eq!(quantize(-0.5, 8), 7);
    }

    #[test]
    fn single_slice_covers_everything() {
        assert_eq!(quantize(0.0, 1), 0);
        assert_eq!(quantize(270.0, 1), 0);
    }
}
