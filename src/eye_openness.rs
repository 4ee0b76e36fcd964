//! Eye aspect ratio (EAR) from six eye contour points.
//!
//! Points follow the `p1..p6` convention: `p1` and `p4` are the horizontal
//! corners, `(p2, p6)` and `(p3, p5)` are the vertical lid pairs.

use crate::constants::{EPSILON, NUM_EYE_POINTS};
use nalgebra::{distance, Point2};

/// Compute `(|p2-p6| + |p3-p5|) / (2 |p1-p4|)`.
///
/// Returns `0.0` (a closed eye) when the corners coincide or any point is
/// non-finite.
#[must_use]
pub fn eye_aspect_ratio(eye: &[Point2<f64>; NUM_EYE_POINTS]) -> f64 {
    let horizontal = distance(&eye[0], &eye[3]);
    let vertical = distance(&eye[1], &eye[5]) + distance(&eye[2], &eye[4]);

    if !horizontal.is_finite() || !vertical.is_finite() || horizontal < EPSILON {
        return 0.0;
    }

    vertical / (2.0 * horizontal)
}

/// Mean eye aspect ratio of both eyes
#[must_use]
pub fn average_eye_aspect_ratio(
    left: &[Point2<f64>; NUM_EYE_POINTS],
    right: &[Point2<f64>; NUM_EYE_POINTS],
) -> f64 {
    (eye_aspect_ratio(left) + eye_aspect_ratio(right)) / 2.0
}
