//! Landmark and camera types consumed by the attention pipeline.
//!
//! A [`LandmarkSet`] carries only the points the pipeline needs: the six
//! canonical pose landmarks and two six-point eye contours. Sets can be
//! built directly, deserialized from JSON, or extracted from a full
//! normalized face mesh with [`LandmarkSet::from_face_mesh`].

use crate::{
    constants::{CAMERA_CENTER_FACTOR, NUM_EYE_POINTS, NUM_POSE_LANDMARKS},
    Error, Result,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Face mesh indices of the pose landmarks, in canonical order:
/// nose tip, chin, left eye outer corner, right eye outer corner,
/// left mouth corner, right mouth corner.
pub const MESH_POSE_INDICES: [usize; NUM_POSE_LANDMARKS] = [1, 152, 33, 263, 61, 291];

/// Face mesh indices of the left eye contour (`p1..p6` order)
pub const MESH_LEFT_EYE_INDICES: [usize; NUM_EYE_POINTS] = [33, 160, 158, 133, 153, 144];

/// Face mesh indices of the right eye contour (`p1..p6` order)
pub const MESH_RIGHT_EYE_INDICES: [usize; NUM_EYE_POINTS] = [362, 385, 387, 263, 373, 380];

/// Landmarks of one detected face, in pixel coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    /// Pose landmarks in canonical order (see [`MESH_POSE_INDICES`])
    pub pose: [Point2<f64>; NUM_POSE_LANDMARKS],
    /// Left eye contour: corner, two upper lid points, corner, two lower lid points
    pub left_eye: [Point2<f64>; NUM_EYE_POINTS],
    /// Right eye contour, same ordering as the left eye
    pub right_eye: [Point2<f64>; NUM_EYE_POINTS],
}

impl LandmarkSet {
    /// Extract the pipeline landmarks from a normalized face mesh.
    ///
    /// Mesh coordinates are expected in `[0, 1]` relative to the frame and are
    /// scaled to pixels using `width` and `height`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mesh is too short to contain every index used.
    pub fn from_face_mesh(mesh: &[Point2<f64>], width: u32, height: u32) -> Result<Self> {
        let required = MESH_POSE_INDICES
            .iter()
            .chain(MESH_LEFT_EYE_INDICES.iter())
            .chain(MESH_RIGHT_EYE_INDICES.iter())
            .max()
            .map_or(0, |&max| max + 1);

        if mesh.len() < required {
            return Err(Error::InvalidInput(format!(
                "Face mesh has {} points, at least {} required",
                mesh.len(),
                required
            )));
        }

        let (w, h) = (f64::from(width), f64::from(height));
        let to_pixel = |idx: usize| Point2::new(mesh[idx].x * w, mesh[idx].y * h);

        Ok(Self {
            pose: MESH_POSE_INDICES.map(to_pixel),
            left_eye: MESH_LEFT_EYE_INDICES.map(to_pixel),
            right_eye: MESH_RIGHT_EYE_INDICES.map(to_pixel),
        })
    }

    /// Whether every coordinate in the set is finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose
            .iter()
            .chain(self.left_eye.iter())
            .chain(self.right_eye.iter())
            .all(|p| p.x.is_finite() && p.y.is_finite())
    }
}

/// Pinhole camera intrinsics with optional lens distortion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraModel {
    /// Focal length along x, in pixels
    pub fx: f64,
    /// Focal length along y, in pixels
    pub fy: f64,
    /// Principal point x
    pub cx: f64,
    /// Principal point y
    pub cy: f64,
    /// Distortion coefficients `(k1, k2, p1, p2)`
    pub distortion: [f64; 4],
}

impl CameraModel {
    /// Approximate intrinsics for a frame size: focal length equal to the
    /// frame width, principal point at the frame center, no distortion.
    #[must_use]
    pub fn pinhole(image_width: u32, image_height: u32) -> Self {
        let focal_length = f64::from(image_width);
        Self {
            fx: focal_length,
            fy: focal_length,
            cx: f64::from(image_width) / CAMERA_CENTER_FACTOR,
            cy: f64::from(image_height) / CAMERA_CENTER_FACTOR,
            distortion: [0.0; 4],
        }
    }

    /// Replace the distortion coefficients
    #[must_use]
    pub fn with_distortion(mut self, distortion: [f64; 4]) -> Self {
        self.distortion = distortion;
        self
    }
}
