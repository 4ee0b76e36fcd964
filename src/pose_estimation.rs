//! Head pose estimation from six facial landmarks.
//!
//! The estimator solves the Perspective-n-Point problem for a fixed generic
//! face model with a Levenberg-Marquardt refinement of the reprojection
//! error, then decomposes the recovered rotation into yaw, pitch and roll.
//!
//! Solver failures are not errors: a degenerate or non-converging input
//! yields a zero pose.

use crate::{
    constants::{
        COLLINEARITY_THRESHOLD, EPSILON, LM_COST_TOLERANCE, LM_INITIAL_LAMBDA, LM_MAX_ITERATIONS, LM_MAX_LAMBDA,
        LM_MIN_LAMBDA,
        LM_STEP_TOLERANCE, MIN_DEPTH, NUM_POSE_LANDMARKS, POSE_SEEDS_DEG, SINGULARITY_THRESHOLD,
    },
    landmarks::CameraModel,
};
use nalgebra::{Matrix2x3, Matrix3, Matrix3x6, Matrix6, Point2, Point3, Rotation3, Vector3, Vector6};
use serde::{Deserialize, Serialize};

/// Generic face model in millimetres, in the same order as the pose landmarks.
///
/// Axes are camera aligned (x right, y down, z away from the camera) with the
/// nose tip at the origin, so a face looking straight into the camera has an
/// identity rotation.
pub const MODEL_POINTS_MM: [[f64; 3]; NUM_POSE_LANDMARKS] = [
    [0.0, 0.0, 0.0],       // nose tip
    [0.0, 63.6, 12.5],     // chin
    [-43.3, -32.7, 26.0],  // left eye outer corner
    [43.3, -32.7, 26.0],   // right eye outer corner
    [-28.9, 28.9, 24.1],   // left mouth corner
    [28.9, 28.9, 24.1],    // right mouth corner
];

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Rotation about the vertical axis
    pub yaw: f64,
    /// Rotation about the lateral axis
    pub pitch: f64,
    /// Rotation about the longitudinal axis
    pub roll: f64,
}

impl Pose {
    /// Whether all three angles are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.yaw.is_finite() && self.pitch.is_finite() && self.roll.is_finite()
    }
}

/// Rigid transform recovered by the PnP solver
#[derive(Debug, Clone, Copy)]
pub struct PoseSolution {
    /// Model to camera rotation
    pub rotation: Rotation3<f64>,
    /// Model to camera translation, in millimetres
    pub translation: Vector3<f64>,
    /// Sum of squared reprojection residuals, in pixels²
    pub cost: f64,
}

/// Head pose estimator using `PnP` algorithm
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    model_points: [Point3<f64>; NUM_POSE_LANDMARKS],
    camera: CameraModel,
}

impl PoseEstimator {
    /// Create a new pose estimator for the given camera
    #[must_use]
    pub fn new(camera: CameraModel) -> Self {
        log::info!(
            "Initializing PoseEstimator: f=({:.1}, {:.1}) c=({:.1}, {:.1})",
            camera.fx,
            camera.fy,
            camera.cx,
            camera.cy
        );
        Self {
            model_points: MODEL_POINTS_MM.map(|[x, y, z]| Point3::new(x, y, z)),
            camera,
        }
    }

    /// Camera intrinsics used by this estimator
    #[must_use]
    pub fn camera(&self) -> &CameraModel {
        &self.camera
    }

    /// Estimate head pose from the six pose landmarks.
    ///
    /// Returns the zero pose when the solver cannot produce a finite result.
    #[must_use]
    pub fn estimate(&self, image_points: &[Point2<f64>; NUM_POSE_LANDMARKS]) -> Pose {
        let Some(solution) = self.solve(image_points) else {
            return Pose::default();
        };

        let pose = rotation_matrix_to_euler(solution.rotation.matrix());
        if pose.is_finite() {
            pose
        } else {
            log::debug!("Non-finite Euler angles from rotation, falling back to zero pose");
            Pose::default()
        }
    }

    /// Solve the `PnP` problem for the six pose landmarks.
    ///
    /// Every seed in [`POSE_SEEDS_DEG`] is refined and the lowest-cost result
    /// is kept. Returns `None` for degenerate input or when no seed yields a
    /// valid solution.
    #[must_use]
    pub fn solve(&self, image_points: &[Point2<f64>; NUM_POSE_LANDMARKS]) -> Option<PoseSolution> {
        let Some((centroid, spread)) = image_spread(image_points) else {
            log::debug!("Degenerate landmark geometry, skipping pose solve");
            return None;
        };

        let best = POSE_SEEDS_DEG
            .iter()
            .filter_map(|&(yaw, pitch)| {
                let rotation = Rotation3::from_euler_angles(pitch.to_radians(), yaw.to_radians(), 0.0);
                let translation = self.initial_translation(&rotation, &centroid, spread);
                self.refine(image_points, rotation, translation)
            })
            .min_by(|a, b| a.cost.total_cmp(&b.cost));

        match best {
            Some(solution) if solution.cost.is_finite() && solution.translation.z > 0.0 => Some(solution),
            _ => {
                log::debug!("PnP solver did not converge");
                None
            }
        }
    }

    /// Project a model point into the image.
    ///
    /// Returns `None` if the point lands behind the camera.
    #[must_use]
    pub fn project(
        &self,
        rotation: &Rotation3<f64>,
        translation: &Vector3<f64>,
        point: &Point3<f64>,
    ) -> Option<Point2<f64>> {
        let camera_point = rotation * point.coords + translation;
        self.project_camera_point(&camera_point).map(|(pixel, _)| pixel)
    }

    /// Root mean square reprojection error of a solution, in pixels
    #[must_use]
    pub fn reprojection_error(
        &self,
        solution: &PoseSolution,
        image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
    ) -> f64 {
        self.cost(image_points, &solution.rotation, &solution.translation)
            .map_or(f64::INFINITY, |cost| (cost / NUM_POSE_LANDMARKS as f64).sqrt())
    }

    /// Translation that places the model centroid on the ray through the image
    /// centroid, at a depth matching the observed landmark spread.
    fn initial_translation(&self, rotation: &Rotation3<f64>, centroid: &Point2<f64>, spread: f64) -> Vector3<f64> {
        let n = NUM_POSE_LANDMARKS as f64;
        let model_centroid = self.model_points.iter().map(|p| p.coords).sum::<Vector3<f64>>() / n;
        let model_spread = (self
            .model_points
            .iter()
            .map(|p| (p.x - model_centroid.x).powi(2) + (p.y - model_centroid.y).powi(2))
            .sum::<f64>()
            / n)
            .sqrt();

        let focal = (self.camera.fx + self.camera.fy) / 2.0;
        let depth = focal * model_spread / spread;
        let target = Vector3::new(
            (centroid.x - self.camera.cx) / self.camera.fx * depth,
            (centroid.y - self.camera.cy) / self.camera.fy * depth,
            depth,
        );

        target - rotation * model_centroid
    }

    /// Levenberg-Marquardt refinement from one starting transform
    fn refine(
        &self,
        image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
        mut rotation: Rotation3<f64>,
        mut translation: Vector3<f64>,
    ) -> Option<PoseSolution> {
        let mut cost = self.cost(image_points, &rotation, &translation)?;
        let mut lambda = LM_INITIAL_LAMBDA;

        for _ in 0..LM_MAX_ITERATIONS {
            let (jtj, jtr) = self.normal_equations(image_points, &rotation, &translation)?;

            let mut step = None;
            while lambda < LM_MAX_LAMBDA {
                let mut damped = jtj;
                for i in 0..6 {
                    damped[(i, i)] += lambda * (jtj[(i, i)] + EPSILON);
                }

                let Some(delta) = damped.cholesky().map(|c| c.solve(&(-jtr))) else {
                    lambda *= 10.0;
                    continue;
                };

                let candidate_rotation = Rotation3::new(delta.fixed_rows::<3>(0).into_owned()) * rotation;
                let candidate_translation = translation + delta.fixed_rows::<3>(3);

                match self.cost(image_points, &candidate_rotation, &candidate_translation) {
                    Some(candidate_cost) if candidate_cost < cost => {
                        step = Some((delta.norm(), cost - candidate_cost));
                        rotation = candidate_rotation;
                        translation = candidate_translation;
                        cost = candidate_cost;
                        lambda = (lambda / 10.0).max(LM_MIN_LAMBDA);
                        break;
                    }
                    _ => lambda *= 10.0,
                }
            }

            match step {
                Some((step_norm, reduction)) if step_norm > LM_STEP_TOLERANCE && reduction > LM_COST_TOLERANCE => {}
                _ => break,
            }
        }

        cost.is_finite().then_some(PoseSolution {
            rotation,
            translation,
            cost,
        })
    }

    /// Sum of squared reprojection residuals
    fn cost(
        &self,
        image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
        rotation: &Rotation3<f64>,
        translation: &Vector3<f64>,
    ) -> Option<f64> {
        self.model_points
            .iter()
            .zip(image_points.iter())
            .map(|(model, observed)| {
                self.project(rotation, translation, model)
                    .map(|projected| (projected - observed).norm_squared())
            })
            .sum()
    }

    /// Gauss-Newton normal equations `JᵀJ` and `Jᵀr` for the parameter
    /// vector `[δω, δt]`, where `δω` is a left-multiplied rotation increment.
    fn normal_equations(
        &self,
        image_points: &[Point2<f64>; NUM_POSE_LANDMARKS],
        rotation: &Rotation3<f64>,
        translation: &Vector3<f64>,
    ) -> Option<(Matrix6<f64>, Vector6<f64>)> {
        let mut jtj = Matrix6::zeros();
        let mut jtr = Vector6::zeros();

        for (model, observed) in self.model_points.iter().zip(image_points.iter()) {
            let rotated = rotation * model.coords;
            let camera_point = rotated + translation;
            let (projected, d_pixel) = self.project_camera_point(&camera_point)?;

            let mut d_camera = Matrix3x6::zeros();
            d_camera.fixed_view_mut::<3, 3>(0, 0).copy_from(&(-rotated.cross_matrix()));
            d_camera.fixed_view_mut::<3, 3>(0, 3).copy_from(&Matrix3::identity());

            let jacobian = d_pixel * d_camera;
            let residual = projected - observed;

            jtj += jacobian.transpose() * jacobian;
            jtr += jacobian.transpose() * residual;
        }

        Some((jtj, jtr))
    }

    /// Pinhole projection with radial/tangential distortion, plus the
    /// derivative of the pixel position with respect to the camera point.
    fn project_camera_point(&self, point: &Vector3<f64>) -> Option<(Point2<f64>, Matrix2x3<f64>)> {
        if !(point.z > MIN_DEPTH) {
            return None;
        }

        let [k1, k2, p1, p2] = self.camera.distortion;
        let inv_z = 1.0 / point.z;
        let x = point.x * inv_z;
        let y = point.y * inv_z;

        let r2 = x * x + y * y;
        let radial = 1.0 + k1 * r2 + k2 * r2 * r2;
        let d_radial = k1 + 2.0 * k2 * r2;

        let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;

        let dxd_dx = radial + 2.0 * x * x * d_radial + 2.0 * p1 * y + 6.0 * p2 * x;
        let dxd_dy = 2.0 * x * y * d_radial + 2.0 * p1 * x + 2.0 * p2 * y;
        let dyd_dx = dxd_dy;
        let dyd_dy = radial + 2.0 * y * y * d_radial + 6.0 * p1 * y + 2.0 * p2 * x;

        // d(x, y) / d(X, Y, Z)
        let d_normalized = Matrix2x3::new(inv_z, 0.0, -x * inv_z, 0.0, inv_z, -y * inv_z);
        let d_distorted = nalgebra::Matrix2::new(
            self.camera.fx * dxd_dx,
            self.camera.fx * dxd_dy,
            self.camera.fy * dyd_dx,
            self.camera.fy * dyd_dy,
        );

        let pixel = Point2::new(self.camera.fx * xd + self.camera.cx, self.camera.fy * yd + self.camera.cy);
        Some((pixel, d_distorted * d_normalized))
    }
}

/// Centroid and RMS spread of the landmarks, or `None` when they are
/// non-finite, coincident or collinear.
fn image_spread(points: &[Point2<f64>; NUM_POSE_LANDMARKS]) -> Option<(Point2<f64>, f64)> {
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return None;
    }

    let n = NUM_POSE_LANDMARKS as f64;
    let centroid = Point2::from(points.iter().map(|p| p.coords).sum::<nalgebra::Vector2<f64>>() / n);

    let (mut sxx, mut sxy, mut syy) = (0.0, 0.0, 0.0);
    for p in points {
        let d = p - centroid;
        sxx += d.x * d.x;
        sxy += d.x * d.y;
        syy += d.y * d.y;
    }
    let (sxx, sxy, syy) = (sxx / n, sxy / n, syy / n);

    let trace = sxx + syy;
    if trace < EPSILON {
        return None;
    }

    // Eigenvalues of the 2x2 covariance
    let half_gap = (((sxx - syy) / 2.0).powi(2) + sxy * sxy).sqrt();
    let major = trace / 2.0 + half_gap;
    let minor = trace / 2.0 - half_gap;
    if minor / major < COLLINEARITY_THRESHOLD {
        return None;
    }

    Some((centroid, trace.sqrt()))
}

/// Convert a rotation matrix to Euler angles in degrees.
///
/// Uses the `Rz·Ry·Rx` decomposition (roll, yaw, pitch). When
/// `sqrt(R00² + R10²)` vanishes the decomposition is gimbal locked; roll is
/// then fixed to zero and pitch absorbs the remaining rotation.
#[must_use]
pub fn rotation_matrix_to_euler(r: &Matrix3<f64>) -> Pose {
    let sy = (r[(0, 0)] * r[(0, 0)] + r[(1, 0)] * r[(1, 0)]).sqrt();

    let (pitch, yaw, roll) = if sy >= SINGULARITY_THRESHOLD {
        (
            r[(2, 1)].atan2(r[(2, 2)]),
            (-r[(2, 0)]).atan2(sy),
            r[(1, 0)].atan2(r[(0, 0)]),
        )
    } else {
        ((-r[(1, 2)]).atan2(r[(1, 1)]), (-r[(2, 0)]).atan2(sy), 0.0)
    };

    Pose {
        yaw: yaw.to_degrees(),
        pitch: pitch.to_degrees(),
        roll: roll.to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(estimator: &PoseEstimator, pose: Pose, depth: f64) -> [Point2<f64>; NUM_POSE_LANDMARKS] {
        let rotation = Rotation3::from_euler_angles(
            pose.pitch.to_radians(),
            pose.yaw.to_radians(),
            pose.roll.to_radians(),
        );
        let translation = Vector3::new(10.0, -5.0, depth);
        MODEL_POINTS_MM.map(|[x, y, z]| {
            estimator
                .project(&rotation, &translation, &Point3::new(x, y, z))
                .unwrap()
        })
    }

    #[test]
    fn test_euler_angle_conversion() {
        let angles = rotation_matrix_to_euler(&Matrix3::identity());

        assert!(angles.yaw.abs() < 1e-6);
        assert!(angles.pitch.abs() < 1e-6);
        assert!(angles.roll.abs() < 1e-6);
    }

    #[test]
    fn test_euler_matches_composition() {
        let rotation = Rotation3::from_euler_angles(0.2, -0.3, 0.1);
        let angles = rotation_matrix_to_euler(rotation.matrix());

        assert!((angles.pitch - 0.2f64.to_degrees()).abs() < 1e-9);
        assert!((angles.yaw + 0.3f64.to_degrees()).abs() < 1e-9);
        assert!((angles.roll - 0.1f64.to_degrees()).abs() < 1e-9);
    }

    #[test]
    fn test_euler_gimbal_lock() {
        for yaw in [std::f64::consts::FRAC_PI_2, -std::f64::consts::FRAC_PI_2] {
            let rotation = Rotation3::from_euler_angles(0.3, yaw, 0.0);
            let angles = rotation_matrix_to_euler(rotation.matrix());

            assert!(angles.is_finite());
            assert_eq!(angles.roll, 0.0);
            assert!((angles.yaw.abs() - 90.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_frontal_face_is_zero_pose() {
        let estimator = PoseEstimator::new(CameraModel::pinhole(640, 480));
        let points = render(&estimator, Pose::default(), 500.0);
        let pose = estimator.estimate(&points);

        assert!(pose.yaw.abs() < 1e-3, "yaw {}", pose.yaw);
        assert!(pose.pitch.abs() < 1e-3, "pitch {}", pose.pitch);
        assert!(pose.roll.abs() < 1e-3, "roll {}", pose.roll);
    }

    #[test]
    fn test_recovers_rotated_pose() {
        let estimator = PoseEstimator::new(CameraModel::pinhole(640, 480));
        let truth = Pose {
            yaw: 25.0,
            pitch: -10.0,
            roll: 5.0,
        };
        let points = render(&estimator, truth, 550.0);
        let solution = estimator.solve(&points).unwrap();
        let pose = rotation_matrix_to_euler(solution.rotation.matrix());

        assert!((pose.yaw - truth.yaw).abs() < 0.5, "yaw {}", pose.yaw);
        assert!((pose.pitch - truth.pitch).abs() < 0.5, "pitch {}", pose.pitch);
        assert!((pose.roll - truth.roll).abs() < 0.5, "roll {}", pose.roll);
        assert!(estimator.reprojection_error(&solution, &points) < 1e-3);
    }

    #[test]
    fn test_recovers_pose_with_distortion() {
        let camera = CameraModel::pinhole(640, 480).with_distortion([0.05, -0.01, 0.001, -0.001]);
        let estimator = PoseEstimator::new(camera);
        let truth = Pose {
            yaw: -20.0,
            pitch: 12.0,
            roll: 0.0,
        };
        let points = render(&estimator, truth, 600.0);
        let pose = estimator.estimate(&points);

        assert!((pose.yaw - truth.yaw).abs() < 0.5, "yaw {}", pose.yaw);
        assert!((pose.pitch - truth.pitch).abs() < 0.5, "pitch {}", pose.pitch);
    }

    #[test]
    fn test_collinear_points_fall_back_to_zero() {
        let estimator = PoseEstimator::new(CameraModel::pinhole(640, 480));
        let points: [Point2<f64>; NUM_POSE_LANDMARKS] =
            std::array::from_fn(|i| Point2::new(100.0 + 10.0 * i as f64, 50.0 + 5.0 * i as f64));

        assert!(estimator.solve(&points).is_none());
        assert_eq!(estimator.estimate(&points), Pose::default());
    }

    #[test]
    fn test_coincident_points_fall_back_to_zero() {
        let estimator = PoseEstimator::new(CameraModel::pinhole(640, 480));
        let points = [Point2::new(320.0, 240.0); NUM_POSE_LANDMARKS];

        assert_eq!(estimator.estimate(&points), Pose::default());
    }

    #[test]
    fn test_non_finite_points_fall_back_to_zero() {
        let estimator = PoseEstimator::new(CameraModel::pinhole(640, 480));
        let mut points = render(&estimator, Pose::default(), 500.0);
        points[3] = Point2::new(f64::NAN, 10.0);

        assert_eq!(estimator.estimate(&points), Pose::default());
    }

    #[test]
    fn test_project_behind_camera() {
        let estimator = PoseEstimator::new(CameraModel::pinhole(640, 480));
        let projected = estimator.project(
            &Rotation3::identity(),
            &Vector3::new(0.0, 0.0, -100.0),
            &Point3::origin(),
        );
        assert!(projected.is_none());
    }
}
