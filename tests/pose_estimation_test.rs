//! Pose estimation accuracy and robustness tests


use attention_monitor::{
    landmarks::CameraModel,
    pose_estimation::{rotation_matrix_to_euler, Pose, PoseEstimator},
};
use nalgebra::{Point2, Rotation3};
use proptest::prelude::*;
use test_helpers::{assert_pose_finite, render_pose_points};

fn estimator() -> PoseEstimator {
    PoseEstimator::new(CameraModel::pinhole(640, 480))
}

#[test]
fn test_near_frontal_faces_are_near_zero() {
    let estimator = estimator();

    // Integer pixel coordinates, as landmark detectors usually report them
    for depth in [400.0, 500.0, 700.0] {
        let points = render_pose_points(estimator.camera(), Pose::default(), depth)
            .map(|p| Point2::new(p.x.round(), p.y.round()));
        let pose = estimator.estimate(&points);

        assert!(pose.yaw.abs() < 5.0, "yaw {} at depth {depth}", pose.yaw);
        assert!(pose.pitch.abs() < 5.0, "pitch {} at depth {depth}", pose.pitch);
        assert!(pose.roll.abs() < 5.0, "roll {} at depth {depth}", pose.roll);
    }
}

#[test]
fn test_recovers_known_poses() {
    let estimator = estimator();
    let cases = [
        (30.0, 0.0, 0.0),
        (-30.0, 0.0, 0.0),
        (0.0, 20.0, 0.0),
        (0.0, -20.0, 0.0),
        (0.0, 0.0, 15.0),
        (15.0, -10.0, -8.0),
        (45.0, 10.0, 5.0),
    ];

    for (yaw, pitch, roll) in cases {
        let truth = Pose { yaw, pitch, roll };
        let points = render_pose_points(estimator.camera(), truth, 500.0);
        let pose = estimator.estimate(&points);

        assert!((pose.yaw - yaw).abs() < 1.0, "{truth:?} -> {pose:?}");
        assert!((pose.pitch - pitch).abs() < 1.0, "{truth:?} -> {pose:?}");
        assert!((pose.roll - roll).abs() < 1.0, "{truth:?} -> {pose:?}");
    }
}

#[test]
fn test_sign_convention() {
    let estimator = estimator();
    let right = estimator.estimate(&render_pose_points(
        estimator.camera(),
        Pose {
            yaw: 20.0,
            ..Pose::default()
        },
        500.0,
    ));
    let left = estimator.estimate(&render_pose_points(
        estimator.camera(),
        Pose {
            yaw: -20.0,
            ..Pose::default()
        },
        500.0,
    ));

    assert!(right.yaw > 0.0);
    assert!(left.yaw < 0.0);
}

#[test]
fn test_near_gimbal_lock_is_finite() {
    let estimator = estimator();

    for yaw in [85.0, 89.0, 89.9, -89.9] {
        let truth = Pose {
            yaw,
            pitch: 5.0,
            roll: 0.0,
        };
        let points = render_pose_points(estimator.camera(), truth, 500.0);
        assert_pose_finite(&estimator.estimate(&points)).unwrap();
    }

    for yaw in [90.0f64, -90.0] {
        let rotation = Rotation3::from_euler_angles(0.4, yaw.to_radians(), 0.2);
        let pose = rotation_matrix_to_euler(rotation.matrix());
        assert_pose_finite(&pose).unwrap();
        assert_eq!(pose.roll, 0.0);
    }
}

proptest! {
    #[test]
    fn prop_estimate_is_always_finite(coords in prop::array::uniform12(-2000.0f64..2000.0)) {
        let points: [Point2<f64>; 6] = std::array::from_fn(|i| Point2::new(coords[2 * i], coords[2 * i + 1]));
        let pose = estimator().estimate(&points);
        prop_assert!(pose.is_finite(), "{:?}", pose);
    }

    #[test]
    fn prop_euler_is_finite_for_any_rotation(
        x in -std::f64::consts::PI..std::f64::consts::PI,
        y in -std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2,
        z in -std::f64::consts::PI..std::f64::consts::PI,
    ) {
        let pose = rotation_matrix_to_euler(Rotation3::from_euler_angles(x, y, z).matrix());
        prop_assert!(pose.is_finite());
        prop_assert!(pose.yaw.abs() <= 90.0 + 1e-9);
    }
}
