//! Constants used throughout the application

/// Number of canonical landmarks used for head pose
pub const NUM_POSE_LANDMARKS: usize = 6;

/// Number of contour points per eye
pub const NUM_EYE_POINTS: usize = 6;

/// Default expected frame size
pub const DEFAULT_IMG_WIDTH: u32 = 640;
pub const DEFAULT_IMG_HEIGHT: u32 = 480;

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: f64 = 2.0;

/// Default head pose thresholds in degrees
pub const DEFAULT_YAW_THRESHOLD: f64 = 15.0;
pub const DEFAULT_PITCH_THRESHOLD: f64 = 15.0;

/// Eye aspect ratio below which eyes are considered closed
pub const DEFAULT_EAR_THRESHOLD: f64 = 0.22;

/// Score multipliers applied by the attention policy
pub const DEFAULT_HEAD_AWAY_PENALTY: f64 = 0.5;
pub const DEFAULT_EYES_CLOSED_PENALTY: f64 = 0.2;

/// Rolling window size per identity
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// Number of records returned by a history query when no limit is given
pub const DEFAULT_QUERY_LIMIT: usize = 20;

/// Below this `sqrt(R00² + R10²)` the rotation is treated as gimbal-locked
pub const SINGULARITY_THRESHOLD: f64 = 1e-6;

/// Landmarks whose covariance eigenvalue ratio falls below this are collinear
pub const COLLINEARITY_THRESHOLD: f64 = 1e-6;

/// Minimum camera-space depth (mm) for a projectable point
pub const MIN_DEPTH: f64 = 1e-3;

/// Levenberg-Marquardt solver limits
pub const LM_MAX_ITERATIONS: usize = 100;
pub const LM_INITIAL_LAMBDA: f64 = 1e-3;
pub const LM_MIN_LAMBDA: f64 = 1e-12;
pub const LM_MAX_LAMBDA: f64 = 1e10;
pub const LM_STEP_TOLERANCE: f64 = 1e-10;
pub const LM_COST_TOLERANCE: f64 = 1e-12;

/// Initial yaw/pitch guesses (degrees) tried by the pose solver
pub const POSE_SEEDS_DEG: [(f64, f64); 7] = [
    (0.0, 0.0),
    (35.0, 0.0),
    (-35.0, 0.0),
    (0.0, 35.0),
    (0.0, -35.0),
    (60.0, 0.0),
    (-60.0, 0.0),
];

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
