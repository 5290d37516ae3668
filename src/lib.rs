//! Tracking Math Library
//!
//! Math primitives shared by camera tracking code:
//! - Pinhole camera intrinsics with radial-tangential distortion, including
//!   YAML/JSON archives and Kalibr calibration import
//! - Point transformation by fixed-size matrices with implicit homogeneous
//!   padding
//! - Rigid body poses (rotation + translation) with composition, inversion and
//!   interpolation
//! - Two-view epipolar geometry (fundamental matrices)

pub mod camera;
pub mod epipolar;
pub mod geometry;
pub mod pose;

// Re-export commonly used types
pub use camera::{CameraError, CameraIntrinsics, Resolution};

pub use epipolar::{
    estimate_fundamental_matrix, fundamental_matrix_from_poses, hom_matrix_diff, EpipolarError,
};

pub use geometry::{transform_point, transform_points, TransformPoint};

pub use pose::{linear_interpolate, Pose};
