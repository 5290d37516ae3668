//! Camera intrinsics and lens distortion.
//!
//! This module provides [`CameraIntrinsics`], a compact value type bundling the
//! 3x3 intrinsic matrix (with its cached inverse), the calibration image
//! dimension and the radial/tangential distortion coefficients of a camera.
//! It is meant as the one representation handed between modules that need to
//! project, unproject or persist camera calibrations.
//!
//! The persisted form is implemented in [`archive`] on top of `serde`, with
//! YAML and JSON helpers and a Kalibr `cam0` importer.

pub mod archive;
pub mod intrinsics;

pub use intrinsics::{CameraIntrinsics, RADIAL_SLOTS, TANGENTIAL_SLOTS};

/// Image dimension a calibration refers to.
///
/// A dimension of 1x1 signals a normalized calibration, i.e. the intrinsic
/// matrix maps to normalized rather than pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: usize,
    pub height: usize,
}

impl Resolution {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Returns `true` for the 1x1 "normalized" dimension.
    pub fn is_normalized(&self) -> bool {
        self.width == 1 && self.height == 1
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CameraError {
    #[error("Intrinsic matrix is singular and cannot be inverted")]
    SingularMatrix,
    #[error("z is close to zero, point is at camera center")]
    PointAtCameraCenter,
    #[error("Numerical error in computation: {0}")]
    NumericalError(String),
    #[error("Invalid camera parameters: {0}")]
    InvalidParams(String),
    #[error("Failed to load YAML: {0}")]
    YamlError(String),
    #[error("Failed to process JSON: {0}")]
    JsonError(String),
    #[error("IO Error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for CameraError {
    fn from(err: std::io::Error) -> Self {
        CameraError::IOError(err.to_string())
    }
}

impl From<yaml_rust::ScanError> for CameraError {
    fn from(err: yaml_rust::ScanError) -> Self {
        CameraError::YamlError(err.to_string())
    }
}

impl From<serde_yaml::Error> for CameraError {
    fn from(err: serde_yaml::Error) -> Self {
        CameraError::YamlError(err.to_string())
    }
}

impl From<serde_json::Error> for CameraError {
    fn from(err: serde_json::Error) -> Self {
        CameraError::JsonError(err.to_string())
    }
}
