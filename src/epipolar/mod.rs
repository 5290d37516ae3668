//! Two-view epipolar geometry.
//!
//! Provides the fundamental matrix induced by two camera poses, its linear
//! estimation from point correspondences, and a scale-invariant distance to
//! compare homogeneous matrices.

pub mod fundamental;

pub use fundamental::{
    estimate_fundamental_matrix, fundamental_matrix_from_poses, hom_matrix_diff,
    MIN_CORRESPONDENCES,
};

#[derive(thiserror::Error, Debug)]
pub enum EpipolarError {
    #[error("Matrix singularity detected")]
    SingularMatrix,
    #[error("At least 8 correspondences are required, got {0}")]
    NotEnoughCorrespondences(usize),
    #[error("Correspondence count mismatch: {from} source points, {to} target points")]
    LengthMismatch { from: usize, to: usize },
    #[error("Decomposition failed: {0}")]
    DecompositionFailed(String),
}
