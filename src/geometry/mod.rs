//! Spatial transformation of points by fixed-size matrices.
//!
//! See [`transform`] for the supported matrix and point shapes.

pub mod transform;

pub use transform::{
    transform_point, transform_points, transform_points_in_place, transform_points_into,
    TransformPoint,
};
