//! Rigid-body poses: a rotation followed by a translation.
//!
//! A [`Pose`] maps a point `x` to `r * x + t`. Poses compose with `*`
//! (`a * b` applies `b` first, then `a`), invert with [`Pose::inverse`], act on
//! 3D points with `pose * point`, and interpolate with [`linear_interpolate`].

use nalgebra::{
    Isometry3, Matrix3, Matrix3x4, Matrix4, Rotation3, Translation3, UnitQuaternion, Vector3,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Mul;

const ROTATION_REFINE_ITERATIONS: usize = 100;

/// A rigid transformation between two coordinate frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    rotation: UnitQuaternion<f64>,
    translation: Vector3<f64>,
}

impl Pose {
    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The pose that leaves every point unchanged.
    pub fn identity() -> Self {
        Self::new(UnitQuaternion::identity(), Vector3::zeros())
    }

    /// Builds a pose from a 4x4 homogeneous transformation.
    ///
    /// The rotation is the closest rotation to the upper-left 3x3 block, which
    /// tolerates scaled or slightly non-orthonormal blocks. The first three
    /// entries of the last column are the translation. The bottom row is ignored.
    pub fn from_matrix4(matrix: &Matrix4<f64>) -> Self {
        Self::from_blocks(
            &matrix.fixed_view::<3, 3>(0, 0).into_owned(),
            Vector3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]),
        )
    }

    /// Builds a pose from a 3x4 `[R | t]` transformation.
    pub fn from_matrix3x4(matrix: &Matrix3x4<f64>) -> Self {
        Self::from_blocks(
            &matrix.fixed_view::<3, 3>(0, 0).into_owned(),
            matrix.column(3).into_owned(),
        )
    }

    fn from_blocks(block: &Matrix3<f64>, translation: Vector3<f64>) -> Self {
        let guess = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*block));
        let guess = UnitQuaternion::new_normalize(guess.into_inner());
        // refine onto the closest rotation so drifting blocks stay unit length
        let rotation = UnitQuaternion::from_matrix_eps(
            block,
            f64::EPSILON,
            ROTATION_REFINE_ITERATIONS,
            guess,
        );
        Self::new(rotation, translation)
    }

    pub fn rotation(&self) -> &UnitQuaternion<f64> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// The algebraic inverse: `pose * pose.inverse()` is the identity.
    pub fn inverse(&self) -> Self {
        let rotation_inv = self.rotation.inverse();
        Self::new(rotation_inv, -(rotation_inv * self.translation))
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }

    /// The 4x4 homogeneous matrix of this pose.
    pub fn to_matrix4(&self) -> Matrix4<f64> {
        self.to_isometry().to_homogeneous()
    }

    /// The 3x4 `[R | t]` matrix of this pose.
    pub fn to_matrix3x4(&self) -> Matrix3x4<f64> {
        self.to_matrix4().fixed_view::<3, 4>(0, 0).into_owned()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<&Matrix4<f64>> for Pose {
    fn from(matrix: &Matrix4<f64>) -> Self {
        Pose::from_matrix4(matrix)
    }
}

impl From<&Matrix3x4<f64>> for Pose {
    fn from(matrix: &Matrix3x4<f64>) -> Self {
        Pose::from_matrix3x4(matrix)
    }
}

impl From<&Pose> for Matrix4<f64> {
    fn from(pose: &Pose) -> Self {
        pose.to_matrix4()
    }
}

impl From<&Pose> for Matrix3x4<f64> {
    fn from(pose: &Pose) -> Self {
        pose.to_matrix3x4()
    }
}

impl<'a> Mul<&'a Pose> for &'a Pose {
    type Output = Pose;

    /// Composition: applies `rhs` first, then `self`.
    fn mul(self, rhs: &'a Pose) -> Pose {
        Pose::new(
            self.rotation * rhs.rotation,
            self.rotation * rhs.translation + self.translation,
        )
    }
}

impl Mul<Pose> for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        &self * &rhs
    }
}

impl Mul<Vector3<f64>> for &Pose {
    type Output = Vector3<f64>;

    fn mul(self, point: Vector3<f64>) -> Vector3<f64> {
        self.rotation * point + self.translation
    }
}

impl Mul<Vector3<f64>> for Pose {
    type Output = Vector3<f64>;

    fn mul(self, point: Vector3<f64>) -> Vector3<f64> {
        &self * point
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = &self.translation;
        let q = self.rotation.quaternion();
        write!(
            f,
            "[{}, {}, {}] [{}, {}, {}, {}]",
            t.x, t.y, t.z, q.w, q.i, q.j, q.k
        )
    }
}

/// Interpolates between two poses.
///
/// The rotation follows the spherical interpolation of `x` and `y`, the
/// translation the linear one. `t = 0` yields `x` and `t = 1` yields `y`;
/// other values outside `[0, 1]` extrapolate.
pub fn linear_interpolate(x: &Pose, y: &Pose, t: f64) -> Pose {
    let rotation = x
        .rotation
        .try_slerp(&y.rotation, t, f64::EPSILON)
        .unwrap_or_else(|| x.rotation.nlerp(&y.rotation, t));
    Pose::new(rotation, x.translation.lerp(&y.translation, t))
}
