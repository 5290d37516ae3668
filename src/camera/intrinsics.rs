//! Implements the [`CameraIntrinsics`] value type.
//!
//! The intrinsic matrix is stored together with its inverse. Both are only
//! ever written together, so [`CameraIntrinsics::matrix_inv`] always is the
//! inverse of [`CameraIntrinsics::matrix`] as of the last constructor call,
//! [`CameraIntrinsics::set_matrix`] or deserialization.
//!
//! Lens distortion follows the OpenCV rational model: radial coefficients
//! `k1..k6` and tangential coefficients `p1, p2`. Calibrations with only two
//! radial coefficients (older OpenCV releases) keep the remaining slots at zero.

use crate::camera::{CameraError, Resolution};
use log::{debug, warn};
use nalgebra::{Matrix2, Matrix3, RealField, Vector2, Vector3, Vector6};
use std::fmt;

/// Number of radial distortion slots (`k1..k6`).
pub const RADIAL_SLOTS: usize = 6;

/// Number of tangential distortion slots (`p1, p2`).
pub const TANGENTIAL_SLOTS: usize = 2;

const UNDISTORT_MAX_ITERATIONS: u32 = 100;

/// Pinhole camera intrinsics with radial and tangential lens distortion.
///
/// # Examples
///
/// ```rust
/// use nalgebra::{Matrix3, Vector2};
/// use tracking_math::camera::CameraIntrinsics;
///
/// let k = Matrix3::new(
///     461.629, 0.0, 362.680,
///     0.0, 460.152, 246.049,
///     0.0, 0.0, 1.0,
/// );
/// let intrinsics = CameraIntrinsics::with_radial2(
///     k,
///     Vector2::new(-0.2834, 0.0739),
///     Vector2::new(0.0002, 0.00002),
/// )
/// .unwrap();
///
/// assert_eq!(intrinsics.radial_size(), 2);
/// assert_eq!(intrinsics.radial(), &[-0.2834, 0.0739]);
/// assert!((intrinsics.matrix() * intrinsics.matrix_inv() - Matrix3::identity()).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics<T: RealField + Copy> {
    dimension: Resolution,
    matrix: Matrix3<T>,
    matrix_inv: Matrix3<T>,
    radial_size: usize,
    radial_params: Vector6<T>,
    tangential_params: Vector2<T>,
}

/// Inverts an intrinsic matrix, rejecting singular input.
pub(crate) fn invert<T: RealField + Copy>(matrix: Matrix3<T>) -> Result<Matrix3<T>, CameraError> {
    matrix.try_inverse().ok_or_else(|| {
        warn!("Rejecting singular intrinsic matrix: {}", matrix);
        CameraError::SingularMatrix
    })
}

impl<T: RealField + Copy> Default for CameraIntrinsics<T> {
    /// Identity intrinsics for a normalized (1x1) camera without distortion.
    fn default() -> Self {
        Self {
            dimension: Resolution::default(),
            matrix: Matrix3::identity(),
            matrix_inv: Matrix3::identity(),
            radial_size: 0,
            radial_params: Vector6::zeros(),
            tangential_params: Vector2::zeros(),
        }
    }
}

impl<T: RealField + Copy> CameraIntrinsics<T> {
    /// Creates intrinsics with two radial distortion coefficients `k1, k2`.
    ///
    /// The remaining four radial slots are zero and [`radial_size`](Self::radial_size)
    /// is 2. The dimension is the normalized 1x1.
    ///
    /// # Errors
    ///
    /// * [`CameraError::SingularMatrix`]: if `matrix` has no inverse.
    pub fn with_radial2(
        matrix: Matrix3<T>,
        radial: Vector2<T>,
        tangential: Vector2<T>,
    ) -> Result<Self, CameraError> {
        let mut radial_params = Vector6::zeros();
        radial_params[0] = radial[0];
        radial_params[1] = radial[1];
        Self::from_parts(matrix, Resolution::default(), 2, radial_params, tangential)
    }

    /// Creates intrinsics with the full six radial distortion coefficients `k1..k6`.
    ///
    /// # Errors
    ///
    /// * [`CameraError::SingularMatrix`]: if `matrix` has no inverse.
    pub fn with_radial6(
        matrix: Matrix3<T>,
        radial: Vector6<T>,
        tangential: Vector2<T>,
    ) -> Result<Self, CameraError> {
        Self::from_parts(matrix, Resolution::default(), 6, radial, tangential)
    }

    /// Assembles intrinsics from already validated parts, deriving the inverse.
    pub(crate) fn from_parts(
        matrix: Matrix3<T>,
        dimension: Resolution,
        radial_size: usize,
        radial_params: Vector6<T>,
        tangential_params: Vector2<T>,
    ) -> Result<Self, CameraError> {
        if !matches!(radial_size, 0 | 2 | 6) {
            return Err(CameraError::InvalidParams(format!(
                "radial_size must be 0, 2 or 6, got {radial_size}"
            )));
        }
        let matrix_inv = invert(matrix)?;

        // unused slots stay zero
        let mut radial = Vector6::zeros();
        for i in 0..radial_size {
            radial[i] = radial_params[i];
        }

        debug!(
            "CameraIntrinsics created: {}x{}, {} radial coefficients",
            dimension.width, dimension.height, radial_size
        );

        Ok(Self {
            dimension,
            matrix,
            matrix_inv,
            radial_size,
            radial_params: radial,
            tangential_params,
        })
    }

    /// Image dimension the calibration refers to (1x1 when normalized).
    pub fn dimension(&self) -> Resolution {
        self.dimension
    }

    pub fn set_dimension(&mut self, dimension: Resolution) {
        self.dimension = dimension;
    }

    /// The 3x3 intrinsic matrix.
    pub fn matrix(&self) -> &Matrix3<T> {
        &self.matrix
    }

    /// The cached inverse of [`matrix`](Self::matrix).
    pub fn matrix_inv(&self) -> &Matrix3<T> {
        &self.matrix_inv
    }

    /// Replaces the intrinsic matrix and re-derives its inverse.
    ///
    /// On error the intrinsics are left untouched.
    pub fn set_matrix(&mut self, matrix: Matrix3<T>) -> Result<(), CameraError> {
        self.matrix_inv = invert(matrix)?;
        self.matrix = matrix;
        Ok(())
    }

    /// Number of populated radial coefficients: 0, 2 or 6.
    pub fn radial_size(&self) -> usize {
        self.radial_size
    }

    /// All six radial slots; only the first [`radial_size`](Self::radial_size) are meaningful.
    pub fn radial_params(&self) -> &Vector6<T> {
        &self.radial_params
    }

    /// The populated radial coefficients.
    pub fn radial(&self) -> &[T] {
        &self.radial_params.as_slice()[..self.radial_size]
    }

    pub fn tangential_params(&self) -> &Vector2<T> {
        &self.tangential_params
    }

    /// Radial factor `(1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)`
    /// and its derivative with respect to `r²`.
    fn radial_factor(&self, r2: T) -> (T, T) {
        let k = &self.radial_params;
        let one = T::one();
        let two: T = nalgebra::convert(2.0);
        let three: T = nalgebra::convert(3.0);
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let num = one + k[0] * r2 + k[1] * r4 + k[2] * r6;
        let den = one + k[3] * r2 + k[4] * r4 + k[5] * r6;
        let d_num = k[0] + two * k[1] * r2 + three * k[2] * r4;
        let d_den = k[3] + two * k[4] * r2 + three * k[5] * r4;

        (num / den, (d_num * den - num * d_den) / (den * den))
    }

    /// Applies lens distortion to a point on the normalized image plane.
    pub fn distort(&self, normalized: &Vector2<T>) -> Vector2<T> {
        let two: T = nalgebra::convert(2.0);
        let p1 = self.tangential_params[0];
        let p2 = self.tangential_params[1];
        let x = normalized.x;
        let y = normalized.y;
        let r2 = x * x + y * y;
        let (radial, _) = self.radial_factor(r2);

        Vector2::new(
            x * radial + two * p1 * x * y + p2 * (r2 + two * x * x),
            y * radial + p1 * (r2 + two * y * y) + two * p2 * x * y,
        )
    }

    /// Removes lens distortion from a point on the normalized image plane.
    ///
    /// Solves `distort(p) = distorted` with Newton's method, starting from the
    /// distorted point itself.
    ///
    /// # Errors
    ///
    /// * [`CameraError::NumericalError`]: if the Jacobian becomes singular or the
    ///   iteration does not converge.
    pub fn undistort(&self, distorted: &Vector2<T>) -> Result<Vector2<T>, CameraError> {
        let two: T = nalgebra::convert(2.0);
        let six: T = nalgebra::convert(6.0);
        let tolerance = RealField::max(
            nalgebra::convert::<f64, T>(1e-9),
            T::default_epsilon() * nalgebra::convert(16.0),
        );
        let p1 = self.tangential_params[0];
        let p2 = self.tangential_params[1];

        let mut point = *distorted;
        for _ in 0..UNDISTORT_MAX_ITERATIONS {
            let error = self.distort(&point) - distorted;
            if error.norm() < tolerance {
                return Ok(point);
            }

            let x = point.x;
            let y = point.y;
            let (radial, d_radial) = self.radial_factor(x * x + y * y);
            let d_radial_dx = d_radial * two * x;
            let d_radial_dy = d_radial * two * y;

            let jacobian = Matrix2::new(
                radial + x * d_radial_dx + two * p1 * y + six * p2 * x,
                x * d_radial_dy + two * p1 * x + two * p2 * y,
                y * d_radial_dx + two * p1 * x + two * p2 * y,
                radial + y * d_radial_dy + six * p1 * y + two * p2 * x,
            );

            let inv_jacobian = jacobian.try_inverse().ok_or_else(|| {
                CameraError::NumericalError("Jacobian is singular".to_string())
            })?;
            let delta = inv_jacobian * error;
            point -= delta;

            if delta.norm() < tolerance {
                return Ok(point);
            }
        }

        warn!(
            "Undistortion of ({}, {}) did not converge",
            distorted.x, distorted.y
        );
        Err(CameraError::NumericalError(format!(
            "Undistortion did not converge after {UNDISTORT_MAX_ITERATIONS} iterations."
        )))
    }

    /// Projects a 3D point in camera coordinates to image coordinates.
    ///
    /// The point is divided by its depth, distorted, and mapped through the
    /// intrinsic matrix. Negative depths are accepted, so matrices using a
    /// camera looking down the negative z axis work as well.
    ///
    /// # Errors
    ///
    /// * [`CameraError::PointAtCameraCenter`]: if the depth is close to zero.
    pub fn project(&self, point: &Vector3<T>) -> Result<Vector2<T>, CameraError> {
        let limit = T::default_epsilon().sqrt();
        if point.z.abs() < limit {
            return Err(CameraError::PointAtCameraCenter);
        }
        let distorted = self.distort(&Vector2::new(point.x / point.z, point.y / point.z));
        let image = self.matrix * distorted.push(T::one());
        if image.z.abs() < limit {
            return Err(CameraError::NumericalError(
                "Projection maps to the line at infinity".to_string(),
            ));
        }
        Ok(Vector2::new(image.x / image.z, image.y / image.z))
    }

    /// Unprojects image coordinates to a unit viewing ray.
    ///
    /// The ray is `(x, y, 1) / |(x, y, 1)|` for the undistorted normalized
    /// coordinates `(x, y)`, flipped when the inverse matrix maps the pixel to a
    /// negative depth. So for a matrix looking down the negative z axis the ray
    /// points at the projected scene. A point behind a regular camera projects
    /// to the same pixel as its mirror in front, and unprojects to the front ray.
    ///
    /// # Errors
    ///
    /// * [`CameraError::NumericalError`]: if the pixel maps to infinity or
    ///   undistortion fails.
    pub fn unproject(&self, pixel: &Vector2<T>) -> Result<Vector3<T>, CameraError> {
        let ray = self.matrix_inv * pixel.push(T::one());
        if ray.z.abs() < T::default_epsilon().sqrt() {
            return Err(CameraError::NumericalError(
                "Pixel unprojects to the line at infinity".to_string(),
            ));
        }
        let undistorted = self.undistort(&Vector2::new(ray.x / ray.z, ray.y / ray.z))?;
        let direction = undistorted.push(T::one()).normalize();
        if ray.z < T::zero() {
            Ok(-direction)
        } else {
            Ok(direction)
        }
    }
}

impl<T: RealField + Copy> fmt::Display for CameraIntrinsics<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix:")?;
        write!(f, "{}", self.matrix)?;
        writeln!(
            f,
            "Resolution: {}x{}",
            self.dimension.width, self.dimension.height
        )?;
        if self.radial_size == 0 {
            writeln!(f, "Distortion radial: none")?;
        } else {
            let radial = self
                .radial()
                .iter()
                .map(|k| k.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "Distortion radial: {radial}")?;
        }
        writeln!(
            f,
            "Distortion tangential: {}, {}",
            self.tangential_params[0], self.tangential_params[1]
        )
    }
}
