//! Fundamental matrix computation and estimation.
//!
//! All matrices follow the convention `x2ᵀ F x1 = 0`, where `x1` is a point in
//! the first ("from") image and `x2` its correspondence in the second ("to")
//! image, both in homogeneous pixel coordinates.

use crate::epipolar::EpipolarError;
use crate::pose::Pose;
use log::info;
use nalgebra::{DMatrix, Matrix3, SMatrix, Vector2, Vector3};

/// Minimum number of correspondences for the 8-point algorithm.
pub const MIN_CORRESPONDENCES: usize = 8;

/// Fundamental matrix between two cameras `x1 = K1 [R1 | t1] X` and
/// `x2 = K2 [R2 | t2] X`.
///
/// The poses map world coordinates into each camera frame. With the relative
/// motion `R = R2 R1ᵀ`, `t = t2 - R t1` the result is `K2⁻ᵀ [t]ₓ R K1⁻¹`.
///
/// # Errors
///
/// * [`EpipolarError::SingularMatrix`]: if either intrinsic matrix is singular.
pub fn fundamental_matrix_from_poses(
    pose1: &Pose,
    pose2: &Pose,
    k1: &Matrix3<f64>,
    k2: &Matrix3<f64>,
) -> Result<Matrix3<f64>, EpipolarError> {
    let k1_inv = k1.try_inverse().ok_or(EpipolarError::SingularMatrix)?;
    let k2_inv = k2.try_inverse().ok_or(EpipolarError::SingularMatrix)?;

    let relative = pose2 * &pose1.inverse();
    let rotation = relative.rotation().to_rotation_matrix().into_inner();
    let essential = relative.translation().cross_matrix() * rotation;

    Ok(k2_inv.transpose() * essential * k1_inv)
}

/// Similarity transform moving the centroid to the origin with a mean
/// distance of `sqrt(2)`.
fn normalization(points: &[Vector2<f64>]) -> Matrix3<f64> {
    let n = points.len() as f64;
    let centroid = points.iter().fold(Vector2::zeros(), |acc, p| acc + p) / n;
    let mean_dist = points.iter().map(|p| (p - centroid).norm()).sum::<f64>() / n;
    let scale = if mean_dist > f64::EPSILON {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    Matrix3::new(
        scale,
        0.0,
        -scale * centroid.x,
        0.0,
        scale,
        -scale * centroid.y,
        0.0,
        0.0,
        1.0,
    )
}

fn apply(transform: &Matrix3<f64>, point: &Vector2<f64>) -> Vector3<f64> {
    transform * Vector3::new(point.x, point.y, 1.0)
}

/// Estimates the fundamental matrix with the normalized 8-point algorithm.
///
/// The points are normalized, the linear system is solved through its SVD
/// null vector, rank 2 is enforced, and the normalization is undone. The
/// result is scaled to unit Frobenius norm.
///
/// # Errors
///
/// * [`EpipolarError::LengthMismatch`]: if `from` and `to` differ in length.
/// * [`EpipolarError::NotEnoughCorrespondences`]: for fewer than
///   [`MIN_CORRESPONDENCES`] pairs.
/// * [`EpipolarError::DecompositionFailed`]: if an SVD could not be computed.
pub fn estimate_fundamental_matrix(
    from: &[Vector2<f64>],
    to: &[Vector2<f64>],
) -> Result<Matrix3<f64>, EpipolarError> {
    if from.len() != to.len() {
        return Err(EpipolarError::LengthMismatch {
            from: from.len(),
            to: to.len(),
        });
    }
    if from.len() < MIN_CORRESPONDENCES {
        return Err(EpipolarError::NotEnoughCorrespondences(from.len()));
    }

    let t_from = normalization(from);
    let t_to = normalization(to);

    // zero rows keep the system square for exactly 8 points
    let rows = from.len().max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (p, q)) in from.iter().zip(to).enumerate() {
        let x = apply(&t_from, p);
        let xp = apply(&t_to, q);
        let row = [
            xp.x * x.x,
            xp.x * x.y,
            xp.x * x.z,
            xp.y * x.x,
            xp.y * x.y,
            xp.y * x.z,
            xp.z * x.x,
            xp.z * x.y,
            xp.z * x.z,
        ];
        for (j, value) in row.iter().enumerate() {
            a[(i, j)] = *value;
        }
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.as_ref().ok_or_else(|| {
        EpipolarError::DecompositionFailed("SVD of the design matrix".to_string())
    })?;
    let null = v_t.row(svd.singular_values.imin());
    let f_hat = Matrix3::from_row_slice(&null.iter().copied().collect::<Vec<_>>());

    let svd = f_hat.svd(true, true);
    let (u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => {
            return Err(EpipolarError::DecompositionFailed(
                "SVD of the rank-3 estimate".to_string(),
            ))
        }
    };
    let mut singular_values = svd.singular_values;
    let smallest = singular_values.imin();
    singular_values[smallest] = 0.0;
    let f_rank2 = u * Matrix3::from_diagonal(&singular_values) * v_t;

    let f = t_to.transpose() * f_rank2 * t_from;
    info!(
        "Estimated fundamental matrix from {} correspondences",
        from.len()
    );
    Ok(f / f.norm())
}

/// Distance between two homogeneous matrices, ignoring scale and sign.
///
/// Both matrices are scaled to unit Frobenius norm and the smaller of
/// `|a - b|` and `|a + b|` is returned, so matrices equal up to a non-zero
/// factor are at distance 0. A zero matrix is at distance 0 from another zero
/// matrix and 1 from anything else.
pub fn hom_matrix_diff<const R: usize, const C: usize>(
    a: &SMatrix<f64, R, C>,
    b: &SMatrix<f64, R, C>,
) -> f64 {
    let norm_a = a.norm();
    let norm_b = b.norm();
    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 0.0,
        (true, false) | (false, true) => 1.0,
        (false, false) => {
            let a = a / norm_a;
            let b = b / norm_b;
            (a - b).norm().min((a + b).norm())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TransformPoint;
    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix3x4, UnitQuaternion};

    fn camera_matrix() -> Matrix3<f64> {
        Matrix3::new(500.0, 0.0, 320.0, 0.0, 500.0, 240.0, 0.0, 0.0, 1.0)
    }

    fn world_points() -> Vec<Vector3<f64>> {
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..4 {
                let depth = 5.0 + ((i * 7 + j * 3) % 5) as f64 * 0.4;
                points.push(Vector3::new(
                    (i as f64 - 2.0) * 0.5,
                    (j as f64 - 1.5) * 0.5,
                    depth,
                ));
            }
        }
        points
    }

    fn project(camera: &Matrix3x4<f64>, point: &Vector3<f64>) -> Vector2<f64> {
        let x = camera.apply_to(point);
        Vector2::new(x.x / x.z, x.y / x.z)
    }

    fn two_views() -> (Pose, Pose, Vec<Vector2<f64>>, Vec<Vector2<f64>>) {
        let pose1 = Pose::identity();
        let pose2 = Pose::new(
            UnitQuaternion::from_euler_angles(0.02, 0.1, -0.03),
            Vector3::new(-1.0, 0.2, 0.1),
        );
        let k = camera_matrix();
        let camera1 = k * pose1.to_matrix3x4();
        let camera2 = k * pose2.to_matrix3x4();

        let points = world_points();
        let from = points.iter().map(|p| project(&camera1, p)).collect();
        let to = points.iter().map(|p| project(&camera2, p)).collect();
        (pose1, pose2, from, to)
    }

    fn epipolar_residual(f: &Matrix3<f64>, p: &Vector2<f64>, q: &Vector2<f64>) -> f64 {
        Vector3::new(q.x, q.y, 1.0).dot(&(f * Vector3::new(p.x, p.y, 1.0)))
    }

    #[test]
    fn test_fundamental_from_poses_satisfies_constraint() {
        let (pose1, pose2, from, to) = two_views();
        let k = camera_matrix();
        let f = fundamental_matrix_from_poses(&pose1, &pose2, &k, &k).unwrap();
        let f = f / f.norm();

        for (p, q) in from.iter().zip(&to) {
            assert_abs_diff_eq!(epipolar_residual(&f, p, q), 0.0, epsilon = 1e-8);
        }
        assert_abs_diff_eq!(f.determinant(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_estimate_recovers_pose_fundamental() {
        let (pose1, pose2, from, to) = two_views();
        let k = camera_matrix();

        let expected = fundamental_matrix_from_poses(&pose1, &pose2, &k, &k).unwrap();
        let estimated = estimate_fundamental_matrix(&from, &to).unwrap();

        assert!(hom_matrix_diff(&expected, &estimated) < 1e-6);
        assert_abs_diff_eq!(estimated.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(estimated.determinant(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_estimate_with_minimal_set() {
        let (pose1, pose2, from, to) = two_views();
        let k = camera_matrix();

        let picked = [1, 4, 7, 10, 13, 16, 19, 2];
        let from: Vec<_> = picked.iter().map(|&i| from[i]).collect();
        let to: Vec<_> = picked.iter().map(|&i| to[i]).collect();

        let expected = fundamental_matrix_from_poses(&pose1, &pose2, &k, &k).unwrap();
        let estimated = estimate_fundamental_matrix(&from, &to).unwrap();
        assert!(hom_matrix_diff(&expected, &estimated) < 1e-6);
    }

    #[test]
    fn test_estimate_input_errors() {
        let points = vec![Vector2::new(1.0, 2.0); 7];
        assert!(matches!(
            estimate_fundamental_matrix(&points, &points),
            Err(EpipolarError::NotEnoughCorrespondences(7))
        ));

        let more = vec![Vector2::new(1.0, 2.0); 9];
        assert!(matches!(
            estimate_fundamental_matrix(&points, &more),
            Err(EpipolarError::LengthMismatch { from: 7, to: 9 })
        ));
    }

    #[test]
    fn test_singular_intrinsics_are_rejected() {
        let singular = Matrix3::zeros();
        let result =
            fundamental_matrix_from_poses(&Pose::identity(), &Pose::identity(), &singular, &singular);
        assert!(matches!(result, Err(EpipolarError::SingularMatrix)));
    }

    #[test]
    fn test_hom_matrix_diff_ignores_scale_and_sign() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0);
        assert_abs_diff_eq!(hom_matrix_diff(&m, &(m * 3.5)), 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(hom_matrix_diff(&m, &(m * -0.25)), 0.0, epsilon = 1e-15);
        assert!(hom_matrix_diff(&m, &Matrix3::identity()) > 0.1);

        assert_eq!(hom_matrix_diff(&Matrix3::zeros(), &Matrix3::zeros()), 0.0);
        assert_eq!(hom_matrix_diff(&Matrix3::zeros(), &m), 1.0);
    }
}
