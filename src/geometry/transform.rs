//! Functions to spatially transform 2D, 3D and homogeneous points.
//!
//! A transformation matrix of shape 2x3, 3x3, 3x4 or 4x4 is applied to a point
//! as a plain matrix-vector product. Points with fewer coordinates than the
//! matrix has columns are padded in homogeneous fashion:
//!
//! | Matrix  | Point        | Output | Padded point        |
//! |---------|--------------|--------|---------------------|
//! | 2x3     | 2D           | 2D     | `(x, y, 1)`         |
//! | 2x3     | 3D           | 2D     | `(x, y, z)`         |
//! | 3x3     | 2D           | 3D     | `(x, y, 1)`         |
//! | 3x3     | 3D           | 3D     | `(x, y, z)`         |
//! | 3x4     | 2D           | 3D     | `(x, y, 0, 1)`      |
//! | 3x4     | 3D           | 3D     | `(x, y, z, 1)`      |
//! | 3x4     | 4D           | 3D     | `(x, y, z, w)`      |
//! | 4x4     | 2D           | 4D     | `(x, y, 0, 1)`      |
//! | 4x4     | 3D           | 4D     | `(x, y, z, 1)`      |
//! | 4x4     | 4D           | 4D     | `(x, y, z, w)`      |
//!
//! Every supported pair is an implementation of [`TransformPoint`], so any other
//! combination, or mixing `f32` and `f64`, does not compile:
//!
//! ```compile_fail
//! use nalgebra::{Matrix2x3, Vector4};
//! use tracking_math::geometry::TransformPoint;
//!
//! let m = Matrix2x3::<f64>::zeros();
//! let _ = m.apply_to(&Vector4::new(1.0, 2.0, 3.0, 1.0));
//! ```

use nalgebra::{
    Matrix2x3, Matrix3, Matrix3x4, Matrix4, RealField, Vector2, Vector3, Vector4,
};

/// Applies a transformation matrix to a point of type `P`.
///
/// The output always has as many coordinates as the matrix has rows.
pub trait TransformPoint<P> {
    type Output;

    fn apply_to(&self, point: &P) -> Self::Output;
}

macro_rules! impl_transform_point {
    ($matrix:ident, $point:ident => $output:ident, |$p:ident| $padded:expr) => {
        impl<T: RealField + Copy> TransformPoint<$point<T>> for $matrix<T> {
            type Output = $output<T>;

            #[inline]
            fn apply_to(&self, $p: &$point<T>) -> $output<T> {
                self * $padded
            }
        }
    };
}

impl_transform_point!(Matrix2x3, Vector2 => Vector2, |p| Vector3::new(p.x, p.y, T::one()));
impl_transform_point!(Matrix2x3, Vector3 => Vector2, |p| p);

impl_transform_point!(Matrix3, Vector2 => Vector3, |p| Vector3::new(p.x, p.y, T::one()));
impl_transform_point!(Matrix3, Vector3 => Vector3, |p| p);

impl_transform_point!(Matrix3x4, Vector2 => Vector3, |p| Vector4::new(p.x, p.y, T::zero(), T::one()));
impl_transform_point!(Matrix3x4, Vector3 => Vector3, |p| Vector4::new(p.x, p.y, p.z, T::one()));
impl_transform_point!(Matrix3x4, Vector4 => Vector3, |p| p);

impl_transform_point!(Matrix4, Vector2 => Vector4, |p| Vector4::new(p.x, p.y, T::zero(), T::one()));
impl_transform_point!(Matrix4, Vector3 => Vector4, |p| Vector4::new(p.x, p.y, p.z, T::one()));
impl_transform_point!(Matrix4, Vector4 => Vector4, |p| p);

/// Transforms a single point, see [`TransformPoint`].
///
/// # Examples
///
/// ```rust
/// use nalgebra::{Matrix3, Vector2, Vector3};
/// use tracking_math::geometry::transform_point;
///
/// let p = transform_point(&Matrix3::<f64>::identity(), &Vector2::new(1.0, 2.0));
/// assert_eq!(p, Vector3::new(1.0, 2.0, 1.0));
/// ```
#[inline]
pub fn transform_point<M, P>(matrix: &M, point: &P) -> M::Output
where
    M: TransformPoint<P>,
{
    matrix.apply_to(point)
}

/// Lazily transforms a sequence of points.
///
/// Accepts anything iterable over `&P` (slices, `Vec`, `VecDeque`, sets, ...).
/// The outputs come in input order, one per input point.
pub fn transform_points<'a, M, P, I>(
    matrix: &'a M,
    points: I,
) -> impl Iterator<Item = M::Output> + 'a
where
    M: TransformPoint<P>,
    P: 'a,
    I: IntoIterator<Item = &'a P>,
    I::IntoIter: 'a,
{
    points
        .into_iter()
        .map(move |point| matrix.apply_to(point))
}

/// Transforms a sequence of points and appends the results to `out`.
///
/// # Examples
///
/// ```rust
/// use nalgebra::{Matrix3x4, Vector3};
/// use tracking_math::geometry::transform_points_into;
///
/// let translation = Matrix3x4::new(
///     1.0, 0.0, 0.0, 1.0,
///     0.0, 1.0, 0.0, 2.0,
///     0.0, 0.0, 1.0, 3.0,
/// );
/// let points = vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0)];
/// let mut moved = Vec::with_capacity(points.len());
/// transform_points_into(&translation, &points, &mut moved);
///
/// assert_eq!(moved, vec![Vector3::new(1.0, 2.0, 3.0), Vector3::new(2.0, 3.0, 4.0)]);
/// ```
pub fn transform_points_into<'a, M, P, I, E>(matrix: &'a M, points: I, out: &mut E)
where
    M: TransformPoint<P>,
    P: 'a,
    I: IntoIterator<Item = &'a P>,
    I::IntoIter: 'a,
    E: Extend<M::Output>,
{
    out.extend(transform_points(matrix, points));
}

/// Transforms points in place, for matrices whose output type equals the input type.
pub fn transform_points_in_place<M, P>(matrix: &M, points: &mut [P])
where
    M: TransformPoint<P, Output = P>,
{
    for point in points.iter_mut() {
        *point = matrix.apply_to(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn counting_3x4() -> Matrix3x4<f64> {
        Matrix3x4::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0)
    }

    fn counting_4x4() -> Matrix4<f64> {
        Matrix4::new(
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
        )
    }

    #[test]
    fn test_identity_3x3_on_2d_point() {
        let p = Matrix3::<f64>::identity().apply_to(&Vector2::new(1.0, 2.0));
        assert_eq!(p, Vector3::new(1.0, 2.0, 1.0));
    }

    #[test]
    fn test_2x3() {
        let m = Matrix2x3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        // (1, 1, 1)
        assert_eq!(m.apply_to(&Vector2::new(1.0, 1.0)), Vector2::new(6.0, 15.0));
        assert_eq!(
            m.apply_to(&Vector3::new(1.0, 1.0, 2.0)),
            Vector2::new(9.0, 21.0)
        );
    }

    #[test]
    fn test_3x3() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        assert_eq!(
            m.apply_to(&Vector2::new(1.0, -1.0)),
            Vector3::new(2.0, 5.0, 8.0)
        );
        assert_eq!(
            m.apply_to(&Vector3::new(1.0, 0.0, 2.0)),
            Vector3::new(7.0, 16.0, 25.0)
        );
    }

    #[test]
    fn test_3x4_pads_2d_with_zero_and_one() {
        let m = counting_3x4();
        // third column is skipped, fourth column is added
        assert_eq!(
            m.apply_to(&Vector2::new(1.0, 1.0)),
            Vector3::new(7.0, 19.0, 31.0)
        );
        assert_eq!(
            m.apply_to(&Vector3::new(1.0, 1.0, 1.0)),
            Vector3::new(10.0, 26.0, 42.0)
        );
        assert_eq!(
            m.apply_to(&Vector4::new(1.0, 1.0, 1.0, 2.0)),
            Vector3::new(14.0, 34.0, 54.0)
        );
    }

    #[test]
    fn test_4x4() {
        let m = counting_4x4();
        assert_eq!(
            m.apply_to(&Vector2::new(1.0, 1.0)),
            Vector4::new(7.0, 19.0, 31.0, 43.0)
        );
        assert_eq!(
            m.apply_to(&Vector3::new(1.0, 1.0, 1.0)),
            Vector4::new(10.0, 26.0, 42.0, 58.0)
        );
        // every entry of the last row contributes
        assert_eq!(
            m.apply_to(&Vector4::new(0.0, 0.0, 1.0, 0.0)),
            Vector4::new(3.0, 7.0, 11.0, 15.0)
        );
        assert_eq!(
            m.apply_to(&Vector4::new(1.0, 2.0, 3.0, 4.0)),
            m * Vector4::new(1.0, 2.0, 3.0, 4.0)
        );
    }

    #[test]
    fn test_homogeneous_agrees_with_padded() {
        let m = counting_4x4();
        let p = Vector3::new(0.5, -1.5, 2.0);
        assert_eq!(
            m.apply_to(&p),
            m.apply_to(&Vector4::new(p.x, p.y, p.z, 1.0))
        );
    }

    #[test]
    fn test_f32() {
        let m = Matrix3::<f32>::new(2.0, 0.0, 1.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0);
        assert_eq!(
            transform_point(&m, &Vector2::new(1.0f32, 2.0)),
            Vector3::new(3.0f32, 5.0, 1.0)
        );
    }

    #[test]
    fn test_bulk_matches_single_point_loop() {
        let m = counting_3x4();
        let points: Vec<Vector3<f64>> = (0..25)
            .map(|i| {
                let i = i as f64;
                Vector3::new(i, -0.5 * i, i * i)
            })
            .collect();

        let bulk: Vec<Vector3<f64>> = transform_points(&m, &points).collect();
        assert_eq!(bulk.len(), points.len());
        for (out, point) in bulk.iter().zip(&points) {
            assert_eq!(*out, m.apply_to(point));
        }
    }

    #[test]
    fn test_method_syntax_on_square_matrices() {
        // Matrix3 and Matrix4 carry inherent `transform_point` methods for nalgebra points
        let m3 = Matrix3::new(1.0, 0.0, 5.0, 0.0, 1.0, -2.0, 0.0, 0.0, 1.0);
        let by_method: Vector3<f64> = m3.apply_to(&Vector2::new(1.0, 1.0));
        assert_eq!(by_method, Vector3::new(6.0, -1.0, 1.0));
        assert_eq!(by_method, transform_point(&m3, &Vector2::new(1.0, 1.0)));

        let m4 = counting_4x4();
        let by_method: Vector4<f64> = m4.apply_to(&Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(by_method, Vector4::new(4.0, 8.0, 12.0, 16.0));
        assert_eq!(by_method, transform_point(&m4, &Vector3::new(0.0, 0.0, 0.0)));
    }

    fn bulk_and_loop<M, P>(matrix: &M, points: &[P]) -> (Vec<M::Output>, Vec<M::Output>)
    where
        M: TransformPoint<P>,
    {
        let bulk = transform_points(matrix, points).collect();
        let mut looped = Vec::with_capacity(points.len());
        for point in points {
            looped.push(matrix.apply_to(point));
        }
        (bulk, looped)
    }

    #[test]
    fn test_bulk_matches_loop_through_generic_bound() {
        let m = counting_4x4();
        let points: Vec<Vector2<f64>> = (0..12)
            .map(|i| Vector2::new(i as f64, 3.0 - i as f64))
            .collect();

        let (bulk, looped) = bulk_and_loop(&m, &points);
        assert_eq!(bulk.len(), points.len());
        assert_eq!(bulk, looped);
        assert_eq!(bulk[1], Vector4::new(9.0, 25.0, 41.0, 57.0));
    }

    #[test]
    fn test_bulk_from_any_container() {
        let m = Matrix2x3::new(1.0, 0.0, 10.0, 0.0, 1.0, 20.0);
        let points: VecDeque<Vector2<f64>> =
            VecDeque::from(vec![Vector2::new(1.0, 2.0), Vector2::new(3.0, 4.0)]);

        let mut out = vec![Vector2::new(0.0, 0.0)];
        transform_points_into(&m, &points, &mut out);

        // existing elements are left alone
        assert_eq!(
            out,
            vec![
                Vector2::new(0.0, 0.0),
                Vector2::new(11.0, 22.0),
                Vector2::new(13.0, 24.0)
            ]
        );
    }

    #[test]
    fn test_bulk_empty_input() {
        let points: Vec<Vector4<f64>> = Vec::new();
        assert_eq!(transform_points(&counting_4x4(), &points).count(), 0);
    }

    #[test]
    fn test_in_place() {
        let m = Matrix3::new(0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        let mut points = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ];
        transform_points_in_place(&m, &mut points[..2]);

        assert_eq!(points[0], Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(points[1], Vector3::new(-1.0, 0.0, 0.0));
        assert_eq!(points[2], Vector3::new(0.0, 0.0, 1.0));
    }
}
