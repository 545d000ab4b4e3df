//! 3-dimensional vector type
use std::ops::{Add, Sub, Neg, Mul, Div, BitXor, Index, IndexMut};
use std::ops::{AddAssign, SubAssign, MulAssign, DivAssign};

use approx::{AbsDiffEq, RelativeEq, UlpsEq};

use super::Matrix3;

/// A 3-dimensional vector type
///
/// A `Vector3D` implement all the arithmetic operations:
///
/// ```
/// # use pescore::Vector3D;
/// let u = Vector3D::new(1.0, 2.0, 3.0);
/// let v = Vector3D::new(4.0, 5.0, 6.0);
///
/// // Indexing
/// assert_eq!(u[0], 1.0);
/// assert_eq!(u[1], 2.0);
/// assert_eq!(u[2], 3.0);
///
/// // Addition
/// let w = u + v;
/// assert_eq!(w, Vector3D::new(5.0, 7.0, 9.0));
///
/// // Subtraction
/// let w = u - v;
/// assert_eq!(w, Vector3D::new(-3.0, -3.0, -3.0));
///
/// // Negation
/// let w = -u;
/// assert_eq!(w, Vector3D::new(-1.0, -2.0, -3.0));
///
/// // Cross product
/// let w = u ^ v;
/// assert_eq!(w, Vector3D::new(-3.0, 6.0, -3.0));
///
/// // Multiplication
/// let w = 2.0 * u;
/// assert_eq!(w, Vector3D::new(2.0, 4.0, 6.0));
///
/// let w = u * 3.0;
/// assert_eq!(w, Vector3D::new(3.0, 6.0, 9.0));
///
/// // Division
/// let w = u / 2.0;
/// assert_eq!(w, Vector3D::new(0.5, 1.0, 1.5));
///
/// // Dot product
/// let a = u * v;
/// assert_eq!(a, 32.0);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Vector3D([f64; 3]);

impl Vector3D {
    /// Create a new `Vector3D` with components `x`, `y`, `z`
    pub const fn new(x: f64, y: f64, z: f64) -> Vector3D {
        Vector3D([x, y, z])
    }

    /// Create a new `Vector3D` with all components set to zero
    pub const fn zero() -> Vector3D {
        Vector3D([0.0, 0.0, 0.0])
    }

    /// Return the squared euclidean norm of a `Vector3D`
    #[inline]
    pub fn norm2(&self) -> f64 {
        self * self
    }

    /// Return the euclidean norm of a `Vector3D`
    #[inline]
    pub fn norm(&self) -> f64 {
        f64::sqrt(self.norm2())
    }

    /// Normalize a `Vector3D`.
    #[inline]
    #[must_use]
    pub fn normalized(&self) -> Vector3D {
        self / self.norm()
    }

    /// Tensor product of `self` and `other`, i.e. the matrix with entries
    /// `self[i] * other[j]`
    pub fn tensor_product(&self, other: Vector3D) -> Matrix3 {
        let mut res = Matrix3::zero();
        for i in 0..3 {
            for j in 0..3 {
                res[i][j] = self[i] * other[j];
            }
        }
        return res;
    }

    /// Check whether all components of this vector are finite
    pub fn is_finite(&self) -> bool {
        self[0].is_finite() && self[1].is_finite() && self[2].is_finite()
    }

    /// Get the components of this vector as an array
    pub fn as_array(&self) -> &[f64; 3] {
        &self.0
    }
}

impl From<[f64; 3]> for Vector3D {
    fn from(array: [f64; 3]) -> Vector3D {
        Vector3D(array)
    }
}

impl From<Vector3D> for [f64; 3] {
    fn from(vector: Vector3D) -> [f64; 3] {
        vector.0
    }
}

impl Index<usize> for Vector3D {
    type Output = f64;
    #[inline]
    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vector3D {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        &mut self.0[index]
    }
}

binary_operator!(Add::add(Vector3D, Vector3D) -> Vector3D, |u, v| {
    Vector3D::new(u[0] + v[0], u[1] + v[1], u[2] + v[2])
});

binary_operator!(Sub::sub(Vector3D, Vector3D) -> Vector3D, |u, v| {
    Vector3D::new(u[0] - v[0], u[1] - v[1], u[2] - v[2])
});

assign_operator!(AddAssign::add_assign(Vector3D, Vector3D), |u, v| {
    u[0] += v[0];
    u[1] += v[1];
    u[2] += v[2];
});

assign_operator!(SubAssign::sub_assign(Vector3D, Vector3D), |u, v| {
    u[0] -= v[0];
    u[1] -= v[1];
    u[2] -= v[2];
});

// dot product
binary_operator!(Mul::mul(Vector3D, Vector3D) -> f64, |u, v| {
    u[0] * v[0] + u[1] * v[1] + u[2] * v[2]
});

// cross product
binary_operator!(BitXor::bitxor(Vector3D, Vector3D) -> Vector3D, |u, v| {
    Vector3D::new(
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    )
});

binary_operator!(Mul::mul(Vector3D, f64) -> Vector3D, |u, s| {
    Vector3D::new(u[0] * s, u[1] * s, u[2] * s)
});

binary_operator!(Mul::mul(f64, Vector3D) -> Vector3D, |s, u| {
    Vector3D::new(s * u[0], s * u[1], s * u[2])
});

binary_operator!(Div::div(Vector3D, f64) -> Vector3D, |u, s| {
    Vector3D::new(u[0] / s, u[1] / s, u[2] / s)
});

impl MulAssign<f64> for Vector3D {
    #[inline]
    fn mul_assign(&mut self, other: f64) {
        self[0] *= other;
        self[1] *= other;
        self[2] *= other;
    }
}

impl DivAssign<f64> for Vector3D {
    #[inline]
    fn div_assign(&mut self, other: f64) {
        self[0] /= other;
        self[1] /= other;
        self[2] /= other;
    }
}

impl Neg for Vector3D {
    type Output = Vector3D;
    #[inline]
    fn neg(self) -> Vector3D {
        Vector3D::new(-self[0], -self[1], -self[2])
    }
}

impl<'a> Neg for &'a Vector3D {
    type Output = Vector3D;
    #[inline]
    fn neg(self) -> Vector3D {
        Vector3D::new(-self[0], -self[1], -self[2])
    }
}

impl std::iter::Sum for Vector3D {
    fn sum<I: Iterator<Item = Vector3D>>(iter: I) -> Vector3D {
        iter.fold(Vector3D::zero(), |acc, v| acc + v)
    }
}

impl AbsDiffEq for Vector3D {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Vector3D, epsilon: f64) -> bool {
        f64::abs_diff_eq(&self[0], &other[0], epsilon) &&
        f64::abs_diff_eq(&self[1], &other[1], epsilon) &&
        f64::abs_diff_eq(&self[2], &other[2], epsilon)
    }
}

impl RelativeEq for Vector3D {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Vector3D, epsilon: f64, max_relative: f64) -> bool {
        f64::relative_eq(&self[0], &other[0], epsilon, max_relative) &&
        f64::relative_eq(&self[1], &other[1], epsilon, max_relative) &&
        f64::relative_eq(&self[2], &other[2], epsilon, max_relative)
    }
}

impl UlpsEq for Vector3D {
    fn default_max_ulps() -> u32 {
        f64::default_max_ulps()
    }

    fn ulps_eq(&self, other: &Vector3D, epsilon: f64, max_ulps: u32) -> bool {
        f64::ulps_eq(&self[0], &other[0], epsilon, max_ulps) &&
        f64::ulps_eq(&self[1], &other[1], epsilon, max_ulps) &&
        f64::ulps_eq(&self[2], &other[2], epsilon, max_ulps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_ulps_eq;

    #[test]
    fn add() {
        let a = Vector3D::new(2.0, 3.5, 4.8);
        let b = Vector3D::new(6.1, -8.5, 7.3);

        let c = a + b;
        assert_ulps_eq!(c, Vector3D::new(8.1, -5.0, 12.1));

        let mut d = a;
        d += b;
        assert_eq!(d, c);
    }

    #[test]
    fn sub() {
        let a = Vector3D::new(2.0, 3.5, 4.8);
        let b = Vector3D::new(6.1, -8.5, 7.3);

        let c = a - b;
        assert_ulps_eq!(c, Vector3D::new(-4.1, 12.0, -2.5));

        let mut d = a;
        d -= b;
        assert_eq!(d, c);
    }

    #[test]
    fn products() {
        let a = Vector3D::new(1.0, 0.0, 0.0);
        let b = Vector3D::new(0.0, 1.0, 0.0);
        assert_eq!(a * b, 0.0);
        assert_eq!(a ^ b, Vector3D::new(0.0, 0.0, 1.0));
        assert_eq!(b ^ a, Vector3D::new(0.0, 0.0, -1.0));

        let u = Vector3D::new(1.0, 2.0, 3.0);
        let v = Vector3D::new(-2.0, 0.5, 4.0);
        let tensor = u.tensor_product(v);
        assert_eq!(tensor[0], [-2.0, 0.5, 4.0]);
        assert_eq!(tensor[2], [-6.0, 1.5, 12.0]);
    }

    #[test]
    fn norm() {
        let a = Vector3D::new(3.0, 4.0, 12.0);
        assert_eq!(a.norm2(), 169.0);
        assert_eq!(a.norm(), 13.0);
        assert_ulps_eq!(a.normalized().norm(), 1.0);
    }

    #[test]
    fn sum() {
        let vectors = [Vector3D::new(1.0, 2.0, 3.0), Vector3D::new(-1.0, 2.0, 0.5)];
        let total: Vector3D = vectors.iter().copied().sum();
        assert_eq!(total, Vector3D::new(0.0, 4.0, 3.5));
    }
}
