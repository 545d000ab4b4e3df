//! 3x3 matrix type
use std::ops::{Add, Sub, Neg, Mul, Div, Index, IndexMut};
use std::ops::{AddAssign, SubAssign, MulAssign, DivAssign};

use approx::{AbsDiffEq, RelativeEq, UlpsEq};

use super::Vector3D;

/// A 3x3 square matrix type, stored in row-major order.
///
/// `Matrix3` implements all the usual arithmetic operations:
///
/// ```
/// # use pescore::{Matrix3, Vector3D};
/// let one = Matrix3::one();
/// let a = Matrix3::new([
///     [1.0, 2.0, 3.0],
///     [4.0, 5.0, 6.0],
///     [7.0, 8.0, 10.0],
/// ]);
///
/// // Indexing
/// assert_eq!(a[0][1], 2.0);
/// assert_eq!(a[2], [7.0, 8.0, 10.0]);
///
/// // Matrix-matrix and matrix-vector products
/// assert_eq!(one * a, a);
/// assert_eq!(a * Vector3D::new(1.0, 0.0, 0.0), Vector3D::new(1.0, 4.0, 7.0));
///
/// // Scaling
/// assert_eq!(2.0 * one, Matrix3::new([[2.0, 0.0, 0.0], [0.0, 2.0, 0.0], [0.0, 0.0, 2.0]]));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct Matrix3([[f64; 3]; 3]);

impl Matrix3 {
    /// Create a new `Matrix3` from its rows
    pub const fn new(data: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(data)
    }

    /// Create a new `Matrix3` with all components set to 0
    pub const fn zero() -> Matrix3 {
        Matrix3([[0.0; 3]; 3])
    }

    /// Create a new identity matrix
    pub const fn one() -> Matrix3 {
        Matrix3([
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ])
    }

    /// Create a matrix from three row vectors
    pub fn from_rows(a: Vector3D, b: Vector3D, c: Vector3D) -> Matrix3 {
        Matrix3([a.into(), b.into(), c.into()])
    }

    /// Get one row of this matrix as a vector
    pub fn row(&self, i: usize) -> Vector3D {
        Vector3D::from(self[i])
    }

    /// Compute the trace of the matrix
    pub fn trace(&self) -> f64 {
        self[0][0] + self[1][1] + self[2][2]
    }

    /// Compute the determinant of the matrix
    pub fn determinant(&self) -> f64 {
        let m = self;
        let a = m[1][1] * m[2][2] - m[2][1] * m[1][2];
        let b = m[1][0] * m[2][2] - m[1][2] * m[2][0];
        let c = m[1][0] * m[2][1] - m[1][1] * m[2][0];
        return m[0][0] * a - m[0][1] * b + m[0][2] * c;
    }

    /// Computes the inverse of a matrix. If the matrix is not invertible, the
    /// result contains non-finite values.
    #[must_use]
    pub fn inverse(&self) -> Matrix3 {
        let m = self;
        let inv_det = 1.0 / self.determinant();

        let mut res = Matrix3::zero();
        res[0][0] = (m[1][1] * m[2][2] - m[2][1] * m[1][2]) * inv_det;
        res[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
        res[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
        res[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
        res[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
        res[1][2] = (m[1][0] * m[0][2] - m[0][0] * m[1][2]) * inv_det;
        res[2][0] = (m[1][0] * m[2][1] - m[2][0] * m[1][1]) * inv_det;
        res[2][1] = (m[2][0] * m[0][1] - m[0][0] * m[2][1]) * inv_det;
        res[2][2] = (m[0][0] * m[1][1] - m[1][0] * m[0][1]) * inv_det;
        return res;
    }

    /// Transpose this matrix into a new matrix
    #[must_use]
    pub fn transposed(&self) -> Matrix3 {
        let m = self;
        Matrix3::new([
            [m[0][0], m[1][0], m[2][0]],
            [m[0][1], m[1][1], m[2][1]],
            [m[0][2], m[1][2], m[2][2]],
        ])
    }

    /// Get the symmetric part of this matrix, `(M + M^T) / 2`
    #[must_use]
    pub fn symmetrized(&self) -> Matrix3 {
        0.5 * (self + self.transposed())
    }

    /// Check whether all entries of this matrix are finite
    pub fn is_finite(&self) -> bool {
        self.0.iter().flatten().all(|v| v.is_finite())
    }
}

impl From<[[f64; 3]; 3]> for Matrix3 {
    fn from(data: [[f64; 3]; 3]) -> Matrix3 {
        Matrix3(data)
    }
}

impl Index<usize> for Matrix3 {
    type Output = [f64; 3];
    #[inline]
    fn index(&self, index: usize) -> &[f64; 3] {
        &self.0[index]
    }
}

impl IndexMut<usize> for Matrix3 {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut [f64; 3] {
        &mut self.0[index]
    }
}

binary_operator!(Add::add(Matrix3, Matrix3) -> Matrix3, |a, b| {
    Matrix3::new(std::array::from_fn(|i| std::array::from_fn(|j| a[i][j] + b[i][j])))
});

binary_operator!(Sub::sub(Matrix3, Matrix3) -> Matrix3, |a, b| {
    Matrix3::new(std::array::from_fn(|i| std::array::from_fn(|j| a[i][j] - b[i][j])))
});

assign_operator!(AddAssign::add_assign(Matrix3, Matrix3), |a, b| {
    for i in 0..3 {
        for j in 0..3 {
            a[i][j] += b[i][j];
        }
    }
});

assign_operator!(SubAssign::sub_assign(Matrix3, Matrix3), |a, b| {
    for i in 0..3 {
        for j in 0..3 {
            a[i][j] -= b[i][j];
        }
    }
});

// matrix product
binary_operator!(Mul::mul(Matrix3, Matrix3) -> Matrix3, |a, b| {
    Matrix3::new(std::array::from_fn(|i| std::array::from_fn(|j| {
        a[i][0] * b[0][j] + a[i][1] * b[1][j] + a[i][2] * b[2][j]
    })))
});

// matrix-vector product
binary_operator!(Mul::mul(Matrix3, Vector3D) -> Vector3D, |a, v| {
    Vector3D::new(a.row(0) * v, a.row(1) * v, a.row(2) * v)
});

binary_operator!(Mul::mul(Matrix3, f64) -> Matrix3, |a, s| {
    Matrix3::new(std::array::from_fn(|i| std::array::from_fn(|j| a[i][j] * s)))
});

binary_operator!(Mul::mul(f64, Matrix3) -> Matrix3, |s, a| {
    Matrix3::new(std::array::from_fn(|i| std::array::from_fn(|j| s * a[i][j])))
});

binary_operator!(Div::div(Matrix3, f64) -> Matrix3, |a, s| {
    Matrix3::new(std::array::from_fn(|i| std::array::from_fn(|j| a[i][j] / s)))
});

impl MulAssign<f64> for Matrix3 {
    fn mul_assign(&mut self, other: f64) {
        for i in 0..3 {
            for j in 0..3 {
                self[i][j] *= other;
            }
        }
    }
}

impl DivAssign<f64> for Matrix3 {
    fn div_assign(&mut self, other: f64) {
        for i in 0..3 {
            for j in 0..3 {
                self[i][j] /= other;
            }
        }
    }
}

impl Neg for Matrix3 {
    type Output = Matrix3;
    fn neg(self) -> Matrix3 {
        -1.0 * self
    }
}

impl std::iter::Sum for Matrix3 {
    fn sum<I: Iterator<Item = Matrix3>>(iter: I) -> Matrix3 {
        iter.fold(Matrix3::zero(), |acc, m| acc + m)
    }
}

impl AbsDiffEq for Matrix3 {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Matrix3, epsilon: f64) -> bool {
        self.0.iter().flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| f64::abs_diff_eq(a, b, epsilon))
    }
}

impl RelativeEq for Matrix3 {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Matrix3, epsilon: f64, max_relative: f64) -> bool {
        self.0.iter().flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| f64::relative_eq(a, b, epsilon, max_relative))
    }
}

impl UlpsEq for Matrix3 {
    fn default_max_ulps() -> u32 {
        f64::default_max_ulps()
    }

    fn ulps_eq(&self, other: &Matrix3, epsilon: f64, max_ulps: u32) -> bool {
        self.0.iter().flatten()
            .zip(other.0.iter().flatten())
            .all(|(a, b)| f64::ulps_eq(a, b, epsilon, max_ulps))
    }
}
