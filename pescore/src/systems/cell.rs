//! The `UnitCell` type represents the periodic lattice enclosing a system, with
//! zero to three periodic directions.
use crate::{Error, Matrix3, Vector3D};

/// A cell shift represents the displacement along the cell vectors between
/// the actual position of an atom and one of its periodic images.
///
/// Components along non-periodic directions are always zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellShift([i32; 3]);

impl CellShift {
    /// Create a new cell shift from its components
    pub const fn new(shift: [i32; 3]) -> CellShift {
        CellShift(shift)
    }

    /// Check whether this shift is the zero shift
    pub fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }

    /// Get the components of this shift
    pub fn as_array(&self) -> [i32; 3] {
        self.0
    }
}

impl std::ops::Add<CellShift> for CellShift {
    type Output = CellShift;

    fn add(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] += rhs[0];
        self.0[1] += rhs[1];
        self.0[2] += rhs[2];
        return self;
    }
}

impl std::ops::Sub<CellShift> for CellShift {
    type Output = CellShift;

    fn sub(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] -= rhs[0];
        self.0[1] -= rhs[1];
        self.0[2] -= rhs[2];
        return self;
    }
}

impl std::ops::Neg for CellShift {
    type Output = CellShift;

    fn neg(self) -> Self::Output {
        CellShift([-self[0], -self[1], -self[2]])
    }
}

impl std::ops::Index<usize> for CellShift {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

/// An `UnitCell` defines the periodic boundary conditions of a system.
///
/// The cell is made of `nvec` lattice vectors (0 to 3). When there are less
/// than three lattice vectors, the cell is completed by orthonormal vectors
/// perpendicular to the lattice vectors, and the corresponding directions are
/// not periodic. Fractional coordinates along these completed directions are
/// simple Cartesian projections, and are never wrapped or rounded.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct UnitCell {
    /// Number of periodic lattice vectors
    nvec: usize,
    /// Lattice vectors (one per row), completed to a full basis
    matrix: Matrix3,
    /// Transpose of `matrix`, converting fractional to Cartesian coordinates
    transpose: Matrix3,
    /// Inverse of the transpose of `matrix`. The rows are the reciprocal
    /// vectors (without the `2π` factor), and this matrix converts Cartesian
    /// to fractional coordinates
    reciprocal: Matrix3,
}

impl UnitCell {
    /// Create a new cell from 0 to 3 lattice vectors. The vectors must be
    /// linearly independent.
    pub fn new(vectors: &[Vector3D]) -> Result<UnitCell, Error> {
        if vectors.len() > 3 {
            return Err(Error::InvalidParameter(format!(
                "a cell can have at most 3 lattice vectors, got {}", vectors.len()
            )));
        }

        for vector in vectors {
            if !vector.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "cell vectors must be finite, got {:?}", vector
                )));
            }
        }

        let matrix = match *vectors {
            [] => Matrix3::one(),
            [a] => {
                if a.norm() == 0.0 {
                    return Err(Error::InvalidParameter(
                        "cell vector can not have a zero length".into()
                    ));
                }

                // use the Cartesian axis least aligned with `a` to build two
                // orthonormal vectors perpendicular to it
                let a_normalized = a.normalized();
                let mut axis = Vector3D::zero();
                let mut smallest = f64::INFINITY;
                for i in 0..3 {
                    if a_normalized[i].abs() < smallest {
                        smallest = a_normalized[i].abs();
                        axis = Vector3D::zero();
                        axis[i] = 1.0;
                    }
                }

                let u = (a_normalized ^ axis).normalized();
                let w = a_normalized ^ u;
                Matrix3::from_rows(a, u, w)
            }
            [a, b] => {
                let normal = a ^ b;
                if normal.norm() <= 1e-10 * a.norm() * b.norm() {
                    return Err(Error::InvalidParameter(format!(
                        "cell vectors {:?} and {:?} are linearly dependent", a, b
                    )));
                }
                Matrix3::from_rows(a, b, normal.normalized())
            }
            [a, b, c] => {
                let volume = a * (b ^ c);
                if volume.abs() <= 1e-10 * a.norm() * b.norm() * c.norm() {
                    return Err(Error::InvalidParameter(format!(
                        "cell vectors {:?}, {:?} and {:?} are linearly dependent", a, b, c
                    )));
                }
                Matrix3::from_rows(a, b, c)
            }
            _ => unreachable!(),
        };

        let transpose = matrix.transposed();
        return Ok(UnitCell {
            nvec: vectors.len(),
            matrix: matrix,
            transpose: transpose,
            reciprocal: transpose.inverse(),
        });
    }

    /// Create an infinite unit cell, without any periodic direction
    pub fn infinite() -> UnitCell {
        UnitCell {
            nvec: 0,
            matrix: Matrix3::one(),
            transpose: Matrix3::one(),
            reciprocal: Matrix3::one(),
        }
    }

    /// Create an orthorhombic unit cell, with side lengths `a, b, c`.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<UnitCell, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "cell lengths must be positive, got {}, {} and {}", a, b, c
            )));
        }

        return UnitCell::new(&[
            Vector3D::new(a, 0.0, 0.0),
            Vector3D::new(0.0, b, 0.0),
            Vector3D::new(0.0, 0.0, c),
        ]);
    }

    /// Create a cubic unit cell, with side lengths `length, length, length`.
    pub fn cubic(length: f64) -> Result<UnitCell, Error> {
        UnitCell::orthorhombic(length, length, length)
    }

    /// Create a triclinic unit cell, with side lengths `a, b, c` and angles
    /// `alpha, beta, gamma` (in degrees).
    pub fn triclinic(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<UnitCell, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "cell lengths must be positive, got {}, {} and {}", a, b, c
            )));
        }

        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let b_x = b * cos_gamma;
        let b_y = b * sin_gamma;

        let c_x = c * cos_beta;
        let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c_z2 = c * c - c_y * c_y - c_x * c_x;
        if !(c_z2 > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "cell angles {}, {} and {} do not define a valid cell", alpha, beta, gamma
            )));
        }

        return UnitCell::new(&[
            Vector3D::new(a, 0.0, 0.0),
            Vector3D::new(b_x, b_y, 0.0),
            Vector3D::new(c_x, c_y, f64::sqrt(c_z2)),
        ]);
    }

    /// Create a new cell with the same number of periodic directions as this
    /// one, but different lattice vectors.
    pub fn with_vectors(&self, vectors: &[Vector3D]) -> Result<UnitCell, Error> {
        if vectors.len() != self.nvec {
            return Err(Error::UnsupportedCellDimension(format!(
                "can not change the number of cell vectors from {} to {}",
                self.nvec, vectors.len()
            )));
        }
        return UnitCell::new(vectors);
    }

    /// Get the number of periodic lattice vectors
    pub fn nvec(&self) -> usize {
        self.nvec
    }

    /// Check if this unit cell is infinite, *i.e.* if it does not have any
    /// periodic direction.
    pub fn is_infinite(&self) -> bool {
        self.nvec == 0
    }

    /// Get the periodic lattice vectors
    pub fn vectors(&self) -> Vec<Vector3D> {
        (0..self.nvec).map(|i| self.matrix.row(i)).collect()
    }

    /// Get the reciprocal vectors (without the `2π` factor) of the periodic
    /// directions.
    pub fn reciprocal_vectors(&self) -> Vec<Vector3D> {
        (0..self.nvec).map(|i| self.reciprocal.row(i)).collect()
    }

    /// Get the lattice vectors, completed to a full basis for non-periodic
    /// cells, as the rows of a matrix
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// Get the reciprocal vectors of the completed basis (without the `2π`
    /// factor) as the rows of a matrix
    pub fn reciprocal_matrix(&self) -> Matrix3 {
        self.reciprocal
    }

    /// Get the volume of the cell: the actual volume for 3 periodic directions,
    /// the area for 2, the length for 1 and 0 for a non-periodic cell.
    pub fn volume(&self) -> f64 {
        if self.nvec == 0 {
            return 0.0;
        }
        // the completed vectors are orthonormal and perpendicular to the
        // lattice vectors, so the determinant gives the area/length for
        // lower-dimensional cells
        return f64::abs(self.matrix.determinant());
    }

    /// Get the distance between consecutive lattice planes for each periodic
    /// direction, i.e. `1 / |g_i|` where `g_i` are the reciprocal vectors.
    pub fn rspacings(&self) -> Vec<f64> {
        (0..self.nvec).map(|i| 1.0 / self.reciprocal.row(i).norm()).collect()
    }

    /// Get the distance between consecutive reciprocal lattice planes for each
    /// periodic direction, i.e. `1 / |r_i|` where `r_i` are the lattice
    /// vectors.
    pub fn gspacings(&self) -> Vec<f64> {
        (0..self.nvec).map(|i| 1.0 / self.matrix.row(i).norm()).collect()
    }

    /// Get the smallest distance between lattice planes, or infinity for a
    /// non-periodic cell
    pub fn min_rspacing(&self) -> f64 {
        self.rspacings().into_iter().fold(f64::INFINITY, f64::min)
    }

    /// Get the lengths of the lattice vectors and the angles between them (in
    /// degrees). For 3 periodic directions, the angles are `alpha` (between
    /// the second and third vectors), `beta` (first and third) and `gamma`
    /// (first and second); for 2 periodic directions there is only `gamma`.
    pub fn parameters(&self) -> (Vec<f64>, Vec<f64>) {
        let vectors = self.vectors();
        let lengths = vectors.iter().map(|v| v.norm()).collect();
        let angles = match *vectors {
            [a, b, c] => vec![angle(b, c), angle(a, c), angle(a, b)],
            [a, b] => vec![angle(a, b)],
            _ => Vec::new(),
        };
        return (lengths, angles);
    }
}

/// Geometric operations using periodic boundary conditions
impl UnitCell {
    /// Get the fractional representation of the `vector` in this cell
    pub fn to_fractional(&self, vector: Vector3D) -> Vector3D {
        return self.reciprocal * vector;
    }

    /// Get the Cartesian representation of the `fractional` vector in this
    /// cell
    pub fn to_cartesian(&self, fractional: Vector3D) -> Vector3D {
        return self.transpose * fractional;
    }

    /// Wrap a position inside the unit cell, obeying the periodic boundary
    /// conditions. The fractional coordinates along periodic directions end up
    /// in `[0, 1)`, other components are left unchanged.
    pub fn wrap(&self, vector: &mut Vector3D) {
        let fractional = self.to_fractional(*vector);
        let mut shift = [0; 3];
        for i in 0..self.nvec {
            shift[i] = f64::floor(fractional[i]) as i32;
        }
        *vector -= self.shift_vector(CellShift(shift));
    }

    /// Get the number of lattice vectors to remove from `vector` to get its
    /// minimum image, by rounding the fractional coordinates along periodic
    /// directions.
    pub fn image_shift(&self, vector: Vector3D) -> CellShift {
        let fractional = self.to_fractional(vector);
        let mut shift = [0; 3];
        for i in 0..self.nvec {
            shift[i] = f64::round(fractional[i]) as i32;
        }
        return CellShift(shift);
    }

    /// Find the minimum image of a vector, obeying the periodic boundary
    /// conditions. For a cubic cell of side length `L`, this produce a vector
    /// with all components in `[-L/2, L/2]`.
    ///
    /// This uses rounding of fractional coordinates, which gives the closest
    /// image for every vector shorter than half of the smallest distance
    /// between lattice planes.
    pub fn minimum_image(&self, vector: &mut Vector3D) {
        let shift = self.image_shift(*vector);
        *vector -= self.shift_vector(shift);
    }

    /// Get the Cartesian vector corresponding to the given cell shift
    pub fn shift_vector(&self, shift: CellShift) -> Vector3D {
        let mut result = Vector3D::zero();
        for i in 0..self.nvec {
            if shift[i] != 0 {
                result += shift[i] as f64 * self.matrix.row(i);
            }
        }
        return result;
    }

    /// Add the Cartesian vector corresponding to `shift` to `vector`
    pub fn add_shift(&self, vector: &mut Vector3D, shift: CellShift) {
        *vector += self.shift_vector(shift);
    }

    /// Compute the minimum image vector going from `a` to `b`, and the
    /// corresponding distance
    pub fn compute_delta(&self, a: Vector3D, b: Vector3D) -> (Vector3D, f64) {
        let mut delta = b - a;
        self.minimum_image(&mut delta);
        return (delta, delta.norm());
    }

    /// Periodic boundary conditions distance between the point `u` and
    /// the point `v`
    pub fn distance(&self, u: Vector3D, v: Vector3D) -> f64 {
        return self.compute_delta(u, v).1;
    }
}

/// Get the angle between the vectors `u` and `v`, in degrees
fn angle(u: Vector3D, v: Vector3D) -> f64 {
    let cos = u.normalized() * v.normalized();
    f64::acos(cos.clamp(-1.0, 1.0)).to_degrees()
}
