use indexmap::IndexMap;
use rayon::prelude::*;

use crate::{Error, Vector3D};
use crate::systems::DeltaList;

/// Relative threshold under which the geometry of an internal coordinate is
/// considered degenerate (collinear or superimposed atoms)
const DEGENERATE_THRESHOLD: f64 = 1e-10;

/// Internal coordinates, defined by a small number of atoms.
///
/// Angles are expressed in radians.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum InternalCoordinate {
    /// Distance between two atoms `i-j`
    Bond([usize; 2]),
    /// Angle `i-j-k`, with `j` at the center
    BendAngle([usize; 3]),
    /// Cosine of the angle `i-j-k`, with `j` at the center
    BendCos([usize; 3]),
    /// Signed dihedral angle `i-j-k-l` around the `j-k` bond, in `[-π, π]`
    DihedralAngle([usize; 4]),
    /// Cosine of the dihedral angle `i-j-k-l`
    DihedralCos([usize; 4]),
    /// Signed distance between atom `l` and the plane going through atoms
    /// `i`, `j` and `k`. The sign follows the direction of `(r_i - r_k) ×
    /// (r_j - r_k)`.
    OutOfPlaneDistance([usize; 4]),
    /// Angle between the vector `k → l` and the plane containing `k`, `i` and
    /// `j`, in `[-π/2, π/2]`
    OutOfPlaneAngle([usize; 4]),
    /// Distance between the first and last atoms of an angle `i-j-k`
    UreyBradley([usize; 3]),
}

impl InternalCoordinate {
    /// Get the atoms defining this coordinate
    pub fn atoms(&self) -> &[usize] {
        match self {
            InternalCoordinate::Bond(atoms) => atoms,
            InternalCoordinate::BendAngle(atoms) |
            InternalCoordinate::BendCos(atoms) |
            InternalCoordinate::UreyBradley(atoms) => atoms,
            InternalCoordinate::DihedralAngle(atoms) |
            InternalCoordinate::DihedralCos(atoms) |
            InternalCoordinate::OutOfPlaneDistance(atoms) |
            InternalCoordinate::OutOfPlaneAngle(atoms) => atoms,
        }
    }

    /// Get the pairs of atoms `(from, to)` for the displacement vectors this
    /// coordinate depends on
    fn pairs(&self) -> Vec<(usize, usize)> {
        match *self {
            InternalCoordinate::Bond([i, j]) => vec![(i, j)],
            InternalCoordinate::UreyBradley([i, _, k]) => vec![(i, k)],
            InternalCoordinate::BendAngle([i, j, k]) |
            InternalCoordinate::BendCos([i, j, k]) => vec![(j, i), (j, k)],
            InternalCoordinate::DihedralAngle([i, j, k, l]) |
            InternalCoordinate::DihedralCos([i, j, k, l]) => vec![(i, j), (j, k), (k, l)],
            InternalCoordinate::OutOfPlaneDistance([i, j, k, l]) |
            InternalCoordinate::OutOfPlaneAngle([i, j, k, l]) => vec![(k, i), (k, j), (k, l)],
        }
    }

    /// Compute the value of this coordinate and its gradient with respect to
    /// the vectors given by `Self::pairs`
    fn compute(&self, vectors: &[Vector3D]) -> Result<(f64, [Vector3D; 3]), Error> {
        let mut gradient = [Vector3D::zero(); 3];
        let value = match self {
            InternalCoordinate::Bond(_) | InternalCoordinate::UreyBradley(_) => {
                let distance = vectors[0].norm();
                if distance == 0.0 {
                    return Err(self.degenerate("atoms are on top of each other"));
                }
                gradient[0] = vectors[0] / distance;
                distance
            }
            InternalCoordinate::BendCos(_) => {
                let (cos, grad_a, grad_b) = self.bend_cos(vectors[0], vectors[1])?;
                gradient[0] = grad_a;
                gradient[1] = grad_b;
                cos
            }
            InternalCoordinate::BendAngle(_) => {
                let (cos, grad_a, grad_b) = self.bend_cos(vectors[0], vectors[1])?;
                let sin = f64::sqrt(f64::max(1.0 - cos * cos, 0.0));
                if sin < DEGENERATE_THRESHOLD {
                    return Err(self.degenerate("atoms are collinear"));
                }
                gradient[0] = -grad_a / sin;
                gradient[1] = -grad_b / sin;
                f64::acos(cos.clamp(-1.0, 1.0))
            }
            InternalCoordinate::DihedralCos(_) => {
                let [b1, b2, b3] = [vectors[0], vectors[1], vectors[2]];
                let (n1, n2) = self.dihedral_normals(b1, b2, b3)?;
                let (n1_norm, n2_norm) = (n1.norm(), n2.norm());

                let cos = (n1 * n2) / (n1_norm * n2_norm);
                let u1 = n2 / (n1_norm * n2_norm) - cos * n1 / (n1_norm * n1_norm);
                let u2 = n1 / (n1_norm * n2_norm) - cos * n2 / (n2_norm * n2_norm);

                gradient[0] = b2 ^ u1;
                gradient[1] = (u1 ^ b1) + (b3 ^ u2);
                gradient[2] = u2 ^ b2;
                cos
            }
            InternalCoordinate::DihedralAngle(_) => {
                let [b1, b2, b3] = [vectors[0], vectors[1], vectors[2]];
                let (n1, n2) = self.dihedral_normals(b1, b2, b3)?;

                // φ = atan2(y, x) with x² + y² = |n1|² |n2|²
                let b2_norm = b2.norm();
                let x = n1 * n2;
                let y = b2_norm * (b1 * n2);
                let denominator = n1.norm2() * n2.norm2();

                let dx_db1 = b2 ^ n2;
                let dx_db2 = (n2 ^ b1) + (b3 ^ n1);
                let dx_db3 = n1 ^ b2;

                let dy_db1 = b2_norm * n2;
                let dy_db2 = (b1 * n2) / b2_norm * b2 + b2_norm * (b3 ^ b1);
                let dy_db3 = b2_norm * n1;

                gradient[0] = (x * dy_db1 - y * dx_db1) / denominator;
                gradient[1] = (x * dy_db2 - y * dx_db2) / denominator;
                gradient[2] = (x * dy_db3 - y * dx_db3) / denominator;
                f64::atan2(y, x)
            }
            InternalCoordinate::OutOfPlaneDistance(_) => {
                let (distance, grad) = self.out_of_plane_distance(vectors)?;
                gradient = grad;
                distance
            }
            InternalCoordinate::OutOfPlaneAngle(_) => {
                let (distance, grad) = self.out_of_plane_distance(vectors)?;
                let d2 = vectors[2];
                let d2_norm = d2.norm();
                if d2_norm == 0.0 {
                    return Err(self.degenerate("atoms are on top of each other"));
                }

                let sin = distance / d2_norm;
                let cos = f64::sqrt(f64::max(1.0 - sin * sin, 0.0));
                if cos < DEGENERATE_THRESHOLD {
                    return Err(self.degenerate("out of plane vector is perpendicular to the plane"));
                }

                gradient[0] = grad[0] / (d2_norm * cos);
                gradient[1] = grad[1] / (d2_norm * cos);
                gradient[2] = (grad[2] / d2_norm - sin * d2 / (d2_norm * d2_norm)) / cos;
                f64::asin(sin.clamp(-1.0, 1.0))
            }
        };

        return Ok((value, gradient));
    }

    /// Cosine of the angle between `a` and `b`, and its gradient with respect
    /// to both vectors
    fn bend_cos(&self, a: Vector3D, b: Vector3D) -> Result<(f64, Vector3D, Vector3D), Error> {
        let (a_norm, b_norm) = (a.norm(), b.norm());
        if a_norm == 0.0 || b_norm == 0.0 {
            return Err(self.degenerate("atoms are on top of each other"));
        }

        let cos = (a * b) / (a_norm * b_norm);
        let grad_a = b / (a_norm * b_norm) - cos * a / (a_norm * a_norm);
        let grad_b = a / (a_norm * b_norm) - cos * b / (b_norm * b_norm);
        return Ok((cos, grad_a, grad_b));
    }

    /// Normals to the two planes of a dihedral angle
    fn dihedral_normals(&self, b1: Vector3D, b2: Vector3D, b3: Vector3D) -> Result<(Vector3D, Vector3D), Error> {
        let n1 = b1 ^ b2;
        let n2 = b2 ^ b3;
        if n1.norm() <= DEGENERATE_THRESHOLD * b1.norm() * b2.norm()
            || n2.norm() <= DEGENERATE_THRESHOLD * b2.norm() * b3.norm() {
            return Err(self.degenerate("three consecutive atoms are collinear"));
        }
        return Ok((n1, n2));
    }

    /// Signed distance of the end of `vectors[2]` to the plane spanned by
    /// `vectors[0]` and `vectors[1]`, and its gradient
    fn out_of_plane_distance(&self, vectors: &[Vector3D]) -> Result<(f64, [Vector3D; 3]), Error> {
        let [d0, d1, d2] = [vectors[0], vectors[1], vectors[2]];
        let normal = d0 ^ d1;
        let normal_norm = normal.norm();
        if normal_norm <= DEGENERATE_THRESHOLD * d0.norm() * d1.norm() {
            return Err(self.degenerate("the atoms defining the plane are collinear"));
        }

        let unit_normal = normal / normal_norm;
        let distance = d2 * unit_normal;
        let dh_dnormal = (d2 - distance * unit_normal) / normal_norm;

        let gradient = [d1 ^ dh_dnormal, dh_dnormal ^ d0, unit_normal];
        return Ok((distance, gradient));
    }

    fn degenerate(&self, reason: &str) -> Error {
        Error::DegenerateGeometry(format!("{:?} is not defined: {}", self, reason))
    }
}

/// A coordinate in the list, with the deltas it depends on
#[derive(Debug, Clone)]
struct CoordinateData {
    coordinate: InternalCoordinate,
    /// index of the delta and sign to apply to it, for each vector
    deltas: Vec<(usize, f64)>,
}

/// List of internal coordinates computed from the displacement vectors in a
/// [`DeltaList`].
#[derive(Debug, Clone)]
pub struct InternalCoordinateList {
    n_atoms: usize,
    coordinates: Vec<CoordinateData>,
    lookup: IndexMap<InternalCoordinate, usize>,
    values: Vec<f64>,
    /// gradient of each coordinate with respect to (signed) deltas
    gradients: Vec<[Vector3D; 3]>,
}

impl InternalCoordinateList {
    /// Create an empty list for a system containing `n_atoms` atoms
    pub fn new(n_atoms: usize) -> InternalCoordinateList {
        InternalCoordinateList {
            n_atoms: n_atoms,
            coordinates: Vec::new(),
            lookup: IndexMap::new(),
            values: Vec::new(),
            gradients: Vec::new(),
        }
    }

    /// Add a new internal coordinate to this list, registering the pairs it
    /// needs in `deltas`. If the same coordinate was already added, this
    /// returns the index of the existing one.
    pub fn add(&mut self, coordinate: InternalCoordinate, deltas: &mut DeltaList) -> Result<usize, Error> {
        if let Some(&index) = self.lookup.get(&coordinate) {
            return Ok(index);
        }

        let atoms = coordinate.atoms();
        for (position, &atom) in atoms.iter().enumerate() {
            if atom >= self.n_atoms {
                return Err(Error::InconsistentTopology(format!(
                    "{:?} refers to atom {}, but there are only {} atoms",
                    coordinate, atom, self.n_atoms
                )));
            }

            if atoms[..position].contains(&atom) {
                return Err(Error::InconsistentTopology(format!(
                    "atom {} is repeated in {:?}", atom, coordinate
                )));
            }
        }

        let pairs = coordinate.pairs()
            .into_iter()
            .map(|(from, to)| deltas.add_pair(from, to))
            .collect::<Result<Vec<_>, _>>()?;

        let index = self.coordinates.len();
        self.coordinates.push(CoordinateData {
            coordinate: coordinate,
            deltas: pairs,
        });
        self.values.push(0.0);
        self.gradients.push([Vector3D::zero(); 3]);
        self.lookup.insert(coordinate, index);

        return Ok(index);
    }

    /// Get the number of coordinates in this list
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// Check if this list is empty
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Get the coordinate at the given index
    pub fn coordinate(&self, index: usize) -> InternalCoordinate {
        self.coordinates[index].coordinate
    }

    /// Get the values of all coordinates, as computed by the last call to
    /// `update`
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Compute the values of all coordinates and their gradients from the
    /// (already updated) `deltas`.
    pub fn update(&mut self, deltas: &DeltaList) -> Result<(), Error> {
        let results = self.coordinates.par_iter().map(|data| {
            let vectors = data.deltas.iter()
                .map(|&(index, sign)| sign * deltas.get(index).vector)
                .collect::<Vec<_>>();
            data.coordinate.compute(&vectors)
        }).collect::<Result<Vec<_>, _>>()?;

        for (i, (value, gradient)) in results.into_iter().enumerate() {
            self.values[i] = value;
            self.gradients[i] = gradient;
        }

        return Ok(());
    }

    /// Accumulate the gradient of the energy with respect to the deltas, given
    /// the derivatives of the energy with respect to each coordinate.
    pub fn back_propagate(&self, coordinate_gradients: &[f64], delta_gradients: &mut [Vector3D]) {
        debug_assert_eq!(coordinate_gradients.len(), self.coordinates.len());
        for ((data, gradients), &derivative) in self.coordinates.iter().zip(&self.gradients).zip(coordinate_gradients) {
            if derivative == 0.0 {
                continue;
            }

            for (&(index, sign), &gradient) in data.deltas.iter().zip(gradients) {
                delta_gradients[index] += (sign * derivative) * gradient;
            }
        }
    }
}
