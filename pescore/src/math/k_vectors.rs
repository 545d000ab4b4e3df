//! Generate the k-vectors (also called reciprocal or Fourier vectors) needed
//! for the reciprocal space part of Ewald summation. These are all points of
//! the reciprocal lattice that lie within a ball of a specified cutoff radius,
//! keeping only one vector out of each `(k, -k)` pair.

use crate::{Error, Vector3D};
use crate::systems::UnitCell;

/// A single k-vector and its squared norm stored together
#[derive(Debug, Clone, Copy)]
pub struct KVector {
    /// the k-vector itself, including the `2π` factor
    pub vector: Vector3D,
    /// squared length of the k-vector
    pub norm2: f64,
}

/// Generate the half-space set of k-vectors with norm smaller than `k_cutoff`
/// (in reciprocal space units) for the given cell. The cell must be periodic in
/// all three directions.
///
/// For each `k` in the full set, exactly one of `k` and `-k` is included, and
/// the zero vector is excluded.
pub fn compute_k_vectors(cell: &UnitCell, k_cutoff: f64) -> Result<Vec<KVector>, Error> {
    if cell.nvec() != 3 {
        return Err(Error::UnsupportedCellDimension(format!(
            "k-vectors require a cell periodic in 3 dimensions, got {} periodic dimensions",
            cell.nvec()
        )));
    }

    if !(k_cutoff > 0.0 && k_cutoff.is_finite()) {
        return Err(Error::InvalidParameter(format!(
            "k-vector cutoff must be positive, got {}", k_cutoff
        )));
    }

    let reciprocal_cell = 2.0 * std::f64::consts::PI * cell.reciprocal_matrix();

    let cutoff_squared = k_cutoff * k_cutoff;
    let b1 = reciprocal_cell.row(0);
    let b2 = reciprocal_cell.row(1);
    let b3 = reciprocal_cell.row(2);

    // the number of planes to visit along each direction is the cutoff divided
    // by the distance between reciprocal lattice planes
    let k_volume = f64::abs(reciprocal_cell.determinant());
    let n1_max = ((b2 ^ b3).norm() / k_volume * k_cutoff) as isize;
    let n2_max = ((b3 ^ b1).norm() / k_volume * k_cutoff) as isize;
    let n3_max = ((b1 ^ b2).norm() / k_volume * k_cutoff) as isize;

    let mut results = Vec::new();
    let mut push_if_inside = |k: Vector3D| {
        let norm2 = k.norm2();
        if norm2 < cutoff_squared {
            results.push(KVector { vector: k, norm2: norm2 });
        }
    };

    for n3 in 1..=n3_max {
        push_if_inside(n3 as f64 * b3);
    }

    for n2 in 1..=n2_max {
        for n3 in -n3_max..=n3_max {
            push_if_inside(n2 as f64 * b2 + n3 as f64 * b3);
        }
    }

    for n1 in 1..=n1_max {
        for n2 in -n2_max..=n2_max {
            for n3 in -n3_max..=n3_max {
                push_if_inside(n1 as f64 * b1 + n2 as f64 * b2 + n3 as f64 * b3);
            }
        }
    }

    return Ok(results);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Matrix3;

    const SQRT_3: f64 = 1.7320508075688772;
    const SQRT_5: f64 = 2.23606797749979;

    fn cell_from_reciprocal(reciprocal: Matrix3) -> UnitCell {
        let matrix = (reciprocal / (2.0 * std::f64::consts::PI)).inverse().transposed();
        return UnitCell::new(&[matrix.row(0), matrix.row(1), matrix.row(2)]).unwrap();
    }

    #[test]
    fn half_space_count() {
        let reciprocal_cells = [
            Matrix3::one(),
            Matrix3::new([[1.0, 0.0, 0.0], [5.0, 1.0, 0.0], [3.0, 4.0, 1.0]]),
            Matrix3::new([
                [-0.10740572, -0.73747025, -0.66678455],
                [0.30874359, -3.40258247, -3.7851169],
                [3.58349326, -1.68574423, -3.21198419],
            ]),
        ];

        // number of lattice points of the cubic lattice in the half space,
        // for increasing cutoffs
        let num_vectors_correct = [3, 3, 9, 9, 13, 13, 16];

        let eps = 1e-2;
        let cutoffs = [
            1.0 + eps,
            std::f64::consts::SQRT_2 - eps,
            std::f64::consts::SQRT_2 + eps,
            SQRT_3 - eps,
            SQRT_3 + eps,
            2.0 - eps,
            SQRT_5 - eps,
        ];

        for reciprocal in reciprocal_cells {
            let cell = cell_from_reciprocal(reciprocal);
            for (ik, &k_cutoff) in cutoffs.iter().enumerate() {
                let k_vectors = compute_k_vectors(&cell, k_cutoff).unwrap();
                assert_eq!(k_vectors.len(), num_vectors_correct[ik]);

                for k_vector in &k_vectors {
                    assert!(k_vector.norm2 < k_cutoff * k_cutoff);
                }

                // no vector is the opposite of another one
                for (i, ki) in k_vectors.iter().enumerate() {
                    for kj in &k_vectors[i + 1..] {
                        assert!((ki.vector + kj.vector).norm() > 1e-6);
                    }
                }
            }
        }
    }

    #[test]
    fn non_periodic_cell() {
        let cell = UnitCell::new(&[Vector3D::new(3.0, 0.0, 0.0), Vector3D::new(0.0, 3.0, 0.0)]).unwrap();
        let error = compute_k_vectors(&cell, 2.0).unwrap_err();
        assert!(matches!(error, Error::UnsupportedCellDimension(_)));
    }
}
