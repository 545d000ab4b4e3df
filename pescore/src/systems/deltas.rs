use indexmap::IndexMap;
use rayon::prelude::*;

use crate::{Error, Matrix3, Vector3D};
use super::{UnitCell, CellShift, NeighborList};

/// A single entry in a [`DeltaList`]: the displacement vector going from the
/// `first` atom to the `second` one, and the corresponding distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delta {
    /// index of the first atom
    pub first: usize,
    /// index of the second atom
    pub second: usize,
    /// fixed periodic image of the second atom to use, or `None` to use the
    /// minimum image convention
    pub shift: Option<CellShift>,
    /// vector from the first atom to the second atom, updated by
    /// [`DeltaList::update`]
    pub vector: Vector3D,
    /// norm of `vector`
    pub distance: f64,
}

/// List of displacement vectors between pairs of atoms.
///
/// Pairs coming from the bonded topology are registered once with
/// [`DeltaList::add_pair`] and use the minimum image convention. Pairs coming
/// from a neighbor list use a fixed periodic image. All vectors are recomputed
/// from the current positions with [`DeltaList::update`].
#[derive(Debug, Clone, Default)]
pub struct DeltaList {
    deltas: Vec<Delta>,
    /// position of minimum image pairs in `deltas`, indexed by `(min, max)`
    /// atomic indexes
    lookup: IndexMap<(usize, usize), usize>,
}

impl DeltaList {
    /// Create an empty delta list
    pub fn new() -> DeltaList {
        DeltaList::default()
    }

    /// Create a delta list containing all the pairs in the given neighbor list,
    /// using the current shifts of the pairs
    pub fn from_neighbors(neighbors: &NeighborList) -> DeltaList {
        let deltas = neighbors.pairs().iter().map(|pair| Delta {
            first: pair.first,
            second: pair.second,
            shift: Some(neighbors.current_shift(pair)),
            vector: Vector3D::zero(),
            distance: 0.0,
        }).collect();

        return DeltaList {
            deltas: deltas,
            lookup: IndexMap::new(),
        };
    }

    /// Register the minimum image pair between atoms `i` and `j`, if it is
    /// not already part of this list.
    ///
    /// This returns the index of the corresponding delta, and a sign: `+1` if
    /// the stored vector goes from `i` to `j` and `-1` if it goes from `j` to
    /// `i`.
    pub fn add_pair(&mut self, i: usize, j: usize) -> Result<(usize, f64), Error> {
        if i == j {
            return Err(Error::InconsistentTopology(format!(
                "can not create a pair between atom {} and itself", i
            )));
        }

        let sign = if i < j { 1.0 } else { -1.0 };
        let key = (usize::min(i, j), usize::max(i, j));
        if let Some(&index) = self.lookup.get(&key) {
            return Ok((index, sign));
        }

        let index = self.deltas.len();
        self.deltas.push(Delta {
            first: key.0,
            second: key.1,
            shift: None,
            vector: Vector3D::zero(),
            distance: 0.0,
        });
        self.lookup.insert(key, index);

        return Ok((index, sign));
    }

    /// Register a pair between atoms `i` and `j` using a fixed periodic image
    /// of `j`. The vector is `positions[j] - positions[i] + cell.shift_vector(shift)`.
    pub fn add_shifted_pair(&mut self, i: usize, j: usize, shift: CellShift) -> usize {
        let index = self.deltas.len();
        self.deltas.push(Delta {
            first: i,
            second: j,
            shift: Some(shift),
            vector: Vector3D::zero(),
            distance: 0.0,
        });
        return index;
    }

    /// Get the number of pairs in this list
    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    /// Check if this list is empty
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    /// Get all the deltas in this list
    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    /// Get a single delta by index
    pub fn get(&self, index: usize) -> &Delta {
        &self.deltas[index]
    }

    /// Get the largest atomic index used in this list, if any
    pub fn max_atom_index(&self) -> Option<usize> {
        self.deltas.iter().map(|delta| usize::max(delta.first, delta.second)).max()
    }

    /// Recompute all the vectors and distances from the given `positions` and
    /// `cell`.
    pub fn update(&mut self, positions: &[Vector3D], cell: &UnitCell) -> Result<(), Error> {
        if let Some(max_index) = self.max_atom_index() {
            if max_index >= positions.len() {
                return Err(Error::InconsistentTopology(format!(
                    "pair list refers to atom {}, but there are only {} atoms",
                    max_index, positions.len()
                )));
            }
        }

        self.deltas.par_iter_mut().for_each(|delta| {
            let mut vector = positions[delta.second] - positions[delta.first];
            match delta.shift {
                Some(shift) => cell.add_shift(&mut vector, shift),
                None => cell.minimum_image(&mut vector),
            }
            delta.vector = vector;
            delta.distance = vector.norm();
        });

        return Ok(());
    }

    /// Transform gradients with respect to the delta vectors into gradients
    /// with respect to the atomic positions, accumulating them in `gradient`.
    ///
    /// The virial contribution `- Σ delta ⊗ gradient` is accumulated in
    /// `virial`.
    pub fn back_propagate(
        &self,
        delta_gradients: &[Vector3D],
        gradient: &mut [Vector3D],
        virial: &mut Matrix3,
    ) -> Result<(), Error> {
        if delta_gradients.len() != self.deltas.len() {
            return Err(Error::Internal(format!(
                "expected {} delta gradients, got {}", self.deltas.len(), delta_gradients.len()
            )));
        }

        for (delta, &delta_gradient) in self.deltas.iter().zip(delta_gradients) {
            gradient[delta.first] -= delta_gradient;
            gradient[delta.second] += delta_gradient;
            *virial -= delta.vector.tensor_product(delta_gradient);
        }

        return Ok(());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_ulps_eq;

    use super::*;

    #[test]
    fn add_pairs() {
        let mut deltas = DeltaList::new();
        assert_eq!(deltas.add_pair(0, 1).unwrap(), (0, 1.0));
        assert_eq!(deltas.add_pair(2, 1).unwrap(), (1, -1.0));
        assert_eq!(deltas.add_pair(1, 0).unwrap(), (0, -1.0));
        assert_eq!(deltas.add_pair(1, 2).unwrap(), (1, 1.0));
        assert_eq!(deltas.len(), 2);

        let error = deltas.add_pair(3, 3).unwrap_err();
        assert!(matches!(error, Error::InconsistentTopology(_)));

        assert_eq!(deltas.add_shifted_pair(0, 0, CellShift::new([1, 0, 0])), 2);
        assert_eq!(deltas.max_atom_index(), Some(2));
    }

    #[test]
    fn update() {
        let cell = UnitCell::cubic(10.0).unwrap();
        let positions = [
            Vector3D::new(0.5, 0.0, 0.0),
            Vector3D::new(9.5, 0.0, 0.0),
        ];

        let mut deltas = DeltaList::new();
        deltas.add_pair(0, 1).unwrap();
        deltas.add_shifted_pair(0, 1, CellShift::new([0, 0, 0]));
        deltas.add_shifted_pair(0, 0, CellShift::new([0, 1, 0]));
        deltas.update(&positions, &cell).unwrap();

        assert_eq!(deltas.get(0).vector, Vector3D::new(-1.0, 0.0, 0.0));
        assert_eq!(deltas.get(0).distance, 1.0);
        assert_eq!(deltas.get(1).vector, Vector3D::new(9.0, 0.0, 0.0));
        assert_eq!(deltas.get(2).vector, Vector3D::new(0.0, 10.0, 0.0));

        let error = deltas.update(&positions[..1], &cell).unwrap_err();
        assert!(matches!(error, Error::InconsistentTopology(_)));
    }

    #[test]
    fn back_propagate() {
        let cell = UnitCell::infinite();
        let positions = [
            Vector3D::new(0.0, 0.0, 0.0),
            Vector3D::new(1.0, 2.0, 0.0),
        ];

        let mut deltas = DeltaList::new();
        deltas.add_pair(0, 1).unwrap();
        deltas.update(&positions, &cell).unwrap();

        let mut gradient = vec![Vector3D::zero(); 2];
        let mut virial = Matrix3::zero();
        let delta_gradient = Vector3D::new(0.5, -1.0, 2.0);
        deltas.back_propagate(&[delta_gradient], &mut gradient, &mut virial).unwrap();

        assert_eq!(gradient[0], -delta_gradient);
        assert_eq!(gradient[1], delta_gradient);
        assert_ulps_eq!(virial, -Vector3D::new(1.0, 2.0, 0.0).tensor_product(delta_gradient));

        assert!(deltas.back_propagate(&[], &mut gradient, &mut virial).is_err());
    }
}
