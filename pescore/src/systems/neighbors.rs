use log::{debug, info, warn};
use ndarray::Array3;
use rayon::prelude::*;

use crate::{Error, Vector3D};
use super::{UnitCell, CellShift};

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a small unit cell and a large cutoff
const MAX_NUMBER_OF_CELLS: f64 = 1e5;

/// Pair produced by the cell list. The vector between the atoms can be
/// constructed as `position[second] - position[first] + cell.shift_vector(shift)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellPair {
    /// index of the first atom in the pair
    pub first: usize,
    /// index of the second atom in the pair
    pub second: usize,
    /// number of shifts along the cell for this pair
    pub shift: CellShift,
}

/// Data associated with an atoms inside the `CellList`
#[derive(Debug, Clone)]
struct AtomData {
    /// index of the atom in the original system
    index: usize,
    /// the shift vector from the actual atom position to the image of this atom
    /// inside the unit cell
    shift: CellShift,
}

/// The cell list is used to sort atoms inside bins/cells.
///
/// The bins are defined in fractional coordinates of the (completed) unit
/// cell, which guarantees that all pairs below the cutoff are found even for
/// very skewed cells. Along periodic directions, atoms are folded back inside
/// the unit cell; along non-periodic directions, bins cover the bounding box of
/// the atoms and are never wrapped.
///
/// The list of potential pairs is then constructed by looking through all
/// neighboring cells (the number of cells to search depends on the cutoff and
/// the size of the cells) for each atom to create pair candidates.
#[derive(Debug, Clone)]
pub struct CellList {
    /// How many cells do we need to look at when searching neighbors to include
    /// all neighbors below cutoff
    n_search: [i32; 3],
    /// Is the corresponding direction periodic?
    periodic: [bool; 3],
    /// Lowest fractional coordinate covered by the bins along each direction
    origin: [f64; 3],
    /// Range of fractional coordinates covered by the bins along each
    /// direction
    extent: [f64; 3],
    /// the cells themselves
    cells: Array3<Vec<AtomData>>,
    /// Unit cell defining periodic boundary conditions
    unit_cell: UnitCell,
}

impl CellList {
    /// Create a new `CellList` for the given unit cell, positions and cutoff,
    /// and add all the atoms to it.
    pub fn new(unit_cell: UnitCell, positions: &[Vector3D], cutoff: f64) -> CellList {
        let fractional = positions.iter()
            .map(|&position| unit_cell.to_fractional(position))
            .collect::<Vec<_>>();

        let spacings = unit_cell.rspacings();
        let mut periodic = [false; 3];
        let mut origin = [0.0; 3];
        let mut extent = [1.0; 3];
        // real space thickness of the region covered by the bins
        let mut thickness = [0.0; 3];
        for xyz in 0..3 {
            if xyz < unit_cell.nvec() {
                periodic[xyz] = true;
                thickness[xyz] = spacings[xyz];
            } else if !fractional.is_empty() {
                // completed directions are orthonormal, fractional coordinates
                // along them are distances
                let min = fractional.iter().map(|f| f[xyz]).fold(f64::INFINITY, f64::min);
                let max = fractional.iter().map(|f| f[xyz]).fold(f64::NEG_INFINITY, f64::max);
                origin[xyz] = min;
                extent[xyz] = max - min;
                thickness[xyz] = max - min;
            }
        }

        let mut n_cells = [
            f64::clamp(f64::trunc(thickness[0] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(thickness[1] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(thickness[2] / cutoff), 1.0, f64::INFINITY),
        ];

        // limit memory consumption by ensuring we have less than
        // `MAX_NUMBER_OF_CELLS` cells to look though
        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        if n_cells_total > MAX_NUMBER_OF_CELLS {
            // set the total number of cells close to MAX_NUMBER_OF_CELLS, while
            // keeping roughly the ratio of cells in each direction
            let scaling = f64::cbrt(MAX_NUMBER_OF_CELLS / n_cells_total);
            for n in &mut n_cells {
                *n = f64::max(f64::trunc(*n * scaling), 1.0);
            }

            warn!(
                "the neighbor list would need {} cells, reducing it to {}x{}x{} cells",
                n_cells_total, n_cells[0], n_cells[1], n_cells[2],
            );
        }

        // number of cells to search in each direction to make sure all possible
        // pairs below the cutoff are accounted for.
        let mut n_search = [0; 3];
        for xyz in 0..3 {
            if periodic[xyz] {
                n_search[xyz] = i32::max(f64::ceil(cutoff * n_cells[xyz] / thickness[xyz]) as i32, 1);
            } else if n_cells[xyz] > 1.0 {
                // bins are wider than the cutoff along non-periodic directions
                n_search[xyz] = 1;
            }
            // with a single bin in a non-periodic direction, there is no
            // neighboring bin to look at
        }

        let n_cells = [n_cells[0] as usize, n_cells[1] as usize, n_cells[2] as usize];

        let mut cell_list = CellList {
            n_search: n_search,
            periodic: periodic,
            origin: origin,
            extent: extent,
            cells: Array3::from_elem(n_cells, Vec::new()),
            unit_cell: unit_cell,
        };

        for (index, fractional) in fractional.iter().enumerate() {
            cell_list.add_atom(index, *fractional);
        }

        return cell_list;
    }

    /// Get the number of bins in this cell list
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Add a single atom to the cell list at the given `fractional` position.
    /// The atom is uniquely identified by its `index`.
    fn add_atom(&mut self, index: usize, fractional: Vector3D) {
        let n_cells = self.cells.shape();
        let n_cells = [n_cells[0], n_cells[1], n_cells[2]];

        let mut shift = [0; 3];
        let mut cell_index = [0; 3];
        for xyz in 0..3 {
            if self.periodic[xyz] {
                // deal with pbc by wrapping the atom inside if it was outside
                // of the cell
                let bin = f64::floor(fractional[xyz] * n_cells[xyz] as f64) as i32;
                let (quotient, remainder) = divmod(bin, n_cells[xyz]);
                shift[xyz] = quotient;
                cell_index[xyz] = remainder;
            } else if self.extent[xyz] > 0.0 {
                let scaled = (fractional[xyz] - self.origin[xyz]) / self.extent[xyz];
                let bin = f64::floor(scaled * n_cells[xyz] as f64) as usize;
                cell_index[xyz] = usize::min(bin, n_cells[xyz] - 1);
            }
        }

        self.cells[cell_index].push(AtomData {
            index: index,
            shift: CellShift::new(shift),
        });
    }

    /// Get the index of the cell at `cell_i` (which can be outside of the
    /// cell list) and the corresponding periodic shift, or `None` if the cell
    /// is outside of the bins along a non-periodic direction.
    fn neighbor_cell(&self, cell_i: [i32; 3]) -> Option<(CellShift, [usize; 3])> {
        let n_cells = self.cells.shape();

        let mut shift = [0; 3];
        let mut neighbor = [0; 3];
        for xyz in 0..3 {
            if self.periodic[xyz] {
                let (quotient, remainder) = divmod(cell_i[xyz], n_cells[xyz]);
                shift[xyz] = quotient;
                neighbor[xyz] = remainder;
            } else {
                if cell_i[xyz] < 0 || cell_i[xyz] as usize >= n_cells[xyz] {
                    return None;
                }
                neighbor[xyz] = cell_i[xyz] as usize;
            }
        }

        return Some((CellShift::new(shift), neighbor));
    }

    /// Get the list of candidate pair. Some pairs might be separated by more
    /// than `cutoff`, so additional filtering of the pairs might be required
    /// later.
    ///
    /// This function produces a so-called "half" neighbors list, where each
    /// pair is only included once. For example, if atoms 33 and 64 are in range
    /// of each other, the output will only contain pairs in the order 33-64,
    /// and not 64-33.
    ///
    /// If two atoms are neighbors of one another more than once (this can
    /// happen when the cutoff is larger than half the cell), all pairs at
    /// different distances/directions are still included.
    pub fn pairs(&self) -> Vec<CellPair> {
        let mut pairs = Vec::new();

        let search_x = -self.n_search[0]..=self.n_search[0];
        let search_y = -self.n_search[1]..=self.n_search[1];
        let search_z = -self.n_search[2]..=self.n_search[2];

        // for each cell in the cell list
        for ((cell_i_x, cell_i_y, cell_i_z), current_cell) in self.cells.indexed_iter() {
            if current_cell.is_empty() {
                continue;
            }

            // look through each neighboring cell
            for delta_x in search_x.clone() {
                for delta_y in search_y.clone() {
                    for delta_z in search_z.clone() {
                        let cell_i = [
                            cell_i_x as i32 + delta_x,
                            cell_i_y as i32 + delta_y,
                            cell_i_z as i32 + delta_z,
                        ];

                        let Some((cell_shift, neighbor_cell_i)) = self.neighbor_cell(cell_i) else {
                            continue;
                        };

                        for atom_i in current_cell {
                            for atom_j in &self.cells[neighbor_cell_i] {
                                // create a half neighbor list
                                if atom_i.index > atom_j.index {
                                    continue;
                                }

                                let shift = cell_shift + atom_i.shift - atom_j.shift;
                                if atom_i.index == atom_j.index && !keep_self_image(shift) {
                                    continue;
                                }

                                pairs.push(CellPair {
                                    first: atom_i.index,
                                    second: atom_j.index,
                                    shift: shift,
                                });
                            }
                        } // loop over atoms in current neighbor cells
                    }
                }
            } // loop over neighboring cells
        }

        return pairs;
    }

    /// Get the unit cell used by this cell list
    pub fn unit_cell(&self) -> &UnitCell {
        &self.unit_cell
    }
}

/// Should we keep a pair between an atom and its own periodic image with the
/// given `shift`?
///
/// The same atom is never paired with itself without shift. When creating
/// pairs between an atom and one of its periodic images, the cell list
/// generates redundant pairs (e.g. with shifts 0 1 1 and 0 -1 -1), and we only
/// keep the ones in the positive half-space.
fn keep_self_image(shift: CellShift) -> bool {
    if shift.is_zero() {
        return false;
    }

    if shift[0] + shift[1] + shift[2] < 0 {
        return false;
    }

    if (shift[0] + shift[1] + shift[2] == 0) && (shift[2] < 0 || (shift[2] == 0 && shift[1] < 0)) {
        // drop shifts in the negative half plane or the negative shift[1]
        // axis. See below for a graphical representation: we are keeping the
        // shifts indicated with `O` and dropping the ones indicated with `X`
        //
        //  O O O │ O O O
        //  O O O │ O O O
        //  O O O │ O O O
        // ─X─X─X─┼─O─O─O─
        //  X X X │ X X X
        //  X X X │ X X X
        //  X X X │ X X X
        return false;
    }

    return true;
}

/// Function to compute both quotient and remainder of the division of a by b.
/// This function follows Python convention, making sure the remainder have the
/// same sign as `b`.
fn divmod(a: i32, b: usize) -> (i32, usize) {
    debug_assert!(b < (i32::MAX as usize));
    let b = b as i32;
    let mut quotient = a / b;
    let mut remainder = a % b;
    if remainder < 0 {
        remainder += b;
        quotient -= 1;
    }
    return (quotient, remainder as usize);
}

/// A pair of atoms in the neighbor list. The vector between the atoms at the
/// time the list was built is `position[second] - position[first] +
/// cell.shift_vector(shift)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    /// index of the first atom in the pair
    pub first: usize,
    /// index of the second atom in the pair
    pub second: usize,
    /// periodic image of the second atom in this pair
    pub shift: CellShift,
}

/// Possible states of a [`NeighborList`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborListState {
    /// The list was never built
    Empty,
    /// The list contains all pairs within the cutoff for the current positions
    Built,
    /// The list must be rebuilt before being used again
    Stale,
}

/// Verlet neighbor list, containing all pairs of atoms (including pairs with
/// periodic images) closer than `cutoff + skin`.
///
/// The list is only rebuilt when some atom moved by more than `skin / 2`
/// since the last build, when the cell changes, or when it was explicitly
/// marked as stale. Between rebuilds, the pairs are kept unchanged, and
/// translations of individual atoms by full lattice vectors (e.g. when an
/// integrator wraps positions inside the cell) are tracked so that
/// [`NeighborList::current_shift`] keeps producing the same pair vectors.
#[derive(Debug, Clone)]
pub struct NeighborList {
    cutoff: f64,
    skin: f64,
    cell: UnitCell,
    state: NeighborListState,
    pairs: Vec<Pair>,
    /// positions of the atoms at the last rebuild
    reference_positions: Vec<Vector3D>,
    /// lattice translations of each atom since the last rebuild
    image_offsets: Vec<CellShift>,
    rebuild_count: usize,
}

impl NeighborList {
    /// Create a new, empty neighbor list. This checks that `2 * cutoff` is not
    /// larger than the smallest distance between lattice planes of the cell.
    pub fn new(cell: UnitCell, cutoff: f64, skin: f64) -> Result<NeighborList, Error> {
        if !(cutoff > 0.0 && cutoff.is_finite()) {
            return Err(Error::InvalidCutoff(format!(
                "cutoff must be a positive number, got {}", cutoff
            )));
        }

        if !(skin >= 0.0 && skin.is_finite()) {
            return Err(Error::InvalidCutoff(format!(
                "neighbor list skin must be positive or zero, got {}", skin
            )));
        }

        check_cutoff(&cell, cutoff)?;

        return Ok(NeighborList {
            cutoff: cutoff,
            skin: skin,
            cell: cell,
            state: NeighborListState::Empty,
            pairs: Vec::new(),
            reference_positions: Vec::new(),
            image_offsets: Vec::new(),
            rebuild_count: 0,
        });
    }

    /// Get the cutoff of this neighbor list
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Get the skin of this neighbor list
    pub fn skin(&self) -> f64 {
        self.skin
    }

    /// Get the current state of this neighbor list
    pub fn state(&self) -> NeighborListState {
        self.state
    }

    /// Get the number of times this list was (re-)built
    pub fn rebuild_count(&self) -> usize {
        self.rebuild_count
    }

    /// Get the cell used by this neighbor list
    pub fn cell(&self) -> &UnitCell {
        &self.cell
    }

    /// Get all the pairs in this neighbor list, sorted by first atom, second
    /// atom and then cell shift.
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Force a rebuild of the list at the next call to `update`
    pub fn mark_stale(&mut self) {
        if self.state == NeighborListState::Built {
            self.state = NeighborListState::Stale;
        }
    }

    /// Replace the cell of this neighbor list, marking the list as stale.
    pub fn set_cell(&mut self, cell: UnitCell) -> Result<(), Error> {
        check_cutoff(&cell, self.cutoff)?;
        self.cell = cell;
        self.mark_stale();
        return Ok(());
    }

    /// Get the shift to use for the given `pair` with the current positions,
    /// accounting for lattice translations of the atoms since the last
    /// rebuild. The pair vector is then `positions[second] - positions[first]
    /// + cell.shift_vector(shift)`.
    pub fn current_shift(&self, pair: &Pair) -> CellShift {
        pair.shift + self.image_offsets[pair.first] - self.image_offsets[pair.second]
    }

    /// Update the neighbor list for new positions and cell, rebuilding it if
    /// needed. This returns `true` if the list was rebuilt and `false` if it
    /// was reused.
    #[time_graph::instrument(name = "NeighborList::update")]
    pub fn update(&mut self, positions: &[Vector3D], cell: &UnitCell) -> Result<bool, Error> {
        if cell != &self.cell {
            self.set_cell(*cell)?;
        }

        if let Some(position) = positions.iter().find(|p| !p.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "got non finite position {:?} in neighbor list update", position
            )));
        }

        if self.state == NeighborListState::Built {
            if positions.len() == self.reference_positions.len() {
                let displacements = positions.par_iter()
                    .zip(&self.reference_positions)
                    .map(|(&position, &reference)| {
                        let displacement = position - reference;
                        let shift = self.cell.image_shift(displacement);
                        let distance = (displacement - self.cell.shift_vector(shift)).norm();
                        (shift, distance)
                    })
                    .collect::<Vec<_>>();

                let max_displacement = displacements.iter()
                    .map(|&(_, distance)| distance)
                    .fold(0.0, f64::max);

                if max_displacement <= 0.5 * self.skin {
                    debug!(
                        "reusing neighbor list, maximal displacement is {:.4} (skin is {})",
                        max_displacement, self.skin
                    );
                    self.image_offsets = displacements.into_iter().map(|(shift, _)| shift).collect();
                    return Ok(false);
                }

                debug!(
                    "maximal displacement ({:.4}) is larger than half the skin ({}), rebuilding neighbor list",
                    max_displacement, self.skin
                );
            }
            self.state = NeighborListState::Stale;
        }

        self.rebuild(positions);
        return Ok(true);
    }

    fn rebuild(&mut self, positions: &[Vector3D]) {
        let range = self.cutoff + self.skin;
        let range2 = range * range;
        let cell_list = CellList::new(self.cell, positions, range);

        // the cell list creates too many pairs, we only need to keep the one
        // where the distance is actually below the range
        let mut pairs = Vec::new();
        for pair in cell_list.pairs() {
            let mut vector = positions[pair.second] - positions[pair.first];
            self.cell.add_shift(&mut vector, pair.shift);

            let distance2 = vector.norm2();
            if distance2 < range2 {
                if distance2 < 1e-6 {
                    warn!(
                        "atoms {} and {} are very close to one another ({} A)",
                        pair.first, pair.second, distance2.sqrt()
                    );
                }

                pairs.push(Pair {
                    first: pair.first,
                    second: pair.second,
                    shift: pair.shift,
                });
            }
        }

        pairs.sort_unstable_by_key(|pair| (pair.first, pair.second, pair.shift));

        info!(
            "rebuilt neighbor list with {} pairs ({} bins, range {})",
            pairs.len(), cell_list.n_cells(), range
        );

        self.pairs = pairs;
        self.reference_positions = positions.to_vec();
        self.image_offsets = vec![CellShift::default(); positions.len()];
        self.state = NeighborListState::Built;
        self.rebuild_count += 1;
    }
}

/// Check that the minimum image convention is valid for `cutoff` in `cell`
fn check_cutoff(cell: &UnitCell, cutoff: f64) -> Result<(), Error> {
    let min_spacing = cell.min_rspacing();
    if 2.0 * cutoff > min_spacing {
        return Err(Error::InvalidCutoff(format!(
            "cutoff ({}) is larger than half of the smallest distance between lattice planes ({})",
            cutoff, min_spacing
        )));
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use approx::assert_ulps_eq;

    use super::*;

    fn pair_distance(list: &NeighborList, pair: &Pair, positions: &[Vector3D]) -> f64 {
        let mut vector = positions[pair.second] - positions[pair.first];
        list.cell().add_shift(&mut vector, list.current_shift(pair));
        return vector.norm();
    }

    #[test]
    fn non_periodic() {
        let positions = [
            Vector3D::new(0.134, 1.282, 1.701),
            Vector3D::new(-0.273, 1.026, -1.471),
            Vector3D::new(1.922, -0.124, 1.900),
            Vector3D::new(1.400, -0.464, 0.480),
            Vector3D::new(0.149, 1.865, 0.635),
        ];

        let mut neighbors = NeighborList::new(UnitCell::infinite(), 3.42, 0.0).unwrap();
        assert_eq!(neighbors.state(), NeighborListState::Empty);
        assert!(neighbors.update(&positions, &UnitCell::infinite()).unwrap());
        assert_eq!(neighbors.state(), NeighborListState::Built);

        // reference computed with ASE
        let reference = [
            (0, 1, 3.2082345612501593),
            (0, 2, 2.283282943482914),
            (0, 3, 2.4783286706972505),
            (0, 4, 1.215100818862369),
            (1, 3, 2.9707625283755013),
            (1, 4, 2.3059143522689647),
            (2, 3, 1.550639867925496),
            (2, 4, 2.9495550511899244),
            (3, 4, 2.6482573515427084),
        ];

        assert_eq!(neighbors.pairs().len(), reference.len());
        for (pair, reference) in neighbors.pairs().iter().zip(&reference) {
            assert_eq!(pair.first, reference.0);
            assert_eq!(pair.second, reference.1);
            assert!(pair.shift.is_zero());
            assert_ulps_eq!(pair_distance(&neighbors, pair, &positions), reference.2);
        }
    }

    #[test]
    fn large_cell_small_cutoff() {
        let cell = UnitCell::cubic(54.0).unwrap();
        let positions = [
            Vector3D::new(0.0, 0.0, 0.0),
            Vector3D::new(0.0, 2.0, 0.0),
            Vector3D::new(0.0, 0.0, 2.0),
            // atoms outside the cell natural boundaries
            Vector3D::new(-6.0, 0.0, 0.0),
            Vector3D::new(-6.0, -2.0, 0.0),
            Vector3D::new(-6.0, 0.0, -2.0),
        ];

        let mut neighbors = NeighborList::new(cell, 2.1, 0.0).unwrap();
        neighbors.update(&positions, &cell).unwrap();

        let expected = [(0, 1), (0, 2), (3, 4), (3, 5)];

        assert_eq!(neighbors.pairs().len(), expected.len());
        for (pair, expected) in neighbors.pairs().iter().zip(&expected) {
            assert_eq!(pair.first, expected.0);
            assert_eq!(pair.second, expected.1);
            assert!(pair.shift.is_zero());
            assert_ulps_eq!(pair_distance(&neighbors, pair, &positions), 2.0);
        }
    }

    #[test]
    fn invalid_cutoff() {
        let cell = UnitCell::cubic(10.0).unwrap();
        let error = NeighborList::new(cell, 5.5, 0.0).unwrap_err();
        assert!(matches!(error, Error::InvalidCutoff(_)));

        assert!(NeighborList::new(cell, 5.0, 1.0).is_ok());
        assert!(NeighborList::new(cell, -1.0, 1.0).is_err());
        assert!(NeighborList::new(cell, 3.0, -1.0).is_err());

        // the cutoff is checked again when changing the cell
        let mut neighbors = NeighborList::new(cell, 4.0, 1.0).unwrap();
        let error = neighbors.set_cell(UnitCell::cubic(7.0).unwrap()).unwrap_err();
        assert!(matches!(error, Error::InvalidCutoff(_)));
    }

    #[test]
    fn small_cell_large_cutoff_cell_list() {
        // the cell list itself supports cutoffs larger than the cell
        let cell = UnitCell::cubic(0.5).unwrap();
        let positions = [Vector3D::new(0.0, 0.0, 0.0)];
        let cell_list = CellList::new(cell, &positions, 0.6);

        let mut pairs = cell_list.pairs().into_iter().filter(|pair| {
            let mut vector = positions[pair.second] - positions[pair.first];
            cell.add_shift(&mut vector, pair.shift);
            vector.norm() < 0.6
        }).collect::<Vec<_>>();
        pairs.sort_unstable_by_key(|pair| pair.shift);

        let expected = [[0, 0, 1], [0, 1, 0], [1, 0, 0]];
        assert_eq!(pairs.len(), 3);
        for (pair, shift) in pairs.iter().zip(&expected) {
            assert_eq!(pair.first, 0);
            assert_eq!(pair.second, 0);
            assert_eq!(pair.shift.as_array(), *shift);
        }
    }

    #[test]
    fn non_cubic_cell_list() {
        let cell = UnitCell::new(&[
            Vector3D::new(4.26, -2.45951215, 0.0),
            Vector3D::new(2.13, 1.22975607, 0.0),
            Vector3D::new(0.0, 0.0, 50.0),
        ]).unwrap();
        let positions = [
            Vector3D::new(1.42, 0.0, 0.0),
            Vector3D::new(2.84, 0.0, 0.0),
            Vector3D::new(3.55, -1.22975607, 0.0),
            Vector3D::new(4.97, -1.22975607, 0.0),
        ];
        let cell_list = CellList::new(cell, &positions, 6.4);
        let pairs = cell_list.pairs().into_iter().filter(|pair| {
            let mut vector = positions[pair.second] - positions[pair.first];
            cell.add_shift(&mut vector, pair.shift);
            vector.norm() < 6.4
        }).collect::<Vec<_>>();

        assert_eq!(pairs.len(), 90);

        let previously_missing = [
            (0, 3, [-2, 0, 0]),
            (0, 3, [-2, 1, 0]),
            (0, 3, [-2, 2, 0]),
        ];

        for missing in previously_missing {
            let found = pairs.iter().any(|pair| {
                pair.first == missing.0 && pair.second == missing.1 && pair.shift.as_array() == missing.2
            });
            assert!(found, "could not find pair {:?}", missing);
        }
    }

    #[test]
    fn slab_cell_list() {
        // periodic in x and y, free along z
        let cell = UnitCell::new(&[Vector3D::new(5.0, 0.0, 0.0), Vector3D::new(0.0, 5.0, 0.0)]).unwrap();
        let positions = [
            Vector3D::new(0.5, 0.5, 0.0),
            Vector3D::new(4.5, 0.5, 0.0),
            Vector3D::new(0.5, 0.5, 40.0),
            Vector3D::new(0.5, 0.5, 41.5),
        ];

        let mut neighbors = NeighborList::new(cell, 2.0, 0.0).unwrap();
        neighbors.update(&positions, &cell).unwrap();

        let pairs = neighbors.pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[0].first, pairs[0].second), (0, 1));
        assert_eq!(pairs[0].shift.as_array(), [-1, 0, 0]);
        assert_ulps_eq!(pair_distance(&neighbors, &pairs[0], &positions), 1.0);

        assert_eq!((pairs[1].first, pairs[1].second), (2, 3));
        assert!(pairs[1].shift.is_zero());
    }

    #[test]
    fn reuse_and_rebuild() {
        let cell = UnitCell::cubic(10.0).unwrap();
        let mut positions = vec![
            Vector3D::new(0.0, 0.0, 0.0),
            Vector3D::new(3.2, 0.0, 0.0),
            Vector3D::new(9.5, 9.5, 9.5),
        ];

        let mut neighbors = NeighborList::new(cell, 3.0, 1.0).unwrap();
        assert!(neighbors.update(&positions, &cell).unwrap());
        let initial = neighbors.pairs().to_vec();
        // (0, 1) is in the skin, (0, 2) crosses the boundaries
        assert_eq!(initial.len(), 3);

        // small displacements, the list is reused
        positions[1][0] -= 0.4;
        assert!(!neighbors.update(&positions, &cell).unwrap());
        assert_eq!(neighbors.pairs(), initial);
        assert_eq!(neighbors.rebuild_count(), 1);

        // wrapping an atom inside the cell does not trigger a rebuild, and the
        // pair vectors are unchanged
        let before = pair_distance(&neighbors, &neighbors.pairs()[1], &positions);
        positions[2] -= Vector3D::new(10.0, 10.0, 10.0);
        assert!(!neighbors.update(&positions, &cell).unwrap());
        let after = pair_distance(&neighbors, &neighbors.pairs()[1], &positions);
        assert_ulps_eq!(before, after);

        // large displacement, the list is rebuilt
        positions[1][0] += 1.0;
        assert!(neighbors.update(&positions, &cell).unwrap());
        assert_eq!(neighbors.rebuild_count(), 2);

        // explicit invalidation
        neighbors.mark_stale();
        assert_eq!(neighbors.state(), NeighborListState::Stale);
        assert!(neighbors.update(&positions, &cell).unwrap());

        // changing the number of atoms
        positions.push(Vector3D::new(5.0, 5.0, 5.0));
        assert!(neighbors.update(&positions, &cell).unwrap());
        assert_eq!(neighbors.rebuild_count(), 4);
    }
}
