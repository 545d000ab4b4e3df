use std::collections::VecDeque;

use indexmap::IndexMap;

use crate::Error;

/// Scaling factors applied to non-bonded interactions between atoms close to
/// each other in the bond graph.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Scalings {
    /// scaling for pairs of directly bonded atoms
    #[serde(default)]
    pub scale_12: f64,
    /// scaling for pairs of atoms separated by two bonds
    #[serde(default)]
    pub scale_13: f64,
    /// scaling for pairs of atoms separated by three bonds
    #[serde(default = "serde_default_scale_14")]
    pub scale_14: f64,
}

fn serde_default_scale_14() -> f64 {
    return 1.0;
}

impl Default for Scalings {
    fn default() -> Scalings {
        Scalings {
            scale_12: 0.0,
            scale_13: 0.0,
            scale_14: 1.0,
        }
    }
}

impl Scalings {
    /// Check that all scaling factors are between 0 and 1
    pub fn validate(&self) -> Result<(), Error> {
        for (name, value) in [("scale_12", self.scale_12), ("scale_13", self.scale_13), ("scale_14", self.scale_14)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidParameter(format!(
                    "{} must be between 0 and 1, got {}", name, value
                )));
            }
        }
        return Ok(());
    }

    /// Get the scaling for atoms separated by `n_bonds` bonds
    fn for_bond_distance(&self, n_bonds: usize) -> f64 {
        match n_bonds {
            1 => self.scale_12,
            2 => self.scale_13,
            3 => self.scale_14,
            _ => 1.0,
        }
    }
}

/// Description of the atoms in a system and the bonds between them.
///
/// Each atom has a type, used to look up the parameters of pair potentials,
/// and a charge used by electrostatic interactions.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    types: Vec<String>,
    charges: Vec<f64>,
    bonds: Vec<[usize; 2]>,
}

impl Topology {
    /// Create a new topology with the given atomic types and charges, and no
    /// bonds.
    pub fn new(types: Vec<String>, charges: Vec<f64>) -> Result<Topology, Error> {
        if types.len() != charges.len() {
            return Err(Error::InconsistentTopology(format!(
                "got {} atomic types but {} charges", types.len(), charges.len()
            )));
        }

        if let Some(charge) = charges.iter().find(|q| !q.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "atomic charges must be finite, got {}", charge
            )));
        }

        return Ok(Topology {
            types: types,
            charges: charges,
            bonds: Vec::new(),
        });
    }

    /// Add a bond between atoms `i` and `j`
    pub fn add_bond(&mut self, i: usize, j: usize) -> Result<(), Error> {
        if i == j {
            return Err(Error::InconsistentTopology(format!(
                "can not create a bond between atom {} and itself", i
            )));
        }

        if i >= self.size() || j >= self.size() {
            return Err(Error::InconsistentTopology(format!(
                "bond between atoms {} and {} is out of bounds for a system with {} atoms",
                i, j, self.size()
            )));
        }

        let bond = [usize::min(i, j), usize::max(i, j)];
        if self.bonds.contains(&bond) {
            return Err(Error::InconsistentTopology(format!(
                "bond between atoms {} and {} is already defined", i, j
            )));
        }

        self.bonds.push(bond);
        return Ok(());
    }

    /// Get the number of atoms in this topology
    pub fn size(&self) -> usize {
        self.types.len()
    }

    /// Get the types of all atoms
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// Get the charges of all atoms
    pub fn charges(&self) -> &[f64] {
        &self.charges
    }

    /// Get the list of bonds, each bond is stored with the smallest index
    /// first
    pub fn bonds(&self) -> &[[usize; 2]] {
        &self.bonds
    }

    /// Get the list of bonded neighbors for each atom, sorted by index
    pub fn bonded_neighbors(&self) -> Vec<Vec<usize>> {
        let mut neighbors = vec![Vec::new(); self.size()];
        for &[i, j] in &self.bonds {
            neighbors[i].push(j);
            neighbors[j].push(i);
        }

        for list in &mut neighbors {
            list.sort_unstable();
        }

        return neighbors;
    }

    /// Get all bending angles `i-j-k` made of two bonds `i-j` and `j-k`,
    /// with `i < k`
    pub fn angles(&self) -> Vec<[usize; 3]> {
        let neighbors = self.bonded_neighbors();
        let mut angles = Vec::new();
        for (center, list) in neighbors.iter().enumerate() {
            for (a, &i) in list.iter().enumerate() {
                for &k in &list[a + 1..] {
                    angles.push([i, center, k]);
                }
            }
        }
        return angles;
    }

    /// Get all dihedral angles `i-j-k-l` made of three bonds, with `j < k`
    pub fn dihedrals(&self) -> Vec<[usize; 4]> {
        let neighbors = self.bonded_neighbors();
        let mut dihedrals = Vec::new();
        for &[j, k] in &self.bonds {
            for &i in &neighbors[j] {
                if i == k {
                    continue;
                }
                for &l in &neighbors[k] {
                    if l == j || l == i {
                        continue;
                    }
                    dihedrals.push([i, j, k, l]);
                }
            }
        }
        return dihedrals;
    }

    /// Get the scaling factor of all pairs of atoms separated by at most three
    /// bonds, using the shortest path in the bond graph. Pairs are stored
    /// with the smallest index first, and pairs with a scaling of 1 are not
    /// included.
    pub fn exclusions(&self, scalings: &Scalings) -> IndexMap<(usize, usize), f64> {
        let neighbors = self.bonded_neighbors();
        let mut exclusions = IndexMap::new();

        let mut distances = vec![usize::MAX; self.size()];
        for start in 0..self.size() {
            // breadth-first search up to three bonds away from `start`
            let mut visited = vec![start];
            distances[start] = 0;
            let mut queue = VecDeque::from([start]);
            while let Some(current) = queue.pop_front() {
                let distance = distances[current];
                if distance == 3 {
                    continue;
                }

                for &next in &neighbors[current] {
                    if distances[next] == usize::MAX {
                        distances[next] = distance + 1;
                        visited.push(next);
                        queue.push_back(next);
                    }
                }
            }

            for &other in &visited {
                if other > start {
                    let scaling = scalings.for_bond_distance(distances[other]);
                    if scaling != 1.0 {
                        exclusions.insert((start, other), scaling);
                    }
                }
                distances[other] = usize::MAX;
            }
        }

        exclusions.sort_keys();
        return exclusions;
    }
}
