use std::cell::RefCell;
use std::collections::BTreeSet;

use indexmap::IndexMap;
use rayon::prelude::*;
use thread_local::ThreadLocal;

use crate::{Error, Matrix3, Vector3D};
use crate::systems::{Delta, DeltaList, Topology, UnitCell};

use super::{PairPotential, Truncation};
use super::potentials::PairFunction;

/// Configuration of a single non-bonded pair interaction
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PairTerm {
    /// the pair potential to use
    pub potential: PairPotential,
    /// how to bring the potential to zero at the cutoff
    #[serde(default)]
    pub truncation: Truncation,
    /// should the exclusion scalings for atoms close in the bond graph be
    /// applied to this term?
    #[serde(default = "serde_default_scaled")]
    pub scaled: bool,
}

fn serde_default_scaled() -> bool {
    return true;
}

/// Per-thread partial sums during the evaluation of a pair part
struct Accumulator {
    energy: f64,
    gradient: Vec<Vector3D>,
    virial: Matrix3,
    overlapping: Option<(usize, usize)>,
}

impl Accumulator {
    fn new(n_atoms: usize) -> Accumulator {
        Accumulator {
            energy: 0.0,
            gradient: vec![Vector3D::zero(); n_atoms],
            virial: Matrix3::zero(),
            overlapping: None,
        }
    }
}

/// Evaluation of a single pair potential over all the pairs in the neighbor
/// list.
#[derive(Debug, Clone)]
pub struct PairPart {
    name: String,
    cutoff: f64,
    truncation: Truncation,
    /// index of the type of each atom
    atom_types: Vec<usize>,
    n_types: usize,
    /// resolved potential for each pair of types
    functions: Vec<Option<PairFunction>>,
    /// atomic charges, only set for electrostatic potentials
    charges: Option<Vec<f64>>,
    /// scaling of atoms close in the bond graph, empty for unscaled terms
    exclusions: IndexMap<(usize, usize), f64>,
}

impl PairPart {
    /// Create a new pair part for the atoms in `topology`.
    ///
    /// `exclusions` contains the scaling factor for pairs of atoms close in
    /// the bond graph, as produced by [`Topology::exclusions`].
    pub fn new(
        term: &PairTerm,
        topology: &Topology,
        exclusions: &IndexMap<(usize, usize), f64>,
        cutoff: f64,
        coulomb_constant: f64,
    ) -> Result<PairPart, Error> {
        term.truncation.validate(cutoff)?;

        let all_types = topology.types().iter().cloned().collect::<BTreeSet<_>>();
        let all_types = all_types.into_iter().collect::<Vec<_>>();
        let atom_types = topology.types().iter()
            .map(|name| all_types.iter().position(|t| t == name).unwrap_or_default())
            .collect();

        let functions = term.potential.build(&all_types, coulomb_constant, cutoff)?;

        let charges = if term.potential.uses_charges() {
            Some(topology.charges().to_vec())
        } else {
            None
        };

        return Ok(PairPart {
            name: term.potential.name().into(),
            cutoff: cutoff,
            truncation: term.truncation,
            atom_types: atom_types,
            n_types: all_types.len(),
            functions: functions,
            charges: charges,
            exclusions: if term.scaled { exclusions.clone() } else { IndexMap::new() },
        });
    }

    /// Get the name of this part
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Override the name of this part
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Get the scaling factor to use for the given pair. Only the minimum
    /// image of a pair of atoms is scaled.
    fn scaling(&self, delta: &Delta, cell: &UnitCell) -> f64 {
        if self.exclusions.is_empty() || delta.first == delta.second {
            return 1.0;
        }

        let key = (usize::min(delta.first, delta.second), usize::max(delta.first, delta.second));
        match self.exclusions.get(&key) {
            Some(&scaling) if cell.image_shift(delta.vector).is_zero() => scaling,
            _ => 1.0,
        }
    }

    /// Compute the energy of this part from the neighbor pairs in `deltas`,
    /// accumulating the gradient with respect to positions in `gradient` and
    /// the virial in `virial`.
    #[time_graph::instrument(name = "PairPart::compute")]
    pub fn compute(
        &self,
        deltas: &DeltaList,
        cell: &UnitCell,
        gradient: &mut [Vector3D],
        virial: &mut Matrix3,
    ) -> Result<f64, Error> {
        let n_atoms = self.atom_types.len();
        if gradient.len() != n_atoms {
            return Err(Error::Internal(format!(
                "expected a gradient array for {} atoms, got {}", n_atoms, gradient.len()
            )));
        }

        let accumulators = ThreadLocal::new();
        deltas.deltas().par_iter().for_each(|delta| {
            if delta.distance >= self.cutoff {
                return;
            }

            let type_i = self.atom_types[delta.first];
            let type_j = self.atom_types[delta.second];
            let function = match &self.functions[type_i * self.n_types + type_j] {
                Some(function) => function,
                None => return,
            };

            let scaling = self.scaling(delta, cell);
            if scaling == 0.0 {
                return;
            }

            let mut accumulator = accumulators.get_or(|| RefCell::new(Accumulator::new(n_atoms))).borrow_mut();
            if delta.distance == 0.0 {
                accumulator.overlapping = Some((delta.first, delta.second));
                return;
            }

            let charges = match self.charges {
                Some(ref charges) => charges[delta.first] * charges[delta.second],
                None => 0.0,
            };

            let (energy, derivative) = function.compute(delta.distance, charges);
            let (truncation, truncation_derivative) = self.truncation.compute(delta.distance, self.cutoff);

            let energy_derivative = scaling * (derivative * truncation + energy * truncation_derivative);
            let pair_gradient = energy_derivative / delta.distance * delta.vector;

            accumulator.energy += scaling * energy * truncation;
            accumulator.gradient[delta.first] -= pair_gradient;
            accumulator.gradient[delta.second] += pair_gradient;
            accumulator.virial -= delta.vector.tensor_product(pair_gradient);
        });

        let mut energy = 0.0;
        for accumulator in accumulators {
            let accumulator = accumulator.into_inner();
            if let Some((first, second)) = accumulator.overlapping {
                return Err(Error::DegenerateGeometry(format!(
                    "atoms {} and {} are on top of each other", first, second
                )));
            }

            energy += accumulator.energy;
            for (total, partial) in gradient.iter_mut().zip(&accumulator.gradient) {
                *total += *partial;
            }
            *virial += accumulator.virial;
        }

        return Ok(energy);
    }
}
