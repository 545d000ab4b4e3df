use log::info;

use crate::{Error, Matrix3, Vector3D};
use crate::systems::{DeltaList, NeighborList, Scalings, Topology, UnitCell};
use crate::valence::{ValenceList, ValenceParameters};
use crate::pairs::{PairPart, PairPotential, PairTerm, Truncation};
use crate::ewald::{EwaldParameters, EwaldPart, EwaldReciprocal, EwaldExclusionCorrection};

/// Units used by the force field
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct UnitSystem {
    /// Coulomb constant `1 / (4π ε0)` in the energy and length units of the
    /// force field. The default (1) corresponds to atomic units.
    #[serde(default = "serde_default_coulomb_constant")]
    pub coulomb_constant: f64,
}

fn serde_default_coulomb_constant() -> f64 {
    return 1.0;
}

impl Default for UnitSystem {
    fn default() -> UnitSystem {
        UnitSystem {
            coulomb_constant: serde_default_coulomb_constant(),
        }
    }
}

/// Parameters of the neighbor list shared by all pair interactions
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NeighborParameters {
    /// cutoff radius of all pair interactions
    pub cutoff: f64,
    /// additional distance included in the neighbor list, allowing it to be
    /// reused until some atom moved by more than half the skin
    #[serde(default)]
    pub skin: f64,
}

/// Full set of parameters of a force field
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ForceFieldParameters {
    /// units of the force field parameters
    #[serde(default)]
    pub units: UnitSystem,
    /// neighbor list parameters
    pub neighbors: NeighborParameters,
    /// non-bonded pair interactions
    #[serde(default)]
    pub pairs: Vec<PairTerm>,
    /// Ewald summation for the electrostatic interactions
    #[serde(default)]
    pub ewald: Option<EwaldParameters>,
    /// scaling of the non-bonded interactions between atoms close in the
    /// bond graph
    #[serde(default)]
    pub valence_scalings: Scalings,
    /// bonded interactions
    #[serde(default)]
    pub valence: Vec<ValenceParameters>,
    /// external pressure, adding a `P V` term to the energy
    #[serde(default)]
    pub pressure: Option<f64>,
}

impl ForceFieldParameters {
    /// Load force field parameters from a JSON string
    pub fn from_json(json: &str) -> Result<ForceFieldParameters, Error> {
        let parameters = serde_json::from_str::<ForceFieldParameters>(json)?;
        parameters.validate()?;
        return Ok(parameters);
    }

    /// Check the consistency of all the parameters
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.units.coulomb_constant > 0.0 && self.units.coulomb_constant.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "coulomb_constant must be positive, got {}", self.units.coulomb_constant
            )));
        }

        self.valence_scalings.validate()?;

        if let Some(ewald) = &self.ewald {
            ewald.validate()?;
        }

        for term in &self.pairs {
            term.truncation.validate(self.neighbors.cutoff)?;
        }

        for valence in &self.valence {
            valence.term.validate()?;
        }

        if let Some(pressure) = self.pressure {
            if !pressure.is_finite() {
                return Err(Error::InvalidParameter(format!(
                    "pressure must be finite, got {}", pressure
                )));
            }
        }

        return Ok(());
    }
}

/// Data available to all parts of a force field during an evaluation
#[derive(Debug, Clone, Copy)]
pub struct SystemState<'a> {
    /// positions of all atoms
    pub positions: &'a [Vector3D],
    /// current cell
    pub cell: &'a UnitCell,
    /// displacement vectors for all pairs in the neighbor list
    pub neighbors: &'a DeltaList,
}

/// A single contribution to the energy of a force field.
pub trait EnergyPart: Send + std::fmt::Debug {
    /// Get the name of this part, used to report the energies
    fn name(&self) -> &str;

    /// Update this part after a change of the cell vectors
    fn set_cell(&mut self, cell: &UnitCell) -> Result<(), Error> {
        let _ = cell;
        return Ok(());
    }

    /// Compute the energy of this part, accumulating the gradient of the
    /// energy with respect to the atomic positions in `gradient` and the
    /// virial in `virial`.
    fn compute(&mut self, system: &SystemState, gradient: &mut [Vector3D], virial: &mut Matrix3) -> Result<f64, Error>;
}

impl EnergyPart for PairPart {
    fn name(&self) -> &str {
        PairPart::name(self)
    }

    fn compute(&mut self, system: &SystemState, gradient: &mut [Vector3D], virial: &mut Matrix3) -> Result<f64, Error> {
        PairPart::compute(self, system.neighbors, system.cell, gradient, virial)
    }
}

impl EnergyPart for ValenceList {
    fn name(&self) -> &str {
        "valence"
    }

    fn compute(&mut self, system: &SystemState, gradient: &mut [Vector3D], virial: &mut Matrix3) -> Result<f64, Error> {
        ValenceList::compute(self, system.positions, system.cell, gradient, virial)
    }
}

/// Work done against a constant external pressure, `E = P V`.
#[derive(Debug, Clone, Copy)]
pub struct ExternalPressure {
    pressure: f64,
}

impl ExternalPressure {
    /// Create the `P·V` term for the given `pressure`. The cell must be
    /// periodic in all three directions.
    pub fn new(pressure: f64, cell: &UnitCell) -> Result<ExternalPressure, Error> {
        if cell.nvec() != 3 {
            return Err(Error::UnsupportedCellDimension(format!(
                "external pressure requires a cell periodic in 3 dimensions, got {} periodic dimensions",
                cell.nvec()
            )));
        }
        return Ok(ExternalPressure { pressure });
    }
}

impl EnergyPart for ExternalPressure {
    fn name(&self) -> &str {
        "external_pressure"
    }

    fn compute(&mut self, system: &SystemState, _: &mut [Vector3D], virial: &mut Matrix3) -> Result<f64, Error> {
        let energy = self.pressure * system.cell.volume();
        *virial -= energy * Matrix3::one();
        return Ok(energy);
    }
}

/// Result of a force field evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// total energy
    pub energy: f64,
    /// gradient of the energy with respect to the atomic positions. The forces
    /// are the opposite of this gradient.
    pub gradient: Vec<Vector3D>,
    /// virial tensor `W = -∂E/∂ε`, where `ε` is a homogeneous deformation of
    /// the system
    pub virial: Matrix3,
    /// energy of each part of the force field
    pub parts: Vec<(String, f64)>,
}

impl Evaluation {
    /// Get the energy of the part with the given name, if it exists
    pub fn part(&self, name: &str) -> Option<f64> {
        self.parts.iter().find(|(part, _)| part == name).map(|&(_, energy)| energy)
    }
}

/// A force field, computing the energy of a system and its derivatives from
/// the atomic positions and the cell.
#[derive(Debug)]
pub struct ForceField {
    topology: Topology,
    cell: UnitCell,
    neighbors: NeighborList,
    parts: Vec<Box<dyn EnergyPart>>,
}

impl ForceField {
    /// Create a new force field for the atoms in `topology`, using the given
    /// `parameters`.
    pub fn new(topology: Topology, cell: UnitCell, parameters: &ForceFieldParameters) -> Result<ForceField, Error> {
        parameters.validate()?;

        let cutoff = parameters.neighbors.cutoff;
        let neighbors = NeighborList::new(cell, cutoff, parameters.neighbors.skin)?;

        let coulomb_constant = parameters.units.coulomb_constant;
        let exclusions = topology.exclusions(&parameters.valence_scalings);

        let mut parts: Vec<Box<dyn EnergyPart>> = Vec::new();

        let mut valence = ValenceList::new(topology.size());
        for term in &parameters.valence {
            valence.add(term)?;
        }
        if !valence.is_empty() {
            parts.push(Box::new(valence));
        }

        for term in &parameters.pairs {
            let mut part = PairPart::new(term, &topology, &exclusions, cutoff, coulomb_constant)?;
            let name = part.name().to_string();
            let n_existing = parts.iter().filter(|other| other.name().starts_with(&name)).count();
            if n_existing != 0 {
                part.set_name(format!("{}_{}", name, n_existing));
            }
            parts.push(Box::new(part));
        }

        if let Some(ewald) = &parameters.ewald {
            let real_space = PairTerm {
                potential: PairPotential::DampedCoulomb { alpha: ewald.alpha, dielectric: 1.0 },
                truncation: Truncation::Hard {},
                scaled: true,
            };
            let mut part = PairPart::new(&real_space, &topology, &exclusions, cutoff, coulomb_constant)?;
            part.set_name("ewald_real");
            parts.push(Box::new(part));

            let charges = topology.charges().to_vec();
            let reciprocal = EwaldReciprocal::new(&cell, &charges, ewald, coulomb_constant)?;
            parts.push(Box::new(EwaldPart::Reciprocal(reciprocal)));

            parts.push(Box::new(EwaldPart::SelfEnergy {
                charges: charges.clone(),
                alpha: ewald.alpha,
                coulomb_constant: coulomb_constant,
            }));

            let correction = EwaldExclusionCorrection::new(&charges, &exclusions, ewald.alpha, coulomb_constant)?;
            if !correction.is_empty() {
                parts.push(Box::new(EwaldPart::ExclusionCorrection(correction)));
            }

            if ewald.neutralizing {
                parts.push(Box::new(EwaldPart::Neutralizing {
                    charges: charges.clone(),
                    alpha: ewald.alpha,
                    coulomb_constant: coulomb_constant,
                }));
            }

            if ewald.dipole_correction {
                parts.push(Box::new(EwaldPart::Dipole {
                    charges: charges,
                    coulomb_constant: coulomb_constant,
                }));
            }
        }

        if let Some(pressure) = parameters.pressure {
            parts.push(Box::new(ExternalPressure::new(pressure, &cell)?));
        }

        info!(
            "created force field for {} atoms with {} parts",
            topology.size(), parts.len()
        );

        return Ok(ForceField {
            topology: topology,
            cell: cell,
            neighbors: neighbors,
            parts: parts,
        });
    }

    /// Get the topology of the system
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Get the current cell
    pub fn cell(&self) -> &UnitCell {
        &self.cell
    }

    /// Get the neighbor list
    pub fn neighbors(&self) -> &NeighborList {
        &self.neighbors
    }

    /// Get the names of all the parts of this force field
    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|part| part.name()).collect()
    }

    /// Replace the cell of the system. This updates the k-vectors used by
    /// Ewald summation and forces a rebuild of the neighbor list at the next
    /// evaluation.
    pub fn update_cell(&mut self, cell: UnitCell) -> Result<(), Error> {
        if cell.nvec() != self.cell.nvec() {
            return Err(Error::UnsupportedCellDimension(format!(
                "can not change the number of cell vectors from {} to {}",
                self.cell.nvec(), cell.nvec()
            )));
        }

        self.neighbors.set_cell(cell)?;
        for part in &mut self.parts {
            part.set_cell(&cell)?;
        }
        self.cell = cell;

        return Ok(());
    }

    /// Compute the energy, gradient and virial for the given `positions` and
    /// `cell`. If the cell differs from the current one, it is updated first.
    #[time_graph::instrument(name = "ForceField::evaluate")]
    pub fn evaluate(&mut self, positions: &[Vector3D], cell: &UnitCell) -> Result<Evaluation, Error> {
        if positions.len() != self.topology.size() {
            return Err(Error::InconsistentTopology(format!(
                "expected positions for {} atoms, got {}", self.topology.size(), positions.len()
            )));
        }

        if cell != &self.cell {
            self.update_cell(*cell)?;
        }

        self.neighbors.update(positions, &self.cell)?;
        let mut neighbor_deltas = DeltaList::from_neighbors(&self.neighbors);
        neighbor_deltas.update(positions, &self.cell)?;

        let system = SystemState {
            positions: positions,
            cell: &self.cell,
            neighbors: &neighbor_deltas,
        };

        let mut gradient = vec![Vector3D::zero(); positions.len()];
        let mut virial = Matrix3::zero();
        let mut energy = 0.0;
        let mut parts = Vec::with_capacity(self.parts.len());
        for part in &mut self.parts {
            let part_energy = part.compute(&system, &mut gradient, &mut virial)?;
            energy += part_energy;
            parts.push((part.name().to_string(), part_energy));
        }

        return Ok(Evaluation {
            energy: energy,
            gradient: gradient,
            virial: virial,
            parts: parts,
        });
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::valence::{InternalCoordinate, ValenceTerm};
    use super::*;

    fn two_charges() -> (Topology, ForceFieldParameters) {
        let topology = Topology::new(vec!["A".into(), "B".into()], vec![1.0, -1.0]).unwrap();
        let parameters = ForceFieldParameters::from_json(r#"{
            "neighbors": {"cutoff": 10.0, "skin": 1.0},
            "pairs": [{"potential": {"type": "DampedCoulomb", "alpha": 0.0}}]
        }"#).unwrap();
        return (topology, parameters);
    }

    #[test]
    fn two_point_charges() {
        let (topology, parameters) = two_charges();
        let cell = UnitCell::infinite();
        let mut forcefield = ForceField::new(topology, cell, &parameters).unwrap();

        let positions = [Vector3D::zero(), Vector3D::new(3.0, 0.0, 4.0)];
        let evaluation = forcefield.evaluate(&positions, &cell).unwrap();
        assert_relative_eq!(evaluation.energy, -1.0 / 5.0, max_relative = 1e-12);

        // force on the second atom points toward the first one, with
        // magnitude k q1 q2 / r²
        let force = -evaluation.gradient[1];
        assert_relative_eq!(force.norm(), 1.0 / 25.0, max_relative = 1e-12);
        assert_relative_eq!(force.normalized(), -positions[1].normalized(), max_relative = 1e-12);
        assert_relative_eq!(evaluation.gradient[0], -evaluation.gradient[1]);

        assert_eq!(evaluation.parts.len(), 1);
        assert_eq!(evaluation.part("damped_coulomb"), Some(evaluation.energy));
    }

    #[test]
    fn harmonic_bond() {
        let mut topology = Topology::new(vec!["C".into(), "C".into()], vec![0.0, 0.0]).unwrap();
        topology.add_bond(0, 1).unwrap();

        let mut parameters = ForceFieldParameters::from_json(r#"{"neighbors": {"cutoff": 5.0}}"#).unwrap();
        parameters.valence.push(ValenceParameters {
            term: ValenceTerm::Harmonic { k: 3.0, rest: 1.5 },
            coordinates: vec![InternalCoordinate::Bond([0, 1])],
        });

        let cell = UnitCell::infinite();
        let mut forcefield = ForceField::new(topology, cell, &parameters).unwrap();

        let positions = [Vector3D::zero(), Vector3D::new(0.0, 1.5, 0.0)];
        let evaluation = forcefield.evaluate(&positions, &cell).unwrap();
        assert_eq!(evaluation.energy, 0.0);
        assert_eq!(evaluation.gradient, [Vector3D::zero(), Vector3D::zero()]);

        let positions = [Vector3D::zero(), Vector3D::new(0.0, 1.6, 0.0)];
        let evaluation = forcefield.evaluate(&positions, &cell).unwrap();
        assert_relative_eq!(evaluation.energy, 0.5 * 3.0 * 0.01, max_relative = 1e-12);
        assert_relative_eq!(evaluation.gradient[1], Vector3D::new(0.0, 0.3, 0.0), max_relative = 1e-12);
        assert_eq!(forcefield.part_names(), ["valence"]);
    }

    #[test]
    fn external_pressure() {
        let topology = Topology::new(vec!["A".into()], vec![0.0]).unwrap();
        let parameters = ForceFieldParameters::from_json(r#"{
            "neighbors": {"cutoff": 3.0},
            "pressure": 0.5
        }"#).unwrap();

        let cell = UnitCell::cubic(10.0).unwrap();
        let mut forcefield = ForceField::new(topology.clone(), cell, &parameters).unwrap();
        let evaluation = forcefield.evaluate(&[Vector3D::zero()], &cell).unwrap();
        assert_relative_eq!(evaluation.energy, 500.0);
        assert_relative_eq!(evaluation.virial, -500.0 * Matrix3::one());

        let error = ForceField::new(topology, UnitCell::infinite(), &parameters).unwrap_err();
        assert!(matches!(error, Error::UnsupportedCellDimension(_)));
    }

    #[test]
    fn update_cell() {
        let (topology, parameters) = two_charges();
        let cell = UnitCell::cubic(25.0).unwrap();
        let mut forcefield = ForceField::new(topology, cell, &parameters).unwrap();

        let positions = [Vector3D::zero(), Vector3D::new(3.0, 0.0, 4.0)];
        forcefield.evaluate(&positions, &cell).unwrap();
        assert_eq!(forcefield.neighbors().rebuild_count(), 1);

        let new_cell = UnitCell::cubic(24.0).unwrap();
        forcefield.update_cell(new_cell).unwrap();
        assert_eq!(forcefield.cell(), &new_cell);
        forcefield.evaluate(&positions, &new_cell).unwrap();
        assert_eq!(forcefield.neighbors().rebuild_count(), 2);

        // too small for the cutoff
        let error = forcefield.update_cell(UnitCell::cubic(15.0).unwrap()).unwrap_err();
        assert!(matches!(error, Error::InvalidCutoff(_)));

        let error = forcefield.update_cell(UnitCell::infinite()).unwrap_err();
        assert!(matches!(error, Error::UnsupportedCellDimension(_)));
    }

    #[test]
    fn invalid_parameters() {
        let (topology, _) = two_charges();
        let error = ForceFieldParameters::from_json(r#"{"neighbors": {"cutoff": 5.0}, "units": {"coulomb_constant": -1}}"#).unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));

        let error = ForceFieldParameters::from_json(r#"{"neighbors": {"cutoff": 5.0}, "unknown": 3}"#).unwrap_err();
        assert!(matches!(error, Error::Json(_)));

        let parameters = ForceFieldParameters::from_json(r#"{"neighbors": {"cutoff": 5.0}}"#).unwrap();
        let error = ForceField::new(topology.clone(), UnitCell::cubic(8.0).unwrap(), &parameters).unwrap_err();
        assert!(matches!(error, Error::InvalidCutoff(_)));

        let mut forcefield = ForceField::new(topology, UnitCell::infinite(), &parameters).unwrap();
        let error = forcefield.evaluate(&[Vector3D::zero()], &UnitCell::infinite()).unwrap_err();
        assert!(matches!(error, Error::InconsistentTopology(_)));
    }
}
