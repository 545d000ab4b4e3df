//! Long-range electrostatic interactions with Ewald summation.
//!
//! The real space part of the sum is a [`PairPotential::DampedCoulomb`]
//! evaluated over the neighbor list, and the other parts are defined here:
//! the reciprocal space sum, the self-interaction, the correction for scaled
//! pairs of bonded atoms, and optional terms for charged systems and surface
//! dipoles.
//!
//! [`PairPotential::DampedCoulomb`]: crate::pairs::PairPotential::DampedCoulomb

use std::f64::consts::PI;

use indexmap::IndexMap;
use log::info;
use ndarray::{Array1, Array2, Zip};

use crate::{Error, Matrix3, Vector3D};
use crate::math::{erf, compute_k_vectors, KVector};
use crate::systems::{DeltaList, UnitCell};
use crate::forcefield::{EnergyPart, SystemState};

/// Parameters of the Ewald summation
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EwaldParameters {
    /// width parameter of the Gaussian screening charges, in inverse length
    /// units
    pub alpha: f64,
    /// cutoff of the reciprocal space sum, in inverse length units
    pub k_cutoff: f64,
    /// add the interaction with a uniform neutralizing background, for
    /// systems with a non-zero total charge
    #[serde(default)]
    pub neutralizing: bool,
    /// add the surface term for a system surrounded by vacuum
    #[serde(default)]
    pub dipole_correction: bool,
}

impl EwaldParameters {
    /// Check that `alpha` and the k-space cutoff are positive and finite
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.alpha > 0.0 && self.alpha.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "alpha must be positive for Ewald summation, got {}", self.alpha
            )));
        }

        if !(self.k_cutoff > 0.0 && self.k_cutoff.is_finite()) {
            return Err(Error::InvalidParameter(format!(
                "k_cutoff must be positive for Ewald summation, got {}", self.k_cutoff
            )));
        }

        return Ok(());
    }

    /// Get Ewald parameters for the given real space `cutoff`, such that both
    /// the real space and reciprocal space terms neglected by the cutoffs are
    /// approximately smaller than `accuracy` (relative to the terms included).
    pub fn suggested(cell: &UnitCell, cutoff: f64, accuracy: f64) -> Result<EwaldParameters, Error> {
        if cell.nvec() != 3 {
            return Err(Error::UnsupportedCellDimension(format!(
                "Ewald summation requires a cell periodic in 3 dimensions, got {} periodic dimensions",
                cell.nvec()
            )));
        }

        if !(cutoff > 0.0 && cutoff.is_finite()) {
            return Err(Error::InvalidCutoff(format!(
                "cutoff must be positive, got {}", cutoff
            )));
        }

        if !(accuracy > 0.0 && accuracy < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "accuracy must be between 0 and 1, got {}", accuracy
            )));
        }

        // erfc(α rc) ≈ exp(-α² rc²) and exp(-kc² / 4α²) are both set to the
        // accuracy
        let log_accuracy = f64::sqrt(-f64::ln(accuracy));
        let alpha = log_accuracy / cutoff;
        return Ok(EwaldParameters {
            alpha: alpha,
            k_cutoff: 2.0 * alpha * log_accuracy,
            neutralizing: false,
            dipole_correction: false,
        });
    }
}

fn check_3d_cell(cell: &UnitCell) -> Result<(), Error> {
    if cell.nvec() != 3 {
        return Err(Error::UnsupportedCellDimension(format!(
            "Ewald summation requires a cell periodic in 3 dimensions, got {} periodic dimensions",
            cell.nvec()
        )));
    }
    return Ok(());
}

/// Reciprocal space part of the Ewald sum,
/// `E = 4π k / V Σ_k exp(-k²/4α²) / k² |S(k)|²` where the sum runs over half
/// of the reciprocal lattice and `S(k) = Σ_i q_i exp(i k·r_i)`.
#[derive(Debug, Clone)]
pub struct EwaldReciprocal {
    alpha: f64,
    k_cutoff: f64,
    coulomb_constant: f64,
    charges: Array1<f64>,
    volume: f64,
    k_vectors: Vec<KVector>,
    /// `exp(-k²/4α²) / k²` for each k-vector
    weights: Array1<f64>,
}

impl EwaldReciprocal {
    /// Create the reciprocal space sum for atoms with the given `charges`,
    /// generating the k-vectors of `cell`. The cell must be periodic in all
    /// three directions.
    pub fn new(
        cell: &UnitCell,
        charges: &[f64],
        parameters: &EwaldParameters,
        coulomb_constant: f64,
    ) -> Result<EwaldReciprocal, Error> {
        parameters.validate()?;
        check_3d_cell(cell)?;

        let mut reciprocal = EwaldReciprocal {
            alpha: parameters.alpha,
            k_cutoff: parameters.k_cutoff,
            coulomb_constant: coulomb_constant,
            charges: Array1::from(charges.to_vec()),
            volume: 0.0,
            k_vectors: Vec::new(),
            weights: Array1::zeros(0),
        };
        reciprocal.set_cell(cell)?;

        return Ok(reciprocal);
    }

    /// Get the current set of k-vectors
    pub fn k_vectors(&self) -> &[KVector] {
        &self.k_vectors
    }

    /// Regenerate the k-vectors and their weights for a new cell
    pub fn set_cell(&mut self, cell: &UnitCell) -> Result<(), Error> {
        check_3d_cell(cell)?;

        self.k_vectors = compute_k_vectors(cell, self.k_cutoff)?;
        self.volume = cell.volume();

        let factor = -0.25 / (self.alpha * self.alpha);
        self.weights = self.k_vectors.iter()
            .map(|k| f64::exp(factor * k.norm2) / k.norm2)
            .collect();

        info!("generated {} k-vectors for Ewald summation", self.k_vectors.len());
        return Ok(());
    }

    /// Compute the reciprocal space energy for the given `positions`,
    /// accumulating the gradient in `gradient` and the virial in `virial`.
    #[time_graph::instrument(name = "EwaldReciprocal::compute")]
    pub fn compute(
        &self,
        positions: &[Vector3D],
        gradient: &mut [Vector3D],
        virial: &mut Matrix3,
    ) -> Result<f64, Error> {
        let n_atoms = positions.len();
        if n_atoms != self.charges.len() {
            return Err(Error::InconsistentTopology(format!(
                "expected positions for {} atoms, got {}", self.charges.len(), n_atoms
            )));
        }

        let n_k_vectors = self.k_vectors.len();
        if n_k_vectors == 0 {
            return Ok(0.0);
        }

        let phases = Array2::from_shape_fn((n_atoms, n_k_vectors), |(atom_i, ik)| {
            self.k_vectors[ik].vector * positions[atom_i]
        });

        let mut cosines = Array2::from_elem((n_atoms, n_k_vectors), 0.0);
        let mut sines = Array2::from_elem((n_atoms, n_k_vectors), 0.0);
        Zip::from(&mut cosines)
            .and(&mut sines)
            .and(&phases)
            .par_for_each(|cos, sin, &phase| {
                let (s, c) = f64::sin_cos(phase);
                *cos = c;
                *sin = s;
            });

        // real and imaginary parts of the structure factor
        let structure_cos = self.charges.dot(&cosines);
        let structure_sin = self.charges.dot(&sines);

        let prefactor = 4.0 * PI * self.coulomb_constant / self.volume;
        let k_energies = prefactor * &self.weights * (&structure_cos * &structure_cos + &structure_sin * &structure_sin);
        let energy = k_energies.sum();

        // dE/dr_j = 2 * prefactor * q_j Σ_k w_k k (S_sin cos_j - S_cos sin_j)
        let coefficients = &cosines * &(&self.weights * &structure_sin) - &sines * &(&self.weights * &structure_cos);
        let k_matrix = Array2::from_shape_fn((n_k_vectors, 3), |(ik, d)| self.k_vectors[ik].vector[d]);
        let atomic_gradients = coefficients.dot(&k_matrix);
        for (atom_i, atom_gradient) in gradient.iter_mut().enumerate() {
            let factor = 2.0 * prefactor * self.charges[atom_i];
            for d in 0..3 {
                atom_gradient[d] += factor * atomic_gradients[[atom_i, d]];
            }
        }

        let inverse_4_alpha2 = 0.25 / (self.alpha * self.alpha);
        for (k, &k_energy) in self.k_vectors.iter().zip(&k_energies) {
            let factor = 2.0 * k_energy * (1.0 / k.norm2 + inverse_4_alpha2);
            *virial += k_energy * Matrix3::one() - factor * k.vector.tensor_product(k.vector);
        }

        return Ok(energy);
    }
}

/// Interaction of each Gaussian screening charge with its own point charge,
/// `E = - α/√π k Σ_i q_i²`
pub fn ewald_self_energy(charges: &[f64], alpha: f64, coulomb_constant: f64) -> f64 {
    let sum_squared = charges.iter().map(|q| q * q).sum::<f64>();
    return -alpha / f64::sqrt(PI) * coulomb_constant * sum_squared;
}

/// Correction for pairs of atoms whose real space interaction is scaled by
/// a factor `s` (typically bonded atoms), removing the corresponding part of
/// the reciprocal space interaction:
/// `E = - k Σ_pairs (1 - s) q_i q_j erf(α r) / r`
#[derive(Debug, Clone)]
pub struct EwaldExclusionCorrection {
    alpha: f64,
    coulomb_constant: f64,
    deltas: DeltaList,
    /// `(1 - s) q_i q_j` for each pair in `deltas`
    factors: Vec<f64>,
}

impl EwaldExclusionCorrection {
    /// Create the correction for the given scaled pairs. Pairs with a scaling
    /// of 1 or where one of the charges is zero are ignored.
    pub fn new(
        charges: &[f64],
        exclusions: &IndexMap<(usize, usize), f64>,
        alpha: f64,
        coulomb_constant: f64,
    ) -> Result<EwaldExclusionCorrection, Error> {
        let mut deltas = DeltaList::new();
        let mut factors = Vec::new();
        for (&(i, j), &scaling) in exclusions {
            if i >= charges.len() || j >= charges.len() {
                return Err(Error::InconsistentTopology(format!(
                    "scaled pair ({}, {}) is out of bounds for a system with {} atoms",
                    i, j, charges.len()
                )));
            }

            let factor = (1.0 - scaling) * charges[i] * charges[j];
            if factor == 0.0 {
                continue;
            }

            deltas.add_pair(i, j)?;
            factors.push(factor);
        }

        return Ok(EwaldExclusionCorrection {
            alpha: alpha,
            coulomb_constant: coulomb_constant,
            deltas: deltas,
            factors: factors,
        });
    }

    /// Get the number of corrected pairs
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Check if there are no corrected pairs
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Compute the correction energy for the scaled pairs, using the minimum
    /// image of each pair.
    pub fn compute(
        &mut self,
        positions: &[Vector3D],
        cell: &UnitCell,
        gradient: &mut [Vector3D],
        virial: &mut Matrix3,
    ) -> Result<f64, Error> {
        if self.factors.is_empty() {
            return Ok(0.0);
        }

        self.deltas.update(positions, cell)?;

        let gaussian_factor = 2.0 * self.alpha / f64::sqrt(PI);
        let mut energy = 0.0;
        let mut delta_gradients = Vec::with_capacity(self.factors.len());
        for (delta, &factor) in self.deltas.deltas().iter().zip(&self.factors) {
            let r = delta.distance;
            if r == 0.0 {
                return Err(Error::DegenerateGeometry(format!(
                    "atoms {} and {} are on top of each other", delta.first, delta.second
                )));
            }

            let erf = erf(self.alpha * r);
            let gaussian = gaussian_factor * f64::exp(-self.alpha * self.alpha * r * r);
            let prefactor = -self.coulomb_constant * factor;

            energy += prefactor * erf / r;
            let derivative = prefactor * (gaussian - erf / r) / r;
            delta_gradients.push(derivative / r * delta.vector);
        }

        self.deltas.back_propagate(&delta_gradients, gradient, virial)?;
        return Ok(energy);
    }
}

/// Interaction of the charges with a uniform neutralizing background,
/// `E = - π k Q² / (2 V α²)` where `Q` is the total charge
pub fn ewald_neutralizing_energy(
    charges: &[f64],
    cell: &UnitCell,
    alpha: f64,
    coulomb_constant: f64,
    virial: &mut Matrix3,
) -> f64 {
    let total_charge = charges.iter().sum::<f64>();
    let energy = -PI * coulomb_constant * total_charge * total_charge / (2.0 * cell.volume() * alpha * alpha);
    *virial += energy * Matrix3::one();
    return energy;
}

/// Surface term for a periodic system surrounded by vacuum,
/// `E = 2π k |M|² / (3 V)` where `M = Σ_i q_i r_i` is the dipole moment of
/// the cell
pub fn dipole_correction(
    charges: &[f64],
    positions: &[Vector3D],
    cell: &UnitCell,
    coulomb_constant: f64,
    gradient: &mut [Vector3D],
    virial: &mut Matrix3,
) -> f64 {
    let dipole = charges.iter().zip(positions).map(|(&q, &r)| q * r).sum::<Vector3D>();
    let volume = cell.volume();
    let energy = 2.0 * PI * coulomb_constant * dipole.norm2() / (3.0 * volume);

    let factor = 4.0 * PI * coulomb_constant / (3.0 * volume);
    for (atom_gradient, &q) in gradient.iter_mut().zip(charges) {
        *atom_gradient += factor * q * dipole;
    }
    *virial += energy * Matrix3::one() - factor * dipole.tensor_product(dipole);

    return energy;
}

/// Ewald summation parts, except for the real space term
#[derive(Debug, Clone)]
pub(crate) enum EwaldPart {
    Reciprocal(EwaldReciprocal),
    SelfEnergy { charges: Vec<f64>, alpha: f64, coulomb_constant: f64 },
    ExclusionCorrection(EwaldExclusionCorrection),
    Neutralizing { charges: Vec<f64>, alpha: f64, coulomb_constant: f64 },
    Dipole { charges: Vec<f64>, coulomb_constant: f64 },
}

impl EnergyPart for EwaldPart {
    fn name(&self) -> &str {
        match self {
            EwaldPart::Reciprocal(_) => "ewald_reciprocal",
            EwaldPart::SelfEnergy { .. } => "ewald_self",
            EwaldPart::ExclusionCorrection(_) => "ewald_correction",
            EwaldPart::Neutralizing { .. } => "ewald_neutralizing",
            EwaldPart::Dipole { .. } => "dipole_correction",
        }
    }

    fn set_cell(&mut self, cell: &UnitCell) -> Result<(), Error> {
        if let EwaldPart::Reciprocal(reciprocal) = self {
            reciprocal.set_cell(cell)?;
        }
        return Ok(());
    }

    fn compute(&mut self, system: &SystemState, gradient: &mut [Vector3D], virial: &mut Matrix3) -> Result<f64, Error> {
        match self {
            EwaldPart::Reciprocal(reciprocal) => {
                reciprocal.compute(system.positions, gradient, virial)
            }
            EwaldPart::SelfEnergy { charges, alpha, coulomb_constant } => {
                Ok(ewald_self_energy(charges, *alpha, *coulomb_constant))
            }
            EwaldPart::ExclusionCorrection(correction) => {
                correction.compute(system.positions, system.cell, gradient, virial)
            }
            EwaldPart::Neutralizing { charges, alpha, coulomb_constant } => {
                Ok(ewald_neutralizing_energy(charges, system.cell, *alpha, *coulomb_constant, virial))
            }
            EwaldPart::Dipole { charges, coulomb_constant } => {
                Ok(dipole_correction(charges, system.positions, system.cell, *coulomb_constant, gradient, virial))
            }
        }
    }
}
