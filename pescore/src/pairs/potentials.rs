use std::collections::BTreeMap;
use std::sync::Arc;

use crate::Error;
use crate::math::{erfc, HermitCubicSpline};

/// Analytic or tabulated pair potentials. Per atomic type parameters are
/// given as maps from the type name to the value, and combined for each pair
/// of types with the usual mixing rules.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(tag = "type")]
pub enum PairPotential {
    /// `E = 4 ε ((σ/r)^12 - (σ/r)^6)`, with Lorentz-Berthelot mixing rules
    /// (arithmetic mean for `σ`, geometric mean for `ε`)
    LennardJones {
        sigma: BTreeMap<String, f64>,
        epsilon: BTreeMap<String, f64>,
    },
    /// `E = A exp(-B r) - C / r^6`, with geometric mixing for `A` and `C` and
    /// arithmetic mixing for `B`
    Buckingham {
        a: BTreeMap<String, f64>,
        b: BTreeMap<String, f64>,
        c: BTreeMap<String, f64>,
    },
    /// MM3 Buckingham form, `E = ε (1.84e5 exp(-12 r/σ) - 2.25 (σ/r)^6)`,
    /// with `σ = σ_i + σ_j` and geometric mixing for `ε`. The dispersion term
    /// is removed for pairs containing an atom type marked as `only_pauli`.
    Mm3 {
        sigma: BTreeMap<String, f64>,
        epsilon: BTreeMap<String, f64>,
        #[serde(default)]
        only_pauli: BTreeMap<String, bool>,
    },
    /// Exponential repulsion `E = A exp(-B r)`, with geometric mixing for `A`
    /// and arithmetic mixing for `B`
    ExpRepulsion {
        amplitude: BTreeMap<String, f64>,
        b: BTreeMap<String, f64>,
    },
    /// Dispersion with Tang-Toennies damping, `E = - f_6(b r) C6 / r^6`,
    /// with geometric mixing for `C6` and arithmetic mixing for `b`. `b = 0`
    /// disables the damping.
    DampedDispersion {
        c6: BTreeMap<String, f64>,
        b: BTreeMap<String, f64>,
    },
    /// Electrostatic interaction between atomic charges, damped by the
    /// complementary error function: `E = k q_i q_j erfc(α r) / (ε r)`. Using
    /// `alpha = 0` gives the bare Coulomb interaction.
    DampedCoulomb {
        alpha: f64,
        #[serde(default = "serde_default_dielectric")]
        dielectric: f64,
    },
    /// Overlap between normalized Slater 1s densities `exp(-r/a) / (8π a³)`
    /// of width `a`, scaled by the populations of both atoms:
    /// `E = amplitude N_i N_j S(a_i, a_j, r)`
    SlaterOverlap {
        widths: BTreeMap<String, f64>,
        populations: BTreeMap<String, f64>,
        amplitude: f64,
    },
    /// Potential interpolated from a table of values
    Tabulated(TabulatedParameters),
}

fn serde_default_dielectric() -> f64 {
    return 1.0;
}

/// Parameters of a tabulated pair potential.
///
/// A single table is shared by all the pairs of atomic types listed in
/// `types`. Pairs of types needing different tables are described by
/// separate tabulated pair terms, one for each table.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub struct TabulatedParameters {
    /// pairs of atomic types this potential applies to. If empty, it applies
    /// to all pairs of atoms.
    #[serde(default)]
    pub types: Vec<[String; 2]>,
    /// values used to build the table
    pub grid: TabulatedGrid,
}

/// Source of the values in a tabulated pair potential
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum TabulatedGrid {
    /// Explicit values on a regular grid of distances `start + i * step`.
    /// The grid must extend up to the cutoff.
    Values {
        start: f64,
        step: f64,
        values: Vec<f64>,
    },
    /// Tabulate an analytic potential between `start` and the cutoff, adding
    /// points until the interpolation reaches the requested `accuracy`
    Accuracy {
        potential: Box<PairPotential>,
        start: f64,
        accuracy: f64,
    },
}

impl PairPotential {
    /// Short name of this potential, used to report energies
    pub fn name(&self) -> &'static str {
        match self {
            PairPotential::LennardJones { .. } => "lennard_jones",
            PairPotential::Buckingham { .. } => "buckingham",
            PairPotential::Mm3 { .. } => "mm3",
            PairPotential::ExpRepulsion { .. } => "exp_repulsion",
            PairPotential::DampedDispersion { .. } => "damped_dispersion",
            PairPotential::DampedCoulomb { .. } => "damped_coulomb",
            PairPotential::SlaterOverlap { .. } => "slater_overlap",
            PairPotential::Tabulated(_) => "tabulated",
        }
    }

    /// Does this potential use the atomic charges?
    pub fn uses_charges(&self) -> bool {
        matches!(self, PairPotential::DampedCoulomb { .. })
    }

    /// Resolve the parameters of this potential for all pairs of the given
    /// atomic `types`. The result is indexed by `i * types.len() + j`, and
    /// contains `None` for pairs of types without interaction.
    pub(crate) fn build(
        &self,
        types: &[String],
        coulomb_constant: f64,
        cutoff: f64,
    ) -> Result<Vec<Option<PairFunction>>, Error> {
        let n_types = types.len();
        let mut functions = Vec::with_capacity(n_types * n_types);

        if let PairPotential::Tabulated(parameters) = self {
            let spline = Arc::new(parameters.grid.build(types, coulomb_constant, cutoff)?);
            for type_i in types {
                for type_j in types {
                    let selected = parameters.types.is_empty() || parameters.types.iter().any(|[a, b]| {
                        (a == type_i && b == type_j) || (a == type_j && b == type_i)
                    });

                    if selected {
                        functions.push(Some(PairFunction::Spline(Arc::clone(&spline))));
                    } else {
                        functions.push(None);
                    }
                }
            }
            return Ok(functions);
        }

        for type_i in types {
            for type_j in types {
                functions.push(Some(self.mix(type_i, type_j, coulomb_constant)?));
            }
        }

        return Ok(functions);
    }

    /// Combine the parameters for atomic types `i` and `j`
    fn mix(&self, i: &str, j: &str, coulomb_constant: f64) -> Result<PairFunction, Error> {
        let function = match self {
            PairPotential::LennardJones { sigma, epsilon } => {
                PairFunction::LennardJones {
                    sigma: arithmetic(sigma, "sigma", i, j)?,
                    epsilon: geometric(epsilon, "epsilon", i, j)?,
                }
            }
            PairPotential::Buckingham { a, b, c } => {
                PairFunction::Buckingham {
                    a: geometric(a, "a", i, j)?,
                    b: arithmetic(b, "b", i, j)?,
                    c: geometric(c, "c", i, j)?,
                }
            }
            PairPotential::Mm3 { sigma, epsilon, only_pauli } => {
                let sigma = get_parameter(sigma, "sigma", i)? + get_parameter(sigma, "sigma", j)?;
                if sigma <= 0.0 {
                    return Err(Error::InvalidParameter(format!(
                        "MM3 sigma must be positive for types {} and {}", i, j
                    )));
                }

                let pauli_i = only_pauli.get(i).copied().unwrap_or(false);
                let pauli_j = only_pauli.get(j).copied().unwrap_or(false);
                PairFunction::Mm3 {
                    sigma: sigma,
                    epsilon: geometric(epsilon, "epsilon", i, j)?,
                    dispersion: !(pauli_i || pauli_j),
                }
            }
            PairPotential::ExpRepulsion { amplitude, b } => {
                PairFunction::ExpRepulsion {
                    a: geometric(amplitude, "amplitude", i, j)?,
                    b: arithmetic(b, "b", i, j)?,
                }
            }
            PairPotential::DampedDispersion { c6, b } => {
                PairFunction::DampedDispersion {
                    c6: geometric(c6, "c6", i, j)?,
                    b: arithmetic(b, "b", i, j)?,
                }
            }
            &PairPotential::DampedCoulomb { alpha, dielectric } => {
                if !(alpha >= 0.0 && alpha.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "alpha must be positive or zero for damped Coulomb potential, got {}", alpha
                    )));
                }

                if !(dielectric > 0.0 && dielectric.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "dielectric constant must be positive, got {}", dielectric
                    )));
                }

                PairFunction::DampedCoulomb {
                    alpha: alpha,
                    prefactor: coulomb_constant / dielectric,
                }
            }
            PairPotential::SlaterOverlap { widths, populations, amplitude } => {
                let width_i = get_parameter(widths, "widths", i)?;
                let width_j = get_parameter(widths, "widths", j)?;
                if width_i <= 0.0 || width_j <= 0.0 {
                    return Err(Error::InvalidParameter(format!(
                        "Slater widths must be positive for types {} and {}", i, j
                    )));
                }

                let population = get_parameter(populations, "populations", i)? * get_parameter(populations, "populations", j)?;
                PairFunction::SlaterOverlap {
                    width_i: width_i,
                    width_j: width_j,
                    prefactor: amplitude * population,
                }
            }
            PairPotential::Tabulated(_) => {
                return Err(Error::Internal("tabulated potentials can not be mixed".into()));
            }
        };

        return Ok(function);
    }
}

/// Relative tolerance on the end of a table of values compared to the cutoff,
/// for grids where `start + n * step` is not exactly representable
const TABLE_CUTOFF_TOLERANCE: f64 = 1e-12;

impl TabulatedGrid {
    fn build(&self, types: &[String], coulomb_constant: f64, cutoff: f64) -> Result<HermitCubicSpline, Error> {
        match self {
            &TabulatedGrid::Values { start, step, ref values } => {
                let stop = start + step * values.len().saturating_sub(1) as f64;
                if !(stop >= cutoff * (1.0 - TABLE_CUTOFF_TOLERANCE)) {
                    return Err(Error::InvalidParameter(format!(
                        "tabulated potential values stop at {}, before the cutoff ({})", stop, cutoff
                    )));
                }
                return HermitCubicSpline::from_table(start, step, values);
            }
            TabulatedGrid::Accuracy { potential, start, accuracy } => {
                if potential.uses_charges() || matches!(**potential, PairPotential::Tabulated(_)) {
                    return Err(Error::InvalidParameter(format!(
                        "{} potential can not be tabulated", potential.name()
                    )));
                }

                // all types must share the same interaction to use a single table
                let functions = potential.build(types, coulomb_constant, cutoff)?;
                let function = match functions.first() {
                    Some(Some(function)) => function.clone(),
                    _ => return Err(Error::InvalidParameter(
                        "can not tabulate a potential without atomic types".into()
                    )),
                };

                if functions.iter().any(|other| other.as_ref() != Some(&function)) {
                    return Err(Error::InvalidParameter(
                        "tabulated analytic potentials must have the same parameters for all pairs of atomic types".into()
                    ));
                }

                return HermitCubicSpline::with_accuracy(*accuracy, *start, cutoff, |r| function.compute(r, 1.0));
            }
        }
    }
}

fn get_parameter(parameters: &BTreeMap<String, f64>, name: &str, atomic_type: &str) -> Result<f64, Error> {
    match parameters.get(atomic_type) {
        Some(&value) if value.is_finite() => Ok(value),
        Some(value) => Err(Error::InvalidParameter(format!(
            "{} for atomic type {} must be finite, got {}", name, atomic_type, value
        ))),
        None => Err(Error::InvalidParameter(format!(
            "missing {} parameter for atomic type {}", name, atomic_type
        ))),
    }
}

fn arithmetic(parameters: &BTreeMap<String, f64>, name: &str, i: &str, j: &str) -> Result<f64, Error> {
    let value_i = get_parameter(parameters, name, i)?;
    let value_j = get_parameter(parameters, name, j)?;
    return Ok(0.5 * (value_i + value_j));
}

fn geometric(parameters: &BTreeMap<String, f64>, name: &str, i: &str, j: &str) -> Result<f64, Error> {
    let value_i = get_parameter(parameters, name, i)?;
    let value_j = get_parameter(parameters, name, j)?;
    if value_i * value_j < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "{} for atomic types {} and {} must have the same sign", name, i, j
        )));
    }
    return Ok(f64::sqrt(value_i * value_j) * f64::signum(value_i));
}

/// A pair potential with parameters resolved for a specific pair of atomic
/// types
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PairFunction {
    LennardJones { sigma: f64, epsilon: f64 },
    Buckingham { a: f64, b: f64, c: f64 },
    Mm3 { sigma: f64, epsilon: f64, dispersion: bool },
    ExpRepulsion { a: f64, b: f64 },
    DampedDispersion { c6: f64, b: f64 },
    DampedCoulomb { alpha: f64, prefactor: f64 },
    SlaterOverlap { width_i: f64, width_j: f64, prefactor: f64 },
    Spline(Arc<HermitCubicSpline>),
}

const MM3_REPULSION: f64 = 1.84e5;
const MM3_DISPERSION: f64 = 2.25;

impl PairFunction {
    /// Compute the energy and its derivative with respect to `r`.
    /// `charges` is the product of the charges of the two atoms, only used
    /// by electrostatic interactions.
    pub(crate) fn compute(&self, r: f64, charges: f64) -> (f64, f64) {
        match *self {
            PairFunction::LennardJones { sigma, epsilon } => {
                let s6 = (sigma / r).powi(6);
                let energy = 4.0 * epsilon * s6 * (s6 - 1.0);
                let derivative = 4.0 * epsilon * s6 * (6.0 - 12.0 * s6) / r;
                (energy, derivative)
            }
            PairFunction::Buckingham { a, b, c } => {
                let exp = a * f64::exp(-b * r);
                let r6 = r.powi(6);
                (exp - c / r6, -b * exp + 6.0 * c / (r6 * r))
            }
            PairFunction::Mm3 { sigma, epsilon, dispersion } => {
                let exp = MM3_REPULSION * f64::exp(-12.0 * r / sigma);
                let mut energy = exp;
                let mut derivative = -12.0 * exp / sigma;
                if dispersion {
                    let s6 = (sigma / r).powi(6);
                    energy -= MM3_DISPERSION * s6;
                    derivative += 6.0 * MM3_DISPERSION * s6 / r;
                }
                (epsilon * energy, epsilon * derivative)
            }
            PairFunction::ExpRepulsion { a, b } => {
                let exp = a * f64::exp(-b * r);
                (exp, -b * exp)
            }
            PairFunction::DampedDispersion { c6, b } => {
                let (damping, damping_derivative) = tang_toennies(b, r);
                let r6 = r.powi(6);
                let energy = -damping * c6 / r6;
                let derivative = -damping_derivative * c6 / r6 + 6.0 * damping * c6 / (r6 * r);
                (energy, derivative)
            }
            PairFunction::DampedCoulomb { alpha, prefactor } => {
                let factor = prefactor * charges;
                if alpha == 0.0 {
                    (factor / r, -factor / (r * r))
                } else {
                    let erfc = erfc(alpha * r);
                    let gaussian = 2.0 * alpha / f64::sqrt(std::f64::consts::PI) * f64::exp(-alpha * alpha * r * r);
                    (factor * erfc / r, -factor * (erfc / r + gaussian) / r)
                }
            }
            PairFunction::SlaterOverlap { width_i, width_j, prefactor } => {
                let (overlap, derivative) = slater_overlap(width_i, width_j, r);
                (prefactor * overlap, prefactor * derivative)
            }
            PairFunction::Spline(ref spline) => spline.compute(r),
        }
    }
}

/// Sixth order Tang-Toennies damping function `f_6(b r)`, and its derivative
/// with respect to `r`
fn tang_toennies(b: f64, r: f64) -> (f64, f64) {
    if b == 0.0 {
        return (1.0, 0.0);
    }

    let x = b * r;
    let exp = f64::exp(-x);
    let mut sum = 1.0;
    let mut term = 1.0;
    for k in 1..=6 {
        term *= x / k as f64;
        sum += term;
    }

    // `term` is now x^6 / 6!
    return (1.0 - exp * sum, b * exp * term);
}

/// Relative difference between widths under which the overlap of two Slater
/// densities is computed with the expression for equal widths
const SLATER_EQUAL_WIDTHS: f64 = 1e-4;

/// Overlap integral between two normalized Slater 1s densities
/// `exp(-r/a) / (8π a³)` with widths `a` and `b` separated by `r`, and its
/// derivative with respect to `r`
fn slater_overlap(a: f64, b: f64, r: f64) -> (f64, f64) {
    let c = 1.0 / a;
    let d = 1.0 / b;

    if f64::abs(c - d) < SLATER_EQUAL_WIDTHS * (c + d) {
        let c = 0.5 * (c + d);
        let x = c * r;
        let prefactor = c * c * c * f64::exp(-x) / (192.0 * std::f64::consts::PI);
        let overlap = prefactor * (3.0 + x * (3.0 + x));
        let derivative = -c * prefactor * x * (1.0 + x);
        return (overlap, derivative);
    }

    let delta = d * d - c * c;
    let prefactor = c.powi(4) * d.powi(4) / (2.0 * std::f64::consts::PI * delta * delta);

    let exp_c = f64::exp(-c * r);
    let exp_d = f64::exp(-d * r);
    let difference = exp_c - exp_d;

    let overlap = exp_c / (4.0 * c) + exp_d / (4.0 * d) - difference / (delta * r);
    let derivative = -0.25 * (exp_c + exp_d)
        - ((d * exp_d - c * exp_c) * r - difference) / (delta * r * r);

    return (prefactor * overlap, prefactor * derivative);
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn types() -> Vec<String> {
        vec!["H".into(), "O".into()]
    }

    fn parameters(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
        values.iter().map(|&(name, value)| (name.to_string(), value)).collect()
    }

    fn check_derivative(function: &PairFunction, charges: f64) {
        let delta = 1e-6;
        for r in [1.3, 2.2, 3.7, 5.1] {
            let (_, derivative) = function.compute(r, charges);
            let plus = function.compute(r + delta, charges).0;
            let minus = function.compute(r - delta, charges).0;
            assert_relative_eq!(derivative, (plus - minus) / (2.0 * delta), epsilon = 1e-9, max_relative = 1e-6);
        }
    }

    #[test]
    fn lennard_jones() {
        let potential = PairPotential::LennardJones {
            sigma: parameters(&[("H", 2.0), ("O", 3.0)]),
            epsilon: parameters(&[("H", 0.25), ("O", 1.0)]),
        };

        let functions = potential.build(&types(), 1.0, 10.0).unwrap();
        assert_eq!(functions.len(), 4);
        assert_eq!(functions[1], Some(PairFunction::LennardJones { sigma: 2.5, epsilon: 0.5 }));
        assert_eq!(functions[1], functions[2]);

        let function = functions[1].clone().unwrap();
        let (energy, _) = function.compute(2.5, 0.0);
        assert_eq!(energy, 0.0);

        // minimum of the potential
        let (energy, derivative) = function.compute(2.5 * f64::powf(2.0, 1.0 / 6.0), 0.0);
        assert_relative_eq!(energy, -0.5, max_relative = 1e-12);
        assert_relative_eq!(derivative, 0.0, epsilon = 1e-12);

        check_derivative(&function, 0.0);
    }

    #[test]
    fn missing_parameters() {
        let potential = PairPotential::LennardJones {
            sigma: parameters(&[("H", 2.0)]),
            epsilon: parameters(&[("H", 0.1), ("O", 0.4)]),
        };
        let error = potential.build(&types(), 1.0, 10.0).unwrap_err();
        assert_eq!(error.to_string(), "invalid parameter: missing sigma parameter for atomic type O");
    }

    #[test]
    fn derivatives() {
        let functions = [
            PairFunction::Buckingham { a: 1000.0, b: 3.0, c: 20.0 },
            PairFunction::Mm3 { sigma: 3.5, epsilon: 0.05, dispersion: true },
            PairFunction::Mm3 { sigma: 3.5, epsilon: 0.05, dispersion: false },
            PairFunction::ExpRepulsion { a: 100.0, b: 2.0 },
            PairFunction::DampedDispersion { c6: 15.0, b: 1.8 },
            PairFunction::DampedDispersion { c6: 15.0, b: 0.0 },
            PairFunction::DampedCoulomb { alpha: 0.0, prefactor: 1.0 },
            PairFunction::DampedCoulomb { alpha: 0.4, prefactor: 1.0 },
            PairFunction::SlaterOverlap { width_i: 0.5, width_j: 0.5, prefactor: 2.0 },
            PairFunction::SlaterOverlap { width_i: 0.5, width_j: 0.8, prefactor: 2.0 },
        ];

        for function in &functions {
            check_derivative(function, -0.6);
        }
    }

    #[test]
    fn damped_coulomb() {
        let potential = PairPotential::DampedCoulomb { alpha: 0.0, dielectric: 2.0 };
        let functions = potential.build(&types(), 1.5, 10.0).unwrap();
        let function = functions[0].clone().unwrap();
        assert_relative_eq!(function.compute(2.0, -1.0).0, -1.5 / 4.0);

        let potential = PairPotential::DampedCoulomb { alpha: -1.0, dielectric: 1.0 };
        assert!(potential.build(&types(), 1.0, 10.0).is_err());
    }

    #[test]
    fn tang_toennies_damping() {
        // no damping at large distances, full damping at short distances
        assert_relative_eq!(tang_toennies(2.0, 50.0).0, 1.0, epsilon = 1e-12);
        assert!(tang_toennies(2.0, 1e-3).0 < 1e-12);
    }

    #[test]
    fn slater_overlap_normalization() {
        // integrating the overlap over all separations gives the product of
        // the normalizations of both densities
        for (a, b) in [(0.5, 0.5), (0.4, 0.7), (0.6, 0.60001)] {
            let step = 1e-3;
            let mut integral = 0.0;
            for i in 0..40_000 {
                let r = (i as f64 + 0.5) * step;
                integral += 4.0 * std::f64::consts::PI * r * r * slater_overlap(a, b, r).0 * step;
            }
            assert_relative_eq!(integral, 1.0, max_relative = 1e-6);
        }

        // continuity between the equal and different widths expressions
        let equal = slater_overlap(0.5, 0.5, 1.2).0;
        let close = slater_overlap(0.5, 0.5002, 1.2).0;
        assert_relative_eq!(equal, close, max_relative = 1e-3);
    }

    #[test]
    fn tabulated() {
        let potential = PairPotential::Tabulated(TabulatedParameters {
            types: vec![["O".into(), "O".into()]],
            grid: TabulatedGrid::Values {
                start: 1.0,
                step: 0.5,
                values: vec![4.0, 3.0, 2.0, 1.0, 0.0],
            },
        });

        let functions = potential.build(&types(), 1.0, 3.0).unwrap();
        assert!(functions[0].is_none());
        assert!(functions[1].is_none());
        assert!(functions[2].is_none());

        let function = functions[3].clone().unwrap();
        let (energy, derivative) = function.compute(1.75, 0.0);
        assert_relative_eq!(energy, 2.5, max_relative = 1e-12);
        assert_relative_eq!(derivative, -2.0, max_relative = 1e-12);

        // the table must cover all distances up to the cutoff
        let error = potential.build(&types(), 1.0, 3.5).unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid parameter: tabulated potential values stop at 3, before the cutoff (3.5)"
        );

        let analytic = PairPotential::Tabulated(TabulatedParameters {
            types: vec![],
            grid: TabulatedGrid::Accuracy {
                potential: Box::new(PairPotential::ExpRepulsion {
                    amplitude: parameters(&[("H", 10.0), ("O", 10.0)]),
                    b: parameters(&[("H", 1.5), ("O", 1.5)]),
                }),
                start: 0.5,
                accuracy: 1e-8,
            },
        });

        let functions = analytic.build(&types(), 1.0, 6.0).unwrap();
        let function = functions[1].clone().unwrap();
        let expected = 10.0 * f64::exp(-1.5 * 2.3);
        assert_relative_eq!(function.compute(2.3, 0.0).0, expected, max_relative = 1e-5);
    }

    #[test]
    fn from_json() {
        let potential: PairPotential = serde_json::from_str(r#"{
            "type": "Mm3",
            "sigma": {"C": 1.96, "H": 1.62},
            "epsilon": {"C": 0.056, "H": 0.020},
            "only_pauli": {"H": true}
        }"#).unwrap();

        let types = vec!["C".to_string(), "H".to_string()];
        let functions = potential.build(&types, 1.0, 10.0).unwrap();
        match functions[0] {
            Some(PairFunction::Mm3 { sigma, epsilon, dispersion }) => {
                assert_relative_eq!(sigma, 3.92);
                assert_relative_eq!(epsilon, 0.056);
                assert!(dispersion);
            }
            _ => panic!("expected a MM3 function"),
        }
        assert!(matches!(functions[1], Some(PairFunction::Mm3 { dispersion: false, .. })));

        let potential: PairPotential = serde_json::from_str(r#"{
            "type": "Tabulated",
            "grid": {"Values": {"start": 1.0, "step": 0.1, "values": [1.0, 0.5, 0.0]}}
        }"#).unwrap();
        assert_eq!(potential.name(), "tabulated");
    }
}
