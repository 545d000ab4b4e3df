use rayon::prelude::*;

use crate::{Error, Matrix3, Vector3D};
use crate::systems::{DeltaList, UnitCell};

use super::{InternalCoordinate, InternalCoordinateList};

/// Energy terms depending on one (or two, for `Cross`) internal coordinates.
///
/// In all the expressions below, `q` is the value of the internal coordinate
/// and `x = q - rest`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(tag = "type")]
pub enum ValenceTerm {
    /// `E = k/2 x²`
    Harmonic {
        k: f64,
        rest: f64,
    },
    /// Fourth order polynomial without constant term, `E = Σ_n c_n x^n` for
    /// `n = 1..4`
    PolyFour {
        coefficients: [f64; 4],
        rest: f64,
    },
    /// Fues potential, `E = k/2 rest² (1 - rest/q)²`
    Fues {
        k: f64,
        rest: f64,
    },
    /// Morse potential, `E = e0 (exp(-2 k x) - 2 exp(-k x))`
    Morse {
        e0: f64,
        k: f64,
        rest: f64,
    },
    /// One term of a torsional series, `E = A/2 (1 - cos(m x))`
    Cosine {
        multiplicity: u32,
        amplitude: f64,
        rest: f64,
    },
    /// Chebyshev polynomial of the coordinate (usually the cosine of an angle),
    /// `E = A/2 (1 + sign T_n(q))`
    Chebychev {
        order: u32,
        amplitude: f64,
        sign: f64,
    },
    /// MM3 quartic bond stretch, `E = k/2 x² (1 - 2.55 x + 7/12 (2.55 x)²)`
    MM3Quartic {
        k: f64,
        rest: f64,
    },
    /// MM3 bending term, with a sixth order polynomial of `x` expressed in
    /// degrees
    MM3Bend {
        k: f64,
        rest: f64,
    },
    /// Cross term coupling two coordinates, `E = k (q0 - rest0) (q1 - rest1)`
    Cross {
        k: f64,
        rest0: f64,
        rest1: f64,
    },
}

const MM3_QUARTIC_CUBIC: f64 = 2.55;

/// Relative value of the coordinate (with respect to the rest value) under
/// which a Fues term is singular
const FUES_SINGULAR_THRESHOLD: f64 = 1e-10;

fn check_finite(name: &str, value: f64) -> Result<(), Error> {
    if !value.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "{} must be a finite number, got {}", name, value
        )));
    }
    return Ok(());
}

impl ValenceTerm {
    /// Check that the parameters of this term are valid
    pub fn validate(&self) -> Result<(), Error> {
        match *self {
            ValenceTerm::Harmonic { k, rest } |
            ValenceTerm::MM3Quartic { k, rest } |
            ValenceTerm::MM3Bend { k, rest } => {
                check_finite("k", k)?;
                check_finite("rest", rest)?;
            }
            ValenceTerm::PolyFour { coefficients, rest } => {
                for c in coefficients {
                    check_finite("coefficients", c)?;
                }
                check_finite("rest", rest)?;
            }
            ValenceTerm::Fues { k, rest } => {
                check_finite("k", k)?;
                if !(rest > 0.0 && rest.is_finite()) {
                    return Err(Error::InvalidParameter(format!(
                        "rest must be positive for Fues term, got {}", rest
                    )));
                }
            }
            ValenceTerm::Morse { e0, k, rest } => {
                check_finite("e0", e0)?;
                check_finite("k", k)?;
                check_finite("rest", rest)?;
            }
            ValenceTerm::Cosine { multiplicity, amplitude, rest } => {
                if multiplicity == 0 {
                    return Err(Error::InvalidParameter(
                        "multiplicity must be at least 1 for Cosine term".into()
                    ));
                }
                check_finite("amplitude", amplitude)?;
                check_finite("rest", rest)?;
            }
            ValenceTerm::Chebychev { order, amplitude, sign } => {
                if !(1..=6).contains(&order) {
                    return Err(Error::InvalidParameter(format!(
                        "order must be between 1 and 6 for Chebychev term, got {}", order
                    )));
                }
                check_finite("amplitude", amplitude)?;
                if sign != 1.0 && sign != -1.0 {
                    return Err(Error::InvalidParameter(format!(
                        "sign must be 1 or -1 for Chebychev term, got {}", sign
                    )));
                }
            }
            ValenceTerm::Cross { k, rest0, rest1 } => {
                check_finite("k", k)?;
                check_finite("rest0", rest0)?;
                check_finite("rest1", rest1)?;
            }
        }

        return Ok(());
    }

    /// Number of internal coordinates this term depends on
    pub fn n_coordinates(&self) -> usize {
        match self {
            ValenceTerm::Cross { .. } => 2,
            _ => 1,
        }
    }

    /// Compute the energy of this term and its derivatives with respect to
    /// the internal coordinate(s) `values`
    fn compute(&self, values: &[f64]) -> Result<(f64, [f64; 2]), Error> {
        let q = values[0];
        let (energy, derivative) = match *self {
            ValenceTerm::Harmonic { k, rest } => {
                let x = q - rest;
                (0.5 * k * x * x, k * x)
            }
            ValenceTerm::PolyFour { coefficients: [c1, c2, c3, c4], rest } => {
                let x = q - rest;
                let energy = x * (c1 + x * (c2 + x * (c3 + x * c4)));
                let derivative = c1 + x * (2.0 * c2 + x * (3.0 * c3 + x * 4.0 * c4));
                (energy, derivative)
            }
            ValenceTerm::Fues { k, rest } => {
                if f64::abs(q) <= FUES_SINGULAR_THRESHOLD * rest {
                    return Err(Error::DegenerateGeometry(format!(
                        "Fues term is not defined for a coordinate value of {}", q
                    )));
                }
                let t = 1.0 - rest / q;
                (0.5 * k * rest * rest * t * t, k * rest * rest * rest * t / (q * q))
            }
            ValenceTerm::Morse { e0, k, rest } => {
                let x = q - rest;
                let exp = f64::exp(-k * x);
                (e0 * (exp * exp - 2.0 * exp), 2.0 * e0 * k * (exp - exp * exp))
            }
            ValenceTerm::Cosine { multiplicity, amplitude, rest } => {
                let m = multiplicity as f64;
                let x = q - rest;
                (0.5 * amplitude * (1.0 - f64::cos(m * x)), 0.5 * amplitude * m * f64::sin(m * x))
            }
            ValenceTerm::Chebychev { order, amplitude, sign } => {
                let (t, dt) = chebychev(order, q);
                (0.5 * amplitude * (1.0 + sign * t), 0.5 * amplitude * sign * dt)
            }
            ValenceTerm::MM3Quartic { k, rest } => {
                let x = q - rest;
                let c = MM3_QUARTIC_CUBIC;
                let factor = 1.0 - c * x + 7.0 / 12.0 * c * c * x * x;
                let dfactor = -c + 7.0 / 6.0 * c * c * x;
                (0.5 * k * x * x * factor, k * x * factor + 0.5 * k * x * x * dfactor)
            }
            ValenceTerm::MM3Bend { k, rest } => {
                let x = q - rest;
                let d = x.to_degrees();
                let factor = 1.0 + d * (-0.014 + d * (5.6e-5 + d * (-7e-7 + d * 2.2e-8)));
                let dfactor = (-0.014 + d * (2.0 * 5.6e-5 + d * (-3.0 * 7e-7 + d * 4.0 * 2.2e-8))).to_degrees();
                (0.5 * k * x * x * factor, k * x * factor + 0.5 * k * x * x * dfactor)
            }
            ValenceTerm::Cross { k, rest0, rest1 } => {
                let x0 = q - rest0;
                let x1 = values[1] - rest1;
                return Ok((k * x0 * x1, [k * x1, k * x0]));
            }
        };

        return Ok((energy, [derivative, 0.0]));
    }
}

/// Chebyshev polynomial of the first kind `T_n(x)` and its derivative
fn chebychev(order: u32, x: f64) -> (f64, f64) {
    let (mut t_previous, mut t) = (1.0, x);
    let (mut dt_previous, mut dt) = (0.0, 1.0);
    for _ in 1..order {
        let t_next = 2.0 * x * t - t_previous;
        let dt_next = 2.0 * t + 2.0 * x * dt - dt_previous;
        t_previous = t;
        t = t_next;
        dt_previous = dt;
        dt = dt_next;
    }
    return (t, dt);
}

/// Configuration of a single valence term: the energy expression and the
/// internal coordinate(s) it applies to.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ValenceParameters {
    /// energy expression
    pub term: ValenceTerm,
    /// coordinates used by the term, one for all terms except `Cross`
    pub coordinates: Vec<InternalCoordinate>,
}

/// A set of valence terms, and the internal coordinates and displacement
/// vectors they depend on.
#[derive(Debug, Clone)]
pub struct ValenceList {
    deltas: DeltaList,
    coordinates: InternalCoordinateList,
    terms: Vec<(ValenceTerm, Vec<usize>)>,
    energies: Vec<f64>,
}

impl ValenceList {
    /// Create an empty valence list for a system with `n_atoms` atoms
    pub fn new(n_atoms: usize) -> ValenceList {
        ValenceList {
            deltas: DeltaList::new(),
            coordinates: InternalCoordinateList::new(n_atoms),
            terms: Vec::new(),
            energies: Vec::new(),
        }
    }

    /// Add a new term acting on the given `coordinates`, returning the index
    /// of the term.
    pub fn add_term(&mut self, term: ValenceTerm, coordinates: &[InternalCoordinate]) -> Result<usize, Error> {
        term.validate()?;
        if coordinates.len() != term.n_coordinates() {
            return Err(Error::InvalidParameter(format!(
                "{:?} requires {} internal coordinate(s), got {}",
                term, term.n_coordinates(), coordinates.len()
            )));
        }

        let indexes = coordinates.iter()
            .map(|&coordinate| self.coordinates.add(coordinate, &mut self.deltas))
            .collect::<Result<Vec<_>, _>>()?;

        self.terms.push((term, indexes));
        self.energies.push(0.0);
        return Ok(self.terms.len() - 1);
    }

    /// Add a term from its serialized configuration
    pub fn add(&mut self, parameters: &ValenceParameters) -> Result<usize, Error> {
        self.add_term(parameters.term, &parameters.coordinates)
    }

    /// Get the number of terms in this list
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Check if this list contains no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Get the internal coordinates used by the terms
    pub fn coordinates(&self) -> &InternalCoordinateList {
        &self.coordinates
    }

    /// Get the energy of each term, as computed by the last call to `compute`
    pub fn energies(&self) -> &[f64] {
        &self.energies
    }

    /// Compute the energy of all terms for the given `positions` and `cell`,
    /// accumulating the gradient with respect to positions in `gradient` and
    /// the virial in `virial`.
    #[time_graph::instrument(name = "ValenceList::compute")]
    pub fn compute(
        &mut self,
        positions: &[Vector3D],
        cell: &UnitCell,
        gradient: &mut [Vector3D],
        virial: &mut Matrix3,
    ) -> Result<f64, Error> {
        if self.terms.is_empty() {
            return Ok(0.0);
        }

        self.deltas.update(positions, cell)?;
        self.coordinates.update(&self.deltas)?;

        let values = self.coordinates.values();
        let results = self.terms.par_iter().map(|(term, indexes)| {
            let term_values = indexes.iter().map(|&i| values[i]).collect::<Vec<_>>();
            term.compute(&term_values)
        }).collect::<Result<Vec<_>, _>>()?;

        let mut coordinate_gradients = vec![0.0; self.coordinates.len()];
        for (i, ((_, indexes), (energy, derivatives))) in self.terms.iter().zip(results).enumerate() {
            self.energies[i] = energy;
            for (&coordinate, derivative) in indexes.iter().zip(derivatives) {
                coordinate_gradients[coordinate] += derivative;
            }
        }

        let mut delta_gradients = vec![Vector3D::zero(); self.deltas.len()];
        self.coordinates.back_propagate(&coordinate_gradients, &mut delta_gradients);
        self.deltas.back_propagate(&delta_gradients, gradient, virial)?;

        return Ok(self.energies.iter().sum());
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn term_derivatives() {
        let terms = [
            ValenceTerm::Harmonic { k: 1.3, rest: 1.1 },
            ValenceTerm::PolyFour { coefficients: [0.1, 0.5, -0.3, 0.2], rest: 0.9 },
            ValenceTerm::Fues { k: 2.0, rest: 1.5 },
            ValenceTerm::Morse { e0: 0.3, k: 1.7, rest: 1.2 },
            ValenceTerm::Cosine { multiplicity: 3, amplitude: 0.2, rest: 0.5 },
            ValenceTerm::Chebychev { order: 4, amplitude: 0.2, sign: -1.0 },
            ValenceTerm::MM3Quartic { k: 1.5, rest: 1.1 },
            ValenceTerm::MM3Bend { k: 0.8, rest: 1.9 },
        ];

        let delta = 1e-6;
        for term in terms {
            term.validate().unwrap();
            for q in [0.3, 0.7, 1.4] {
                let (_, [derivative, _]) = term.compute(&[q]).unwrap();
                let (plus, _) = term.compute(&[q + delta]).unwrap();
                let (minus, _) = term.compute(&[q - delta]).unwrap();
                assert_relative_eq!(
                    derivative, (plus - minus) / (2.0 * delta),
                    epsilon = 1e-8, max_relative = 1e-6,
                );
            }
        }

        let cross = ValenceTerm::Cross { k: 0.5, rest0: 1.0, rest1: 2.0 };
        let (energy, derivatives) = cross.compute(&[1.5, 1.0]).unwrap();
        assert_relative_eq!(energy, -0.25);
        assert_eq!(derivatives, [-0.5, 0.25]);
    }

    #[test]
    fn chebychev_polynomials() {
        let x = 0.3_f64;
        let expected = [
            x,
            2.0 * x * x - 1.0,
            4.0 * x.powi(3) - 3.0 * x,
            8.0 * x.powi(4) - 8.0 * x * x + 1.0,
            16.0 * x.powi(5) - 20.0 * x.powi(3) + 5.0 * x,
            32.0 * x.powi(6) - 48.0 * x.powi(4) + 18.0 * x * x - 1.0,
        ];
        for (order, &value) in (1..=6).zip(&expected) {
            assert_relative_eq!(chebychev(order, x).0, value, epsilon = 1e-14);
        }
        assert_relative_eq!(chebychev(2, x).1, 4.0 * x);
    }

    #[test]
    fn invalid_terms() {
        assert!(ValenceTerm::Chebychev { order: 7, amplitude: 1.0, sign: 1.0 }.validate().is_err());
        assert!(ValenceTerm::Chebychev { order: 2, amplitude: 1.0, sign: 0.5 }.validate().is_err());
        assert!(ValenceTerm::Cosine { multiplicity: 0, amplitude: 1.0, rest: 0.0 }.validate().is_err());
        assert!(ValenceTerm::Fues { k: 1.0, rest: 0.0 }.validate().is_err());
        assert!(ValenceTerm::Harmonic { k: f64::NAN, rest: 0.0 }.validate().is_err());

        let mut list = ValenceList::new(3);
        let error = list.add_term(
            ValenceTerm::Cross { k: 1.0, rest0: 1.0, rest1: 1.0 },
            &[InternalCoordinate::Bond([0, 1])],
        ).unwrap_err();
        assert!(matches!(error, Error::InvalidParameter(_)));
    }

    #[test]
    fn harmonic_bond() {
        let mut list = ValenceList::new(2);
        list.add_term(
            ValenceTerm::Harmonic { k: 2.0, rest: 1.5 },
            &[InternalCoordinate::Bond([0, 1])],
        ).unwrap();

        let cell = UnitCell::infinite();
        let mut positions = vec![Vector3D::zero(), Vector3D::new(1.5, 0.0, 0.0)];
        let mut gradient = vec![Vector3D::zero(); 2];
        let mut virial = Matrix3::zero();
        let energy = list.compute(&positions, &cell, &mut gradient, &mut virial).unwrap();
        assert_eq!(energy, 0.0);
        assert_eq!(gradient[1], Vector3D::zero());

        positions[1] = Vector3D::new(1.6, 0.0, 0.0);
        let mut gradient = vec![Vector3D::zero(); 2];
        let energy = list.compute(&positions, &cell, &mut gradient, &mut virial).unwrap();
        assert_relative_eq!(energy, 0.5 * 2.0 * 0.01, max_relative = 1e-12);
        assert_relative_eq!(gradient[1], Vector3D::new(0.2, 0.0, 0.0), max_relative = 1e-12);
        assert_relative_eq!(gradient[0], Vector3D::new(-0.2, 0.0, 0.0), max_relative = 1e-12);
        assert_eq!(list.energies().len(), 1);
    }

    #[test]
    fn fues_singular_coordinate() {
        let fues = ValenceTerm::Fues { k: 1.0, rest: 1.0 };
        let error = fues.compute(&[0.0]).unwrap_err();
        assert!(matches!(error, Error::DegenerateGeometry(_)));

        // planar cis dihedral, the coordinate value is exactly zero
        let mut list = ValenceList::new(4);
        list.add_term(fues, &[InternalCoordinate::DihedralAngle([0, 1, 2, 3])]).unwrap();

        let cell = UnitCell::infinite();
        let positions = [
            Vector3D::new(0.0, 1.0, 0.0),
            Vector3D::new(0.0, 0.0, 0.0),
            Vector3D::new(1.5, 0.0, 0.0),
            Vector3D::new(1.5, 1.0, 0.0),
        ];
        let mut gradient = vec![Vector3D::zero(); 4];
        let mut virial = Matrix3::zero();
        let error = list.compute(&positions, &cell, &mut gradient, &mut virial).unwrap_err();
        assert!(matches!(error, Error::DegenerateGeometry(_)));
        assert!(gradient.iter().all(|g| *g == Vector3D::zero()));
    }

    #[test]
    fn parameters_from_json() {
        let parameters: ValenceParameters = serde_json::from_str(r#"{
            "term": {"type": "Cosine", "multiplicity": 3, "amplitude": 0.1, "rest": 0.0},
            "coordinates": [{"DihedralAngle": [0, 1, 2, 3]}]
        }"#).unwrap();

        assert_eq!(parameters.term, ValenceTerm::Cosine { multiplicity: 3, amplitude: 0.1, rest: 0.0 });
        assert_eq!(parameters.coordinates, [InternalCoordinate::DihedralAngle([0, 1, 2, 3])]);

        let mut list = ValenceList::new(4);
        assert_eq!(list.add(&parameters).unwrap(), 0);
        // several terms can share the same coordinate
        assert_eq!(list.add(&parameters).unwrap(), 1);
        assert_eq!(list.coordinates().len(), 1);
    }
}
