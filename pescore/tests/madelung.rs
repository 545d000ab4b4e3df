//! Ewald summation energies of ionic crystals, compared with the tabulated
//! Madelung constants. For a crystal with nearest neighbor distance `d`, the
//! electrostatic energy per ion pair is `-M / d` for unit charges.
//!
//! See for example N. W. Ashcroft and N. D. Mermin, Solid State Physics
//! for reference values and detailed explanations on these constants.

use approx::assert_relative_eq;

use pescore::ewald::EwaldParameters;
use pescore::{ForceField, ForceFieldParameters, NeighborParameters, Topology, UnitCell, Vector3D};

struct Crystal {
    cell: UnitCell,
    types: Vec<&'static str>,
    charges: Vec<f64>,
    positions: Vec<Vector3D>,
    /// energy of the full cell
    expected: f64,
}

const FCC: [[f64; 3]; 4] = [[0.0, 0.0, 0.0], [0.0, 1.0, 1.0], [1.0, 0.0, 1.0], [1.0, 1.0, 0.0]];

/// NaCl structure, using the cubic cell with 4 ion pairs. The distance between
/// the closest Na-Cl pair is exactly 1.
fn nacl() -> Crystal {
    let mut types = Vec::new();
    let mut charges = Vec::new();
    let mut positions = Vec::new();
    for site in FCC {
        types.push("Na");
        charges.push(1.0);
        positions.push(Vector3D::from(site));

        types.push("Cl");
        charges.push(-1.0);
        positions.push(Vector3D::new(site[0] + 1.0, site[1], site[2]));
    }

    Crystal {
        cell: UnitCell::cubic(2.0).unwrap(),
        types: types,
        charges: charges,
        positions: positions,
        expected: -4.0 * 1.747565,
    }
}

/// CsCl structure, using the primitive cubic cell with a side length of 1.
fn cscl() -> Crystal {
    Crystal {
        cell: UnitCell::cubic(1.0).unwrap(),
        types: vec!["Cl", "Cs"],
        charges: vec![-1.0, 1.0],
        positions: vec![Vector3D::new(0.0, 0.0, 0.0), Vector3D::new(0.5, 0.5, 0.5)],
        expected: -1.762675 / (0.5 * f64::sqrt(3.0)),
    }
}

/// ZnS (zincblende) structure, using the cubic cell with 4 ion pairs and a
/// side length of 2. The closest Zn-S distance is sqrt(3)/2.
fn zns() -> Crystal {
    let mut types = Vec::new();
    let mut charges = Vec::new();
    let mut positions = Vec::new();
    for site in FCC {
        types.push("Zn");
        charges.push(1.0);
        positions.push(Vector3D::from(site));

        types.push("S");
        charges.push(-1.0);
        positions.push(Vector3D::new(site[0] + 0.5, site[1] + 0.5, site[2] + 0.5));
    }

    Crystal {
        cell: UnitCell::cubic(2.0).unwrap(),
        types: types,
        charges: charges,
        positions: positions,
        expected: -4.0 * 1.638055 / (0.5 * f64::sqrt(3.0)),
    }
}

fn electrostatic_energy(crystal: &Crystal, cutoff: f64, accuracy: f64) -> f64 {
    let topology = Topology::new(
        crystal.types.iter().map(|&t| t.to_string()).collect(),
        crystal.charges.clone(),
    ).unwrap();

    let parameters = ForceFieldParameters {
        units: Default::default(),
        neighbors: NeighborParameters { cutoff: cutoff, skin: 0.0 },
        pairs: Vec::new(),
        ewald: Some(EwaldParameters::suggested(&crystal.cell, cutoff, accuracy).unwrap()),
        valence_scalings: Default::default(),
        valence: Vec::new(),
        pressure: None,
    };

    let mut forcefield = ForceField::new(topology, crystal.cell, &parameters).unwrap();
    let evaluation = forcefield.evaluate(&crystal.positions, &crystal.cell).unwrap();

    // perfect crystals are at a stationary point of the energy
    for gradient in &evaluation.gradient {
        assert!(gradient.norm() < 1e-6, "gradient should be zero, got {:?}", gradient);
    }

    return evaluation.energy;
}

#[test]
fn madelung() {
    for crystal in [nacl(), cscl(), zns()] {
        let cutoff = 0.49 * crystal.cell.min_rspacing();
        let energy = electrostatic_energy(&crystal, cutoff, 1e-8);
        assert_relative_eq!(energy, crystal.expected, max_relative = 1e-5);
    }
}

#[test]
fn shifted_crystal() {
    // a global translation of the crystal does not change the energy
    let mut crystal = nacl();
    let reference = electrostatic_energy(&crystal, 0.99, 1e-8);

    for position in &mut crystal.positions {
        *position += Vector3D::new(0.3, -0.7, 1.9);
    }
    let energy = electrostatic_energy(&crystal, 0.99, 1e-8);
    assert_relative_eq!(energy, reference, max_relative = 1e-8);
}
