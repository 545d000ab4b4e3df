//! Check the neighbor list against a brute force search over periodic images,
//! for random configurations in different cells.

use std::collections::BTreeSet;

use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use pescore::systems::{CellShift, NeighborList, UnitCell};
use pescore::{DeltaList, Vector3D};

/// Random positions, some of them slightly outside of the cell
fn random_positions(cell: &UnitCell, n_atoms: usize, seed: u64) -> Vec<Vector3D> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_atoms).map(|_| {
        let fractional = Vector3D::new(
            rng.gen_range(-0.2..1.2),
            rng.gen_range(-0.2..1.2),
            rng.gen_range(-0.2..1.2),
        );
        cell.to_cartesian(fractional)
    }).collect()
}

/// Pairs between an atom and its own images are only included once, use a
/// canonical direction for the shift
fn canonical(first: usize, second: usize, shift: [i32; 3]) -> (usize, usize, [i32; 3]) {
    if first == second {
        let opposite = [-shift[0], -shift[1], -shift[2]];
        return (first, second, std::cmp::max(shift, opposite));
    }
    return (first, second, shift);
}

fn brute_force(cell: &UnitCell, positions: &[Vector3D], range: f64) -> BTreeSet<(usize, usize, [i32; 3])> {
    let mut pairs = BTreeSet::new();
    for i in 0..positions.len() {
        for j in i..positions.len() {
            for a in -3..=3 {
                for b in -3..=3 {
                    for c in -3..=3 {
                        if i == j && a == 0 && b == 0 && c == 0 {
                            continue;
                        }

                        let shift = CellShift::new([a, b, c]);
                        let vector = positions[j] - positions[i] + cell.shift_vector(shift);
                        if vector.norm() < range {
                            pairs.insert(canonical(i, j, shift.as_array()));
                        }
                    }
                }
            }
        }
    }
    return pairs;
}

fn check_neighbors(cell: UnitCell, cutoff: f64, skin: f64, seed: u64) {
    let positions = random_positions(&cell, 60, seed);

    let mut neighbors = NeighborList::new(cell, cutoff, skin).unwrap();
    assert!(neighbors.update(&positions, &cell).unwrap());

    let mut actual = BTreeSet::new();
    for pair in neighbors.pairs() {
        assert!(pair.first <= pair.second);
        let inserted = actual.insert(canonical(pair.first, pair.second, pair.shift.as_array()));
        assert!(inserted, "duplicated pair {:?}", pair);
    }

    let expected = brute_force(&cell, &positions, cutoff + skin);
    assert_eq!(actual, expected);
}

#[test]
fn cubic() {
    check_neighbors(UnitCell::cubic(14.0).unwrap(), 6.5, 0.5, 1);
    check_neighbors(UnitCell::cubic(20.0).unwrap(), 4.0, 0.0, 2);
}

#[test]
fn orthorhombic() {
    check_neighbors(UnitCell::orthorhombic(12.0, 15.0, 21.0).unwrap(), 5.5, 1.0, 3);
}

#[test]
fn triclinic() {
    check_neighbors(UnitCell::triclinic(13.0, 14.0, 15.0, 70.0, 80.0, 100.0).unwrap(), 5.0, 0.8, 4);
    check_neighbors(UnitCell::triclinic(11.0, 11.0, 11.0, 60.0, 60.0, 60.0).unwrap(), 4.0, 0.5, 5);
}

#[test]
fn deltas_follow_moving_atoms() {
    let cell = UnitCell::triclinic(13.0, 14.0, 15.0, 70.0, 80.0, 100.0).unwrap();
    let mut positions = random_positions(&cell, 40, 6);

    let cutoff = 5.0;
    let mut neighbors = NeighborList::new(cell, cutoff, 1.0).unwrap();
    neighbors.update(&positions, &cell).unwrap();

    // move all atoms by less than half the skin, and wrap them in the cell
    let mut rng = StdRng::seed_from_u64(7);
    for position in &mut positions {
        *position += Vector3D::new(
            rng.gen_range(-0.25..0.25),
            rng.gen_range(-0.25..0.25),
            rng.gen_range(-0.25..0.25),
        );
        cell.wrap(position);
    }
    assert!(!neighbors.update(&positions, &cell).unwrap());
    assert_eq!(neighbors.rebuild_count(), 1);

    let mut deltas = DeltaList::from_neighbors(&neighbors);
    deltas.update(&positions, &cell).unwrap();

    // all pairs inside the cutoff are still found with the right distances
    let mut found = BTreeSet::new();
    for delta in deltas.deltas() {
        let expected = positions[delta.second] - positions[delta.first];
        assert_relative_eq!(delta.vector.norm(), delta.distance, max_relative = 1e-12);
        assert_relative_eq!(
            cell.distance(Vector3D::zero(), delta.vector),
            cell.distance(Vector3D::zero(), expected),
            epsilon = 1e-10,
        );

        if delta.distance < cutoff && delta.first != delta.second {
            found.insert((delta.first, delta.second));
        }
    }

    let mut expected = BTreeSet::new();
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            if cell.distance(positions[i], positions[j]) < cutoff {
                expected.insert((i, j));
            }
        }
    }
    assert_eq!(found, expected);
}
