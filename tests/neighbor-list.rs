use approx::assert_ulps_eq;

use mdpost::{Error, Matrix3, Vector3D};
use mdpost::{LatticeMaker, LatticeType, ListMode, NeighborList, NeighborListOptions};
use mdpost::{SimulationBox, System};

fn fcc_crystal() -> (Vec<Vector3D>, SimulationBox) {
    let system = LatticeMaker::new(3.615, LatticeType::Fcc, 2, 2, 2)
        .build()
        .expect("failed to generate the lattice");

    let positions = system.positions().unwrap().to_vec();
    let cell = system.cell().unwrap();
    return (positions, cell);
}

#[test]
fn full_list_symmetry() {
    let (positions, cell) = fcc_crystal();

    let mut options = NeighborListOptions::new(3.0);
    options.mode = ListMode::Full;
    let neighbors = NeighborList::new(&positions, cell, &options).unwrap();

    for pair in neighbors.pairs() {
        let mirrored = neighbors.pairs().iter().find(|other| {
            other.first == pair.second
                && other.second == pair.first
                && other.cell_shift_indices == [
                    -pair.cell_shift_indices[0],
                    -pair.cell_shift_indices[1],
                    -pair.cell_shift_indices[2],
                ]
        }).expect("missing mirrored pair");

        assert_ulps_eq!(mirrored.vector, -pair.vector);
        assert_ulps_eq!(mirrored.distance, pair.distance);
    }

    // in a FCC crystal with a cutoff between the first and second neighbor
    // shells, every atom has exactly 12 neighbors
    for atom in 0..positions.len() {
        assert_eq!(neighbors.neighbor_count(atom), 12);
    }
}

#[test]
fn half_list_count_conservation() {
    let (positions, cell) = fcc_crystal();

    let half = NeighborList::new(&positions, cell, &NeighborListOptions::new(5.0)).unwrap();

    let mut options = NeighborListOptions::new(5.0);
    options.mode = ListMode::Full;
    let full = NeighborList::new(&positions, cell, &options).unwrap();

    assert_eq!(full.len(), 2 * half.len());

    // per-atom, the half list sees every pair once from each side
    let half_sum = (0..positions.len()).map(|atom| half.neighbor_count(atom)).sum::<usize>();
    assert_eq!(half_sum, full.len());

    for atom in 0..positions.len() {
        assert_eq!(half.neighbor_count(atom), full.neighbor_count(atom));
    }
}

#[test]
fn determinism_across_worker_counts() {
    let (positions, cell) = fcc_crystal();
    let options = NeighborListOptions::new(5.0);

    let single = rayon::ThreadPoolBuilder::new()
        .num_threads(1)
        .build()
        .unwrap()
        .install(|| NeighborList::new(&positions, cell, &options).unwrap());

    let multi = rayon::ThreadPoolBuilder::new()
        .num_threads(8)
        .build()
        .unwrap()
        .install(|| NeighborList::new(&positions, cell, &options).unwrap());

    assert_eq!(single.pairs(), multi.pairs());
    for atom in 0..positions.len() {
        assert_eq!(single.pairs_containing(atom), multi.pairs_containing(atom));
    }

    // repeated builds on identical input are identical too
    let again = NeighborList::new(&positions, cell, &options).unwrap();
    assert_eq!(again.pairs(), single.pairs());
}

#[test]
fn degenerate_inputs() {
    let cell = SimulationBox::cubic(10.0).unwrap();

    // no atoms
    let result = NeighborList::new(&[], cell, &NeighborListOptions::new(2.0));
    assert!(matches!(result, Err(Error::EmptyAtomSet)));

    // unusable cutoffs
    let positions = [Vector3D::new(5.0, 5.0, 5.0)];
    for cutoff in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let result = NeighborList::new(&positions, cell, &NeighborListOptions::new(cutoff));
        assert!(matches!(result, Err(Error::InvalidCutoff(_))), "cutoff {} was accepted", cutoff);
    }

    // non-finite positions
    let positions = [Vector3D::new(f64::NAN, 5.0, 5.0)];
    let result = NeighborList::new(&positions, cell, &NeighborListOptions::new(2.0));
    assert!(matches!(result, Err(Error::InvalidPosition(_))));

    // a box with zero volume can not even be constructed
    let coplanar = Matrix3::new([
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [3.0, -2.0, 0.0],
    ]);
    let result = SimulationBox::new(Vector3D::zero(), coplanar, [true; 3]);
    assert!(matches!(result, Err(Error::DegenerateBox(_))));

    // a box below the caller-provided tolerance is rejected by the builder
    let positions = [Vector3D::new(5.0, 5.0, 5.0)];
    let mut options = NeighborListOptions::new(2.0);
    options.tolerance = 2000.0;
    let result = NeighborList::new(&positions, cell, &options);
    assert!(matches!(result, Err(Error::DegenerateBox(_))));
}
