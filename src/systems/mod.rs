use crate::{Error, Vector3D};

mod cell;
pub use self::cell::{SimulationBox, BoxShape, DEGENERACY_TOLERANCE};

mod neighbors;
pub use self::neighbors::{NeighborList, NeighborListOptions, ListMode, ReplicationPolicy};

mod simple_system;
pub use self::simple_system::SimpleSystem;

#[cfg(test)]
pub(crate) mod test_utils;

/// Pair of atoms coming from a neighbor list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pair {
    /// index of the first atom in the pair
    pub first: usize,
    /// index of the second atom in the pair
    pub second: usize,
    /// distance between the two atoms
    pub distance: f64,
    /// vector from the first atom to the second atom, accounting for periodic
    /// boundary conditions. This is `position[second] - position[first] +
    /// H * cell_shift` where `H` is the box matrix.
    pub vector: Vector3D,
    /// How many cell shifts were applied to the `second` atom to create this
    /// pair.
    pub cell_shift_indices: [i32; 3],
}

/// A `System` provides the data a neighbor-list build needs for one
/// trajectory frame: the simulation box, the atom positions, and the atomic
/// types.
///
/// Trajectory readers are expected to implement this trait. Atom indices are
/// stable identifiers: all data produced for a frame refers to atoms through
/// their index in `positions`.
pub trait System: Send + Sync {
    /// Get the simulation box for this system
    fn cell(&self) -> Result<SimulationBox, Error>;

    /// Get the number of atoms in this system
    fn size(&self) -> Result<usize, Error>;

    /// Get the atomic types for all atoms in this system. The returned value
    /// must be a slice of length `self.size()`, where each different atomic
    /// type is identified with a different integer value. These values are
    /// usually the atomic number, but don't have to.
    fn types(&self) -> Result<&[i32], Error>;

    /// Get the positions for all atoms in this system. The returned value
    /// must be a slice of length `self.size()` containing the cartesian
    /// coordinates of all atoms in the system.
    fn positions(&self) -> Result<&[Vector3D], Error>;

    /// Compute the neighbor list according to the given options, and store it
    /// for later access with `neighbors`.
    fn compute_neighbors(&mut self, options: &NeighborListOptions) -> Result<(), Error>;

    /// Get the neighbor list computed by the last call to
    /// `compute_neighbors`. This function is only valid to call after a call
    /// to `compute_neighbors`.
    fn neighbors(&self) -> Result<&NeighborList, Error>;
}
