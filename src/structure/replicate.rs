use crate::{Error, Vector3D};
use crate::systems::{SimpleSystem, SimulationBox, System};

/// `Replicate` tiles a system `nx x ny x nz` times along its lattice
/// vectors, producing a larger system with a correspondingly scaled box.
///
/// The atoms are emitted image by image (first lattice vector first, then
/// the second, then the third), keeping the original atom order inside each
/// image.
#[derive(Debug, Clone, Copy)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Replicate {
    /// Number of copies along the first lattice vector
    pub nx: usize,
    /// Number of copies along the second lattice vector
    pub ny: usize,
    /// Number of copies along the third lattice vector
    pub nz: usize,
}

impl Replicate {
    /// Create a `Replicate` producing `nx x ny x nz` copies
    pub fn new(nx: usize, ny: usize, nz: usize) -> Replicate {
        Replicate { nx: nx, ny: ny, nz: nz }
    }

    /// Replicate `system`, returning the enlarged copy
    pub fn apply(&self, system: &dyn System) -> Result<SimpleSystem, Error> {
        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(Error::InvalidParameter(format!(
                "replication counts must be at least 1 along each axis, got [{}, {}, {}]",
                self.nx, self.ny, self.nz
            )));
        }

        let cell = system.cell()?;
        let matrix = cell.matrix();

        let a_vector = Vector3D::from(matrix[0]);
        let b_vector = Vector3D::from(matrix[1]);
        let c_vector = Vector3D::from(matrix[2]);

        let mut replicated_matrix = matrix;
        for xyz in 0..3 {
            replicated_matrix[0][xyz] *= self.nx as f64;
            replicated_matrix[1][xyz] *= self.ny as f64;
            replicated_matrix[2][xyz] *= self.nz as f64;
        }
        let replicated_cell = SimulationBox::new(cell.origin(), replicated_matrix, cell.periodic())?;

        let positions = system.positions()?;
        let types = system.types()?;

        let mut replicated = SimpleSystem::new(replicated_cell);
        for i in 0..self.nx {
            for j in 0..self.ny {
                for k in 0..self.nz {
                    let shift = i as f64 * a_vector + j as f64 * b_vector + k as f64 * c_vector;
                    for (&atomic_type, &position) in types.iter().zip(positions) {
                        replicated.add_atom(atomic_type, position + shift);
                    }
                }
            }
        }

        return Ok(replicated);
    }
}
