use crate::{Error, Matrix3, Vector3D};
use crate::systems::{SimpleSystem, SimulationBox};

/// Ideal lattices known to [`LatticeMaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum LatticeType {
    /// Face-centered cubic, 4 atoms per cell
    Fcc,
    /// Body-centered cubic, 2 atoms per cell
    Bcc,
    /// Hexagonal close-packed, in an orthorhombic setting with 4 atoms per
    /// cell
    Hcp,
    /// Stacked graphene sheets, in an orthorhombic cell with 4 atoms per
    /// layer and an interlayer distance of 3.4 times the bond length
    Graphene,
}

/// `LatticeMaker` generates ideal periodic crystal structures, mainly as
/// input for analysis pipelines and benchmarks.
///
/// The generated system is periodic along all axes, with its origin at zero,
/// and all atoms have the atomic type 1.
#[derive(Debug, Clone)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct LatticeMaker {
    /// Lattice constant, in the same units as the produced positions
    pub lattice_constant: f64,
    /// Which lattice to generate
    pub lattice_type: LatticeType,
    /// Number of repetitions of the unit cell along the first lattice vector
    pub nx: usize,
    /// Number of repetitions of the unit cell along the second lattice vector
    pub ny: usize,
    /// Number of repetitions of the unit cell along the third lattice vector
    pub nz: usize,
}

impl LatticeMaker {
    /// Create a `LatticeMaker` for `nx x ny x nz` repetitions of the given
    /// lattice.
    pub fn new(lattice_constant: f64, lattice_type: LatticeType, nx: usize, ny: usize, nz: usize) -> LatticeMaker {
        LatticeMaker {
            lattice_constant: lattice_constant,
            lattice_type: lattice_type,
            nx: nx,
            ny: ny,
            nz: nz,
        }
    }

    /// Get the unit cell vectors and the basis atoms of this lattice
    fn unit_cell(&self) -> (Matrix3, Vec<Vector3D>) {
        let a = self.lattice_constant;
        match self.lattice_type {
            LatticeType::Fcc => (
                Matrix3::new([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]),
                vec![
                    Vector3D::new(0.0, 0.0, 0.0),
                    Vector3D::new(0.5 * a, 0.5 * a, 0.0),
                    Vector3D::new(0.5 * a, 0.0, 0.5 * a),
                    Vector3D::new(0.0, 0.5 * a, 0.5 * a),
                ],
            ),
            LatticeType::Bcc => (
                Matrix3::new([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]),
                vec![
                    Vector3D::new(0.0, 0.0, 0.0),
                    Vector3D::new(0.5 * a, 0.5 * a, 0.5 * a),
                ],
            ),
            LatticeType::Hcp => {
                let b = f64::sqrt(3.0) * a;
                let c = f64::sqrt(8.0 / 3.0) * a;
                (
                    Matrix3::new([[a, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, c]]),
                    vec![
                        Vector3D::new(0.0, 0.0, 0.0),
                        Vector3D::new(0.5 * a, 0.5 * b, 0.0),
                        Vector3D::new(0.5 * a, 5.0 / 6.0 * b, 0.5 * c),
                        Vector3D::new(0.0, 1.0 / 3.0 * b, 0.5 * c),
                    ],
                )
            }
            LatticeType::Graphene => {
                let b = f64::sqrt(3.0) * a;
                (
                    Matrix3::new([[3.0 * a, 0.0, 0.0], [0.0, b, 0.0], [0.0, 0.0, 3.4 * a]]),
                    vec![
                        Vector3D::new(0.5 * a, 0.0, 0.0),
                        Vector3D::new(1.5 * a, 0.0, 0.0),
                        Vector3D::new(0.0, 0.5 * b, 0.0),
                        Vector3D::new(2.0 * a, 0.5 * b, 0.0),
                    ],
                )
            }
        }
    }

    /// Generate the lattice, producing a periodic system with
    /// `nx * ny * nz * basis` atoms.
    pub fn build(&self) -> Result<SimpleSystem, Error> {
        if !(self.lattice_constant > 0.0) || !self.lattice_constant.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "lattice constant must be positive and finite, got {}", self.lattice_constant
            )));
        }

        if self.nx == 0 || self.ny == 0 || self.nz == 0 {
            return Err(Error::InvalidParameter(format!(
                "repetitions must be at least 1 along each axis, got [{}, {}, {}]",
                self.nx, self.ny, self.nz
            )));
        }

        let (vectors, basis) = self.unit_cell();

        let mut matrix = vectors;
        for xyz in 0..3 {
            matrix[0][xyz] *= self.nx as f64;
            matrix[1][xyz] *= self.ny as f64;
            matrix[2][xyz] *= self.nz as f64;
        }
        let cell = SimulationBox::new(Vector3D::zero(), matrix, [true; 3])?;

        let a_vector = Vector3D::from(vectors[0]);
        let b_vector = Vector3D::from(vectors[1]);
        let c_vector = Vector3D::from(vectors[2]);

        let mut system = SimpleSystem::new(cell);
        for i in 0..self.nx {
            for j in 0..self.ny {
                for k in 0..self.nz {
                    let origin = i as f64 * a_vector + j as f64 * b_vector + k as f64 * c_vector;
                    for &atom in &basis {
                        system.add_atom(1, origin + atom);
                    }
                }
            }
        }

        return Ok(system);
    }
}
