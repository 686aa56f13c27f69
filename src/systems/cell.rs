//! The `SimulationBox` type represents the enclosing box of a simulated
//! system, with periodic boundary conditions applied per axis.
use std::f64;

use crate::{Error, Matrix3, Vector3D};

/// Volume below which a box matrix is considered degenerate
pub const DEGENERACY_TOLERANCE: f64 = 1e-6;

/// The shape of a box determines how we will be able to compute the periodic
/// boundaries condition.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum BoxShape {
    /// Orthorhombic box, with cuboid shape
    Orthorhombic,
    /// Triclinic box, with arbitrary parallelepiped shape
    Triclinic,
}

/// A `SimulationBox` defines the system physical boundaries: an origin, three
/// lattice vectors (the rows of the box matrix), and one periodicity flag per
/// axis.
///
/// Axes flagged as non-periodic are never wrapped and never produce periodic
/// images; the lattice vectors along these axes only delimit the region used
/// to size the neighbor search grid.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct SimulationBox {
    /// Lower corner of the box
    origin: Vector3D,
    /// Box matrix, rows are the lattice vectors
    matrix: Matrix3,
    /// Transpose of the box matrix, cached from matrix
    transpose: Matrix3,
    /// Inverse of the transpose of the box matrix, cached from matrix
    inverse: Matrix3,
    /// Periodicity of each axis
    periodic: [bool; 3],
    /// Box shape
    shape: BoxShape,
}

impl SimulationBox {
    /// Create a new `SimulationBox` from the given `origin`, box `matrix`
    /// (rows are the lattice vectors) and per-axis periodicity flags.
    ///
    /// The lattice vectors must form a right-handed basis with a volume above
    /// [`DEGENERACY_TOLERANCE`], this function returns
    /// [`Error::DegenerateBox`] otherwise.
    pub fn new(origin: Vector3D, matrix: Matrix3, periodic: [bool; 3]) -> Result<SimulationBox, Error> {
        let volume = matrix.determinant();
        if !(volume > DEGENERACY_TOLERANCE) {
            return Err(Error::DegenerateBox(format!(
                "the box matrix {:?} has a volume of {} which is below the tolerance {}",
                matrix, volume, DEGENERACY_TOLERANCE
            )));
        }

        let is_close_0 = |value: f64| f64::abs(value) < 1e-12;
        let is_diagonal = |matrix: Matrix3| {
            is_close_0(matrix[0][1]) && is_close_0(matrix[0][2]) &&
            is_close_0(matrix[1][0]) && is_close_0(matrix[1][2]) &&
            is_close_0(matrix[2][0]) && is_close_0(matrix[2][1])
        };

        let shape = if is_diagonal(matrix) {
            BoxShape::Orthorhombic
        } else {
            BoxShape::Triclinic
        };

        return Ok(SimulationBox {
            origin: origin,
            matrix: matrix,
            transpose: matrix.transposed(),
            inverse: matrix.transposed().inverse(),
            periodic: periodic,
            shape: shape,
        });
    }

    /// Create an orthorhombic box with side lengths `a, b, c`, at the origin,
    /// periodic along all axes.
    pub fn orthorhombic(a: f64, b: f64, c: f64) -> Result<SimulationBox, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "box lengths must be positive, got [{}, {}, {}]", a, b, c
            )));
        }
        let matrix = Matrix3::new([
            [a, 0.0, 0.0],
            [0.0, b, 0.0],
            [0.0, 0.0, c],
        ]);
        SimulationBox::new(Vector3D::zero(), matrix, [true; 3])
    }

    /// Create a cubic box with side length `length`, at the origin, periodic
    /// along all axes.
    pub fn cubic(length: f64) -> Result<SimulationBox, Error> {
        SimulationBox::orthorhombic(length, length, length)
    }

    /// Create a triclinic box with side lengths `a, b, c` and angles
    /// `alpha, beta, gamma` (in degrees), at the origin, periodic along all
    /// axes.
    pub fn triclinic(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<SimulationBox, Error> {
        if !(a > 0.0 && b > 0.0 && c > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "box lengths must be positive, got [{}, {}, {}]", a, b, c
            )));
        }
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let (sin_gamma, cos_gamma) = gamma.to_radians().sin_cos();

        let b_x = b * cos_gamma;
        let b_y = b * sin_gamma;

        let c_x = c * cos_beta;
        let c_y = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c_z = f64::sqrt(c * c - c_y * c_y - c_x * c_x);

        return SimulationBox::new(Vector3D::zero(), Matrix3::new([
            [a,   0.0, 0.0],
            [b_x, b_y, 0.0],
            [c_x, c_y, c_z],
        ]), [true; 3]);
    }

    /// Get the box shape
    pub fn shape(&self) -> BoxShape {
        self.shape
    }

    /// Get the origin of the box
    pub fn origin(&self) -> Vector3D {
        self.origin
    }

    /// Get the periodicity flags of the box
    pub fn periodic(&self) -> [bool; 3] {
        self.periodic
    }

    /// Check if the given axis (0, 1 or 2) is periodic
    pub fn is_periodic(&self, axis: usize) -> bool {
        self.periodic[axis]
    }

    /// Get the first length of the box (i.e. the norm of the first lattice
    /// vector)
    pub fn a(&self) -> f64 {
        match self.shape {
            BoxShape::Triclinic => self.a_vector().norm(),
            BoxShape::Orthorhombic => self.matrix[0][0],
        }
    }

    /// Get the second length of the box (i.e. the norm of the second lattice
    /// vector)
    pub fn b(&self) -> f64 {
        match self.shape {
            BoxShape::Triclinic => self.b_vector().norm(),
            BoxShape::Orthorhombic => self.matrix[1][1],
        }
    }

    /// Get the third length of the box (i.e. the norm of the third lattice
    /// vector)
    pub fn c(&self) -> f64 {
        match self.shape {
            BoxShape::Triclinic => self.c_vector().norm(),
            BoxShape::Orthorhombic => self.matrix[2][2],
        }
    }

    /// Get the distances between facing planes of the box
    pub fn distances_between_faces(&self) -> Vector3D {
        let (a, b, c) = (self.a_vector(), self.b_vector(), self.c_vector());
        // Plans normal vectors
        let na = (b ^ c).normalized();
        let nb = (c ^ a).normalized();
        let nc = (a ^ b).normalized();

        Vector3D::new(f64::abs(na * a), f64::abs(nb * b), f64::abs(nc * c))
    }

    /// Get the volume of the box
    pub fn volume(&self) -> f64 {
        // the mixed product of the three lattice vectors; construction
        // guarantees it is positive
        let a = self.a_vector();
        let b = self.b_vector();
        let c = self.c_vector();
        a * (b ^ c)
    }

    /// Get the matricial representation of the box
    pub fn matrix(&self) -> Matrix3 {
        self.matrix
    }

    /// Get the first lattice vector
    fn a_vector(&self) -> Vector3D {
        self.matrix[0].into()
    }

    /// Get the second lattice vector
    fn b_vector(&self) -> Vector3D {
        self.matrix[1].into()
    }

    /// Get the third lattice vector
    fn c_vector(&self) -> Vector3D {
        self.matrix[2].into()
    }
}

/// Geometric operations using periodic boundary conditions
impl SimulationBox {
    /// Wrap a position into the canonical image of the box, along the
    /// periodic axes only. For a cubic box of side length `L` at the origin,
    /// this produces components in `[0, L)` along each periodic axis;
    /// components along non-periodic axes are returned unchanged.
    pub fn wrap_position(&self, position: &mut Vector3D) {
        let mut fractional = self.fractional(*position - self.origin);
        for axis in 0..3 {
            if self.periodic[axis] {
                fractional[axis] -= f64::floor(fractional[axis]);
            }
        }
        *position = self.cartesian(fractional) + self.origin;
    }

    /// Find the minimum image of a displacement `vector`, obeying the
    /// periodic boundary conditions. For a cubic box of side length `L`, this
    /// produces components in `[-L/2, L/2)` along each periodic axis.
    pub fn vector_image(&self, vector: &mut Vector3D) {
        let mut fractional = self.fractional(*vector);
        for axis in 0..3 {
            if self.periodic[axis] {
                fractional[axis] -= f64::round(fractional[axis]);
            }
        }
        *vector = self.cartesian(fractional);
    }

    /// Get the displacement from `a` to `b` with the minimal euclidean norm
    /// consistent with the periodic boundary conditions, and its norm.
    pub fn minimum_image(&self, a: Vector3D, b: Vector3D) -> (Vector3D, f64) {
        let mut displacement = b - a;
        self.vector_image(&mut displacement);
        let distance = displacement.norm();
        return (displacement, distance);
    }

    /// Get the fractional representation of the `vector` in this box
    pub fn fractional(&self, vector: Vector3D) -> Vector3D {
        // this needs to use the inverse of the transpose of the matrix, since
        // we only have code to multiply a vector by a matrix on the left
        return self.inverse * vector;
    }

    /// Get the Cartesian representation of the `fractional` vector in this
    /// box
    pub fn cartesian(&self, fractional: Vector3D) -> Vector3D {
        // this needs to use the inverse of the transpose of the matrix, since
        // we only have code to multiply a vector by a matrix on the left
        return self.transpose * fractional;
    }

    /// Periodic boundary conditions distance between the point `u` and the
    /// point `v`
    pub fn distance(&self, u: Vector3D, v: Vector3D) -> f64 {
        self.minimum_image(u, v).1
    }
}
