//! Generation of atomic configurations: ideal lattices and replication of
//! existing systems.

mod lattice;
pub use self::lattice::{LatticeMaker, LatticeType};

mod replicate;
pub use self::replicate::Replicate;
