use crate::{Error, Vector3D};

use super::{NeighborList, NeighborListOptions, SimulationBox, System};

/// A simple implementation of `System` to use when no other is available
#[derive(Clone, Debug)]
pub struct SimpleSystem {
    cell: SimulationBox,
    types: Vec<i32>,
    positions: Vec<Vector3D>,
    neighbors: Option<(NeighborListOptions, NeighborList)>,
}

impl SimpleSystem {
    /// Create a new empty system with the given simulation box
    pub fn new(cell: SimulationBox) -> SimpleSystem {
        SimpleSystem {
            cell: cell,
            types: Vec::new(),
            positions: Vec::new(),
            neighbors: None,
        }
    }

    /// Add an atom with the given atomic type and position to this system
    pub fn add_atom(&mut self, atomic_type: i32, position: Vector3D) {
        // atom addition invalidates the neighbor list
        self.neighbors = None;
        self.types.push(atomic_type);
        self.positions.push(position);
    }

    #[cfg(test)]
    pub(crate) fn positions_mut(&mut self) -> &mut [Vector3D] {
        // any position access invalidates the neighbor list
        self.neighbors = None;
        return &mut self.positions;
    }

    #[cfg(test)]
    pub(crate) fn set_cell(&mut self, cell: SimulationBox) {
        // cell change invalidates the neighbor list
        self.neighbors = None;
        self.cell = cell;
    }
}

impl System for SimpleSystem {
    fn size(&self) -> Result<usize, Error> {
        Ok(self.types.len())
    }

    fn positions(&self) -> Result<&[Vector3D], Error> {
        Ok(&self.positions)
    }

    fn types(&self) -> Result<&[i32], Error> {
        Ok(&self.types)
    }

    fn cell(&self) -> Result<SimulationBox, Error> {
        Ok(self.cell)
    }

    fn compute_neighbors(&mut self, options: &NeighborListOptions) -> Result<(), Error> {
        // re-use the already computed neighbor list if possible
        if let Some((ref cached, _)) = self.neighbors {
            if cached == options {
                return Ok(());
            }
        }

        let neighbors = NeighborList::new(&self.positions, self.cell, options)?;
        self.neighbors = Some((options.clone(), neighbors));
        Ok(())
    }

    fn neighbors(&self) -> Result<&NeighborList, Error> {
        match self.neighbors {
            Some((_, ref neighbors)) => Ok(neighbors),
            None => Err(Error::Internal("neighbor list is not initialized".into())),
        }
    }
}

impl std::convert::TryFrom<&dyn System> for SimpleSystem {
    type Error = Error;

    fn try_from(system: &dyn System) -> Result<SimpleSystem, Error> {
        let mut new = SimpleSystem::new(system.cell()?);
        for (&atomic_type, &position) in system.types()?.iter().zip(system.positions()?) {
            new.add_atom(atomic_type, position);
        }
        return Ok(new);
    }
}

#[cfg(test)]
mod tests {
    use crate::systems::test_utils::test_system;

    use super::*;

    #[test]
    fn add_atoms() {
        let mut system = SimpleSystem::new(SimulationBox::cubic(10.0).unwrap());
        system.add_atom(3, Vector3D::new(2.0, 3.0, 4.0));
        system.add_atom(1, Vector3D::new(1.0, 3.0, 4.0));
        system.add_atom(3, Vector3D::new(5.0, 3.0, 4.0));

        assert_eq!(system.size().unwrap(), 3);
        assert_eq!(system.types.len(), 3);
        assert_eq!(system.positions.len(), 3);

        assert_eq!(system.types().unwrap(), &[3, 1, 3]);
        assert_eq!(system.positions().unwrap(), &[
            Vector3D::new(2.0, 3.0, 4.0),
            Vector3D::new(1.0, 3.0, 4.0),
            Vector3D::new(5.0, 3.0, 4.0),
        ]);
    }

    #[test]
    fn neighbors_cache() {
        let mut system = test_system("water");

        assert!(matches!(system.neighbors(), Err(Error::Internal(_))));

        let options = NeighborListOptions::new(2.0);
        system.compute_neighbors(&options).unwrap();
        let n_pairs = system.neighbors().unwrap().len();
        assert_eq!(n_pairs, 3);

        // same options, the cached list is reused
        system.compute_neighbors(&options).unwrap();
        assert_eq!(system.neighbors().unwrap().len(), n_pairs);

        // a different cutoff invalidates the cache
        system.compute_neighbors(&NeighborListOptions::new(1.0)).unwrap();
        assert_eq!(system.neighbors().unwrap().len(), 2);

        // touching the positions invalidates the cache
        system.compute_neighbors(&options).unwrap();
        system.positions_mut()[0] = Vector3D::new(5.0, 5.0, 5.0);
        assert!(matches!(system.neighbors(), Err(Error::Internal(_))));

        // same for the cell
        system.compute_neighbors(&options).unwrap();
        system.set_cell(SimulationBox::cubic(20.0).unwrap());
        assert!(matches!(system.neighbors(), Err(Error::Internal(_))));
    }

    #[test]
    fn from_dyn_system() {
        let system = test_system("methane");
        let copy = SimpleSystem::try_from(&system as &dyn System).unwrap();

        assert_eq!(copy.size().unwrap(), 5);
        assert_eq!(copy.types().unwrap(), system.types().unwrap());
        assert_eq!(copy.positions().unwrap(), system.positions().unwrap());
    }
}
