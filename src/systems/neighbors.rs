use log::warn;
use ndarray::Array3;
use rayon::prelude::*;

use crate::{Error, Matrix3, Vector3D};
use super::{SimulationBox, Pair};
use super::cell::DEGENERACY_TOLERANCE;

/// Maximal number of cells, we need to use this to prevent having too many
/// cells with a small simulation box and a large cutoff
const MAX_NUMBER_OF_CELLS: f64 = 1e5;

/// A cell shift represents the displacement along cell axes between the raw
/// position of an atom and the resolved position of one of its periodic
/// images.
///
/// The cell shift can be used to reconstruct the vector between two points,
/// wrapped inside the simulation box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CellShift([i32; 3]);

impl std::ops::Add<CellShift> for CellShift {
    type Output = CellShift;

    fn add(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] += rhs[0];
        self.0[1] += rhs[1];
        self.0[2] += rhs[2];
        return self;
    }
}

impl std::ops::Sub<CellShift> for CellShift {
    type Output = CellShift;

    fn sub(mut self, rhs: CellShift) -> Self::Output {
        self.0[0] -= rhs[0];
        self.0[1] -= rhs[1];
        self.0[2] -= rhs[2];
        return self;
    }
}

impl std::ops::Index<usize> for CellShift {
    type Output = i32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl From<CellShift> for [i32; 3] {
    fn from(shift: CellShift) -> [i32; 3] {
        shift.0
    }
}

impl CellShift {
    /// Compute the shift vector in cartesian coordinates, using the given box
    /// matrix (stored in row major order).
    fn cartesian(&self, matrix: &Matrix3) -> Vector3D {
        let x = matrix[0][0] * self[0] as f64 + matrix[1][0] * self[1] as f64 + matrix[2][0] * self[2] as f64;
        let y = matrix[0][1] * self[0] as f64 + matrix[1][1] * self[1] as f64 + matrix[2][1] * self[2] as f64;
        let z = matrix[0][2] * self[0] as f64 + matrix[1][2] * self[1] as f64 + matrix[2][2] * self[2] as f64;
        Vector3D::new(x, y, z)
    }

    fn is_zero(&self) -> bool {
        self.0 == [0, 0, 0]
    }
}

/// Which representation a [`NeighborList`] stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum ListMode {
    /// Each pair is stored exactly once, with `first <= second`. Pairs
    /// between an atom and its own periodic images keep the image whose cell
    /// shift lies in the positive half-space.
    Half,
    /// Each pair is stored in both directions: if `i-j` is in the list with
    /// vector `v` and shift `s`, then `j-i` is in the list with vector `-v`
    /// and shift `-s`.
    Full,
}

/// How many layers of periodic images to generate when building the cell
/// grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum ReplicationPolicy {
    /// Derive the number of image layers from the cutoff and the box size.
    /// This always produces enough ghosts, including for boxes smaller than
    /// the cutoff.
    Automatic,
    /// Replicate exactly this many image layers along every periodic axis.
    /// Building the grid fails with [`Error::InsufficientReplication`] if
    /// this is not enough to cover the cutoff.
    Fixed(u32),
}

impl Default for ReplicationPolicy {
    fn default() -> ReplicationPolicy {
        ReplicationPolicy::Automatic
    }
}

fn default_mode() -> ListMode {
    ListMode::Half
}

fn default_tolerance() -> f64 {
    DEGENERACY_TOLERANCE
}

/// Parameters for the construction of a [`NeighborList`].
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct NeighborListOptions {
    /// Spherical cutoff used to determine if two atoms are neighbors. Pairs
    /// at a distance exactly equal to the cutoff are included.
    pub cutoff: f64,
    /// Should the list store each pair once (half list) or in both
    /// directions (full list)?
    #[serde(default = "default_mode")]
    pub mode: ListMode,
    /// Should individual atoms be considered their own neighbor? Setting
    /// this to `true` will add "self pairs", i.e. pairs between an atom and
    /// itself, with a distance of 0.
    #[serde(default)]
    pub self_pairs: bool,
    /// Ghost replication policy used by the cell grid.
    #[serde(default)]
    pub replication: ReplicationPolicy,
    /// Numerical tolerance for the degenerate box check.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl NeighborListOptions {
    /// Create options for a half neighbor list with the given `cutoff` and
    /// default settings everywhere else.
    pub fn new(cutoff: f64) -> NeighborListOptions {
        NeighborListOptions {
            cutoff: cutoff,
            mode: ListMode::Half,
            self_pairs: false,
            replication: ReplicationPolicy::Automatic,
            tolerance: DEGENERACY_TOLERANCE,
        }
    }

    /// Get the JSON representation of these options
    pub fn parameters(&self) -> String {
        serde_json::to_string(self).expect("failed to serialize to JSON")
    }
}

/// Data associated with one entry (a real atom or one of its periodic
/// images) inside the `CellGrid`
#[derive(Debug, Clone)]
struct CellEntry {
    /// index of the owning real atom
    atom: usize,
    /// shift from the raw atom position to this entry's resolved position
    shift: CellShift,
    /// resolved cartesian position of this entry
    position: Vector3D,
}

/// Candidate pair produced by the cell grid. The vector between the atoms
/// can be constructed as `position[second] - position[first] +
/// shift.cartesian(box_matrix)`. Some candidates are separated by more than
/// the cutoff, filtering happens later.
#[derive(Debug, Clone)]
struct CellPair {
    first: usize,
    second: usize,
    shift: CellShift,
}

/// The cell grid buckets atoms into cells sized to the cutoff. Periodic
/// wrap-around is handled by bucketing ghost images of the atoms into halo
/// cells around the primary grid, so the pair search itself never wraps: it
/// only scans a block of nearby cells, clipped at the grid edges.
///
/// Ghost entries only live as long as the grid, which is rebuilt from
/// scratch for every neighbor list.
#[derive(Debug, Clone)]
struct CellGrid {
    /// the cells, primary grid plus halo layers, indexed with an offset of
    /// `halo`
    cells: Array3<Vec<CellEntry>>,
    /// number of cells covering the primary box along each axis
    n_cells: [usize; 3],
    /// how many cells we need to look at in each direction when searching
    /// neighbors, to include all neighbors below the cutoff
    n_search: [i32; 3],
    /// width of the halo in cells, along periodic axes only
    halo: [usize; 3],
    /// how many layers of periodic images to generate along each axis
    depth: [i32; 3],
    /// simulation box defining the periodic boundary conditions
    cell: SimulationBox,
}

impl CellGrid {
    /// Create a new `CellGrid` for the given box and cutoff, determining all
    /// required parameters.
    fn new(cell: SimulationBox, cutoff: f64, replication: ReplicationPolicy) -> Result<CellGrid, Error> {
        if !cutoff.is_finite() || cutoff <= 0.0 {
            return Err(Error::InvalidCutoff(format!(
                "cutoff must be positive and finite for a neighbor search, got {}", cutoff
            )));
        }

        let distances_between_faces = cell.distances_between_faces();

        let mut n_cells = [
            f64::clamp(f64::trunc(distances_between_faces[0] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(distances_between_faces[1] / cutoff), 1.0, f64::INFINITY),
            f64::clamp(f64::trunc(distances_between_faces[2] / cutoff), 1.0, f64::INFINITY),
        ];

        // limit memory consumption by ensuring we have less than
        // `MAX_NUMBER_OF_CELLS` cells to look though
        let n_cells_total = n_cells[0] * n_cells[1] * n_cells[2];
        if n_cells_total > MAX_NUMBER_OF_CELLS {
            // set the total number of cells close to MAX_NUMBER_OF_CELLS,
            // while keeping roughly the ratio of cells in each direction
            let ratio_x_y = n_cells[0] / n_cells[1];
            let ratio_y_z = n_cells[1] / n_cells[2];

            n_cells[2] = f64::trunc(f64::cbrt(MAX_NUMBER_OF_CELLS / (ratio_x_y * ratio_y_z * ratio_y_z)));
            n_cells[1] = f64::trunc(ratio_y_z * n_cells[2]);
            n_cells[0] = f64::trunc(ratio_x_y * n_cells[1]);

            for n in &mut n_cells {
                *n = f64::clamp(*n, 1.0, f64::INFINITY);
            }
        }

        // number of cells to search in each direction to make sure all
        // possible pairs below the cutoff are accounted for
        let mut n_search = [
            f64::ceil(cutoff * n_cells[0] / distances_between_faces[0]) as i32,
            f64::ceil(cutoff * n_cells[1] / distances_between_faces[1]) as i32,
            f64::ceil(cutoff * n_cells[2] / distances_between_faces[2]) as i32,
        ];

        let n_cells = [
            n_cells[0] as usize,
            n_cells[1] as usize,
            n_cells[2] as usize,
        ];

        for xyz in 0..3 {
            if n_search[xyz] < 1 {
                n_search[xyz] = 1;
            }

            // no neighboring cell exists along a non-periodic axis with a
            // single cell
            if n_cells[xyz] == 1 && !cell.is_periodic(xyz) {
                n_search[xyz] = 0;
            }
        }

        // image layers needed to fill the halo along periodic axes
        let mut depth = [0_i32; 3];
        for xyz in 0..3 {
            if cell.is_periodic(xyz) {
                let required = f64::ceil(n_search[xyz] as f64 / n_cells[xyz] as f64) as i32;
                depth[xyz] = match replication {
                    ReplicationPolicy::Automatic => required,
                    ReplicationPolicy::Fixed(layers) => {
                        if (layers as i32) < required {
                            return Err(Error::InsufficientReplication(format!(
                                "replication depth {} is too shallow for cutoff {}: \
                                axis {} requires {} image layers",
                                layers, cutoff, xyz, required
                            )));
                        }
                        layers as i32
                    }
                };
            }
        }

        let halo = [
            if cell.is_periodic(0) { n_search[0] as usize } else { 0 },
            if cell.is_periodic(1) { n_search[1] as usize } else { 0 },
            if cell.is_periodic(2) { n_search[2] as usize } else { 0 },
        ];

        let shape = [
            n_cells[0] + 2 * halo[0],
            n_cells[1] + 2 * halo[1],
            n_cells[2] + 2 * halo[2],
        ];

        return Ok(CellGrid {
            cells: Array3::from_elem(shape, Default::default()),
            n_cells: n_cells,
            n_search: n_search,
            halo: halo,
            depth: depth,
            cell: cell,
        });
    }

    /// Add all atoms to the grid. Entries (the wrapped atom and its ghost
    /// images) are computed in parallel; the merge into the shared buckets
    /// is a cheap serial pass in atom order, so the bucket content does not
    /// depend on the number of workers.
    fn add_atoms(&mut self, positions: &[Vector3D]) {
        let entries = positions.par_iter()
            .enumerate()
            .map(|(atom, &position)| self.entries_for_atom(atom, position))
            .collect::<Vec<_>>();

        for atom_entries in entries {
            for (cell_index, entry) in atom_entries {
                self.cells[cell_index].push(entry);
            }
        }
    }

    /// Compute the grid entries for the atom at `position`: the atom itself,
    /// wrapped inside the box along periodic axes, plus any ghost image
    /// falling inside the halo.
    fn entries_for_atom(&self, atom: usize, position: Vector3D) -> Vec<([usize; 3], CellEntry)> {
        let matrix = self.cell.matrix();
        let fractional = self.cell.fractional(position - self.cell.origin());

        let mut wrap = [0_i32; 3];
        let mut reduced = fractional;
        for xyz in 0..3 {
            if self.cell.is_periodic(xyz) {
                let images = f64::floor(reduced[xyz]);
                reduced[xyz] -= images;
                wrap[xyz] = -(images as i32);
            }
        }
        let wrap = CellShift(wrap);

        // deterministic floor bucketing. Clamping keeps outliers along
        // non-periodic axes and floating point boundary cases in the edge
        // cells, without touching the positions used for distances.
        let mut base = [0_usize; 3];
        for xyz in 0..3 {
            let index = f64::floor(reduced[xyz] * self.n_cells[xyz] as f64) as i64;
            base[xyz] = i64::clamp(index, 0, self.n_cells[xyz] as i64 - 1) as usize;
        }

        let wrapped_position = position + wrap.cartesian(&matrix);

        let mut entries = Vec::new();
        entries.push((
            [base[0] + self.halo[0], base[1] + self.halo[1], base[2] + self.halo[2]],
            CellEntry {
                atom: atom,
                shift: wrap,
                position: wrapped_position,
            },
        ));

        for image_x in -self.depth[0]..=self.depth[0] {
            for image_y in -self.depth[1]..=self.depth[1] {
                for image_z in -self.depth[2]..=self.depth[2] {
                    let image = CellShift([image_x, image_y, image_z]);
                    if image.is_zero() {
                        continue;
                    }

                    // the image of a cell at `base` shifted by a whole box is
                    // exactly `n_cells` cells away
                    let mut cell_index = [0_usize; 3];
                    let mut in_halo = true;
                    for xyz in 0..3 {
                        let index = base[xyz] as i64 + image[xyz] as i64 * self.n_cells[xyz] as i64;
                        let min = -(self.halo[xyz] as i64);
                        let max = (self.n_cells[xyz] + self.halo[xyz]) as i64;
                        if index < min || index >= max {
                            in_halo = false;
                            break;
                        }
                        cell_index[xyz] = (index + self.halo[xyz] as i64) as usize;
                    }

                    if !in_halo {
                        continue;
                    }

                    entries.push((cell_index, CellEntry {
                        atom: atom,
                        shift: wrap + image,
                        position: wrapped_position + image.cartesian(&matrix),
                    }));
                }
            }
        }

        return entries;
    }

    /// Get the list of candidate pairs. Some pairs might be separated by
    /// more than the cutoff, so additional filtering of the pairs is
    /// required later.
    ///
    /// This function produces a "half" list of candidates, where each pair
    /// is only included once: for example, if atoms 33 and 64 are in range
    /// of each other, the output will only contain the pair in the order
    /// 33-64, and not 64-33.
    ///
    /// If two atoms are neighbors of one another more than once (this can
    /// happen with periodic boundary conditions and a cutoff larger than
    /// half of the box), all pairs at different distances/directions are
    /// included, with different cell shifts.
    fn pairs(&self) -> Vec<CellPair> {
        let n_primary = self.n_cells[0] * self.n_cells[1] * self.n_cells[2];

        // every cell only produces pairs centered on its own (real) entries,
        // so the scan is embarrassingly parallel over primary cells
        let per_cell = (0..n_primary).into_par_iter()
            .map(|linear| {
                let cell_index = [
                    linear / (self.n_cells[1] * self.n_cells[2]),
                    (linear / self.n_cells[2]) % self.n_cells[1],
                    linear % self.n_cells[2],
                ];
                self.pairs_around(cell_index)
            })
            .collect::<Vec<_>>();

        return per_cell.into_iter().flatten().collect();
    }

    /// Collect candidate pairs between the atoms in the primary cell at
    /// `cell_index` and all entries in the surrounding block of cells.
    fn pairs_around(&self, cell_index: [usize; 3]) -> Vec<CellPair> {
        let shape = self.cells.shape();
        let shape = [shape[0] as i64, shape[1] as i64, shape[2] as i64];

        let current_cell = &self.cells[[
            cell_index[0] + self.halo[0],
            cell_index[1] + self.halo[1],
            cell_index[2] + self.halo[2],
        ]];

        let mut pairs = Vec::new();
        for delta_x in -self.n_search[0]..=self.n_search[0] {
            for delta_y in -self.n_search[1]..=self.n_search[1] {
                for delta_z in -self.n_search[2]..=self.n_search[2] {
                    let neighbor_cell_i = [
                        (cell_index[0] + self.halo[0]) as i64 + delta_x as i64,
                        (cell_index[1] + self.halo[1]) as i64 + delta_y as i64,
                        (cell_index[2] + self.halo[2]) as i64 + delta_z as i64,
                    ];

                    // clipped, not wrapped: the halo cells already contain
                    // the periodic images. Clipping only happens along
                    // non-periodic axes, where there is no halo.
                    if neighbor_cell_i[0] < 0 || neighbor_cell_i[0] >= shape[0]
                    || neighbor_cell_i[1] < 0 || neighbor_cell_i[1] >= shape[1]
                    || neighbor_cell_i[2] < 0 || neighbor_cell_i[2] >= shape[2] {
                        continue;
                    }

                    let neighbor_cell = &self.cells[[
                        neighbor_cell_i[0] as usize,
                        neighbor_cell_i[1] as usize,
                        neighbor_cell_i[2] as usize,
                    ]];

                    for atom_i in current_cell {
                        for atom_j in neighbor_cell {
                            // create a half list of candidates
                            if atom_i.atom > atom_j.atom {
                                continue;
                            }

                            let shift = atom_j.shift - atom_i.shift;

                            if atom_i.atom == atom_j.atom {
                                if shift.is_zero() {
                                    // the atom itself
                                    continue;
                                }

                                // Pairs between an atom and its own periodic
                                // images come in redundant +s/-s couples;
                                // keep the shift in the positive half-space,
                                // breaking ties on the sum hyperplane with
                                // the z then y components.
                                if shift[0] + shift[1] + shift[2] < 0 {
                                    continue;
                                }

                                if (shift[0] + shift[1] + shift[2] == 0)
                                    && (shift[2] < 0 || (shift[2] == 0 && shift[1] < 0)) {
                                    continue;
                                }
                            }

                            pairs.push(CellPair {
                                first: atom_i.atom,
                                second: atom_j.atom,
                                shift: shift,
                            });
                        }
                    }
                }
            }
        }

        return pairs;
    }
}

/// A neighbor list for a set of atoms inside a simulation box.
///
/// Depending on [`ListMode`], each pair appears either once in canonical
/// order (`Half`) or in both directions (`Full`). In full mode the list is
/// symmetric: whenever atom `i` lists atom `j` with vector `v` and shift
/// `s`, atom `j` lists atom `i` with vector `-v` and shift `-s`. In half
/// mode the number of stored pairs is exactly half of the full count (when
/// self pairs are disabled).
///
/// Pairs are sorted by `(first, second, cell_shift_indices)`, so the output
/// is reproducible across runs and numbers of threads.
#[derive(Debug, Clone)]
pub struct NeighborList {
    cutoff: f64,
    mode: ListMode,
    pairs: Vec<Pair>,
    pairs_by_atom: Vec<Vec<Pair>>,
}

impl NeighborList {
    /// Build the neighbor list for the given `positions` inside `cell`,
    /// according to `options`.
    ///
    /// All precondition failures (`EmptyAtomSet`, `InvalidCutoff`,
    /// `DegenerateBox`, `InvalidPosition`, `InsufficientReplication`) are
    /// detected before the pair scan starts; a partial list is never
    /// produced.
    #[time_graph::instrument(name = "NeighborList")]
    pub fn new(positions: &[Vector3D], cell: SimulationBox, options: &NeighborListOptions) -> Result<NeighborList, Error> {
        if positions.is_empty() {
            return Err(Error::EmptyAtomSet);
        }

        if cell.volume() <= options.tolerance {
            return Err(Error::DegenerateBox(format!(
                "the box volume {} is below the tolerance {}",
                cell.volume(), options.tolerance
            )));
        }

        for (atom, position) in positions.iter().enumerate() {
            if !position.is_finite() {
                return Err(Error::InvalidPosition(format!(
                    "the position of atom {} is not finite: [{}, {}, {}]",
                    atom, position[0], position[1], position[2]
                )));
            }
        }

        let mut grid = CellGrid::new(cell, options.cutoff, options.replication)?;
        grid.add_atoms(positions);

        let cell_matrix = cell.matrix();
        let cutoff2 = options.cutoff * options.cutoff;

        // the grid produces more candidates than needed, only keep the pairs
        // where the distance is actually within the cutoff
        let mut pairs = grid.pairs().into_par_iter()
            .filter_map(|candidate| {
                let mut vector = positions[candidate.second] - positions[candidate.first];
                vector += candidate.shift.cartesian(&cell_matrix);

                let distance2 = vector * vector;
                if distance2 > cutoff2 {
                    return None;
                }

                if distance2 < 1e-3 {
                    warn!(
                        "atoms {} and {} are very close to one another ({})",
                        candidate.first, candidate.second, distance2.sqrt()
                    );
                }

                Some(Pair {
                    first: candidate.first,
                    second: candidate.second,
                    distance: distance2.sqrt(),
                    vector: vector,
                    cell_shift_indices: candidate.shift.into(),
                })
            })
            .collect::<Vec<_>>();

        if options.self_pairs {
            for atom in 0..positions.len() {
                pairs.push(Pair {
                    first: atom,
                    second: atom,
                    distance: 0.0,
                    vector: Vector3D::zero(),
                    cell_shift_indices: [0, 0, 0],
                });
            }
        }

        if options.mode == ListMode::Full {
            // mirror everything except the zero-distance self pairs, which
            // are their own mirror
            let mirrored = pairs.iter()
                .filter(|pair| pair.first != pair.second || pair.cell_shift_indices != [0, 0, 0])
                .map(|pair| Pair {
                    first: pair.second,
                    second: pair.first,
                    distance: pair.distance,
                    vector: -pair.vector,
                    cell_shift_indices: [
                        -pair.cell_shift_indices[0],
                        -pair.cell_shift_indices[1],
                        -pair.cell_shift_indices[2],
                    ],
                })
                .collect::<Vec<_>>();
            pairs.extend(mirrored);
        }

        // sort the pairs to make the output deterministic, including across
        // different numbers of rayon workers
        pairs.sort_unstable_by_key(|pair| (pair.first, pair.second, pair.cell_shift_indices));

        let mut pairs_by_atom = vec![Vec::new(); positions.len()];
        for pair in &pairs {
            match options.mode {
                ListMode::Half => {
                    pairs_by_atom[pair.first].push(*pair);
                    if pair.second != pair.first {
                        pairs_by_atom[pair.second].push(*pair);
                    }
                }
                ListMode::Full => {
                    pairs_by_atom[pair.first].push(*pair);
                }
            }
        }

        for pairs in &mut pairs_by_atom {
            pairs.sort_unstable_by_key(|pair| (pair.first, pair.second, pair.cell_shift_indices));
        }

        return Ok(NeighborList {
            cutoff: options.cutoff,
            mode: options.mode,
            pairs: pairs,
            pairs_by_atom: pairs_by_atom,
        });
    }

    /// Get the cutoff used to create this neighbor list
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Get the mode of this neighbor list
    pub fn mode(&self) -> ListMode {
        self.mode
    }

    /// Get the total number of pairs in this neighbor list
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check whether this neighbor list contains no pair at all
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Get all pairs in this neighbor list
    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Get the pairs involving the atom at the given index.
    ///
    /// In half mode, the pairs are listed in their canonical orientation for
    /// both atoms of the pair; in full mode, only pairs with `first == atom`
    /// are listed, so the pair vector always points away from `atom`.
    pub fn pairs_containing(&self, atom: usize) -> &[Pair] {
        &self.pairs_by_atom[atom]
    }

    /// Get the number of neighbor relations involving the atom at the given
    /// index
    pub fn neighbor_count(&self, atom: usize) -> usize {
        self.pairs_by_atom[atom].len()
    }
}
