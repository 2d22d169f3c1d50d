//! Uniform-grid spatial hash for neighbor search.
//!
//! Uses sorted-index + cell-offset arrays rather than `HashMap` so a rebuild is
//! a counting sort and a lookup is a contiguous slice per cell.
//!
//! Neighbor sums are expressed as reductions: [`NeighborGrid::reduce_neighbors`]
//! maps a pure per-pair function over every neighbor and folds the results with
//! an associative combine operator. Nothing is mutated through the closure, so
//! the per-particle work of a phase can run on any thread.

/// Uniform-grid spatial hash for O(1) neighbor cell lookup.
///
/// The grid covers a fixed axis-aligned domain. Cell size should equal the
/// kernel support radius so that for any particle the 27 (3x3x3) adjacent
/// cells contain all potential neighbors. Positions outside the domain are
/// clamped into the edge cells.
pub struct NeighborGrid {
    cell_size: f32,
    grid_min: [f32; 3],
    grid_dims: [u32; 3],
    /// Cell index for each particle (parallel to particle arrays).
    cell_indices: Vec<u32>,
    /// Particle indices sorted by cell index.
    sorted_indices: Vec<u32>,
    /// Start offset in `sorted_indices` for each cell.
    cell_offsets: Vec<u32>,
    /// Number of particles in each cell.
    cell_counts: Vec<u32>,
}

impl NeighborGrid {
    /// Create a new neighbor grid covering `[domain_min, domain_max]`.
    ///
    /// `cell_size` should be set to the kernel support radius.
    pub fn new(cell_size: f32, domain_min: [f32; 3], domain_max: [f32; 3]) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive");
        let dims = [
            ((domain_max[0] - domain_min[0]) / cell_size).ceil().max(1.0) as u32,
            ((domain_max[1] - domain_min[1]) / cell_size).ceil().max(1.0) as u32,
            ((domain_max[2] - domain_min[2]) / cell_size).ceil().max(1.0) as u32,
        ];
        let total_cells = (dims[0] as usize) * (dims[1] as usize) * (dims[2] as usize);
        Self {
            cell_size,
            grid_min: domain_min,
            grid_dims: dims,
            cell_indices: Vec::new(),
            sorted_indices: Vec::new(),
            cell_offsets: vec![0; total_cells],
            cell_counts: vec![0; total_cells],
        }
    }

    /// Edge length of one cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Total number of cells in the grid.
    fn total_cells(&self) -> usize {
        (self.grid_dims[0] as usize)
            * (self.grid_dims[1] as usize)
            * (self.grid_dims[2] as usize)
    }

    /// Map a world-space position to a cell (cx, cy, cz), clamped to grid bounds.
    #[inline]
    fn pos_to_cell(&self, px: f32, py: f32, pz: f32) -> (u32, u32, u32) {
        let axis = |p: f32, min: f32, dim: u32| {
            ((p - min) / self.cell_size)
                .floor()
                .max(0.0)
                .min((dim - 1) as f32) as u32
        };
        (
            axis(px, self.grid_min[0], self.grid_dims[0]),
            axis(py, self.grid_min[1], self.grid_dims[1]),
            axis(pz, self.grid_min[2], self.grid_dims[2]),
        )
    }

    /// Flat cell index from (cx, cy, cz).
    #[inline]
    fn cell_hash(&self, cx: u32, cy: u32, cz: u32) -> u32 {
        cx + cy * self.grid_dims[0] + cz * self.grid_dims[0] * self.grid_dims[1]
    }

    /// Rebuild the grid from current particle positions.
    ///
    /// The three slices must all have the same length (one entry per particle).
    pub fn update(&mut self, x: &[f32], y: &[f32], z: &[f32]) {
        let n = x.len();
        debug_assert_eq!(n, y.len());
        debug_assert_eq!(n, z.len());

        let total_cells = self.total_cells();

        // --- 1. Compute cell index for each particle ---
        self.cell_indices.resize(n, 0);
        for i in 0..n {
            let (cx, cy, cz) = self.pos_to_cell(x[i], y[i], z[i]);
            self.cell_indices[i] = self.cell_hash(cx, cy, cz);
        }

        // --- 2. Count particles per cell ---
        self.cell_counts.clear();
        self.cell_counts.resize(total_cells, 0);
        for &ci in &self.cell_indices {
            self.cell_counts[ci as usize] += 1;
        }

        // --- 3. Prefix-sum to get cell offsets ---
        self.cell_offsets.clear();
        self.cell_offsets.resize(total_cells, 0);
        let mut running = 0u32;
        for c in 0..total_cells {
            self.cell_offsets[c] = running;
            running += self.cell_counts[c];
        }

        // --- 4. Scatter particle indices into sorted order ---
        self.sorted_indices.resize(n, 0);
        let mut write_heads: Vec<u32> = self.cell_offsets.clone();
        for i in 0..n {
            let ci = self.cell_indices[i] as usize;
            let pos = write_heads[ci] as usize;
            self.sorted_indices[pos] = i as u32;
            write_heads[ci] += 1;
        }
    }

    /// Iterate over all neighbors of `particle_idx` within `radius`.
    ///
    /// Checks the 27 (3x3x3) adjacent cells around the particle's cell and
    /// yields every other particle whose distance is at most `radius`. The
    /// particle itself is never yielded.
    pub fn neighbors<'a>(
        &'a self,
        particle_idx: usize,
        x: &'a [f32],
        y: &'a [f32],
        z: &'a [f32],
        radius: f32,
    ) -> impl Iterator<Item = usize> + 'a {
        let px = x[particle_idx];
        let py = y[particle_idx];
        let pz = z[particle_idx];
        let (cx, cy, cz) = self.pos_to_cell(px, py, pz);
        let radius_sq = radius * radius;
        let dims = self.grid_dims;

        (-1i32..=1)
            .flat_map(|dz| (-1i32..=1).flat_map(move |dy| (-1i32..=1).map(move |dx| (dx, dy, dz))))
            .filter_map(move |(dx, dy, dz)| {
                let nx = cx as i32 + dx;
                let ny = cy as i32 + dy;
                let nz = cz as i32 + dz;
                let inside = nx >= 0
                    && ny >= 0
                    && nz >= 0
                    && nx < dims[0] as i32
                    && ny < dims[1] as i32
                    && nz < dims[2] as i32;
                inside.then(|| self.cell_hash(nx as u32, ny as u32, nz as u32) as usize)
            })
            .flat_map(move |cell| {
                let start = self.cell_offsets[cell] as usize;
                let count = self.cell_counts[cell] as usize;
                self.sorted_indices[start..start + count].iter().map(|&j| j as usize)
            })
            .filter(move |&j| {
                if j == particle_idx {
                    return false;
                }
                let ddx = px - x[j];
                let ddy = py - y[j];
                let ddz = pz - z[j];
                ddx * ddx + ddy * ddy + ddz * ddz <= radius_sq
            })
    }

    /// Invoke `f` once per neighbor of `particle_idx` within `radius`.
    pub fn for_each_neighbor<F>(
        &self,
        particle_idx: usize,
        x: &[f32],
        y: &[f32],
        z: &[f32],
        radius: f32,
        f: F,
    ) where
        F: FnMut(usize),
    {
        self.neighbors(particle_idx, x, y, z, radius).for_each(f);
    }

    /// Reduce over the neighbors of `particle_idx` within `radius`.
    ///
    /// `pair` computes the contribution of one neighbor `j` and must not have
    /// side effects; `combine` must be associative with `identity` as its
    /// neutral element.
    #[allow(clippy::too_many_arguments)]
    pub fn reduce_neighbors<T, P, C>(
        &self,
        particle_idx: usize,
        x: &[f32],
        y: &[f32],
        z: &[f32],
        radius: f32,
        identity: T,
        pair: P,
        combine: C,
    ) -> T
    where
        P: Fn(usize) -> T,
        C: Fn(T, T) -> T,
    {
        self.neighbors(particle_idx, x, y, z, radius)
            .map(pair)
            .fold(identity, combine)
    }
}
