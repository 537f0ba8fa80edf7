//! Partition: the owned, dense 2-D tile of field values.
//!
//! A partition stores `nx x ny` cell values in a flat row-major buffer
//! together with the global offset of its cell `(0, 0)`. Boundary slices
//! for each of the eight compass directions can be extracted (for sending)
//! and injected (on receipt); corner slices have length one.
//!
//! Owned tiles are mutated in place by stencil computation; halo
//! placeholder tiles are written only by the exchange protocol. Injecting
//! into an owned tile would corrupt owned data and is a fatal assertion.

use crate::topology::Direction;

/// Whether a tile holds owned cells or mirrors a neighbor's edge data.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TileKind {
    /// Real cells owned and computed by this rank.
    Owned,
    /// Halo placeholder on the tile-grid ring, written only via
    /// [`Partition::inject_edge`].
    Halo,
}

/// One dense tile of scalar or vector field values.
#[derive(Clone, Debug)]
pub struct Partition<V> {
    kind: TileKind,
    nx: usize,
    ny: usize,
    global_i: i64,
    global_j: i64,
    cells: Vec<V>,
}

impl<V: Copy + Default> Partition<V> {
    /// A zero-initialized tile of `nx x ny` cells whose cell `(0, 0)` sits
    /// at global coordinates `(global_i, global_j)`.
    pub fn new(kind: TileKind, nx: usize, ny: usize, global_i: i64, global_j: i64) -> Self {
        assert!(nx > 0 && ny > 0, "partition extents must be positive");
        Partition {
            kind,
            nx,
            ny,
            global_i,
            global_j,
            cells: vec![V::default(); nx * ny],
        }
    }

    #[inline]
    pub fn kind(&self) -> TileKind {
        self.kind
    }

    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Global coordinates of cell `(0, 0)`; negative for halo tiles that
    /// sit outside the global grid.
    #[inline]
    pub fn global_offset(&self) -> (i64, i64) {
        (self.global_i, self.global_j)
    }

    #[inline]
    fn idx(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny);
        j * self.nx + i
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> V {
        self.cells[self.idx(i, j)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, value: V) {
        let idx = self.idx(i, j);
        self.cells[idx] = value;
    }

    /// Flat read-only view of the cells, row-major by `j`.
    #[inline]
    pub fn cells(&self) -> &[V] {
        &self.cells
    }

    /// Number of values on the boundary slice named by `dir` (1 for
    /// corners).
    pub fn edge_len(&self, dir: Direction) -> usize {
        match dir {
            Direction::Left | Direction::Right => self.ny,
            Direction::Bottom | Direction::Top => self.nx,
            _ => 1,
        }
    }

    /// The row/column/point adjacent to the edge or corner named by `dir`,
    /// oriented so the receiver can inject it directly.
    pub fn extract_edge(&self, dir: Direction) -> Vec<V> {
        self.edge_cells(dir).map(|(i, j)| self.get(i, j)).collect()
    }

    /// Overwrite the boundary slice named by `dir` with `slice`.
    ///
    /// # Panics
    /// Panics if this is an owned tile, or if `slice` does not match the
    /// edge length — both are protocol violations, not recoverable
    /// conditions.
    pub fn inject_edge(&mut self, dir: Direction, slice: &[V]) {
        assert_eq!(
            self.kind,
            TileKind::Halo,
            "edge injection into an owned tile would corrupt owned data"
        );
        assert_eq!(
            slice.len(),
            self.edge_len(dir),
            "halo slice length mismatch on {dir:?}"
        );
        let cells: Vec<(usize, usize)> = self.edge_cells(dir).collect();
        for ((i, j), v) in cells.into_iter().zip(slice) {
            self.set(i, j, *v);
        }
    }

    /// Cell coordinates of the boundary slice for `dir`, in slice order.
    fn edge_cells(&self, dir: Direction) -> Box<dyn Iterator<Item = (usize, usize)> + '_> {
        let (nx, ny) = (self.nx, self.ny);
        match dir {
            Direction::Left => Box::new((0..ny).map(move |j| (0, j))),
            Direction::Right => Box::new((0..ny).map(move |j| (nx - 1, j))),
            Direction::Bottom => Box::new((0..nx).map(move |i| (i, 0))),
            Direction::Top => Box::new((0..nx).map(move |i| (i, ny - 1))),
            Direction::BottomLeft => Box::new(std::iter::once((0, 0))),
            Direction::BottomRight => Box::new(std::iter::once((nx - 1, 0))),
            Direction::TopLeft => Box::new(std::iter::once((0, ny - 1))),
            Direction::TopRight => Box::new(std::iter::once((nx - 1, ny - 1))),
        }
    }
}
