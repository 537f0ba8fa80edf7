//! TileGrid: the per-rank array of partitions with its halo ring.
//!
//! A rank owns an `np_x x np_y` array of tiles where column/row 0 and the
//! last column/row are halo placeholders mirroring the adjacent rank's
//! data; interior indices `[1, np_x-2] x [1, np_y-2]` hold owned tiles.
//! Tile `(k, l)` lives at flat index `l * np_x + k`.
//!
//! Neighbor slices for a stencil on tile `(k, l)` come from the adjacent
//! tile's mirrored edge, which is the same cell run whether the neighbor
//! is an owned tile (intra-rank) or a halo placeholder filled by the
//! exchange protocol (inter-rank).

use itertools::iproduct;

use crate::grid::partition::{Partition, TileKind};
use crate::topology::Direction;

/// Edge slices of the four orthogonal neighbors of a tile.
#[derive(Clone, Debug)]
pub struct EdgeHalo<V> {
    pub left: Vec<V>,
    pub right: Vec<V>,
    pub bottom: Vec<V>,
    pub top: Vec<V>,
}

/// [`EdgeHalo`] plus the two corner points the momentum stencil reaches.
#[derive(Clone, Debug)]
pub struct StencilHalo<V> {
    pub edge: EdgeHalo<V>,
    pub bottom_right: V,
    pub top_left: V,
}

/// The per-rank grid of tiles, halo ring included.
#[derive(Clone, Debug)]
pub struct TileGrid<V> {
    np_x: usize,
    np_y: usize,
    tiles: Vec<Partition<V>>,
}

impl<V: Copy + Default> TileGrid<V> {
    /// Allocate all tiles for one rank. `cells_x x cells_y` is the tile
    /// size and `(base_i, base_j)` the global coordinate of the first
    /// owned cell; halo tiles get the offsets they would have if owned, so
    /// extraction near rank boundaries stays uniform.
    pub fn new(
        np_x: usize,
        np_y: usize,
        cells_x: usize,
        cells_y: usize,
        base_i: i64,
        base_j: i64,
    ) -> Self {
        assert!(np_x >= 3 && np_y >= 3, "tile grid needs at least one owned tile");
        let mut tiles = Vec::with_capacity(np_x * np_y);
        for l in 0..np_y {
            for k in 0..np_x {
                let on_ring = k == 0 || k == np_x - 1 || l == 0 || l == np_y - 1;
                let kind = if on_ring { TileKind::Halo } else { TileKind::Owned };
                let global_i = base_i + (k as i64 - 1) * cells_x as i64;
                let global_j = base_j + (l as i64 - 1) * cells_y as i64;
                tiles.push(Partition::new(kind, cells_x, cells_y, global_i, global_j));
            }
        }
        TileGrid { np_x, np_y, tiles }
    }

    #[inline]
    pub fn np_x(&self) -> usize {
        self.np_x
    }

    #[inline]
    pub fn np_y(&self) -> usize {
        self.np_y
    }

    #[inline]
    fn index(&self, k: usize, l: usize) -> usize {
        debug_assert!(k < self.np_x && l < self.np_y);
        l * self.np_x + k
    }

    #[inline]
    pub fn tile(&self, k: usize, l: usize) -> &Partition<V> {
        &self.tiles[self.index(k, l)]
    }

    #[inline]
    pub fn tile_mut(&mut self, k: usize, l: usize) -> &mut Partition<V> {
        let idx = self.index(k, l);
        &mut self.tiles[idx]
    }

    /// Coordinates of all owned tiles, `k` fastest.
    pub fn interior(&self) -> impl Iterator<Item = (usize, usize)> {
        let (np_x, np_y) = (self.np_x, self.np_y);
        iproduct!(1..np_y - 1, 1..np_x - 1).map(|(l, k)| (k, l))
    }

    /// The neighbor slice a stencil on tile `(k, l)` sees in direction
    /// `dir`: the adjacent tile's mirrored edge.
    pub fn neighbor_slice(&self, k: usize, l: usize, dir: Direction) -> Vec<V> {
        let (dx, dy) = dir.offset();
        let nk = k.checked_add_signed(dx).expect("neighbor tile out of grid");
        let nl = l.checked_add_signed(dy).expect("neighbor tile out of grid");
        self.tile(nk, nl).extract_edge(dir.mirror())
    }

    /// Orthogonal neighbor slices for tile `(k, l)`.
    pub fn edge_halo(&self, k: usize, l: usize) -> EdgeHalo<V> {
        EdgeHalo {
            left: self.neighbor_slice(k, l, Direction::Left),
            right: self.neighbor_slice(k, l, Direction::Right),
            bottom: self.neighbor_slice(k, l, Direction::Bottom),
            top: self.neighbor_slice(k, l, Direction::Top),
        }
    }

    /// Neighbor slices plus the corner points the momentum stencil needs.
    pub fn stencil_halo(&self, k: usize, l: usize) -> StencilHalo<V> {
        StencilHalo {
            edge: self.edge_halo(k, l),
            bottom_right: self.neighbor_slice(k, l, Direction::BottomRight)[0],
            top_left: self.neighbor_slice(k, l, Direction::TopLeft)[0],
        }
    }

    /// The owned tile whose edge is sent toward `dir`; `t` selects the
    /// tile along the shared boundary (row index for left/right, column
    /// index for bottom/top; ignored for corners).
    pub fn edge_source(&self, dir: Direction, t: usize) -> &Partition<V> {
        let (np_x, np_y) = (self.np_x, self.np_y);
        let (k, l) = match dir {
            Direction::Left => (1, t),
            Direction::Right => (np_x - 2, t),
            Direction::Bottom => (t, 1),
            Direction::Top => (t, np_y - 2),
            Direction::BottomLeft => (1, 1),
            Direction::BottomRight => (np_x - 2, 1),
            Direction::TopLeft => (1, np_y - 2),
            Direction::TopRight => (np_x - 2, np_y - 2),
        };
        self.tile(k, l)
    }

    /// Inject an inbound slice for receive slot `slot` into the matching
    /// ring tile. The slice was extracted by the sender toward
    /// `slot.mirror()`, so it lands on the ring tile's interior-facing
    /// edge.
    pub fn inject_ring(&mut self, slot: Direction, t: usize, slice: &[V]) {
        let (np_x, np_y) = (self.np_x, self.np_y);
        let (k, l) = match slot {
            Direction::Left => (0, t),
            Direction::Right => (np_x - 1, t),
            Direction::Bottom => (t, 0),
            Direction::Top => (t, np_y - 1),
            Direction::BottomLeft => (0, 0),
            Direction::BottomRight => (np_x - 1, 0),
            Direction::TopLeft => (0, np_y - 1),
            Direction::TopRight => (np_x - 1, np_y - 1),
        };
        self.tile_mut(k, l).inject_edge(slot.mirror(), slice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_tiles_are_halo_interior_is_owned() {
        let grid = TileGrid::<f64>::new(4, 3, 2, 2, 0, 0);
        for l in 0..3 {
            for k in 0..4 {
                let on_ring = k == 0 || k == 3 || l == 0 || l == 2;
                let expect = if on_ring { TileKind::Halo } else { TileKind::Owned };
                assert_eq!(grid.tile(k, l).kind(), expect, "tile ({k},{l})");
            }
        }
        assert_eq!(grid.interior().count(), 2);
    }

    #[test]
    fn global_offsets_follow_tile_coords() {
        let grid = TileGrid::<f64>::new(3, 3, 4, 5, 8, 10);
        assert_eq!(grid.tile(1, 1).global_offset(), (8, 10));
        assert_eq!(grid.tile(0, 1).global_offset(), (4, 10));
        assert_eq!(grid.tile(1, 0).global_offset(), (8, 5));
    }

    #[test]
    fn injected_ring_data_feeds_the_stencil_slice() {
        let mut grid = TileGrid::<f64>::new(3, 3, 2, 2, 0, 0);
        // A message in the LEFT slot was extracted by the left neighbor
        // toward its RIGHT; it must surface as tile (1,1)'s left slice.
        grid.inject_ring(Direction::Left, 1, &[7.0, 8.0]);
        assert_eq!(grid.neighbor_slice(1, 1, Direction::Left), vec![7.0, 8.0]);

        grid.inject_ring(Direction::BottomRight, 0, &[3.5]);
        assert_eq!(grid.neighbor_slice(1, 1, Direction::BottomRight), vec![3.5]);
    }

    #[test]
    fn intra_rank_neighbor_slice_reads_owned_tile() {
        let mut grid = TileGrid::<f64>::new(4, 3, 2, 2, 0, 0);
        // Tile (2,1) is owned; its left edge is tile (1,1)'s right slice.
        grid.tile_mut(2, 1).set(0, 0, 1.0);
        grid.tile_mut(2, 1).set(0, 1, 2.0);
        assert_eq!(grid.neighbor_slice(1, 1, Direction::Right), vec![1.0, 2.0]);
    }
}
