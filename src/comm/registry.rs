//! NeighborRegistry: `(rank, direction) -> transport address`, resolved
//! once at setup.
//!
//! Replaces runtime name lookup with a fixed table: each of the eight
//! directions either has a peer rank id or lies on the rank-grid
//! boundary.

use crate::solver_error::SolverError;
use crate::topology::{Direction, NeighborMap, RankGrid, NUM_DIRECTIONS};

/// Resolved neighbor addresses for one rank.
#[derive(Clone, Debug)]
pub struct NeighborRegistry {
    rank: usize,
    map: NeighborMap,
    addresses: [Option<usize>; NUM_DIRECTIONS],
}

impl NeighborRegistry {
    /// Resolve all eight neighbor addresses of `rank` in `grid`.
    pub fn resolve(grid: &RankGrid, rank: usize) -> Result<Self, SolverError> {
        let map = grid.neighbors_of(rank)?;
        let mut addresses = [None; NUM_DIRECTIONS];
        for dir in Direction::ALL {
            if map.has(dir) {
                addresses[dir.index()] = grid.address_of(rank, dir)?;
            }
        }
        Ok(NeighborRegistry { rank, map, addresses })
    }

    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[inline]
    pub fn has_neighbor(&self, dir: Direction) -> bool {
        self.map.has(dir)
    }

    /// Peer rank id in `dir`, `None` at the rank-grid boundary.
    #[inline]
    pub fn address(&self, dir: Direction) -> Option<usize> {
        self.addresses[dir.index()]
    }

    #[inline]
    pub fn existence_map(&self) -> &NeighborMap {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_rank_resolves_all_eight() {
        let grid = RankGrid::planar(3, 3);
        let reg = NeighborRegistry::resolve(&grid, 4).unwrap();
        for dir in Direction::ALL {
            assert!(reg.has_neighbor(dir));
            assert!(reg.address(dir).is_some());
        }
        assert_eq!(reg.address(Direction::Left), Some(3));
        assert_eq!(reg.address(Direction::TopRight), Some(8));
    }

    #[test]
    fn boundary_rank_has_no_address_outward() {
        let grid = RankGrid::planar(2, 2);
        let reg = NeighborRegistry::resolve(&grid, 0).unwrap();
        assert_eq!(reg.address(Direction::Left), None);
        assert_eq!(reg.address(Direction::Bottom), None);
        assert_eq!(reg.address(Direction::Right), Some(1));
        assert_eq!(reg.address(Direction::Top), Some(2));
        assert_eq!(reg.address(Direction::TopRight), Some(3));
        assert!(!reg.has_neighbor(Direction::BottomLeft));
    }
}
