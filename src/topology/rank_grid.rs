//! Logical Cartesian layout of ranks and per-rank neighbor discovery.
//!
//! Ranks are arranged in an `R x C` grid (optionally stacked in layers for
//! 3-D decompositions). A rank's coordinate is derived from its linear id
//! as `id = idz*R*C + idy*R + idx`; a rank lacks a neighbor on any side
//! that lies on the outer boundary of the rank grid, and a diagonal
//! neighbor exists only if both orthogonal neighbors exist.

use serde::{Deserialize, Serialize};

use crate::solver_error::SolverError;
use crate::topology::direction::{Direction, NUM_DIRECTIONS};

/// Cartesian arrangement of ranks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RankGrid {
    nx: usize,
    ny: usize,
    nz: usize,
}

/// Coordinate of one rank inside a [`RankGrid`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RankCoords {
    pub idx: usize,
    pub idy: usize,
    pub idz: usize,
}

/// Which of the eight neighbors exist for a given rank.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NeighborMap {
    present: [bool; NUM_DIRECTIONS],
}

impl NeighborMap {
    #[inline]
    pub fn has(&self, dir: Direction) -> bool {
        self.present[dir.index()]
    }

    /// Directions with an existing neighbor, in discriminant order.
    pub fn existing(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL.into_iter().filter(|d| self.has(*d))
    }
}

impl RankGrid {
    /// A planar `nx x ny` rank grid.
    ///
    /// # Panics
    /// Panics if either extent is zero; geometry is validated before a grid
    /// is ever constructed (see [`SolverError::RankGridMismatch`]).
    pub fn planar(nx: usize, ny: usize) -> Self {
        Self::layered(nx, ny, 1)
    }

    /// An `nx x ny x nz` rank grid.
    pub fn layered(nx: usize, ny: usize, nz: usize) -> Self {
        assert!(nx > 0 && ny > 0 && nz > 0, "rank grid extents must be positive");
        RankGrid { nx, ny, nz }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn extent_x(&self) -> usize {
        self.nx
    }

    #[inline]
    pub fn extent_y(&self) -> usize {
        self.ny
    }

    /// Coordinates of `rank`, inverting `id = idz*R*C + idy*R + idx`.
    pub fn coords_of(&self, rank: usize) -> Result<RankCoords, SolverError> {
        if rank >= self.len() {
            return Err(SolverError::RankOutOfRange {
                rank,
                size: self.len(),
            });
        }
        let layer = self.nx * self.ny;
        Ok(RankCoords {
            idx: (rank % layer) % self.nx,
            idy: (rank % layer) / self.nx,
            idz: rank / layer,
        })
    }

    /// Linear id of the rank at `coords`.
    #[inline]
    pub fn id_of(&self, coords: RankCoords) -> usize {
        coords.idz * self.nx * self.ny + coords.idy * self.nx + coords.idx
    }

    /// Existence map of the eight in-plane neighbors of `rank`.
    pub fn neighbors_of(&self, rank: usize) -> Result<NeighborMap, SolverError> {
        let c = self.coords_of(rank)?;
        let mut map = NeighborMap::default();
        for dir in Direction::ALL {
            let present = if dir.is_corner() {
                let (a, b) = dir.components();
                self.step(c, a).is_some() && self.step(c, b).is_some()
            } else {
                self.step(c, dir).is_some()
            };
            map.present[dir.index()] = present;
        }
        Ok(map)
    }

    /// Linear id of the neighbor of `rank` in `dir`, or `None` at the rank
    /// grid boundary. Callers holding a [`NeighborMap`] check existence
    /// before addressing.
    pub fn address_of(&self, rank: usize, dir: Direction) -> Result<Option<usize>, SolverError> {
        let c = self.coords_of(rank)?;
        Ok(self.step(c, dir).map(|n| self.id_of(n)))
    }

    fn step(&self, c: RankCoords, dir: Direction) -> Option<RankCoords> {
        let (dx, dy) = dir.offset();
        let idx = c.idx.checked_add_signed(dx)?;
        let idy = c.idy.checked_add_signed(dy)?;
        (idx < self.nx && idy < self.ny).then_some(RankCoords { idx, idy, idz: c.idz })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coords_round_trip() {
        let grid = RankGrid::layered(3, 2, 2);
        for rank in 0..grid.len() {
            let c = grid.coords_of(rank).unwrap();
            assert_eq!(grid.id_of(c), rank);
            assert!(c.idx < 3 && c.idy < 2 && c.idz < 2);
        }
    }

    #[test]
    fn rank_out_of_range() {
        let grid = RankGrid::planar(2, 2);
        assert!(matches!(
            grid.coords_of(4),
            Err(SolverError::RankOutOfRange { rank: 4, size: 4 })
        ));
    }

    #[test]
    fn edge_existence_matches_boundary() {
        let grid = RankGrid::planar(3, 3);
        for rank in 0..9 {
            let map = grid.neighbors_of(rank).unwrap();
            assert_eq!(map.has(Direction::Left), rank % 3 != 0);
            assert_eq!(map.has(Direction::Right), rank % 3 != 2);
            assert_eq!(map.has(Direction::Bottom), rank / 3 != 0);
            assert_eq!(map.has(Direction::Top), rank / 3 != 2);
        }
    }

    #[test]
    fn corners_are_conjunction_of_edges() {
        let grid = RankGrid::planar(4, 3);
        for rank in 0..grid.len() {
            let map = grid.neighbors_of(rank).unwrap();
            for corner in Direction::CORNERS {
                let (a, b) = corner.components();
                assert_eq!(map.has(corner), map.has(a) && map.has(b), "rank {rank} {corner:?}");
            }
        }
    }

    #[test]
    fn address_is_mutual() {
        // If b is a's neighbor in dir, then a is b's neighbor in mirror(dir).
        let grid = RankGrid::planar(3, 3);
        for rank in 0..9 {
            for dir in Direction::ALL {
                if let Some(nbr) = grid.address_of(rank, dir).unwrap() {
                    assert_eq!(grid.address_of(nbr, dir.mirror()).unwrap(), Some(rank));
                }
            }
        }
    }

    #[test]
    fn single_rank_has_no_neighbors() {
        let grid = RankGrid::planar(1, 1);
        let map = grid.neighbors_of(0).unwrap();
        assert_eq!(map.existing().count(), 0);
    }
}
