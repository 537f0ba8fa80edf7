//! Per-rank geometry derived from the global grid and the rank count.
//!
//! The global grid of `(i_max + 2) x (j_max + 2)` cells (interior plus
//! ghost border) is cut evenly across the rank grid, and each rank's
//! share is cut again into tiles. Anything that does not divide evenly is
//! a fatal setup error, reported before any communication starts.

use crate::io::config::Config;
use crate::physics::DomainExtent;
use crate::solver_error::SolverError;
use crate::topology::{Direction, RankCoords, RankGrid};

/// Smallest tile width that keeps a boundary ghost cell and its interior
/// mirror cell in the same tile.
const MIN_CELLS_PER_TILE: usize = 2;

/// Everything one rank needs to know about its place in the domain.
#[derive(Clone, Debug)]
pub struct RankGeometry {
    pub rank: usize,
    pub rank_grid: RankGrid,
    pub coords: RankCoords,
    /// Tiles per axis, halo ring included.
    pub np_x: usize,
    pub np_y: usize,
    /// Cells per tile.
    pub cells_x: usize,
    pub cells_y: usize,
    pub dx: f64,
    pub dy: f64,
    pub extent: DomainExtent,
}

impl RankGeometry {
    pub fn derive(cfg: &Config, rank: usize) -> Result<Self, SolverError> {
        let rank_grid = RankGrid::planar(cfg.num_ranks_x, cfg.num_ranks_y);
        let coords = rank_grid.coords_of(rank)?;

        let (cells_x, np_x) = split_axis('x', cfg.i_max + 2, cfg.num_ranks_x, cfg.i_res)?;
        let (cells_y, np_y) = split_axis('y', cfg.j_max + 2, cfg.num_ranks_y, cfg.j_res)?;

        let (dx, dy) = cfg.spacing();
        Ok(RankGeometry {
            rank,
            rank_grid,
            coords,
            np_x,
            np_y,
            cells_x,
            cells_y,
            dx,
            dy,
            extent: DomainExtent {
                i_max: cfg.i_max,
                j_max: cfg.j_max,
            },
        })
    }

    /// Global coordinates of this rank's first owned cell.
    pub fn base_offsets(&self) -> (i64, i64) {
        let owned_x = (self.np_x - 2) * self.cells_x;
        let owned_y = (self.np_y - 2) * self.cells_y;
        (
            (self.coords.idx * owned_x) as i64,
            (self.coords.idy * owned_y) as i64,
        )
    }

    /// Owned cells per axis on this rank.
    pub fn owned_cells(&self) -> (usize, usize) {
        (
            (self.np_x - 2) * self.cells_x,
            (self.np_y - 2) * self.cells_y,
        )
    }

    /// Halo payload length for a direction (edge cell count, 1 for
    /// corners).
    pub fn edge_len(&self, dir: Direction) -> usize {
        match dir {
            Direction::Left | Direction::Right => self.cells_y,
            Direction::Bottom | Direction::Top => self.cells_x,
            _ => 1,
        }
    }
}

/// Split one axis of the global grid: `cells` over `ranks`, then each
/// rank's share into tiles of `res` cells (`res == 0` means one tile per
/// rank). Returns `(cells per tile, tiles including the halo ring)`.
fn split_axis(
    axis: char,
    cells: usize,
    ranks: usize,
    res: usize,
) -> Result<(usize, usize), SolverError> {
    if cells % ranks != 0 {
        return Err(SolverError::IndivisibleGrid {
            axis,
            cells,
            chunks: ranks,
        });
    }
    let per_rank = cells / ranks;
    let per_tile = if res == 0 { per_rank } else { res };
    if per_rank % per_tile != 0 {
        return Err(SolverError::IndivisibleGrid {
            axis,
            cells: per_rank,
            chunks: per_tile,
        });
    }
    if per_tile < MIN_CELLS_PER_TILE {
        return Err(SolverError::PartitionTooSmall {
            axis,
            cells: per_tile,
            min: MIN_CELLS_PER_TILE,
        });
    }
    Ok((per_tile, per_rank / per_tile + 2))
}
