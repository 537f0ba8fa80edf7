//! Rank topology: compass directions and the logical Cartesian rank grid.

pub mod direction;
pub mod rank_grid;

pub use direction::{Direction, NUM_DIRECTIONS};
pub use rank_grid::{NeighborMap, RankCoords, RankGrid};
