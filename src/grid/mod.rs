//! Field storage: partitions, the per-rank tile grid, and cell values.

pub mod partition;
pub mod tile_grid;
pub mod velocity;

pub use partition::{Partition, TileKind};
pub use tile_grid::{EdgeHalo, StencilHalo, TileGrid};
pub use velocity::Vel;
