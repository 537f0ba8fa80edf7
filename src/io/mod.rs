//! Configuration input and snapshot output.

pub mod config;
pub mod vtk;

pub use config::{Config, WallVelocities};
pub use vtk::{Snapshot, SnapshotSink, VtkWriter};
