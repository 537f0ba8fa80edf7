//! Communication: pluggable backends, step-indexed halo channels, the
//! neighbor registry, and collective reductions.

pub mod collective;
pub mod communicator;
pub mod halo;
pub mod registry;
pub mod tag;

pub use collective::Collective;
#[cfg(feature = "mpi-support")]
pub use communicator::MpiComm;
pub use communicator::{Communicator, NoComm, ThreadComm, ThreadWorld, Wait};
pub use halo::{HaloChannel, HaloLinks};
pub use registry::NeighborRegistry;
pub use tag::FieldKind;
