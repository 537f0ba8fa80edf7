//! # flowstep
//!
//! flowstep is a distributed-memory incompressible-flow solver core:
//! finite-difference Navier-Stokes on a staggered grid, partitioned
//! across ranks that advance in lockstep timesteps. The crate owns the
//! domain decomposition, the step-indexed halo-exchange protocol, the
//! global reductions, and the per-timestep orchestration; the
//! finite-difference stencils themselves sit behind a pluggable strategy
//! trait with one production implementation.
//!
//! ## Structure
//! - [`topology`]: compass directions and the logical Cartesian rank
//!   grid with neighbor discovery.
//! - [`grid`]: owned field tiles and the per-rank tile grid with its
//!   halo-placeholder ring.
//! - [`comm`]: pluggable communication backends (serial, in-process
//!   threads, MPI behind the `mpi-support` feature), step-indexed halo
//!   channels, and epoch-tagged collective reductions.
//! - [`physics`]: the computation-strategy trait and the donor-cell
//!   discretization.
//! - [`stepper`]: setup/validation and the timestep state machine.
//! - [`io`]: frozen configuration input and snapshot output.
//! - [`driver`]: an in-process multi-rank harness (one thread per rank).
//!
//! ## Ordering guarantees
//! Halo payloads carry `(field, direction, step)` in the message tag, so
//! a receive for step `s` can only ever observe the matching send, under
//! arbitrary scheduling across ranks. Step ids on a channel strictly
//! increase; reuse is a fatal assertion. Global reductions are full
//! barriers: no rank starts SOR iteration `k + 1` before every rank has
//! contributed its residual for iteration `k`.

pub mod comm;
pub mod driver;
pub mod grid;
pub mod io;
pub mod physics;
pub mod solver_error;
pub mod stepper;
pub mod topology;
pub mod util;

pub use solver_error::SolverError;

/// The most-used types in one import.
pub mod prelude {
    pub use crate::comm::{Collective, Communicator, NoComm, ThreadComm, ThreadWorld, Wait};
    #[cfg(feature = "mpi-support")]
    pub use crate::comm::MpiComm;
    pub use crate::comm::{FieldKind, HaloChannel, HaloLinks, NeighborRegistry};
    pub use crate::driver::{run_threads, run_threads_with};
    pub use crate::grid::{Partition, TileGrid, TileKind, Vel};
    pub use crate::io::{Config, Snapshot, SnapshotSink, VtkWriter, WallVelocities};
    pub use crate::physics::{Discretization, DomainExtent, DonorCell};
    pub use crate::solver_error::SolverError;
    pub use crate::stepper::{cfl_timestep, RankGeometry, RunSummary, StepOutcome, Stepper};
    pub use crate::topology::{Direction, NeighborMap, RankCoords, RankGrid};
    pub use crate::util::CancellationToken;
}
