//! In-process multi-rank driver.
//!
//! Runs one stepper per OS thread over a shared [`ThreadWorld`], the
//! in-process counterpart of launching one process per rank. A panic on
//! any rank (a protocol violation is a fatal assertion) takes the whole
//! run down, matching the distributed failure model.

use std::sync::Arc;

use log::info;

use crate::comm::ThreadWorld;
use crate::io::config::Config;
use crate::io::vtk::SnapshotSink;
use crate::physics::Discretization;
use crate::solver_error::SolverError;
use crate::stepper::{RunSummary, Stepper};

/// Run the configured rank grid as threads; returns one summary per
/// rank, in rank order.
pub fn run_threads<D>(cfg: &Config, strategy: D) -> Result<Vec<RunSummary>, SolverError>
where
    D: Discretization + Clone,
{
    run_threads_with(cfg, strategy, |_| None)
}

/// Like [`run_threads`], attaching the sink the factory returns for each
/// rank.
pub fn run_threads_with<D>(
    cfg: &Config,
    strategy: D,
    mut sink_for_rank: impl FnMut(usize) -> Option<Box<dyn SnapshotSink>>,
) -> Result<Vec<RunSummary>, SolverError>
where
    D: Discretization + Clone,
{
    cfg.validate()?;
    let num_ranks = cfg.num_ranks();
    info!("driving {num_ranks} ranks in-process");

    let world = ThreadWorld::new(num_ranks);
    let results: Vec<Result<RunSummary, SolverError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..num_ranks)
            .map(|rank| {
                let comm = Arc::new(world.comm(rank));
                let cfg = cfg.clone();
                let strategy = strategy.clone();
                let sink = sink_for_rank(rank);
                scope.spawn(move || {
                    let mut stepper = Stepper::new(cfg, comm, strategy)?;
                    if let Some(sink) = sink {
                        stepper = stepper.with_sink(sink);
                    }
                    stepper.run()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });
    results.into_iter().collect()
}
