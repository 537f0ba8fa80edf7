//! Epoch-tagged all-reduce over the point-to-point layer.
//!
//! Rank 0 gathers every rank's contribution, combines, and publishes the
//! result back out. Each call is a full barrier: no rank returns before
//! every rank has contributed. Epochs make reductions from different
//! iterations unmistakable, so a straggler's contribution can never be
//! folded into the wrong round.

use std::cell::Cell;
use std::sync::Arc;

use log::debug;

use crate::comm::communicator::{Communicator, Wait};
use crate::comm::tag::{reduce_tag, ReducePhase};

/// All-reduce endpoint for one rank. All ranks must call the reduction
/// methods in the same order.
pub struct Collective<C: Communicator> {
    comm: Arc<C>,
    epoch: Cell<u64>,
}

impl<C: Communicator> Collective<C> {
    pub fn new(comm: Arc<C>) -> Self {
        Collective {
            comm,
            epoch: Cell::new(0),
        }
    }

    /// Global sum of `value` across all ranks.
    pub fn sum(&self, value: f64) -> f64 {
        self.allreduce([value], |a, b| a + b)[0]
    }

    /// Elementwise global maximum of a pair (used for `max|u|, max|v|`).
    pub fn max_pair(&self, pair: [f64; 2]) -> [f64; 2] {
        self.allreduce(pair, f64::max)
    }

    fn allreduce<const N: usize>(&self, mut acc: [f64; N], op: impl Fn(f64, f64) -> f64) -> [f64; N] {
        let epoch = self.epoch.get();
        self.epoch.set(epoch + 1);

        let (rank, size) = (self.comm.rank(), self.comm.size());
        if size == 1 {
            return acc;
        }
        debug!("allreduce epoch {epoch} on rank {rank}");

        let bytes = N * size_of::<f64>();
        if rank == 0 {
            let pending: Vec<_> = (1..size)
                .map(|peer| self.comm.irecv(peer, reduce_tag(ReducePhase::Contribute, epoch), bytes))
                .collect();
            for handle in pending {
                let raw = handle.wait().expect("reduce contribution");
                let vals: Vec<f64> = bytemuck::pod_collect_to_vec(&raw);
                assert_eq!(vals.len(), N, "reduce contribution width");
                for (a, v) in acc.iter_mut().zip(vals) {
                    *a = op(*a, v);
                }
            }
            for peer in 1..size {
                let _ = self.comm.isend(
                    peer,
                    reduce_tag(ReducePhase::Publish, epoch),
                    bytemuck::cast_slice(acc.as_slice()),
                );
            }
            acc
        } else {
            let _ = self.comm.isend(
                0,
                reduce_tag(ReducePhase::Contribute, epoch),
                bytemuck::cast_slice(acc.as_slice()),
            );
            let raw = self
                .comm
                .irecv(0, reduce_tag(ReducePhase::Publish, epoch), bytes)
                .wait()
                .expect("reduce result");
            let vals: Vec<f64> = bytemuck::pod_collect_to_vec(&raw);
            assert_eq!(vals.len(), N, "reduce result width");
            acc.copy_from_slice(&vals);
            acc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::communicator::{NoComm, ThreadWorld};

    #[test]
    fn single_rank_reduction_is_identity() {
        let c = Collective::new(Arc::new(NoComm));
        assert_eq!(c.sum(2.5), 2.5);
        assert_eq!(c.max_pair([1.0, -3.0]), [1.0, -3.0]);
    }

    #[test]
    fn sum_and_max_across_threads() {
        let world = ThreadWorld::new(3);
        let handles: Vec<_> = (0..3)
            .map(|rank| {
                let comm = Arc::new(world.comm(rank));
                std::thread::spawn(move || {
                    let c = Collective::new(comm);
                    let s = c.sum(rank as f64 + 1.0);
                    let m = c.max_pair([rank as f64, -(rank as f64)]);
                    (s, m)
                })
            })
            .collect();
        for h in handles {
            let (s, m) = h.join().unwrap();
            assert_eq!(s, 6.0);
            assert_eq!(m, [2.0, 0.0]);
        }
    }

    #[test]
    fn consecutive_reductions_stay_separated() {
        let world = ThreadWorld::new(2);
        let handles: Vec<_> = (0..2)
            .map(|rank| {
                let comm = Arc::new(world.comm(rank));
                std::thread::spawn(move || {
                    let c = Collective::new(comm);
                    (0..10).map(|i| c.sum(i as f64)).collect::<Vec<_>>()
                })
            })
            .collect();
        for h in handles {
            let sums = h.join().unwrap();
            let expect: Vec<f64> = (0..10).map(|i| 2.0 * i as f64).collect();
            assert_eq!(sums, expect);
        }
    }
}
