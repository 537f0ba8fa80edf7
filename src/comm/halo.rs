//! Step-indexed halo channels.
//!
//! A [`HaloChannel`] is the mailbox for one `(field, direction)` pair:
//! non-blocking `send` toward the neighbor in that direction, blocking
//! `receive` of the neighbor's mirrored payload. Step ids must strictly
//! increase per channel; reusing one is a fatal assertion — it indicates
//! a broken exchange protocol, not a transient condition.
//!
//! The tag carries `(field, sender direction, step)`, so a payload for
//! step `s` can never satisfy a receive for step `s' != s` regardless of
//! delivery order.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use bytemuck::Pod;
use log::debug;

use crate::comm::communicator::{Communicator, Wait};
use crate::comm::registry::NeighborRegistry;
use crate::comm::tag::{halo_tag, FieldKind};
use crate::topology::{Direction, NUM_DIRECTIONS};

/// Mailbox for one `(field, direction)` pair of one rank.
pub struct HaloChannel<V, C: Communicator> {
    comm: Arc<C>,
    field: FieldKind,
    /// The neighbor slot this channel serves, relative to this rank.
    dir: Direction,
    peer: Option<usize>,
    len: usize,
    last_sent: Cell<Option<u64>>,
    last_received: Cell<Option<u64>>,
    _values: PhantomData<fn() -> V>,
}

impl<V: Pod + Default, C: Communicator> HaloChannel<V, C> {
    pub fn new(comm: Arc<C>, field: FieldKind, dir: Direction, peer: Option<usize>, len: usize) -> Self {
        HaloChannel {
            comm,
            field,
            dir,
            peer,
            len,
            last_sent: Cell::new(None),
            last_received: Cell::new(None),
            _values: PhantomData,
        }
    }

    #[inline]
    pub fn has_neighbor(&self) -> bool {
        self.peer.is_some()
    }

    /// Payload length in values (edge cell count; 1 for corners).
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Dispatch `slice` toward the neighbor, tagged with `step`. No-op
    /// without a neighbor. Non-blocking.
    pub fn send(&self, step: u64, slice: &[V]) {
        let Some(peer) = self.peer else { return };
        assert_eq!(slice.len(), self.len, "send slice length on {:?}", self.dir);
        Self::advance(&self.last_sent, step, "send", self.field, self.dir);
        let tag = halo_tag(self.field, self.dir, step);
        debug!("halo send {:?}/{:?} step {step} -> rank {peer}", self.field, self.dir);
        let _ = self.comm.isend(peer, tag, bytemuck::cast_slice(slice));
    }

    /// Block until the payload tagged `step` arrives from the neighbor
    /// and return it. Without a neighbor, returns a zero-filled dummy of
    /// the channel's length immediately.
    pub fn receive(&self, step: u64) -> Vec<V> {
        let Some(peer) = self.peer else {
            return vec![V::default(); self.len];
        };
        Self::advance(&self.last_received, step, "receive", self.field, self.dir);
        // The sender states the direction relative to itself.
        let tag = halo_tag(self.field, self.dir.mirror(), step);
        let handle = self.comm.irecv(peer, tag, self.len * size_of::<V>());
        let bytes = handle
            .wait()
            .expect("halo receive completed without a payload");
        assert_eq!(
            bytes.len(),
            self.len * size_of::<V>(),
            "halo payload size on {:?}",
            self.dir
        );
        debug!("halo recv {:?}/{:?} step {step} <- rank {peer}", self.field, self.dir);
        bytemuck::pod_collect_to_vec(&bytes)
    }

    fn advance(cell: &Cell<Option<u64>>, step: u64, what: &str, field: FieldKind, dir: Direction) {
        let prev = cell.get();
        assert!(
            prev.is_none_or(|p| step > p),
            "{what} on {field:?}/{dir:?} reuses step {step} (last was {prev:?})"
        );
        cell.set(Some(step));
    }
}

/// The eight-direction channel set for one field of one rank.
pub struct HaloLinks<V, C: Communicator> {
    channels: [HaloChannel<V, C>; NUM_DIRECTIONS],
}

impl<V: Pod + Default, C: Communicator> HaloLinks<V, C> {
    /// Build all eight channels from the resolved registry. `edge_len`
    /// maps a direction to its payload length.
    pub fn new(
        comm: &Arc<C>,
        field: FieldKind,
        registry: &NeighborRegistry,
        edge_len: impl Fn(Direction) -> usize,
    ) -> Self {
        HaloLinks {
            channels: Direction::ALL.map(|dir| {
                HaloChannel::new(
                    Arc::clone(comm),
                    field,
                    dir,
                    registry.address(dir),
                    edge_len(dir),
                )
            }),
        }
    }

    #[inline]
    pub fn channel(&self, dir: Direction) -> &HaloChannel<V, C> {
        &self.channels[dir.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::communicator::{NoComm, ThreadWorld};

    fn pair(len: usize) -> (HaloChannel<f64, crate::comm::communicator::ThreadComm>, HaloChannel<f64, crate::comm::communicator::ThreadComm>) {
        // Rank 0 with rank 1 to its right; rank 1 sees rank 0 to its left.
        let world = ThreadWorld::new(2);
        let right = HaloChannel::new(Arc::new(world.comm(0)), FieldKind::Pressure, Direction::Right, Some(1), len);
        let left = HaloChannel::new(Arc::new(world.comm(1)), FieldKind::Pressure, Direction::Left, Some(0), len);
        (right, left)
    }

    #[test]
    fn send_receive_pairs_by_step() {
        let (tx, rx) = pair(3);
        tx.send(1, &[1.0, 2.0, 3.0]);
        tx.send(2, &[4.0, 5.0, 6.0]);
        // Receives pair by step id even though both are already pending.
        assert_eq!(rx.receive(1), vec![1.0, 2.0, 3.0]);
        assert_eq!(rx.receive(2), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn missing_neighbor_yields_zero_dummy() {
        let ch: HaloChannel<f64, NoComm> =
            HaloChannel::new(Arc::new(NoComm), FieldKind::Velocity, Direction::Top, None, 4);
        ch.send(1, &[9.0; 4]); // swallowed
        assert_eq!(ch.receive(1), vec![0.0; 4]);
    }

    #[test]
    #[should_panic(expected = "reuses step")]
    fn receiving_a_consumed_step_is_fatal() {
        let (tx, rx) = pair(1);
        tx.send(5, &[1.0]);
        let _ = rx.receive(5);
        let _ = rx.receive(5);
    }

    #[test]
    #[should_panic(expected = "reuses step")]
    fn step_ids_must_increase() {
        let (tx, _rx) = pair(1);
        tx.send(5, &[1.0]);
        tx.send(4, &[2.0]);
    }
}
