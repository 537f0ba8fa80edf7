//! Thin façade over intra-process (thread) or inter-process (MPI) message
//! passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees). All
//! handles are **waitable** but non-blocking — the halo and reduction
//! layers call `.wait()` before they trust that data has arrived.
//!
//! Tags are 64-bit so a step id can ride in the tag itself; see
//! [`crate::comm::tag`] for the encoding.

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    /// This endpoint's rank id.
    fn rank(&self) -> usize;
    /// Number of ranks in the world.
    fn size(&self) -> usize;

    /// Post `buf` toward `peer`; returns immediately.
    fn isend(&self, peer: usize, tag: u64, buf: &[u8]) -> Self::SendHandle;
    /// Post a receive of up to `len` bytes from `peer`; returns
    /// immediately.
    fn irecv(&self, peer: usize, tag: u64, len: usize) -> Self::RecvHandle;
}

/// Anything that can be waited on.
pub trait Wait {
    /// Block until completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Compile-time no-op comm for single-rank runs and pure serial unit
/// tests. Every neighbor lookup comes back empty, so nothing is ever
/// posted against it.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn isend(&self, _peer: usize, _tag: u64, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u64, _len: usize) {}
}

// --- ThreadComm: intra-process multi-rank ---

type Key = (usize, usize, u64); // (src, dst, tag)

/// Shared mailbox for all ranks running as threads of one process.
///
/// Step-indexed tags make every in-flight message's key unique, so a
/// plain insert/remove map is a faithful mailbox: at most one payload per
/// `(src, dst, tag)` is ever pending.
#[derive(Debug)]
pub struct ThreadWorld {
    size: usize,
    mailbox: DashMap<Key, Bytes>,
}

impl ThreadWorld {
    pub fn new(size: usize) -> Arc<Self> {
        assert!(size > 0, "world needs at least one rank");
        Arc::new(ThreadWorld {
            size,
            mailbox: DashMap::new(),
        })
    }

    /// The endpoint for `rank` in this world.
    pub fn comm(self: &Arc<Self>, rank: usize) -> ThreadComm {
        assert!(rank < self.size, "rank {rank} outside world of {}", self.size);
        ThreadComm {
            world: Arc::clone(self),
            rank,
        }
    }
}

/// One rank's endpoint into a [`ThreadWorld`].
#[derive(Clone, Debug)]
pub struct ThreadComm {
    world: Arc<ThreadWorld>,
    rank: usize,
}

/// Pending receive against a [`ThreadWorld`] mailbox.
pub struct ThreadRecv {
    world: Arc<ThreadWorld>,
    key: Key,
    len: usize,
}

impl Wait for ThreadRecv {
    fn wait(self) -> Option<Vec<u8>> {
        loop {
            if let Some((_, bytes)) = self.world.mailbox.remove(&self.key) {
                let take = self.len.min(bytes.len());
                return Some(bytes[..take].to_vec());
            }
            std::thread::yield_now();
        }
    }
}

impl Communicator for ThreadComm {
    type SendHandle = ();
    type RecvHandle = ThreadRecv;

    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.world.size
    }

    fn isend(&self, peer: usize, tag: u64, buf: &[u8]) {
        let key = (self.rank, peer, tag);
        let prior = self.world.mailbox.insert(key, Bytes::copy_from_slice(buf));
        debug_assert!(
            prior.is_none(),
            "tag {tag:#x} from {} to {peer} already pending",
            self.rank
        );
    }

    fn irecv(&self, peer: usize, tag: u64, len: usize) -> ThreadRecv {
        ThreadRecv {
            world: Arc::clone(&self.world),
            key: (peer, self.rank, tag),
            len,
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::Wait;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// One MPI process as a rank endpoint.
    ///
    /// Sends go out eagerly at `isend` time (halo payloads are small
    /// enough for MPI's eager protocol); receives are matched blocking
    /// receives performed at `wait` time, which preserves per-(peer,
    /// tag) ordering.
    pub struct MpiComm {
        world: SimpleCommunicator,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialize MPI and wrap the world communicator. The universe
        /// stays alive for the rest of the process.
        pub fn initialize() -> Self {
            let universe = mpi::initialize().expect("MPI initialization");
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            std::mem::forget(universe);
            MpiComm { world, rank, size }
        }

        // MPI tags are 31-bit; the step portion of a 64-bit tag is
        // masked down. Collisions would need 2^27 in-flight epochs on
        // one (peer, kind, direction) stream.
        fn mpi_tag(tag: u64) -> i32 {
            (tag & 0x7fff_ffff) as i32
        }
    }

    pub struct MpiRecv {
        world: SimpleCommunicator,
        peer: i32,
        tag: i32,
        len: usize,
    }

    impl Wait for MpiRecv {
        fn wait(self) -> Option<Vec<u8>> {
            let (data, _status) = self
                .world
                .process_at_rank(self.peer)
                .receive_vec_with_tag::<u8>(self.tag);
            let take = self.len.min(data.len());
            Some(data[..take].to_vec())
        }
    }

    impl super::Communicator for MpiComm {
        type SendHandle = ();
        type RecvHandle = MpiRecv;

        fn rank(&self) -> usize {
            self.rank
        }

        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u64, buf: &[u8]) {
            self.world
                .process_at_rank(peer as i32)
                .send_with_tag(buf, Self::mpi_tag(tag));
        }

        fn irecv(&self, peer: usize, tag: u64, len: usize) -> MpiRecv {
            MpiRecv {
                world: self.world.duplicate(),
                peer: peer as i32,
                tag: Self::mpi_tag(tag),
                len,
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;
