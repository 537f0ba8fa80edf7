//! Message tag encoding: `(field kind, direction, step id)` in one `u64`.
//!
//! The step id occupies the low bits, so for a fixed `(field, direction)`
//! channel every step produces a distinct tag and payloads from different
//! steps can never be confused, whatever the delivery order.

use crate::topology::Direction;

const STEP_BITS: u32 = 56;
const DIR_SHIFT: u32 = STEP_BITS;
const KIND_SHIFT: u32 = STEP_BITS + 3;

/// Which field a halo payload belongs to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum FieldKind {
    /// Pressure (scalar), exchanged every SOR iteration.
    Pressure = 0,
    /// Momentum prediction FG (vector), exchanged once per step.
    Momentum = 1,
    /// Velocity uv (vector), exchanged once per step, corners included.
    Velocity = 2,
}

/// The two legs of a coordinator all-reduce.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u8)]
pub(crate) enum ReducePhase {
    Contribute = 6,
    Publish = 7,
}

/// Tag for a halo payload. `dir` is the direction the *sender* states
/// relative to itself.
pub fn halo_tag(field: FieldKind, dir: Direction, step: u64) -> u64 {
    assert!(step < 1 << STEP_BITS, "step id overflows tag space");
    ((field as u64) << KIND_SHIFT) | ((dir.index() as u64) << DIR_SHIFT) | step
}

/// Tag for one leg of an epoch's all-reduce.
pub(crate) fn reduce_tag(phase: ReducePhase, epoch: u64) -> u64 {
    assert!(epoch < 1 << STEP_BITS, "reduce epoch overflows tag space");
    ((phase as u64) << KIND_SHIFT) | epoch
}
