//! `Vel`: the vector-field cell value (staggered u/v pair).
//!
//! `Vel` is `#[repr(C)]` and `Pod` so that edge slices of velocity or
//! momentum tiles can cross rank boundaries as plain byte buffers without
//! any re-encoding, preserving IEEE-754 bits exactly.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// One staggered-grid velocity (or momentum) sample: `u` on the cell's
/// east face, `v` on its north face.
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Vel {
    pub u: f64,
    pub v: f64,
}

impl Vel {
    #[inline]
    pub const fn new(u: f64, v: f64) -> Self {
        Vel { u, v }
    }
}
