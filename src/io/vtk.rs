//! Snapshot output: the writer seam and a legacy ASCII VTK writer.
//!
//! The stepper reassembles each rank's owned tiles into a [`Snapshot`]
//! and hands it to a [`SnapshotSink`] at the configured cadence. The
//! bundled writer targets legacy ASCII VTK `STRUCTURED_POINTS` files,
//! one per rank per emission; anything fancier lives outside the core.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::grid::Vel;
use crate::solver_error::SolverError;

/// One rank's owned field data at an output instant, row-major by `j`.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub step: usize,
    pub time: f64,
    pub dx: f64,
    pub dy: f64,
    /// Global coordinates of the first owned cell.
    pub origin: (i64, i64),
    /// Owned cells in x and y.
    pub nx: usize,
    pub ny: usize,
    pub pressure: Vec<f64>,
    pub velocity: Vec<Vel>,
}

/// Consumer of per-cadence snapshots.
///
/// The stepper hands over a fully assembled copy and moves on; a sink
/// may defer the actual I/O so output never holds up the next step.
pub trait SnapshotSink: Send {
    fn write(&mut self, snapshot: &Snapshot) -> Result<(), SolverError>;
}

/// Legacy ASCII VTK writer, one `STRUCTURED_POINTS` file per snapshot.
#[derive(Debug)]
pub struct VtkWriter {
    dir: PathBuf,
    prefix: String,
    rank: usize,
    emitted: usize,
}

impl VtkWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, rank: usize) -> Self {
        VtkWriter {
            dir: dir.into(),
            prefix: prefix.into(),
            rank,
            emitted: 0,
        }
    }
}

impl SnapshotSink for VtkWriter {
    fn write(&mut self, snap: &Snapshot) -> Result<(), SolverError> {
        assert_eq!(snap.pressure.len(), snap.nx * snap.ny, "snapshot shape");
        assert_eq!(snap.velocity.len(), snap.nx * snap.ny, "snapshot shape");

        std::fs::create_dir_all(&self.dir)?;
        let path = self
            .dir
            .join(format!("{}_{}_{:05}.vtk", self.prefix, self.rank, self.emitted));
        let mut w = BufWriter::new(File::create(path)?);

        writeln!(w, "# vtk DataFile Version 3.0")?;
        writeln!(w, "step {} time {:.6}", snap.step, snap.time)?;
        writeln!(w, "ASCII")?;
        writeln!(w, "DATASET STRUCTURED_POINTS")?;
        writeln!(w, "DIMENSIONS {} {} 1", snap.nx, snap.ny)?;
        writeln!(
            w,
            "ORIGIN {} {} 0",
            snap.origin.0 as f64 * snap.dx,
            snap.origin.1 as f64 * snap.dy
        )?;
        writeln!(w, "SPACING {} {} 1", snap.dx, snap.dy)?;
        writeln!(w, "POINT_DATA {}", snap.nx * snap.ny)?;

        writeln!(w, "SCALARS pressure double 1")?;
        writeln!(w, "LOOKUP_TABLE default")?;
        for value in &snap.pressure {
            writeln!(w, "{value}")?;
        }

        writeln!(w, "VECTORS velocity double")?;
        for cell in &snap.velocity {
            writeln!(w, "{} {} 0", cell.u, cell.v)?;
        }

        w.flush()?;
        self.emitted += 1;
        Ok(())
    }
}
