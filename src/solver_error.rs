//! SolverError: unified error type for flowstep public APIs.
//!
//! Setup and I/O failures are reported through this enum so callers can
//! propagate them with `?`. Protocol violations (step-id reuse on a halo
//! channel, injection into an owned tile) are *not* represented here: they
//! indicate a broken invariant rather than a recoverable condition and are
//! raised as fatal assertions at the violation site.

use thiserror::Error;

/// Unified error type for solver setup and orchestration.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolverError {
    /// The requested rank topology does not match the number of ranks.
    #[error("rank grid {nx}x{ny}x{nz} does not cover {num_ranks} ranks")]
    RankGridMismatch {
        nx: usize,
        ny: usize,
        nz: usize,
        num_ranks: usize,
    },
    /// The global grid cannot be divided evenly among ranks or tiles.
    #[error("cannot partition {cells} cells along {axis} into {chunks} chunks of equal size")]
    IndivisibleGrid {
        axis: char,
        cells: usize,
        chunks: usize,
    },
    /// A partition would be too narrow to hold both a boundary cell and its
    /// interior mirror cell.
    #[error("partition of {cells} cells along {axis} is below the minimum of {min}")]
    PartitionTooSmall {
        axis: char,
        cells: usize,
        min: usize,
    },
    /// A configuration parameter is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidParameter(String),
    /// Rank id outside the rank grid.
    #[error("rank {rank} outside rank grid of {size} ranks")]
    RankOutOfRange { rank: usize, size: usize },
    /// Failure while parsing a configuration file.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Failure while writing snapshot output.
    #[error("snapshot I/O error: {0}")]
    SnapshotIo(String),
    /// A rank worker thread terminated abnormally.
    #[error("rank {0} terminated abnormally")]
    RankFailed(usize),
}

impl From<std::io::Error> for SolverError {
    fn from(err: std::io::Error) -> Self {
        SolverError::SnapshotIo(err.to_string())
    }
}
