//! Small shared utilities.

pub mod cancellation;

pub use cancellation::CancellationToken;
