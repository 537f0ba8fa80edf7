//! The pluggable computation strategy driven by the stepper.
//!
//! Stencil operators are pure per-tile functions: they see the tile, its
//! neighbors' edge slices, and the tile's position in the global grid,
//! and never touch the network. The stepper owns all orchestration; the
//! strategy owns the discretization.

pub mod donor_cell;

pub use donor_cell::DonorCell;

use crate::grid::{EdgeHalo, Partition, StencilHalo, Vel};

/// Size of the global interior grid (`i_max x j_max` cells inside the
/// one-cell ghost border).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DomainExtent {
    pub i_max: usize,
    pub j_max: usize,
}

/// Finite-difference operator set for one timestep.
///
/// All operators work on one tile at a time. Tiles carry their global
/// offset, and operators use it to decide which cells belong to the
/// domain boundary versus the interior. Halo arguments are the neighbor
/// slices obtained from the exchange protocol; for tiles on the domain
/// boundary the corresponding slices are zero dummies and are never read.
pub trait Discretization: Send + 'static {
    /// Impose velocity boundary conditions on a boundary-facing tile.
    fn apply_velocity_boundary(&self, uv: &mut Partition<Vel>, extent: DomainExtent);

    /// Momentum prediction: write FG from the velocity field.
    #[allow(clippy::too_many_arguments)]
    fn compute_momentum(
        &self,
        fg: &mut Partition<Vel>,
        uv: &Partition<Vel>,
        halo: &StencilHalo<Vel>,
        extent: DomainExtent,
        re: f64,
        dx: f64,
        dy: f64,
        dt: f64,
        alpha: f64,
    );

    /// Pressure-Poisson right-hand side from the momentum prediction.
    #[allow(clippy::too_many_arguments)]
    fn compute_rhs(
        &self,
        rhs: &mut Partition<f64>,
        fg: &Partition<Vel>,
        fg_left: &[Vel],
        fg_bottom: &[Vel],
        extent: DomainExtent,
        dx: f64,
        dy: f64,
        dt: f64,
    );

    /// Impose homogeneous Neumann pressure conditions on the ghost
    /// border.
    fn apply_pressure_boundary(&self, p: &mut Partition<f64>, extent: DomainExtent);

    /// One SOR relaxation sweep over the tile's interior cells.
    #[allow(clippy::too_many_arguments)]
    fn sor_sweep(
        &self,
        p: &mut Partition<f64>,
        halo: &EdgeHalo<f64>,
        rhs: &Partition<f64>,
        extent: DomainExtent,
        omega: f64,
        dx: f64,
        dy: f64,
    );

    /// This tile's contribution to the global squared residual.
    fn compute_residual(
        &self,
        p: &Partition<f64>,
        halo: &EdgeHalo<f64>,
        rhs: &Partition<f64>,
        extent: DomainExtent,
        dx: f64,
        dy: f64,
    ) -> f64;

    /// Correct velocities from the converged pressure field; returns the
    /// tile's `(max|u|, max|v|)` over the updated cells.
    #[allow(clippy::too_many_arguments)]
    fn update_velocity(
        &self,
        uv: &mut Partition<Vel>,
        p: &Partition<f64>,
        p_right: &[f64],
        p_top: &[f64],
        fg: &Partition<Vel>,
        extent: DomainExtent,
        dx: f64,
        dy: f64,
        dt: f64,
    ) -> (f64, f64);
}
