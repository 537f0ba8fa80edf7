//! The stepper: per-timestep orchestration of one rank.
//!
//! The stepper owns all tile grids and halo channels of its rank and
//! drives the timestep cycle in lockstep with every other rank:
//! boundary conditions, momentum prediction, momentum halo exchange,
//! pressure right-hand side, the SOR inner loop (one global residual
//! reduction and one pressure halo exchange per iteration), velocity
//! update, velocity halo exchange, and the CFL reduction that picks the
//! next timestep.
//!
//! Halo latency is one step: the velocity exchange issued at the end of
//! step `s` provides the neighbor slices the momentum prediction of step
//! `s + 1` consumes, and setup primes the exchange for the first step.
//! Per-field epoch counters never reset, so step ids on every channel
//! are strictly increasing over the whole run.

pub mod geometry;

pub use geometry::RankGeometry;

use std::sync::Arc;

use log::{info, warn};

use crate::comm::{Collective, Communicator, FieldKind, HaloLinks, NeighborRegistry};
use crate::grid::{TileGrid, Vel};
use crate::io::config::Config;
use crate::io::vtk::{Snapshot, SnapshotSink};
use crate::physics::Discretization;
use crate::solver_error::SolverError;
use crate::topology::Direction;
use crate::util::CancellationToken;

/// Globally agreed results of one timestep.
#[derive(Copy, Clone, Debug, Default)]
pub struct StepOutcome {
    pub max_u: f64,
    pub max_v: f64,
    pub sor_iters: usize,
    pub residual: f64,
}

/// What one rank did over a whole run.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub rank: usize,
    pub steps: usize,
    pub t_final: f64,
    pub dt_next: f64,
    pub last: StepOutcome,
    pub cancelled: bool,
}

/// One rank's solver instance.
pub struct Stepper<C: Communicator, D: Discretization> {
    cfg: Config,
    geom: RankGeometry,
    strategy: D,
    collective: Collective<C>,
    uv_links: HaloLinks<Vel, C>,
    fg_links: HaloLinks<Vel, C>,
    p_links: HaloLinks<f64, C>,
    uv: TileGrid<Vel>,
    fg: TileGrid<Vel>,
    p: TileGrid<f64>,
    rhs: TileGrid<f64>,
    cancel: CancellationToken,
    sink: Option<Box<dyn SnapshotSink>>,
    uv_epoch: u64,
    fg_epoch: u64,
    p_epoch: u64,
}

impl<C: Communicator, D: Discretization> std::fmt::Debug for Stepper<C, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stepper")
            .field("geom", &self.geom)
            .field("uv_epoch", &self.uv_epoch)
            .field("fg_epoch", &self.fg_epoch)
            .field("p_epoch", &self.p_epoch)
            .finish_non_exhaustive()
    }
}

impl<C: Communicator, D: Discretization> Stepper<C, D> {
    /// Set up one rank: derive geometry, allocate all tile grids, and
    /// resolve neighbor channels. Fails fatally on invalid geometry.
    pub fn new(cfg: Config, comm: Arc<C>, strategy: D) -> Result<Self, SolverError> {
        cfg.validate()?;
        if comm.size() != cfg.num_ranks() {
            return Err(SolverError::RankGridMismatch {
                nx: cfg.num_ranks_x,
                ny: cfg.num_ranks_y,
                nz: 1,
                num_ranks: comm.size(),
            });
        }
        let geom = RankGeometry::derive(&cfg, comm.rank())?;
        let registry = NeighborRegistry::resolve(&geom.rank_grid, comm.rank())?;

        let uv_links = HaloLinks::new(&comm, FieldKind::Velocity, &registry, |d| geom.edge_len(d));
        let fg_links = HaloLinks::new(&comm, FieldKind::Momentum, &registry, |d| geom.edge_len(d));
        let p_links = HaloLinks::new(&comm, FieldKind::Pressure, &registry, |d| geom.edge_len(d));

        let (base_i, base_j) = geom.base_offsets();
        let (np_x, np_y) = (geom.np_x, geom.np_y);
        let (cells_x, cells_y) = (geom.cells_x, geom.cells_y);
        let uv = TileGrid::<Vel>::new(np_x, np_y, cells_x, cells_y, base_i, base_j);
        let fg = TileGrid::<Vel>::new(np_x, np_y, cells_x, cells_y, base_i, base_j);
        let p = TileGrid::<f64>::new(np_x, np_y, cells_x, cells_y, base_i, base_j);
        let rhs = TileGrid::<f64>::new(np_x, np_y, cells_x, cells_y, base_i, base_j);

        info!(
            "stepper on rank {} with {}x{} tiles of {}x{} cells, dx={} dy={}",
            geom.rank,
            geom.np_x - 2,
            geom.np_y - 2,
            geom.cells_x,
            geom.cells_y,
            geom.dx,
            geom.dy,
        );

        Ok(Stepper {
            cfg,
            strategy,
            collective: Collective::new(Arc::clone(&comm)),
            uv_links,
            fg_links,
            p_links,
            uv,
            fg,
            p,
            rhs,
            geom,
            cancel: CancellationToken::new(),
            sink: None,
            uv_epoch: 0,
            fg_epoch: 0,
            p_epoch: 0,
        })
    }

    /// Attach a snapshot sink; snapshots are emitted every
    /// `output_skip_size` steps.
    pub fn with_sink(mut self, sink: Box<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Use `token` instead of this stepper's own cancellation flag. In a
    /// multi-rank run the same flag must be raised on every rank: a rank
    /// that stops alone stalls its neighbors' receives.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that stops the run after the current step completes.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn geometry(&self) -> &RankGeometry {
        &self.geom
    }

    /// Read access to the velocity tile grid (owned tiles plus halo
    /// ring), e.g. for coupling or inspection between steps.
    pub fn velocity(&self) -> &TileGrid<Vel> {
        &self.uv
    }

    /// Read access to the pressure tile grid.
    pub fn pressure(&self) -> &TileGrid<f64> {
        &self.p
    }

    /// Drive timesteps until `t_end`, the step cap, or cancellation.
    pub fn run(&mut self) -> Result<RunSummary, SolverError> {
        if self.cfg.output_skip_size != 0 {
            self.emit(0, 0.0)?;
        }
        // Prime the velocity halos the first momentum prediction reads.
        self.exchange_velocity();

        let mut t = 0.0;
        let mut dt = self.cfg.dt0;
        let mut step = 1usize;
        let mut last = StepOutcome::default();
        let mut cancelled = false;

        while t + dt < self.cfg.t_end {
            if self.cfg.max_timesteps != 0 && step > self.cfg.max_timesteps {
                break;
            }
            if self.cancel.was_cancelled() {
                cancelled = true;
                break;
            }

            last = self.do_timestep(dt);
            t += dt;
            dt = cfl_timestep(
                self.cfg.tau,
                self.cfg.re,
                self.geom.dx,
                self.geom.dy,
                last.max_u,
                last.max_v,
            );

            if self.cfg.output_skip_size != 0 && step % self.cfg.output_skip_size == 0 {
                info!(
                    "rank {}: t {:.5} | dt {:.6} | sor iterations {} | residual {:.3e}",
                    self.geom.rank, t, dt, last.sor_iters, last.residual,
                );
                self.emit(step, t)?;
            }
            step += 1;
        }

        Ok(RunSummary {
            rank: self.geom.rank,
            steps: step - 1,
            t_final: t,
            dt_next: dt,
            last,
            cancelled,
        })
    }

    /// One full timestep. Velocity halos for the momentum prediction were
    /// exchanged at the end of the previous step (or primed at startup).
    pub fn do_timestep(&mut self, dt: f64) -> StepOutcome {
        let extent = self.geom.extent;
        let (dx, dy) = (self.geom.dx, self.geom.dy);
        let (re, alpha) = (self.cfg.re, self.cfg.alpha);
        let tiles: Vec<(usize, usize)> = self.uv.interior().collect();

        for &(k, l) in &tiles {
            self.strategy
                .apply_velocity_boundary(self.uv.tile_mut(k, l), extent);
        }

        for &(k, l) in &tiles {
            let halo = self.uv.stencil_halo(k, l);
            self.strategy.compute_momentum(
                self.fg.tile_mut(k, l),
                self.uv.tile(k, l),
                &halo,
                extent,
                re,
                dx,
                dy,
                dt,
                alpha,
            );
        }
        self.exchange_momentum();

        for &(k, l) in &tiles {
            let fg_left = self.fg.neighbor_slice(k, l, Direction::Left);
            let fg_bottom = self.fg.neighbor_slice(k, l, Direction::Bottom);
            self.strategy.compute_rhs(
                self.rhs.tile_mut(k, l),
                self.fg.tile(k, l),
                &fg_left,
                &fg_bottom,
                extent,
                dx,
                dy,
                dt,
            );
        }

        let (sor_iters, residual) = self.solve_pressure(&tiles);

        let mut max_u = 0.0f64;
        let mut max_v = 0.0f64;
        for &(k, l) in &tiles {
            let p_right = self.p.neighbor_slice(k, l, Direction::Right);
            let p_top = self.p.neighbor_slice(k, l, Direction::Top);
            let (mu, mv) = self.strategy.update_velocity(
                self.uv.tile_mut(k, l),
                self.p.tile(k, l),
                &p_right,
                &p_top,
                self.fg.tile(k, l),
                extent,
                dx,
                dy,
                dt,
            );
            max_u = max_u.max(mu);
            max_v = max_v.max(mv);
        }
        self.exchange_velocity();

        let [max_u, max_v] = self.collective.max_pair([max_u, max_v]);
        StepOutcome {
            max_u,
            max_v,
            sor_iters,
            residual,
        }
    }

    /// The SOR inner loop: sweep, reduce the residual globally, exchange
    /// pressure halos; at least one sweep always runs. Hitting the
    /// iteration cap is reported, not fatal.
    fn solve_pressure(&mut self, tiles: &[(usize, usize)]) -> (usize, f64) {
        let extent = self.geom.extent;
        let (dx, dy) = (self.geom.dx, self.geom.dy);
        let omega = self.cfg.omega;
        let num_cells = (extent.i_max * extent.j_max) as f64;

        let mut iter = 0usize;
        let mut residual;
        loop {
            for &(k, l) in tiles {
                self.strategy
                    .apply_pressure_boundary(self.p.tile_mut(k, l), extent);
            }
            for &(k, l) in tiles {
                let halo = self.p.edge_halo(k, l);
                self.strategy.sor_sweep(
                    self.p.tile_mut(k, l),
                    &halo,
                    self.rhs.tile(k, l),
                    extent,
                    omega,
                    dx,
                    dy,
                );
            }
            let mut local = 0.0;
            for &(k, l) in tiles {
                let halo = self.p.edge_halo(k, l);
                local += self.strategy.compute_residual(
                    self.p.tile(k, l),
                    &halo,
                    self.rhs.tile(k, l),
                    extent,
                    dx,
                    dy,
                );
            }
            self.exchange_pressure();
            residual = self.collective.sum(local) / num_cells;
            iter += 1;
            if residual <= self.cfg.eps_sq || iter >= self.cfg.iter_max {
                break;
            }
        }
        if residual > self.cfg.eps_sq {
            warn!(
                "rank {}: pressure iteration stopped at cap {} with residual {:.3e} (eps_sq {:.3e})",
                self.geom.rank, iter, residual, self.cfg.eps_sq,
            );
        }
        (iter, residual)
    }

    /// Exchange pressure edges with all four orthogonal neighbors.
    fn exchange_pressure(&mut self) {
        let epoch = self.p_epoch;
        self.p_epoch += 1;
        let (np_x, np_y) = (self.p.np_x(), self.p.np_y());

        for l in 1..np_y - 1 {
            let step = epoch * np_y as u64 + l as u64;
            send_edge(&self.p, &self.p_links, Direction::Left, l, step);
            send_edge(&self.p, &self.p_links, Direction::Right, l, step);
        }
        for k in 1..np_x - 1 {
            let step = epoch * np_x as u64 + k as u64;
            send_edge(&self.p, &self.p_links, Direction::Bottom, k, step);
            send_edge(&self.p, &self.p_links, Direction::Top, k, step);
        }

        for l in 1..np_y - 1 {
            let step = epoch * np_y as u64 + l as u64;
            recv_edge(&mut self.p, &self.p_links, Direction::Left, l, step);
            recv_edge(&mut self.p, &self.p_links, Direction::Right, l, step);
        }
        for k in 1..np_x - 1 {
            let step = epoch * np_x as u64 + k as u64;
            recv_edge(&mut self.p, &self.p_links, Direction::Bottom, k, step);
            recv_edge(&mut self.p, &self.p_links, Direction::Top, k, step);
        }
    }

    /// Exchange the momentum edges the right-hand side depends on: each
    /// rank sends right/top and receives left/bottom.
    fn exchange_momentum(&mut self) {
        let epoch = self.fg_epoch;
        self.fg_epoch += 1;
        let (np_x, np_y) = (self.fg.np_x(), self.fg.np_y());

        for l in 1..np_y - 1 {
            let step = epoch * np_y as u64 + l as u64;
            send_edge(&self.fg, &self.fg_links, Direction::Right, l, step);
        }
        for k in 1..np_x - 1 {
            let step = epoch * np_x as u64 + k as u64;
            send_edge(&self.fg, &self.fg_links, Direction::Top, k, step);
        }

        for l in 1..np_y - 1 {
            let step = epoch * np_y as u64 + l as u64;
            recv_edge(&mut self.fg, &self.fg_links, Direction::Left, l, step);
        }
        for k in 1..np_x - 1 {
            let step = epoch * np_x as u64 + k as u64;
            recv_edge(&mut self.fg, &self.fg_links, Direction::Bottom, k, step);
        }
    }

    /// Exchange velocity edges with all four orthogonal neighbors and the
    /// four corner points the momentum stencil reaches.
    fn exchange_velocity(&mut self) {
        let epoch = self.uv_epoch;
        self.uv_epoch += 1;
        let (np_x, np_y) = (self.uv.np_x(), self.uv.np_y());

        for l in 1..np_y - 1 {
            let step = epoch * np_y as u64 + l as u64;
            send_edge(&self.uv, &self.uv_links, Direction::Left, l, step);
            send_edge(&self.uv, &self.uv_links, Direction::Right, l, step);
        }
        for k in 1..np_x - 1 {
            let step = epoch * np_x as u64 + k as u64;
            send_edge(&self.uv, &self.uv_links, Direction::Bottom, k, step);
            send_edge(&self.uv, &self.uv_links, Direction::Top, k, step);
        }
        for corner in Direction::CORNERS {
            send_edge(&self.uv, &self.uv_links, corner, 0, epoch);
        }

        for l in 1..np_y - 1 {
            let step = epoch * np_y as u64 + l as u64;
            recv_edge(&mut self.uv, &self.uv_links, Direction::Left, l, step);
            recv_edge(&mut self.uv, &self.uv_links, Direction::Right, l, step);
        }
        for k in 1..np_x - 1 {
            let step = epoch * np_x as u64 + k as u64;
            recv_edge(&mut self.uv, &self.uv_links, Direction::Bottom, k, step);
            recv_edge(&mut self.uv, &self.uv_links, Direction::Top, k, step);
        }
        for corner in Direction::CORNERS {
            recv_edge(&mut self.uv, &self.uv_links, corner, 0, epoch);
        }
    }

    /// Reassemble the rank's owned cells into one snapshot.
    fn assemble_snapshot(&self, step: usize, time: f64) -> Snapshot {
        let (nx, ny) = self.geom.owned_cells();
        let (cells_x, cells_y) = (self.geom.cells_x, self.geom.cells_y);
        let mut pressure = vec![0.0; nx * ny];
        let mut velocity = vec![Vel::default(); nx * ny];
        for (k, l) in self.p.interior() {
            for j in 0..cells_y {
                for i in 0..cells_x {
                    let x = (k - 1) * cells_x + i;
                    let y = (l - 1) * cells_y + j;
                    pressure[y * nx + x] = self.p.tile(k, l).get(i, j);
                    velocity[y * nx + x] = self.uv.tile(k, l).get(i, j);
                }
            }
        }
        Snapshot {
            step,
            time,
            dx: self.geom.dx,
            dy: self.geom.dy,
            origin: self.geom.base_offsets(),
            nx,
            ny,
            pressure,
            velocity,
        }
    }

    fn emit(&mut self, step: usize, time: f64) -> Result<(), SolverError> {
        if self.sink.is_none() {
            return Ok(());
        }
        let snapshot = self.assemble_snapshot(step, time);
        if let Some(sink) = self.sink.as_mut() {
            sink.write(&snapshot)?;
        }
        Ok(())
    }
}

/// Next stable timestep from the CFL bound:
/// `tau * min(Re/2 * 1/(1/dx^2 + 1/dy^2), dx/max|u|, dy/max|v|)`.
/// A vanished velocity component leaves its bound inactive.
pub fn cfl_timestep(tau: f64, re: f64, dx: f64, dy: f64, max_u: f64, max_v: f64) -> f64 {
    let diffusive = re / 2.0 / (1.0 / (dx * dx) + 1.0 / (dy * dy));
    let convective_x = if max_u > 0.0 { dx / max_u } else { f64::INFINITY };
    let convective_y = if max_v > 0.0 { dy / max_v } else { f64::INFINITY };
    tau * diffusive.min(convective_x).min(convective_y)
}

fn send_edge<V, C>(grid: &TileGrid<V>, links: &HaloLinks<V, C>, dir: Direction, t: usize, step: u64)
where
    V: bytemuck::Pod + Default,
    C: Communicator,
{
    let slice = grid.edge_source(dir, t).extract_edge(dir);
    links.channel(dir).send(step, &slice);
}

fn recv_edge<V, C>(
    grid: &mut TileGrid<V>,
    links: &HaloLinks<V, C>,
    slot: Direction,
    t: usize,
    step: u64,
) where
    V: bytemuck::Pod + Default,
    C: Communicator,
{
    let slice = links.channel(slot).receive(step);
    grid.inject_ring(slot, t, &slice);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::NoComm;
    use crate::physics::DonorCell;

    fn serial_cfg() -> Config {
        Config {
            i_max: 4,
            j_max: 4,
            x_length: 1.0,
            y_length: 1.0,
            iter_max: 50,
            t_end: 10.0,
            dt0: 0.01,
            max_timesteps: 2,
            ..Config::default()
        }
    }

    #[test]
    fn setup_rejects_mismatched_world() {
        let cfg = Config {
            num_ranks_x: 2,
            num_ranks_y: 2,
            ..serial_cfg()
        };
        let err = Stepper::new(cfg, Arc::new(NoComm), DonorCell::default()).unwrap_err();
        assert!(matches!(err, SolverError::RankGridMismatch { .. }));
    }

    #[test]
    fn serial_lid_cavity_converges_per_step() {
        let mut stepper =
            Stepper::new(serial_cfg(), Arc::new(NoComm), DonorCell::default()).unwrap();
        let summary = stepper.run().unwrap();
        assert_eq!(summary.steps, 2);
        assert!(summary.last.sor_iters <= 50);
        assert!(
            summary.last.residual <= 1e-4,
            "residual {} above tolerance",
            summary.last.residual
        );
        // The lid drags fluid; the velocity maximum is bounded by it.
        assert!(summary.last.max_u > 0.0 && summary.last.max_u < 2.0);
    }

    #[test]
    fn cancellation_stops_between_steps() {
        let mut stepper = Stepper::new(
            Config {
                max_timesteps: 0,
                t_end: 1e6,
                ..serial_cfg()
            },
            Arc::new(NoComm),
            DonorCell::default(),
        )
        .unwrap();
        stepper.cancellation_token().cancel();
        let summary = stepper.run().unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.steps, 0);
    }

    #[test]
    fn cfl_respects_every_bound() {
        let dt = cfl_timestep(0.5, 100.0, 0.25, 0.2, 2.0, 0.5);
        assert!(dt <= 0.5 * 0.25 / 2.0 + 1e-15);
        assert!(dt <= 0.5 * 0.2 / 0.5 + 1e-15);
        assert!(dt <= 0.5 * 50.0 / (1.0 / 0.0625 + 1.0 / 0.04) + 1e-15);
    }

    #[test]
    fn cfl_ignores_vanished_velocities() {
        let diffusive_only = cfl_timestep(0.5, 100.0, 0.25, 0.25, 0.0, 0.0);
        assert_eq!(diffusive_only, 0.5 * 50.0 / (2.0 / 0.0625));
    }
}
