//! Donor-cell discretization: the production strategy.
//!
//! Central differences blended with donor-cell upwinding (factor `alpha`)
//! for the convective terms, SOR for the pressure-Poisson equation, and
//! wall/lid velocity boundary conditions driven by configured tangential
//! wall speeds. Velocities live on a staggered grid: `u` on east faces,
//! `v` on north faces.

use crate::grid::{EdgeHalo, Partition, StencilHalo, Vel};
use crate::io::config::WallVelocities;
use crate::physics::{Discretization, DomainExtent};

/// The single production [`Discretization`].
#[derive(Clone, Debug, Default)]
pub struct DonorCell {
    walls: WallVelocities,
}

impl DonorCell {
    pub fn new(walls: WallVelocities) -> Self {
        DonorCell { walls }
    }
}

/// Read access to a tile extended one cell beyond each edge via halo
/// slices. Corner reads are only legal when built from a
/// [`StencilHalo`].
struct GhostView<'a, V> {
    tile: &'a Partition<V>,
    nx: isize,
    ny: isize,
    left: &'a [V],
    right: &'a [V],
    bottom: &'a [V],
    top: &'a [V],
    bottom_right: Option<V>,
    top_left: Option<V>,
}

impl<'a, V: Copy + Default> GhostView<'a, V> {
    fn edges(tile: &'a Partition<V>, halo: &'a EdgeHalo<V>) -> Self {
        GhostView {
            tile,
            nx: tile.nx() as isize,
            ny: tile.ny() as isize,
            left: &halo.left,
            right: &halo.right,
            bottom: &halo.bottom,
            top: &halo.top,
            bottom_right: None,
            top_left: None,
        }
    }

    fn stencil(tile: &'a Partition<V>, halo: &'a StencilHalo<V>) -> Self {
        GhostView {
            bottom_right: Some(halo.bottom_right),
            top_left: Some(halo.top_left),
            ..Self::edges(tile, &halo.edge)
        }
    }

    #[inline]
    fn at(&self, i: isize, j: isize) -> V {
        if i == -1 && j == self.ny {
            return self.top_left.expect("stencil reached an unprovided corner");
        }
        if i == self.nx && j == -1 {
            return self.bottom_right.expect("stencil reached an unprovided corner");
        }
        if i == -1 {
            return self.left[j as usize];
        }
        if i == self.nx {
            return self.right[j as usize];
        }
        if j == -1 {
            return self.bottom[i as usize];
        }
        if j == self.ny {
            return self.top[i as usize];
        }
        self.tile.get(i as usize, j as usize)
    }
}

impl Discretization for DonorCell {
    fn apply_velocity_boundary(&self, uv: &mut Partition<Vel>, extent: DomainExtent) {
        let (gi0, gj0) = uv.global_offset();
        let (nx, ny) = (uv.nx(), uv.ny());
        let i_max = extent.i_max as i64;
        let j_max = extent.j_max as i64;

        // Vertical walls first, then horizontal: the horizontal pass may
        // read vertical-wall values in the domain corners.
        for j in 0..ny {
            for i in 0..nx {
                let gi = gi0 + i as i64;
                if gi == 0 {
                    let inner = uv.get(i + 1, j);
                    uv.set(i, j, Vel::new(0.0, 2.0 * self.walls.v_left - inner.v));
                } else if gi == i_max {
                    let v = uv.get(i, j).v;
                    uv.set(i, j, Vel::new(0.0, v));
                } else if gi == i_max + 1 {
                    let inner = uv.get(i - 1, j);
                    uv.set(i, j, Vel::new(0.0, 2.0 * self.walls.v_right - inner.v));
                }
            }
        }
        for j in 0..ny {
            for i in 0..nx {
                let gj = gj0 + j as i64;
                if gj == 0 {
                    let inner = uv.get(i, j + 1);
                    uv.set(i, j, Vel::new(2.0 * self.walls.u_bottom - inner.u, 0.0));
                } else if gj == j_max {
                    let u = uv.get(i, j).u;
                    uv.set(i, j, Vel::new(u, 0.0));
                } else if gj == j_max + 1 {
                    let inner = uv.get(i, j - 1);
                    uv.set(i, j, Vel::new(2.0 * self.walls.u_top - inner.u, 0.0));
                }
            }
        }
    }

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
    ) {
        let view = GhostView::stencil(uv, halo);
        let u = |i: isize, j: isize| view.at(i, j).u;
        let v = |i: isize, j: isize| view.at(i, j).v;

        let (gi0, gj0) = uv.global_offset();
        let (nx, ny) = (uv.nx(), uv.ny());
        let i_max = extent.i_max as i64;
        let j_max = extent.j_max as i64;
        let dx2 = dx * dx;
        let dy2 = dy * dy;

        for j in 0..ny {
            for i in 0..nx {
                let (gi, gj) = (gi0 + i as i64, gj0 + j as i64);
                let (ii, jj) = (i as isize, j as isize);
                let uc = u(ii, jj);
                let vc = v(ii, jj);

                // On and beyond the boundary the prediction equals the
                // velocity itself, which the RHS relies on.
                let f = if (1..i_max).contains(&gi) && (1..=j_max).contains(&gj) {
                    let (ur, ul) = (u(ii + 1, jj), u(ii - 1, jj));
                    let (ut, ub) = (u(ii, jj + 1), u(ii, jj - 1));
                    let vr = v(ii + 1, jj);
                    let vb = v(ii, jj - 1);
                    let vrb = v(ii + 1, jj - 1);

                    let du2dx = ((uc + ur).powi(2) - (ul + uc).powi(2)) / (4.0 * dx)
                        + alpha / (4.0 * dx)
                            * ((uc + ur).abs() * (uc - ur) - (ul + uc).abs() * (ul - uc));
                    let duvdy = ((vc + vr) * (uc + ut) - (vb + vrb) * (ub + uc)) / (4.0 * dy)
                        + alpha / (4.0 * dy)
                            * ((vc + vr).abs() * (uc - ut) - (vb + vrb).abs() * (ub - uc));
                    let lap = (ur - 2.0 * uc + ul) / dx2 + (ut - 2.0 * uc + ub) / dy2;
                    uc + dt * (lap / re - du2dx - duvdy)
                } else {
                    uc
                };

                let g = if (1..=i_max).contains(&gi) && (1..j_max).contains(&gj) {
                    let (vt, vb) = (v(ii, jj + 1), v(ii, jj - 1));
                    let (vr, vl) = (v(ii + 1, jj), v(ii - 1, jj));
                    let ut = u(ii, jj + 1);
                    let ul = u(ii - 1, jj);
                    let ult = u(ii - 1, jj + 1);

                    let duvdx = ((uc + ut) * (vc + vr) - (ul + ult) * (vl + vc)) / (4.0 * dx)
                        + alpha / (4.0 * dx)
                            * ((uc + ut).abs() * (vc - vr) - (ul + ult).abs() * (vl - vc));
                    let dv2dy = ((vc + vt).powi(2) - (vb + vc).powi(2)) / (4.0 * dy)
                        + alpha / (4.0 * dy)
                            * ((vc + vt).abs() * (vc - vt) - (vb + vc).abs() * (vb - vc));
                    let lap = (vr - 2.0 * vc + vl) / dx2 + (vt - 2.0 * vc + vb) / dy2;
                    vc + dt * (lap / re - duvdx - dv2dy)
                } else {
                    vc
                };

                fg.set(i, j, Vel::new(f, g));
            }
        }
    }

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
    ) {
        let (gi0, gj0) = fg.global_offset();
        let (nx, ny) = (fg.nx(), fg.ny());
        let i_max = extent.i_max as i64;
        let j_max = extent.j_max as i64;

        let f_at = |i: isize, j: usize| -> f64 {
            if i < 0 { fg_left[j].u } else { fg.get(i as usize, j).u }
        };
        let g_at = |i: usize, j: isize| -> f64 {
            if j < 0 { fg_bottom[i].v } else { fg.get(i, j as usize).v }
        };

        for j in 0..ny {
            for i in 0..nx {
                let (gi, gj) = (gi0 + i as i64, gj0 + j as i64);
                if !(1..=i_max).contains(&gi) || !(1..=j_max).contains(&gj) {
                    continue;
                }
                let div = (f_at(i as isize, j) - f_at(i as isize - 1, j)) / dx
                    + (g_at(i, j as isize) - g_at(i, j as isize - 1)) / dy;
                rhs.set(i, j, div / dt);
            }
        }
    }

    fn apply_pressure_boundary(&self, p: &mut Partition<f64>, extent: DomainExtent) {
        let (gi0, gj0) = p.global_offset();
        let (nx, ny) = (p.nx(), p.ny());
        let i_max = extent.i_max as i64;
        let j_max = extent.j_max as i64;

        for j in 0..ny {
            for i in 0..nx {
                let (gi, gj) = (gi0 + i as i64, gj0 + j as i64);
                if gi == 0 {
                    let v = p.get(i + 1, j);
                    p.set(i, j, v);
                } else if gi == i_max + 1 {
                    let v = p.get(i - 1, j);
                    p.set(i, j, v);
                }
                if gj == 0 {
                    let v = p.get(i, j + 1);
                    p.set(i, j, v);
                } else if gj == j_max + 1 {
                    let v = p.get(i, j - 1);
                    p.set(i, j, v);
                }
            }
        }
    }

    fn sor_sweep(
        &self,
        p: &mut Partition<f64>,
        halo: &EdgeHalo<f64>,
        rhs: &Partition<f64>,
        extent: DomainExtent,
        omega: f64,
        dx: f64,
        dy: f64,
    ) {
        let (gi0, gj0) = p.global_offset();
        let (nx, ny) = (p.nx(), p.ny());
        let i_max = extent.i_max as i64;
        let j_max = extent.j_max as i64;
        let dx2 = dx * dx;
        let dy2 = dy * dy;
        let coeff = omega / (2.0 * (1.0 / dx2 + 1.0 / dy2));

        for j in 0..ny {
            for i in 0..nx {
                let (gi, gj) = (gi0 + i as i64, gj0 + j as i64);
                if !(1..=i_max).contains(&gi) || !(1..=j_max).contains(&gj) {
                    continue;
                }
                let p_w = if i == 0 { halo.left[j] } else { p.get(i - 1, j) };
                let p_e = if i == nx - 1 { halo.right[j] } else { p.get(i + 1, j) };
                let p_s = if j == 0 { halo.bottom[i] } else { p.get(i, j - 1) };
                let p_n = if j == ny - 1 { halo.top[i] } else { p.get(i, j + 1) };
                let relaxed = (1.0 - omega) * p.get(i, j)
                    + coeff * ((p_e + p_w) / dx2 + (p_n + p_s) / dy2 - rhs.get(i, j));
                p.set(i, j, relaxed);
            }
        }
    }

    fn compute_residual(
        &self,
        p: &Partition<f64>,
        halo: &EdgeHalo<f64>,
        rhs: &Partition<f64>,
        extent: DomainExtent,
        dx: f64,
        dy: f64,
    ) -> f64 {
        let view = GhostView::edges(p, halo);
        let (gi0, gj0) = p.global_offset();
        let (nx, ny) = (p.nx(), p.ny());
        let i_max = extent.i_max as i64;
        let j_max = extent.j_max as i64;
        let dx2 = dx * dx;
        let dy2 = dy * dy;

        let mut sum = 0.0;
        for j in 0..ny {
            for i in 0..nx {
                let (gi, gj) = (gi0 + i as i64, gj0 + j as i64);
                if !(1..=i_max).contains(&gi) || !(1..=j_max).contains(&gj) {
                    continue;
                }
                let (ii, jj) = (i as isize, j as isize);
                let pc = view.at(ii, jj);
                let r = (view.at(ii + 1, jj) - 2.0 * pc + view.at(ii - 1, jj)) / dx2
                    + (view.at(ii, jj + 1) - 2.0 * pc + view.at(ii, jj - 1)) / dy2
                    - rhs.get(i, j);
                sum += r * r;
            }
        }
        sum
    }

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
    ) -> (f64, f64) {
        let (gi0, gj0) = uv.global_offset();
        let (nx, ny) = (uv.nx(), uv.ny());
        let i_max = extent.i_max as i64;
        let j_max = extent.j_max as i64;

        let p_e = |i: usize, j: usize| if i + 1 == nx { p_right[j] } else { p.get(i + 1, j) };
        let p_n = |i: usize, j: usize| if j + 1 == ny { p_top[i] } else { p.get(i, j + 1) };

        let mut max_u = 0.0f64;
        let mut max_v = 0.0f64;
        for j in 0..ny {
            for i in 0..nx {
                let (gi, gj) = (gi0 + i as i64, gj0 + j as i64);
                let mut cell = uv.get(i, j);
                if (1..i_max).contains(&gi) && (1..=j_max).contains(&gj) {
                    cell.u = fg.get(i, j).u - dt / dx * (p_e(i, j) - p.get(i, j));
                    max_u = max_u.max(cell.u.abs());
                }
                if (1..=i_max).contains(&gi) && (1..j_max).contains(&gj) {
                    cell.v = fg.get(i, j).v - dt / dy * (p_n(i, j) - p.get(i, j));
                    max_v = max_v.max(cell.v.abs());
                }
                uv.set(i, j, cell);
            }
        }
        (max_u, max_v)
    }
}
