//! The adaptive timestep respects every CFL bound.

use proptest::prelude::*;

use flowstep::stepper::cfl_timestep;

proptest! {
    #[test]
    fn dt_respects_all_bounds(
        tau in 0.05f64..=1.0,
        re in 1.0f64..=10_000.0,
        dx in 1e-3f64..=1.0,
        dy in 1e-3f64..=1.0,
        max_u in 1e-6f64..=100.0,
        max_v in 1e-6f64..=100.0,
    ) {
        let dt = cfl_timestep(tau, re, dx, dy, max_u, max_v);
        let eps = 1.0 + 1e-12;
        prop_assert!(dt > 0.0);
        prop_assert!(dt <= eps * tau * dx / max_u);
        prop_assert!(dt <= eps * tau * dy / max_v);
        prop_assert!(dt <= eps * tau * re / 2.0 / (1.0 / (dx * dx) + 1.0 / (dy * dy)));
    }

    /// A vanished velocity component deactivates its bound but never the
    /// others.
    #[test]
    fn zero_velocity_leaves_diffusive_bound(
        tau in 0.05f64..=1.0,
        re in 1.0f64..=10_000.0,
        dx in 1e-3f64..=1.0,
        dy in 1e-3f64..=1.0,
    ) {
        let dt = cfl_timestep(tau, re, dx, dy, 0.0, 0.0);
        let diffusive = tau * re / 2.0 / (1.0 / (dx * dx) + 1.0 / (dy * dy));
        prop_assert!((dt - diffusive).abs() <= 1e-12 * diffusive.abs());
    }
}
