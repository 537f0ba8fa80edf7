//! Immutable simulation configuration.
//!
//! Read once at setup, frozen thereafter. Geometry is validated before
//! any communication starts; a bad grid/rank combination is a fatal setup
//! error, not something to limp through.

use serde::Deserialize;

use crate::solver_error::SolverError;

/// Tangential wall speeds driving the flow (normal components are always
/// zero at walls). The default is a unit lid on the top wall.
#[derive(Copy, Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WallVelocities {
    pub u_top: f64,
    pub u_bottom: f64,
    pub v_left: f64,
    pub v_right: f64,
}

impl Default for WallVelocities {
    fn default() -> Self {
        WallVelocities {
            u_top: 1.0,
            u_bottom: 0.0,
            v_left: 0.0,
            v_right: 0.0,
        }
    }
}

/// Frozen input configuration for one run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Interior cells in x (the global grid adds a one-cell ghost
    /// border).
    pub i_max: usize,
    /// Interior cells in y.
    pub j_max: usize,
    pub x_length: f64,
    pub y_length: f64,

    /// Reynolds number.
    pub re: f64,
    /// SOR relaxation factor, stable in (0, 2).
    pub omega: f64,
    /// Donor-cell upwind blend in [0, 1].
    pub alpha: f64,
    /// CFL safety factor in (0, 1].
    pub tau: f64,
    /// Squared convergence tolerance for the pressure iteration.
    pub eps_sq: f64,
    /// SOR iteration cap per timestep.
    pub iter_max: usize,

    /// Simulated end time.
    pub t_end: f64,
    /// Initial timestep; adapted from the CFL bound afterwards.
    pub dt0: f64,
    /// Hard cap on timesteps (0 = until `t_end`).
    pub max_timesteps: usize,
    /// Emit a snapshot every this many steps (0 = never).
    pub output_skip_size: usize,

    /// Rank grid extents.
    pub num_ranks_x: usize,
    pub num_ranks_y: usize,
    /// Cells per tile (0 = one tile per rank).
    pub i_res: usize,
    pub j_res: usize,

    pub walls: WallVelocities,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            i_max: 64,
            j_max: 64,
            x_length: 1.0,
            y_length: 1.0,
            re: 100.0,
            omega: 1.7,
            alpha: 0.9,
            tau: 0.5,
            eps_sq: 1e-4,
            iter_max: 100,
            t_end: 1.0,
            dt0: 0.02,
            max_timesteps: 0,
            output_skip_size: 0,
            num_ranks_x: 1,
            num_ranks_y: 1,
            i_res: 0,
            j_res: 0,
            walls: WallVelocities::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, SolverError> {
        let cfg: Config =
            serde_json::from_str(json).map_err(|e| SolverError::ConfigParse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a configuration from a JSON reader.
    pub fn from_json_reader<R: std::io::Read>(reader: R) -> Result<Self, SolverError> {
        let cfg: Config =
            serde_json::from_reader(reader).map_err(|e| SolverError::ConfigParse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check parameter ranges. Grid/rank divisibility is checked when the
    /// per-rank geometry is derived.
    pub fn validate(&self) -> Result<(), SolverError> {
        fn bad(msg: impl Into<String>) -> Result<(), SolverError> {
            Err(SolverError::InvalidParameter(msg.into()))
        }
        if self.i_max == 0 || self.j_max == 0 {
            return bad("grid resolution must be positive");
        }
        if !(self.x_length > 0.0 && self.y_length > 0.0) {
            return bad("physical extents must be positive");
        }
        if !(self.re > 0.0) {
            return bad(format!("Reynolds number {} must be positive", self.re));
        }
        if !(self.omega > 0.0 && self.omega < 2.0) {
            return bad(format!("relaxation factor {} outside (0, 2)", self.omega));
        }
        if !(0.0..=1.0).contains(&self.alpha) {
            return bad(format!("upwind blend {} outside [0, 1]", self.alpha));
        }
        if !(self.tau > 0.0 && self.tau <= 1.0) {
            return bad(format!("CFL safety factor {} outside (0, 1]", self.tau));
        }
        if !(self.eps_sq > 0.0) {
            return bad("convergence tolerance must be positive");
        }
        if self.iter_max == 0 {
            return bad("iteration cap must allow at least one sweep");
        }
        if !(self.dt0 > 0.0 && self.t_end > 0.0) {
            return bad("dt0 and t_end must be positive");
        }
        if self.num_ranks_x == 0 || self.num_ranks_y == 0 {
            return bad("rank grid extents must be positive");
        }
        Ok(())
    }

    /// Number of ranks the rank grid describes.
    pub fn num_ranks(&self) -> usize {
        self.num_ranks_x * self.num_ranks_y
    }

    /// Grid spacings derived from resolution and physical extents.
    pub fn spacing(&self) -> (f64, f64) {
        (
            self.x_length / self.i_max as f64,
            self.y_length / self.j_max as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn json_overrides_defaults() {
        let cfg = Config::from_json(
            r#"{ "i_max": 4, "j_max": 4, "num_ranks_x": 2, "num_ranks_y": 2,
                 "walls": { "u_top": 2.0 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.i_max, 4);
        assert_eq!(cfg.num_ranks(), 4);
        assert_eq!(cfg.walls.u_top, 2.0);
        assert_eq!(cfg.re, 100.0);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            Config::from_json(r#"{ "i_mx": 4 }"#),
            Err(SolverError::ConfigParse(_))
        ));
    }

    #[test]
    fn bad_omega_is_rejected() {
        let mut cfg = Config::default();
        cfg.omega = 2.0;
        assert!(matches!(
            cfg.validate(),
            Err(SolverError::InvalidParameter(_))
        ));
    }

    #[test]
    fn spacing_follows_extents() {
        let mut cfg = Config::default();
        cfg.i_max = 4;
        cfg.j_max = 8;
        cfg.x_length = 1.0;
        cfg.y_length = 2.0;
        assert_eq!(cfg.spacing(), (0.25, 0.25));
    }
}
