// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The `ManagerConfig` configuration surface (spec §6's "Configuration inputs" list), validated
//! the way `RealVectorStateSpace::new` validates its bounds: a descriptive error variant instead
//! of a panic.

use crate::{configuration::Bounds, error::ManagerError, replanner::ReplannerKind, ssm::SsmParams, time::Duration};

/// Every tunable the Replanner Manager needs, collected in one place rather than threaded as
/// loose arguments through four thread bodies.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    /// Which pluggable replanning policy to run (spec §6).
    pub replanner_type: ReplannerKind,
    /// Trajectory tick period (spec §4.5's "Trajectory tick (periodic, period `dt`)"), distinct
    /// from the collision-check period `1/f_cc` and the replanner period `dt_replan`.
    pub dt: Duration,
    /// Replanner period and budget base; the replanner's deadline is `0.9 * dt_replan`.
    pub dt_replan: Duration,
    /// Collision-check thread frequency, in Hz.
    pub collision_checker_thread_frequency: f64,
    /// L² tolerance used to decide the robot has reached the goal.
    pub goal_tol: f64,
    /// RRT step limit used by the Tree Editor and the samplers.
    pub max_distance: f64,
    /// The joint-space box every sampled configuration must respect.
    pub bounds: Bounds,
    /// `MARS/n_other_paths`: target size of the alternate-path bank.
    pub mars_n_other_paths: usize,
    /// Whether MARS considers every tree node a bridge-source candidate rather than just the
    /// node the obstruction was detected at. Forced to `false` under MARSHA regardless of this
    /// field (spec §4.4).
    pub mars_full_net_search: bool,
    /// `MARSHA/{...}` SSM parameters; unused unless `replanner_type == Marsha`.
    pub ssm: SsmParams,
}

impl ManagerConfig {
    /// Checks the configuration is internally consistent. Mirrors
    /// `RealVectorStateSpace::new`'s style: every problem is reported, not just the first.
    pub fn validate(&self) -> Result<(), ManagerError> {
        if self.dt.is_zero() {
            return Err(ManagerError::ConfigInvalid("dt must be greater than zero".to_string()));
        }
        if self.dt_replan.is_zero() {
            return Err(ManagerError::ConfigInvalid("dt_replan must be greater than zero".to_string()));
        }
        if !(self.collision_checker_thread_frequency > 0.0) {
            return Err(ManagerError::ConfigInvalid(
                "collision_checker_thread_frequency must be positive".to_string(),
            ));
        }
        if self.goal_tol < 0.0 {
            return Err(ManagerError::ConfigInvalid("goal_tol must be non-negative".to_string()));
        }
        if !(self.max_distance > 0.0) {
            return Err(ManagerError::ConfigInvalid("max_distance must be positive".to_string()));
        }
        if matches!(self.replanner_type, ReplannerKind::Mars | ReplannerKind::Marsha) && self.mars_n_other_paths == 0 {
            return Err(ManagerError::ConfigInvalid(
                "mars_n_other_paths must be at least 1 under MARS/MARSHA".to_string(),
            ));
        }
        if matches!(self.replanner_type, ReplannerKind::Marsha) {
            if self.ssm.ssm_threads == 0 {
                return Err(ManagerError::ConfigInvalid("ssm_threads must be at least 1 under MARSHA".to_string()));
            }
            if self.ssm.v_h <= 0.0 {
                return Err(ManagerError::ConfigInvalid("v_h must be positive under MARSHA".to_string()));
            }
        }
        Ok(())
    }
}
