// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The collision-checking boundary.
//!
//! The geometric collision checker over a planning scene is an external collaborator (see
//! spec §1); this module only defines the interface a `Checker` implementation must satisfy to
//! be usable by the tree editor and the replanners.

use crate::{configuration::Configuration, ssm::Point3};

/// A thread-clonable collision-validity oracle.
///
/// Each of the manager's threads owns its own clone (`box_clone`), obtained once at thread
/// startup, rather than sharing one instance behind a lock: collision geometry queries are
/// read-only and the checker's internal caches (if any) are expected to be thread-local.
pub trait Checker: Send + Sync {
    /// Checks whether the straight-line motion from `from` to `to` is collision-free.
    fn check_path(&self, from: &Configuration, to: &Configuration) -> bool;

    /// Refreshes the obstacle positions this checker validates against, called once per
    /// collision-check cycle with the latest `SceneSnapshot` (spec §5). Checkers with static
    /// geometry (the default) ignore this.
    fn update_scene(&mut self, _positions: &[Point3]) {}

    /// Checks whether a single edge, given its two endpoint configurations, is valid. The
    /// default implementation defers to `check_path`; checkers with a richer edge
    /// representation (cached geometry, precomputed sweep volume) may override it.
    fn check_edge(&self, from: &Configuration, to: &Configuration) -> bool {
        self.check_path(from, to)
    }

    fn box_clone(&self) -> Box<dyn Checker>;
}

impl Clone for Box<dyn Checker> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A `Checker` used by tests and examples: everything within `margin` of `blocked` is invalid.
#[derive(Clone)]
pub struct SphericalObstacleChecker {
    pub blocked: Vec<(Configuration, f64)>,
}

impl SphericalObstacleChecker {
    pub fn new() -> Self {
        SphericalObstacleChecker { blocked: Vec::new() }
    }

    pub fn with_obstacle(mut self, center: Configuration, radius: f64) -> Self {
        self.blocked.push((center, radius));
        self
    }

    fn state_valid(&self, conf: &Configuration) -> bool {
        self.blocked
            .iter()
            .all(|(center, radius)| conf.distance(center) > *radius)
    }
}

impl Default for SphericalObstacleChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl Checker for SphericalObstacleChecker {
    fn check_path(&self, from: &Configuration, to: &Configuration) -> bool {
        let dist = from.distance(to);
        let num_steps = (dist / 0.05).ceil().max(1.0) as usize;
        for i in 0..=num_steps {
            let t = i as f64 / num_steps as f64;
            if !self.state_valid(&from.interpolate(to, t)) {
                return false;
            }
        }
        true
    }

    fn box_clone(&self) -> Box<dyn Checker> {
        Box::new(self.clone())
    }
}
