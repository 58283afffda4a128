// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! Speed-and-separation monitoring (SSM) — the human-aware edge-weighting interface consumed by
//! MARSHA (see spec §4.4, §C8). The kinematic chain and forward-kinematics evaluation that turn
//! obstacle positions into an actual allowed speed are external collaborators; this module only
//! defines the boundary a `Metric` implementation weights its edge cost against.

use crate::configuration::Configuration;

/// A 3-D position, used for obstacle locations and points of interest on the robot's chain.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// A human-aware safety estimator: given the current positions of tracked obstacles and a set of
/// named points of interest on the robot's kinematic chain, estimates how close an edge of the
/// path brings the robot to an "aware" obstacle.
///
/// Thread-clonable, like `Checker`: each thread that needs to evaluate an SSM-weighted `Metric`
/// owns its own clone.
pub trait SsmEstimator: Send + Sync {
    /// Replaces the tracked obstacle positions. `positions[i]` corresponds to
    /// `names_for_positions()[i]` if identifiers were previously registered via
    /// `set_obstacle_ids`; otherwise obstacles are anonymous and always "aware".
    fn set_obstacle_positions(&mut self, positions: &[Point3]);

    /// Registers the identifiers of the obstacles passed to `set_obstacle_positions`, in the
    /// same order, so `unaware_obstacles` (spec §4.4/§6) can be excluded from the SSM term while
    /// still participating in collision checking.
    fn set_obstacle_ids(&mut self, ids: &[String]);

    /// Registers the named points of interest on the kinematic chain to evaluate proximity
    /// against.
    fn set_poi_names(&mut self, names: &[String]);

    /// Estimates the minimum allowed Cartesian speed along the straight-line motion from `from`
    /// to `to`, given the currently tracked obstacle positions. Lower is more constrained; a
    /// motion far from every "aware" obstacle returns the unconstrained maximum speed.
    fn estimate_speed(&self, from: &Configuration, to: &Configuration) -> f64;

    fn box_clone(&self) -> Box<dyn SsmEstimator>;
}

impl Clone for Box<dyn SsmEstimator> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// Parameters controlling SSM evaluation, per spec §6's `MARSHA/{...}` configuration inputs.
#[derive(Clone, Debug)]
pub struct SsmParams {
    pub unaware_obstacles: Vec<String>,
    pub poi_names: Vec<String>,
    pub base_frame: String,
    pub tool_frame: String,
    pub ssm_max_step_size: f64,
    pub ssm_threads: usize,
    pub max_cart_acc: f64,
    pub reaction_time: f64,
    pub min_distance: f64,
    pub v_h: f64,
}

/// A simple, deterministic `SsmEstimator` for tests and examples: allowed speed degrades
/// linearly from `v_h` (far away) to `0.0` (within `min_distance`) of the nearest tracked,
/// aware obstacle, measured against the midpoint of the candidate motion.
#[derive(Clone)]
pub struct StaticSsmEstimator {
    params: SsmParams,
    obstacle_positions: Vec<Point3>,
    obstacle_ids: Vec<String>,
    poi_names: Vec<String>,
}

impl StaticSsmEstimator {
    pub fn new(params: SsmParams) -> Self {
        StaticSsmEstimator {
            params,
            obstacle_positions: Vec::new(),
            obstacle_ids: Vec::new(),
            poi_names: Vec::new(),
        }
    }

    fn midpoint_xyz(&self, from: &Configuration, to: &Configuration) -> Point3 {
        let mid = from.interpolate(to, 0.5);
        Point3 {
            x: *mid.values.first().unwrap_or(&0.0),
            y: *mid.values.get(1).unwrap_or(&0.0),
            z: *mid.values.get(2).unwrap_or(&0.0),
        }
    }

    fn point_distance(a: &Point3, b: &Point3) -> f64 {
        ((a.x - b.x).powi(2) + (a.y - b.y).powi(2) + (a.z - b.z).powi(2)).sqrt()
    }
}

impl SsmEstimator for StaticSsmEstimator {
    fn set_obstacle_positions(&mut self, positions: &[Point3]) {
        self.obstacle_positions = positions.to_vec();
    }

    fn set_obstacle_ids(&mut self, ids: &[String]) {
        self.obstacle_ids = ids.to_vec();
    }

    fn set_poi_names(&mut self, names: &[String]) {
        self.poi_names = names.to_vec();
    }

    fn estimate_speed(&self, from: &Configuration, to: &Configuration) -> f64 {
        let probe = self.midpoint_xyz(from, to);
        let mut nearest = f64::INFINITY;
        for (i, pos) in self.obstacle_positions.iter().enumerate() {
            let id = self.obstacle_ids.get(i);
            let aware = id.map_or(true, |id| !self.params.unaware_obstacles.contains(id));
            if !aware {
                continue;
            }
            let d = Self::point_distance(&probe, pos);
            if d < nearest {
                nearest = d;
            }
        }
        if !nearest.is_finite() {
            return self.params.v_h;
        }
        if nearest <= self.params.min_distance {
            return 0.0;
        }
        let span = (self.params.ssm_max_step_size).max(1e-6);
        let ratio = ((nearest - self.params.min_distance) / span).min(1.0);
        self.params.v_h * ratio
    }

    fn box_clone(&self) -> Box<dyn SsmEstimator> {
        Box::new(self.clone())
    }
}
