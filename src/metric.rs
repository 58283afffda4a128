// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! Edge-cost metrics: plain Euclidean for DRRT★ and MARS, SSM-weighted for MARSHA.

use parking_lot::Mutex;

use crate::{
    configuration::Configuration,
    ssm::{Point3, SsmEstimator},
};

/// A thread-clonable edge-cost function, shared by every `Path` for computing and comparing edge
/// costs.
pub trait Metric: Send + Sync {
    fn cost(&self, from: &Configuration, to: &Configuration) -> f64;

    /// Refreshes whatever live state the metric's cost depends on, mirroring `Checker`'s hook of
    /// the same name. Metrics with no such state (the default) ignore this. Takes `&self`, not
    /// `&mut self`, since every `Path` shares one `Arc<dyn Metric>` rather than a per-thread clone.
    fn update_scene(&self, _positions: &[Point3]) {}

    fn box_clone(&self) -> Box<dyn Metric>;
}

impl Clone for Box<dyn Metric> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// The baseline metric: edge cost is plain Euclidean length, used by DRRT★ and MARS.
#[derive(Clone, Default)]
pub struct EuclideanMetric;

impl Metric for EuclideanMetric {
    fn cost(&self, from: &Configuration, to: &Configuration) -> f64 {
        from.distance(to)
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(self.clone())
    }
}

/// The MARSHA metric: Euclidean length penalised by how close the motion brings the robot to an
/// "aware" obstacle, per the SSM estimate of allowed speed (spec §4.4). A motion that the
/// estimator would force to near-zero speed becomes proportionally expensive; a motion far from
/// every aware obstacle reduces to `EuclideanMetric`.
pub struct SsmWeightedMetric {
    // Behind a `Mutex` rather than owned directly: `update_scene` needs to mutate the estimator's
    // tracked obstacle positions through a shared `Arc<dyn Metric>`, not a per-thread clone.
    ssm: Mutex<Box<dyn SsmEstimator>>,
    v_h: f64,
}

impl SsmWeightedMetric {
    pub fn new(ssm: Box<dyn SsmEstimator>, v_h: f64) -> Self {
        SsmWeightedMetric { ssm: Mutex::new(ssm), v_h }
    }
}

impl Metric for SsmWeightedMetric {
    fn cost(&self, from: &Configuration, to: &Configuration) -> f64 {
        let length = from.distance(to);
        if length <= 0.0 {
            return 0.0;
        }
        let allowed_speed = self.ssm.lock().estimate_speed(from, to).max(1e-6);
        let penalty = (self.v_h / allowed_speed).max(1.0);
        length * penalty
    }

    fn update_scene(&self, positions: &[Point3]) {
        self.ssm.lock().set_obstacle_positions(positions);
    }

    fn box_clone(&self) -> Box<dyn Metric> {
        Box::new(SsmWeightedMetric { ssm: Mutex::new(self.ssm.lock().box_clone()), v_h: self.v_h })
    }
}
