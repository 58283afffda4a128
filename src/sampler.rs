// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The Local Informed Sampler (spec §4.1, component C3): a biased sampler over an ellipsoid
//! between two foci, plus an optional bank of balls used to focus growth near an obstruction.

use rand::Rng;

use crate::configuration::{Bounds, Configuration};

/// A region to sample directly with probability ½ when at least one ball has been registered.
#[derive(Clone, Debug)]
pub struct Ball {
    pub center: Configuration,
    pub radius: f64,
}

/// Samples configurations biased towards an ellipsoid with foci `start` and `goal`, optionally
/// supplemented by a set of balls. Adding a ball after construction is permitted; balls are
/// ordered by insertion but selection among them is uniform.
pub struct LocalInformedSampler {
    start: Configuration,
    goal: Configuration,
    cost_max: f64,
    bounds: Bounds,
    balls: Vec<Ball>,
}

impl LocalInformedSampler {
    pub fn new(start: Configuration, goal: Configuration, cost_max: f64, bounds: Bounds) -> Self {
        LocalInformedSampler { start, goal, cost_max, bounds, balls: Vec::new() }
    }

    pub fn add_ball(&mut self, ball: Ball) {
        self.balls.push(ball);
    }

    /// Never fails for finite bounds (spec §4.1 contract).
    pub fn sample(&self, rng: &mut impl Rng) -> Configuration {
        if !self.balls.is_empty() && rng.random_bool(0.5) {
            let index = rng.random_range(0..self.balls.len());
            self.sample_ball(&self.balls[index], rng)
        } else {
            self.sample_ellipsoid(rng)
        }
    }

    fn sample_ball(&self, ball: &Ball, rng: &mut impl Rng) -> Configuration {
        let offset = sample_unit_ball(rng, ball.center.dimension());
        let values = ball
            .center
            .values
            .iter()
            .zip(offset.iter())
            .map(|(&c, &o)| c + o * ball.radius)
            .collect();
        self.bounds.clamp(&Configuration::new(values))
    }

    fn sample_ellipsoid(&self, rng: &mut impl Rng) -> Configuration {
        let n = self.start.dimension();
        let c_min = self.start.distance(&self.goal);

        if !self.cost_max.is_finite() {
            return self.sample_bounding_box(rng);
        }
        if self.cost_max <= c_min + 1e-12 || c_min < 1e-12 {
            // Degenerate ellipsoid (no room to grow, or coincident foci): fall back to the
            // midpoint rather than sampling an effectively zero-volume region.
            return self.bounds.clamp(&self.start.interpolate(&self.goal, 0.5));
        }

        let center: Vec<f64> = (0..n).map(|i| (self.start.values[i] + self.goal.values[i]) / 2.0).collect();
        let r_major = self.cost_max / 2.0;
        let r_minor = ((self.cost_max.powi(2) - c_min.powi(2)).max(0.0)).sqrt() / 2.0;

        // Unit vector along start->goal.
        let axis: Vec<f64> = (0..n).map(|i| (self.goal.values[i] - self.start.values[i]) / c_min).collect();
        // Householder reflection mapping e1 onto `axis`: u = e1 - axis.
        let mut u = axis.iter().map(|&a| -a).collect::<Vec<_>>();
        u[0] += 1.0;
        let u_norm_sq: f64 = u.iter().map(|x| x * x).sum();

        let mut scaled = sample_unit_ball(rng, n);
        scaled[0] *= r_major;
        for v in scaled.iter_mut().skip(1) {
            *v *= r_minor;
        }

        let rotated = if u_norm_sq > 1e-12 {
            let dot: f64 = scaled.iter().zip(u.iter()).map(|(v, ui)| v * ui).sum();
            let factor = 2.0 * dot / u_norm_sq;
            scaled.iter().zip(u.iter()).map(|(v, ui)| v - factor * ui).collect::<Vec<_>>()
        } else {
            scaled
        };

        let values = (0..n).map(|i| center[i] + rotated[i]).collect();
        self.bounds.clamp(&Configuration::new(values))
    }

    /// Uniform sampling in the axis-aligned bounding box of `start` and `goal`, intersected with
    /// the space's overall bounds; used when `cost_max` is infinite (spec §4.1).
    fn sample_bounding_box(&self, rng: &mut impl Rng) -> Configuration {
        let n = self.start.dimension();
        let values = (0..n)
            .map(|i| {
                let (mut lo, mut hi) = (self.start.values[i], self.goal.values[i]);
                if lo > hi {
                    std::mem::swap(&mut lo, &mut hi);
                }
                let lo = lo.max(self.bounds.lb[i]);
                let hi = hi.min(self.bounds.ub[i]);
                if lo < hi {
                    rng.random_range(lo..hi)
                } else {
                    lo
                }
            })
            .collect();
        Configuration::new(values)
    }
}

/// A point sampled uniformly within the n-dimensional unit ball.
fn sample_unit_ball(rng: &mut impl Rng, n: usize) -> Vec<f64> {
    let direction: Vec<f64> = (0..n).map(|_| sample_standard_normal(rng)).collect();
    let norm = direction.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm < 1e-12 {
        return vec![0.0; n];
    }
    let u: f64 = rng.random_range(0.0..1.0);
    let radius = u.powf(1.0 / n as f64);
    direction.iter().map(|x| x / norm * radius).collect()
}

fn sample_standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn bounds() -> Bounds {
        Bounds::new(vec![-10.0, -10.0], vec![10.0, 10.0]).unwrap()
    }

    #[test]
    fn sample_never_fails_and_respects_bounds() {
        let sampler = LocalInformedSampler::new(
            Configuration::new(vec![0.0, 0.0]),
            Configuration::new(vec![2.0, 0.0]),
            3.0,
            bounds(),
        );
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let q = sampler.sample(&mut rng);
            assert!(bounds().contains(&q));
        }
    }

    #[test]
    fn ball_samples_stay_within_radius_of_center() {
        let sampler = LocalInformedSampler::new(
            Configuration::new(vec![0.0, 0.0]),
            Configuration::new(vec![5.0, 0.0]),
            f64::INFINITY,
            bounds(),
        );
        let ball = Ball { center: Configuration::new(vec![1.0, 1.0]), radius: 0.5 };

        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let q = sampler.sample_ball(&ball, &mut rng);
            assert!(q.distance(&ball.center) <= ball.radius + 1e-9);
        }
    }

    #[test]
    fn infinite_cost_bound_samples_uniformly_in_aabb() {
        let sampler = LocalInformedSampler::new(
            Configuration::new(vec![0.0, 0.0]),
            Configuration::new(vec![2.0, 2.0]),
            f64::INFINITY,
            bounds(),
        );
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let q = sampler.sample(&mut rng);
            assert!(q.values[0] >= 0.0 && q.values[0] <= 2.0);
            assert!(q.values[1] >= 0.0 && q.values[1] <= 2.0);
        }
    }
}
