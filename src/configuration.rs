// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! Joint-space points and the `[lb, ub]` box they live in.

use rand::Rng;

use crate::error::ConfigurationError;

/// A fixed-length vector of joint values in ℝⁿ.
///
/// Identity of a `Node` is pointer/id-equal; equality of two `Configuration`s is purely
/// value-equal and carries no meaning about tree membership.
#[derive(Clone, Debug, PartialEq)]
pub struct Configuration {
    pub values: Vec<f64>,
}

impl Configuration {
    pub fn new(values: Vec<f64>) -> Self {
        Configuration { values }
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    /// Euclidean (L2) distance to `other`.
    pub fn distance(&self, other: &Configuration) -> f64 {
        debug_assert_eq!(self.values.len(), other.values.len());
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    /// Linear interpolation: `t = 0` returns `self`, `t = 1` returns `other`.
    pub fn interpolate(&self, other: &Configuration, t: f64) -> Configuration {
        debug_assert_eq!(self.values.len(), other.values.len());
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a + (b - a) * t)
            .collect();
        Configuration { values }
    }
}

/// The `[lb, ub]` box a `Configuration` must live in.
#[derive(Clone, Debug)]
pub struct Bounds {
    pub lb: Vec<f64>,
    pub ub: Vec<f64>,
}

impl Bounds {
    /// Creates a new `Bounds`, validating that `lb` and `ub` have matching, non-empty length and
    /// that every lower bound is strictly less than its corresponding upper bound.
    pub fn new(lb: Vec<f64>, ub: Vec<f64>) -> Result<Self, ConfigurationError> {
        if lb.len() != ub.len() {
            return Err(ConfigurationError::DimensionMismatch {
                expected: lb.len(),
                found: ub.len(),
            });
        }
        for (i, (&l, &u)) in lb.iter().zip(ub.iter()).enumerate() {
            if l >= u {
                return Err(ConfigurationError::InvalidBound {
                    dimension: i,
                    lower: l,
                    upper: u,
                });
            }
        }
        Ok(Bounds { lb, ub })
    }

    pub fn dimension(&self) -> usize {
        self.lb.len()
    }

    pub fn clamp(&self, conf: &Configuration) -> Configuration {
        let values = conf
            .values
            .iter()
            .enumerate()
            .map(|(i, &v)| v.clamp(self.lb[i], self.ub[i]))
            .collect();
        Configuration { values }
    }

    pub fn contains(&self, conf: &Configuration) -> bool {
        if conf.values.len() != self.dimension() {
            return false;
        }
        conf.values
            .iter()
            .enumerate()
            .all(|(i, &v)| v >= self.lb[i] - f64::EPSILON && v <= self.ub[i] + f64::EPSILON)
    }

    /// Samples uniformly from the whole box.
    pub fn sample_uniform(&self, rng: &mut impl Rng) -> Configuration {
        let values = self
            .lb
            .iter()
            .zip(self.ub.iter())
            .map(|(&l, &u)| rng.random_range(l..u))
            .collect();
        Configuration { values }
    }
}
