// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use std::{error, fmt};

/// Errors describing a malformed or out-of-range `Configuration`/`Bounds` definition.
#[derive(Debug, PartialEq)]
pub enum ConfigurationError {
    /// The length of the provided bounds does not match the configuration dimension.
    DimensionMismatch { expected: usize, found: usize },
    /// A lower bound is greater than or equal to its corresponding upper bound.
    InvalidBound { dimension: usize, lower: f64, upper: f64 },
    /// A configuration's values fall outside the bounds of its space.
    OutOfBounds { dimension: usize, value: f64 },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { expected, found } => write!(
                f,
                "provided bounds length ({found}) does not match dimension ({expected})."
            ),
            Self::InvalidBound { dimension, lower, upper } => write!(
                f,
                "dimension {dimension}: lower bound {lower} is not less than upper bound {upper}."
            ),
            Self::OutOfBounds { dimension, value } => {
                write!(f, "dimension {dimension}: value {value} is outside bounds.")
            }
        }
    }
}
impl error::Error for ConfigurationError {}

/// Errors raised while attempting structural edits on a `Tree`.
///
/// These denote bugs in the tree editor, not expected runtime conditions: conforming callers
/// must never trigger them. They exist only to give internal consistency checks a typed message
/// to panic with.
#[derive(Debug, PartialEq)]
pub enum TreeError {
    /// A `NodeId`/`EdgeId` referenced a slot that has been removed or never existed.
    DanglingReference,
    /// `reroot` failed to restore the original root after a round-trip.
    RerootInvariantViolated,
    /// A node was found with more than one parent edge.
    MultipleParents,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingReference => write!(f, "tree arena slot no longer holds a value."),
            Self::RerootInvariantViolated => {
                write!(f, "reroot round-trip did not restore the original tree.")
            }
            Self::MultipleParents => write!(f, "node has more than one parent edge."),
        }
    }
}
impl error::Error for TreeError {}

/// Precondition violations internal to a `Replanner`. Never surfaced to callers of `replan()`:
/// they are logged and folded into `ReplanOutcome { success: false, mutated: false, .. }`.
#[derive(Debug, PartialEq)]
pub enum ReplanError {
    /// The path handed to the replanner has no obstructed edge.
    NothingObstructed,
    /// `current_configuration` does not lie on any edge of the current path.
    StartNotOnPath,
    /// The node beyond the last obstructed edge could not be located.
    ReplanGoalUnlocatable,
    /// No alternate path offered a valid bridge within the deadline.
    NoBridgeFound,
}

impl fmt::Display for ReplanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingObstructed => write!(f, "current path has no obstructed edge."),
            Self::StartNotOnPath => {
                write!(f, "current configuration does not lie on the current path.")
            }
            Self::ReplanGoalUnlocatable => {
                write!(f, "could not locate the node beyond the last obstruction.")
            }
            Self::NoBridgeFound => write!(f, "no alternate path produced a valid bridge."),
        }
    }
}
impl error::Error for ReplanError {}

/// Errors surfaced from the public `ReplannerManager` API.
#[derive(Debug, PartialEq)]
pub enum ManagerError {
    /// The scene service failed to respond; all threads have been signalled to stop.
    SceneServiceFailure,
    /// The supplied `ManagerConfig` is internally inconsistent.
    ConfigInvalid(String),
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SceneServiceFailure => {
                write!(f, "scene service call failed; shutting down.")
            }
            Self::ConfigInvalid(reason) => write!(f, "invalid manager configuration: {reason}"),
        }
    }
}
impl error::Error for ManagerError {}
