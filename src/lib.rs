// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! `oxreplan`: an online motion-replanning engine.
//!
//! A planner elsewhere produces an initial path through configuration space; this crate keeps
//! that path valid while a robot executes it. A [`tree::Tree`] holds the search structure a
//! planner grew, [`editor`] provides the rewire/extend primitives both replanners share,
//! [`sampler`] biases new samples toward the region that needs repair, and
//! [`replanner::drrt_star`]/[`replanner::mars`] are the two repair strategies
//! [`manager::ReplannerManager`] dispatches between. The geometric collision check
//! ([`checker::Checker`]), the scene service ([`manager::scene::SceneService`]), and SSM's
//! forward-kinematics evaluation ([`ssm::SsmEstimator`]) are all external collaborators this
//! crate only defines the boundary for.

pub mod checker;
pub mod configuration;
pub mod editor;
pub mod error;
pub mod manager;
pub mod metric;
pub mod replanner;
pub mod sampler;
pub mod ssm;
pub mod time;
pub mod tree;

pub use checker::Checker;
pub use configuration::{Bounds, Configuration};
pub use error::{ConfigurationError, ManagerError, ReplanError, TreeError};
pub use manager::{ManagerConfig, ReplannerManager};
pub use metric::Metric;
pub use replanner::{DrrtStarReplanner, MarsReplanner, ReplanOutcome, Replanner, ReplannerKind};
pub use tree::{Edge, EdgeId, Node, NodeId, Path, Tree};
