// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The scene boundary: where the manager's collision-check thread gets the latest obstacle
//! state. Like `Checker`, a real implementation (backed by a perception stack) is an external
//! collaborator out of scope for this crate (spec §1); this module only defines the interface.

use crate::{error::ManagerError, ssm::Point3};

/// A snapshot of the world the collision-check thread re-validates edges against.
#[derive(Clone, Debug)]
pub struct SceneSnapshot {
    pub obstacle_positions: Vec<Point3>,
    pub obstacle_ids: Vec<String>,
}

/// The scene service, sampled once per collision-check cycle under `scene_mtx` (spec §5). A
/// failure here is fatal to the whole manager: `run()` signals `stop` and returns the error
/// (spec §4.5, "a call-failure to the scene service stops all threads cleanly").
pub trait SceneService: Send {
    fn sample_scene(&mut self) -> Result<SceneSnapshot, ManagerError>;
}

/// A `SceneService` that always returns a fixed snapshot; used by tests and examples that drive
/// obstacle changes by constructing a new manager run rather than a live perception feed.
pub struct StaticScene {
    snapshot: SceneSnapshot,
}

impl StaticScene {
    pub fn new(snapshot: SceneSnapshot) -> Self {
        StaticScene { snapshot }
    }
}

impl SceneService for StaticScene {
    fn sample_scene(&mut self) -> Result<SceneSnapshot, ManagerError> {
        Ok(self.snapshot.clone())
    }
}
