// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The Replanner Manager (spec §4.5, component C7): the multi-threaded control loop that ties
//! trajectory execution, collision checking, time-bounded replanning, and hot-swap together.
//!
//! Four long-lived threads, matching the density `skytable`'s server crate logs its connection
//! and task lifecycle at: trajectory tick, collision-check, replanner, and this struct's own
//! `run()` acting as the main/shutdown supervisor. Locks are acquired in the fixed order
//! `scene_mtx -> trj_mtx -> paths_mtx -> other_paths_mtx` and released in reverse (spec §5).

pub mod config;
pub mod scene;

pub use config::ManagerConfig;
pub use scene::{SceneService, SceneSnapshot, StaticScene};

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use parking_lot::Mutex;

use crate::{
    checker::Checker,
    configuration::Configuration,
    editor,
    error::ManagerError,
    metric::Metric,
    replanner::{DrrtStarReplanner, MarsReplanner, Replanner, ReplannerKind},
    time::{Duration, Instant},
    tree::Path,
};

struct TrajectoryState {
    current_configuration: Configuration,
    cursor: usize,
}

/// Ties the pieces together and owns the shared, lock-guarded state (spec §3 "Shared
/// snapshots"). Cloning an `Arc<Mutex<_>>` field, not the data it guards, is how every thread
/// gets its own handle onto the same shared datum.
pub struct ReplannerManager {
    config: ManagerConfig,
    checker: Box<dyn Checker>,
    metric: Arc<dyn Metric>,
    scene: Arc<Mutex<Box<dyn SceneService>>>,
    scene_mtx: Arc<Mutex<Option<SceneSnapshot>>>,
    trj_mtx: Arc<Mutex<TrajectoryState>>,
    paths_mtx: Arc<Mutex<Path>>,
    other_paths_mtx: Arc<Mutex<Vec<Path>>>,
    current_path_sync_needed: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    failure: Arc<Mutex<Option<ManagerError>>>,
}

impl ReplannerManager {
    pub fn new(
        config: ManagerConfig,
        initial_path: Path,
        initial_configuration: Configuration,
        checker: Box<dyn Checker>,
        metric: Arc<dyn Metric>,
        scene: Box<dyn SceneService>,
    ) -> Result<Self, ManagerError> {
        config.validate()?;
        Ok(ReplannerManager {
            config,
            checker,
            metric,
            scene: Arc::new(Mutex::new(scene)),
            scene_mtx: Arc::new(Mutex::new(None)),
            trj_mtx: Arc::new(Mutex::new(TrajectoryState { current_configuration: initial_configuration, cursor: 0 })),
            paths_mtx: Arc::new(Mutex::new(initial_path)),
            other_paths_mtx: Arc::new(Mutex::new(Vec::new())),
            current_path_sync_needed: Arc::new(AtomicBool::new(false)),
            stop: Arc::new(AtomicBool::new(false)),
            failure: Arc::new(Mutex::new(None)),
        })
    }

    /// Requests a clean shutdown; threads observe this at their next loop head or suspension
    /// point (spec §5 "Cancellation").
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// A snapshot of the currently executing path, safe to read from another thread.
    pub fn executing_path(&self) -> Path {
        self.paths_mtx.lock().clone()
    }

    /// The configuration most recently published by the trajectory thread.
    pub fn current_configuration(&self) -> Configuration {
        self.trj_mtx.lock().current_configuration.clone()
    }

    fn build_replanner(&self) -> Box<dyn Replanner> {
        match self.config.replanner_type {
            ReplannerKind::Mprrt | ReplannerKind::Drrt | ReplannerKind::DrrtStar | ReplannerKind::AnytimeDrrt => {
                Box::new(DrrtStarReplanner::new(
                    self.checker.box_clone(),
                    self.metric.clone(),
                    self.config.bounds.clone(),
                    self.config.max_distance,
                ))
            }
            ReplannerKind::Mars => Box::new(MarsReplanner::new(
                self.checker.box_clone(),
                self.metric.clone(),
                self.config.max_distance,
                self.config.mars_full_net_search,
            )),
            ReplannerKind::Marsha => {
                Box::new(MarsReplanner::new_marsha(self.checker.box_clone(), self.metric.clone(), self.config.max_distance))
            }
        }
    }

    /// Runs the trajectory, collision-check, and replanner threads until `request_stop()` is
    /// called or the scene service fails, then joins them. This call itself is the
    /// main/shutdown supervisor (spec §4.5, §5).
    ///
    /// Takes `&self` rather than consuming the manager: every worker thread only needs clones of
    /// the `Arc`-guarded fields, so a caller can keep a handle to call `request_stop()` from
    /// another thread while `run()` blocks (typically via `Arc<ReplannerManager>`).
    pub fn run(&self) -> Result<(), ManagerError> {
        let trajectory = {
            let trj_mtx = self.trj_mtx.clone();
            let paths_mtx = self.paths_mtx.clone();
            let stop = self.stop.clone();
            let period = self.config.dt;
            let goal_tol = self.config.goal_tol;
            thread::spawn(move || trajectory_tick_loop(trj_mtx, paths_mtx, stop, period, goal_tol))
        };

        let collision_check = {
            let scene = self.scene.clone();
            let scene_mtx = self.scene_mtx.clone();
            let trj_mtx = self.trj_mtx.clone();
            let paths_mtx = self.paths_mtx.clone();
            let other_paths_mtx = self.other_paths_mtx.clone();
            let stop = self.stop.clone();
            let checker = self.checker.box_clone();
            let metric = self.metric.clone();
            let failure = self.failure.clone();
            let period = Duration::from_secs_f64(1.0 / self.config.collision_checker_thread_frequency);
            thread::spawn(move || {
                collision_check_loop(scene, scene_mtx, trj_mtx, paths_mtx, other_paths_mtx, stop, checker, metric, failure, period)
            })
        };

        let replanner = {
            let trj_mtx = self.trj_mtx.clone();
            let paths_mtx = self.paths_mtx.clone();
            let other_paths_mtx = self.other_paths_mtx.clone();
            let sync_needed = self.current_path_sync_needed.clone();
            let stop = self.stop.clone();
            let dt_replan = self.config.dt_replan;
            let metric = self.metric.clone();
            let policy = self.build_replanner();
            thread::spawn(move || {
                replanner_loop(trj_mtx, paths_mtx, other_paths_mtx, sync_needed, stop, dt_replan, metric, policy)
            })
        };

        // Main/shutdown supervisor: watch the stop flag, then join every worker.
        while !self.stop.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(20));
        }
        log::info!("manager: stop requested, joining worker threads");

        let trajectory_result = trajectory.join();
        let collision_result = collision_check.join();
        let replanner_result = replanner.join();
        if trajectory_result.is_err() || collision_result.is_err() || replanner_result.is_err() {
            log::error!("manager: a worker thread panicked during shutdown");
        }
        if let Some(err) = self.failure.lock().take() {
            return Err(err);
        }
        Ok(())
    }
}

fn trajectory_tick_loop(
    trj_mtx: Arc<Mutex<TrajectoryState>>,
    paths_mtx: Arc<Mutex<Path>>,
    stop: Arc<AtomicBool>,
    period: Duration,
    goal_tol: f64,
) {
    log::debug!("trajectory: thread started");
    while !stop.load(Ordering::Acquire) {
        let path = paths_mtx.lock().clone();
        {
            let mut trj = trj_mtx.lock();
            if trj.cursor < path.edges.len() {
                let edge_id = path.edges[trj.cursor];
                let reference = {
                    let tree = path.tree.lock();
                    tree.node(tree.edge(edge_id).child).configuration.clone()
                };
                log::debug!("trajectory: publishing reference for edge {}", trj.cursor);
                let reached_goal = reference.distance(&trj.current_configuration) <= goal_tol && trj.cursor + 1 == path.edges.len();
                trj.current_configuration = reference;
                if !reached_goal {
                    trj.cursor += 1;
                }
            }
        }
        thread::sleep(period);
    }
    log::debug!("trajectory: thread stopping");
}

#[allow(clippy::too_many_arguments)]
fn collision_check_loop(
    scene: Arc<Mutex<Box<dyn SceneService>>>,
    scene_mtx: Arc<Mutex<Option<SceneSnapshot>>>,
    trj_mtx: Arc<Mutex<TrajectoryState>>,
    paths_mtx: Arc<Mutex<Path>>,
    other_paths_mtx: Arc<Mutex<Vec<Path>>>,
    stop: Arc<AtomicBool>,
    checker_template: Box<dyn Checker>,
    metric: Arc<dyn Metric>,
    failure: Arc<Mutex<Option<ManagerError>>>,
    period: Duration,
) {
    log::debug!("collision-check: thread started");
    while !stop.load(Ordering::Acquire) {
        let snapshot = {
            let mut scene = scene.lock();
            match scene.sample_scene() {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    log::error!("collision-check: scene service failed: {err}");
                    *failure.lock() = Some(ManagerError::SceneServiceFailure);
                    stop.store(true, Ordering::Release);
                    return;
                }
            }
        };
        *scene_mtx.lock() = Some(snapshot.clone());
        metric.update_scene(&snapshot.obstacle_positions);

        let cursor = trj_mtx.lock().cursor;

        let current_clone = paths_mtx.lock().deep_clone();
        let alternate_clones: Vec<Path> = other_paths_mtx.lock().iter().map(Path::deep_clone).collect();

        // Fan out: one task per alternate path plus one for the current path, all must
        // complete before the next scene update is committed (spec §5).
        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(alternate_clones.len() + 1);
            let positions = &snapshot.obstacle_positions;
            let current_ref = &current_clone;

            let metric_ref = &*metric;
            let mut current_checker = checker_template.box_clone();
            handles.push(scope.spawn(move || {
                current_checker.update_scene(positions);
                revalidate_edges(current_ref, current_checker.as_ref(), metric_ref);
            }));

            for alt in &alternate_clones {
                let mut alt_checker = checker_template.box_clone();
                handles.push(scope.spawn(move || {
                    alt_checker.update_scene(positions);
                    revalidate_edges(alt, alt_checker.as_ref(), metric_ref);
                }));
            }

            for handle in handles {
                let _ = handle.join();
            }
        });

        if current_clone.first_obstructed_index_after(cursor).is_some() {
            log::warn!("collision-check: path_obstructed beyond cursor {cursor}");
        }
        // The edges just re-validated on `current_clone`/`alternate_clones` live on separate
        // deep-cloned trees; commit their costs back onto the shared trees under the documented
        // lock order.
        {
            let path = paths_mtx.lock();
            copy_edge_costs(&current_clone, &path);
        }
        {
            let alts = other_paths_mtx.lock();
            for (clone, shared) in alternate_clones.iter().zip(alts.iter()) {
                copy_edge_costs(clone, shared);
            }
        }

        thread::sleep(period);
    }
    log::debug!("collision-check: thread stopping");
}

/// Re-validates every edge on `path` and recomputes its cost through the live `metric`, so an
/// SSM-weighted cost tracks obstacle motion cycle to cycle rather than staying fixed at the value
/// it was given when the edge was created (spec §8 property: MARSHA cost rises as an aware
/// obstacle approaches).
fn revalidate_edges(path: &Path, checker: &dyn Checker, metric: &dyn Metric) {
    let mut tree = path.tree.lock();
    for &edge_id in &path.edges {
        let (parent, child) = {
            let edge = tree.edge(edge_id);
            (edge.parent, edge.child)
        };
        let parent_conf = tree.node(parent).configuration.clone();
        let child_conf = tree.node(child).configuration.clone();
        let valid = checker.check_edge(&parent_conf, &child_conf);
        tree.edge_mut(edge_id).cost = if valid { metric.cost(&parent_conf, &child_conf) } else { f64::INFINITY };
    }
}

/// Copies costs from `from` (a deep-cloned, independently re-validated tree) onto `to`, edge by
/// edge, for exactly the path's own edge ids — the two trees share ids since `to` is what `from`
/// was cloned from.
fn copy_edge_costs(from: &Path, to: &Path) {
    let from_tree = from.tree.lock();
    let mut to_tree = to.tree.lock();
    for &edge_id in &from.edges {
        if let Some(edge) = from_tree.try_edge(edge_id) {
            if to_tree.try_edge(edge_id).is_some() {
                to_tree.edge_mut(edge_id).cost = edge.cost;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn replanner_loop(
    trj_mtx: Arc<Mutex<TrajectoryState>>,
    paths_mtx: Arc<Mutex<Path>>,
    other_paths_mtx: Arc<Mutex<Vec<Path>>>,
    sync_needed: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    dt_replan: Duration,
    metric: Arc<dyn Metric>,
    mut policy: Box<dyn Replanner>,
) {
    log::debug!("replanner: thread started");
    while !stop.load(Ordering::Acquire) {
        let (current_configuration, cursor) = {
            let trj = trj_mtx.lock();
            (trj.current_configuration.clone(), trj.cursor)
        };
        let current_path = paths_mtx.lock().clone();
        policy.set_alternate_paths(other_paths_mtx.lock().clone());

        if current_path.first_obstructed_index_after(cursor).is_some() {
            let deadline = Instant::now() + dt_replan.mul_f64(0.9);
            let outcome = policy.replan(&current_configuration, &current_path.deep_clone(), deadline);
            if outcome.success {
                log::debug!("replanner: repair succeeded, hot-swapping");
                hot_swap(&paths_mtx, &trj_mtx, &current_configuration, outcome.replanned_path, &*metric);
                sync_needed.store(true, Ordering::Release);
                other_paths_mtx.lock().push(current_path);
            } else if outcome.mutated {
                log::warn!("replanner: path changed but not improved, keeping the current path");
            } else {
                log::debug!("replanner: path unchanged");
            }
        }

        thread::sleep(dt_replan);
    }
    log::debug!("replanner: thread stopping");
}

/// The hot-swap protocol (spec §4.5): splits the replanned tree at `conf`, reroots there, and
/// installs it as the new `executing_path` under the documented lock order.
fn hot_swap(paths_mtx: &Mutex<Path>, trj_mtx: &Mutex<TrajectoryState>, conf: &Configuration, replanned: Path, metric: &dyn Metric) {
    let Some(goal) = replanned.goal() else {
        log::warn!("hot_swap: replanned path has no goal, dropping");
        return;
    };
    let mut tree = replanned.tree.lock().deep_clone();
    let Some(enclosing_index) = editor::locate_enclosing_edge(&tree, &replanned.edges, conf, metric) else {
        log::warn!("hot_swap: current configuration not found on the replanned path, dropping swap");
        return;
    };

    let new_current_node = tree.split_edge_at(replanned.edges[enclosing_index], conf.clone(), metric);
    tree.reroot(new_current_node);
    let new_edges = tree.path_to(goal);

    {
        let mut path = paths_mtx.lock();
        *path = Path::new(new_edges, Arc::new(Mutex::new(tree)), replanned.metric.clone());
    }
    {
        let mut trj = trj_mtx.lock();
        trj.cursor = 0;
        trj.current_configuration = conf.clone();
    }
    log::debug!("hot_swap: installed repaired path");
}
