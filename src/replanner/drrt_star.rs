// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! Local-informed RRT★ repair (spec §4.3): rewires the tree behind the first obstructed edge
//! rather than replanning from scratch. `MPRRT`, `DRRT`, `DRRT★` and `anytimeDRRT` (spec.md §6's
//! `replanner_type`) all resolve to this one implementation — the source commits to
//! `rewireBehindObs` semantics for the whole family (spec §9).

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};

use crate::{
    checker::Checker,
    configuration::{Bounds, Configuration},
    editor::{self, CheckedCache},
    error::ReplanError,
    metric::Metric,
    replanner::{ReplanOutcome, Replanner},
    time::Instant,
    sampler::{Ball, LocalInformedSampler},
    tree::{NodeId, Path, Tree},
};

/// Rewires the tree behind the first obstructed edge on the current path, biasing growth toward
/// the stale subtree's reattachment point with a `LocalInformedSampler` (spec §4.3).
pub struct DrrtStarReplanner {
    checker: Box<dyn Checker>,
    metric: Arc<dyn Metric>,
    bounds: Bounds,
    max_distance: f64,
    rng: StdRng,
}

impl DrrtStarReplanner {
    pub fn new(checker: Box<dyn Checker>, metric: Arc<dyn Metric>, bounds: Bounds, max_distance: f64) -> Self {
        DrrtStarReplanner { checker, metric, bounds, max_distance, rng: StdRng::from_os_rng() }
    }
}

impl Replanner for DrrtStarReplanner {
    fn replan(&mut self, current_configuration: &Configuration, current_path: &Path, deadline: Instant) -> ReplanOutcome {
        let start = Instant::now();
        let metric: &dyn Metric = &*self.metric;
        let no_op = || ReplanOutcome { success: false, mutated: false, replanned_path: current_path.clone() };

        let Some(goal) = current_path.goal() else {
            log::warn!("drrt_star: current path has no edges, nothing to repair");
            return no_op();
        };

        let enclosing_index = {
            let tree = current_path.tree.lock();
            editor::locate_enclosing_edge(&tree, &current_path.edges, current_configuration, metric)
        };
        let Some(enclosing_index) = enclosing_index else {
            log::warn!("drrt_star: {}", ReplanError::StartNotOnPath);
            return no_op();
        };
        if current_path.first_obstructed_index_after(enclosing_index).is_none() {
            log::debug!("drrt_star: {}", ReplanError::NothingObstructed);
            return no_op();
        }

        let mut tree = current_path.tree.lock().deep_clone();
        let original_root = tree.root();
        let enclosing_edge = current_path.edges[enclosing_index];

        // Steps 1-2: split at the current configuration, then reroot there.
        let node_replan = tree.split_edge_at(enclosing_edge, current_configuration.clone(), metric);
        let forward_head = tree.node(node_replan).child_edges[0];
        tree.reroot(node_replan);

        // Step 3: replan_goal is the child of the last obstructed edge in the forward remainder,
        // i.e. from node_replan toward the original goal — never the backward branch that reroot
        // just reversed.
        let mut forward = vec![forward_head];
        forward.extend_from_slice(&current_path.edges[enclosing_index + 1..]);
        let Some(&last_obstructed) = forward.iter().rev().find(|&&e| tree.edge(e).is_obstructed()) else {
            log::warn!("drrt_star: {}", ReplanError::NothingObstructed);
            tree.reroot(original_root);
            tree.remove_node_if_unreferenced(node_replan);
            return no_op();
        };
        let replan_goal = tree.edge(last_obstructed).child;

        // Step 4.
        let node_replan_conf = tree.node(node_replan).configuration.clone();
        let replan_goal_conf = tree.node(replan_goal).configuration.clone();
        let radius = 1.5 * metric.cost(&node_replan_conf, &replan_goal_conf);
        let mut sampler =
            LocalInformedSampler::new(node_replan_conf.clone(), replan_goal_conf.clone(), radius, self.bounds.clone());
        sampler.add_ball(Ball { center: node_replan_conf, radius });

        let mut cache = CheckedCache::new();
        let white_list: HashSet<NodeId> = current_path.nodes().into_iter().collect();

        // Phase A: local rewire, no new nodes, around node_replan.
        editor::rewire_only_with_path_check(&mut tree, node_replan, &mut cache, radius, &white_list, 2, metric, &*self.checker);

        // Step 6: scope Phase B to the freshly-rerooted subtree, never the stale branch past
        // replan_goal.
        let black_list: HashSet<NodeId> = [replan_goal].into_iter().collect();
        let subtree = tree.subtree(node_replan, &black_list);

        // Step 7: Phase B, anytime improvement under 0.98 of the remaining budget.
        let total_budget = deadline.saturating_duration_since(start);
        let phase_b_deadline = start + total_budget.mul_f64(0.98);
        let mut success = false;
        while Instant::now() < phase_b_deadline {
            let q = sampler.sample(&mut self.rng);
            let Some(new_node) = editor::rewire_in(
                &mut tree,
                &q,
                &mut cache,
                radius,
                &white_list,
                self.max_distance,
                metric,
                &*self.checker,
                Some(&subtree),
            ) else {
                continue;
            };

            let new_conf = tree.node(new_node).configuration.clone();
            let dist_to_goal = metric.cost(&new_conf, &replan_goal_conf);
            if dist_to_goal > self.max_distance || !self.checker.check_edge(&new_conf, &replan_goal_conf) {
                continue;
            }
            let candidate_cost = editor::cost_to_root(&tree, new_node) + dist_to_goal;
            let current_cost = editor::cost_to_root(&tree, replan_goal);
            if candidate_cost < current_cost {
                if let Some(old_parent_edge) = tree.node(replan_goal).parent_edge {
                    tree.remove_edge(old_parent_edge);
                }
                tree.add_edge(new_node, replan_goal, dist_to_goal);
                success = true;
                break;
            }
        }

        if success {
            // Step 8: extract the repaired path while node_replan is still the root, then restore.
            let new_path_edges = tree.path_to(goal);
            tree.reroot(original_root);
            log::debug!("drrt_star: replan succeeded, {} edges in repaired path", new_path_edges.len());
            ReplanOutcome {
                success: true,
                mutated: true,
                replanned_path: Path::new(new_path_edges, Arc::new(Mutex::new(tree)), self.metric.clone()),
            }
        } else {
            // Step 9.
            tree.reroot(original_root);
            let fully_cleaned = tree.remove_node_if_unreferenced(node_replan);
            if fully_cleaned {
                log::debug!("drrt_star: replan failed within deadline, path unchanged");
                ReplanOutcome { success: false, mutated: false, replanned_path: current_path.clone() }
            } else {
                log::warn!("drrt_star: replan failed, node_replan still referenced after rollback");
                ReplanOutcome { success: false, mutated: true, replanned_path: current_path.clone() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{checker::SphericalObstacleChecker, metric::EuclideanMetric};
    use std::time::Duration;

    fn p(x: f64, y: f64) -> Configuration {
        Configuration::new(vec![x, y])
    }

    fn bounds() -> Bounds {
        Bounds::new(vec![-10.0, -10.0], vec![10.0, 10.0]).unwrap()
    }

    // S1 (spec §8): straight path (0,0)->(1,0)->(2,0), obstacle on the second edge. DRRT★ should
    // insert a node near the obstruction and reconnect to (2,0), at no great cost increase.
    fn obstructed_straight_path() -> Path {
        let mut tree = Tree::new(p(0.0, 0.0));
        let n1 = tree.insert_node(p(1.0, 0.0));
        let e1 = tree.add_edge(tree.root(), n1, 1.0);
        let n2 = tree.insert_node(p(2.0, 0.0));
        let e2 = tree.add_edge(n1, n2, f64::INFINITY);
        Path::new(vec![e1, e2], Arc::new(Mutex::new(tree)), Arc::new(EuclideanMetric))
    }

    #[test]
    fn repairs_single_obstructed_edge_and_reconnects_goal() {
        let checker = SphericalObstacleChecker::new().with_obstacle(p(1.5, 0.0), 0.2);
        let mut replanner = DrrtStarReplanner::new(Box::new(checker), Arc::new(EuclideanMetric), bounds(), 1.0);
        let path = obstructed_straight_path();

        let outcome = replanner.replan(&p(1.0, 0.0), &path, Instant::now() + Duration::from_millis(200));

        assert!(outcome.success, "expected a successful repair around a single obstruction");
        assert!(outcome.mutated);
        assert!(outcome.replanned_path.edges.len() <= 3);
        assert!(outcome.replanned_path.cost() <= 1.5 * 1.0 + 1.0 /* pre-obstacle leg */);
    }

    #[test]
    fn nothing_obstructed_is_a_silent_no_op() {
        let mut tree = Tree::new(p(0.0, 0.0));
        let n1 = tree.insert_node(p(1.0, 0.0));
        let e1 = tree.add_edge(tree.root(), n1, 1.0);
        let path = Path::new(vec![e1], Arc::new(Mutex::new(tree)), Arc::new(EuclideanMetric));

        let checker = SphericalObstacleChecker::new();
        let mut replanner = DrrtStarReplanner::new(Box::new(checker), Arc::new(EuclideanMetric), bounds(), 1.0);
        let outcome = replanner.replan(&p(0.0, 0.0), &path, Instant::now() + Duration::from_millis(50));

        assert!(!outcome.success);
        assert!(!outcome.mutated);
        assert_eq!(outcome.replanned_path.edges, path.edges);
    }

    // Property 8 (spec §8): when only the last edge is obstructed, replan_goal must be that
    // edge's child.
    #[test]
    fn replan_goal_is_child_of_last_obstructed_edge_when_it_is_the_final_edge() {
        let mut tree = Tree::new(p(0.0, 0.0));
        let n1 = tree.insert_node(p(1.0, 0.0));
        let e1 = tree.add_edge(tree.root(), n1, 1.0);
        let n2 = tree.insert_node(p(2.0, 0.0));
        let e2 = tree.add_edge(n1, n2, f64::INFINITY);
        let path = Path::new(vec![e1, e2], Arc::new(Mutex::new(tree)), Arc::new(EuclideanMetric));

        let checker = SphericalObstacleChecker::new().with_obstacle(p(1.5, 0.0), 0.2);
        let mut replanner = DrrtStarReplanner::new(Box::new(checker), Arc::new(EuclideanMetric), bounds(), 1.0);
        let outcome = replanner.replan(&p(0.5, 0.0), &path, Instant::now() + Duration::from_millis(200));

        assert!(outcome.success);
        let tree = outcome.replanned_path.tree.lock();
        let goal_conf = &tree.node(tree.edge(*outcome.replanned_path.edges.last().unwrap()).child).configuration;
        assert!((goal_conf.values[0] - 2.0).abs() < 1e-9 && goal_conf.values[1].abs() < 1e-9);
    }

    #[test]
    fn failed_repair_leaves_original_path_object_untouched() {
        // An obstacle that also blocks every detour the sampler could take, and a deadline too
        // short for Phase B to find anything: node_replan must be rolled back and cleaned up.
        let checker = SphericalObstacleChecker::new().with_obstacle(p(1.5, 0.0), 5.0);
        let mut replanner = DrrtStarReplanner::new(Box::new(checker), Arc::new(EuclideanMetric), bounds(), 1.0);
        let path = obstructed_straight_path();
        let original_edges = path.edges.clone();

        let outcome = replanner.replan(&p(1.0, 0.0), &path, Instant::now() + Duration::from_millis(5));

        assert!(!outcome.success);
        assert_eq!(outcome.replanned_path.edges, original_edges);
        // The input path's own tree must never have been touched; the replanner only ever
        // mutates a clone.
        assert_eq!(path.edges, original_edges);
    }
}
