// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! The Tree Editor (spec §4.2, component C4): time-bounded rewire/extend operations with
//! path-preservation guards. These are free functions over a borrowed `Tree` rather than a type
//! of their own — the editor is a set of algorithms, not a resource that owns state, the same
//! way `RRTStar::check_motion` in the teacher planner is a small pure helper over borrowed
//! fields rather than a struct.

use std::collections::{HashMap, HashSet};

use crate::{
    checker::Checker,
    configuration::Configuration,
    metric::Metric,
    tree::{EdgeId, NodeId, Tree},
};

/// Edges whose validity was already established during the current replanning call, keyed by
/// the unordered pair of node ids. Consulting this before a fresh `Checker` query lets
/// `rewire`/`rewire_only_with_path_check` skip redundant collision checks within one call.
pub type CheckedCache = HashMap<(NodeId, NodeId), bool>;

fn cache_key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn cached_check(cache: &mut CheckedCache, checker: &dyn Checker, tree: &Tree, a: NodeId, b: NodeId) -> bool {
    let key = cache_key(a, b);
    if let Some(&valid) = cache.get(&key) {
        return valid;
    }
    let valid = checker.check_edge(&tree.node(a).configuration, &tree.node(b).configuration);
    cache.insert(key, valid);
    valid
}

pub(crate) fn cost_to_root(tree: &Tree, node: NodeId) -> f64 {
    tree.path_to(node).iter().map(|&e| tree.edge(e).cost).sum()
}

/// The index, within `edges`, of the edge that `conf` lies on — the one edge whose endpoint
/// distances sum to its own cost. An infinite-cost (obstructed) edge never matches, since a
/// robot cannot be sitting inside an obstruction (used by both replanners to locate the point
/// where the tree must be cut to insert the robot's current configuration).
pub(crate) fn locate_enclosing_edge(tree: &Tree, edges: &[EdgeId], conf: &Configuration, metric: &dyn Metric) -> Option<usize> {
    edges.iter().position(|&e| {
        let edge = tree.edge(e);
        let d1 = metric.cost(&tree.node(edge.parent).configuration, conf);
        let d2 = metric.cost(conf, &tree.node(edge.child).configuration);
        (d1 + d2 - edge.cost).abs() < 1e-6
    })
}

/// `true` if `edge_id` connects two nodes that are both on the white-listed path: such an edge
/// must never be removed, since doing so would make a white-listed node unreachable from the
/// root along the path's original edge sequence (spec §4.2).
fn edge_is_protected(tree: &Tree, edge_id: EdgeId, white_list: &HashSet<NodeId>) -> bool {
    let edge = tree.edge(edge_id);
    white_list.contains(&edge.parent) && white_list.contains(&edge.child)
}

/// A classical RRT step toward `q`, limited to `max_distance`. Returns the newly inserted node,
/// or `None` if the tree is empty or the step is invalid.
pub fn extend(
    tree: &mut Tree,
    q: &Configuration,
    max_distance: f64,
    metric: &dyn Metric,
    checker: &dyn Checker,
    cache: &mut CheckedCache,
) -> Option<NodeId> {
    extend_in(tree, q, max_distance, metric, checker, cache, None)
}

/// Like `extend`, but the nearest-neighbor search is restricted to `allowed` node ids when given
/// (DRRT★ Phase B confines growth to a `subtree`, spec §4.3 step 7).
pub fn extend_in(
    tree: &mut Tree,
    q: &Configuration,
    max_distance: f64,
    metric: &dyn Metric,
    checker: &dyn Checker,
    cache: &mut CheckedCache,
    allowed: Option<&HashSet<NodeId>>,
) -> Option<NodeId> {
    let nearest = tree.nearest_in(q, metric, allowed)?;
    let near_conf = tree.node(nearest).configuration.clone();
    let dist = metric.cost(&near_conf, q);

    let new_conf = if dist > max_distance && dist > 0.0 {
        near_conf.interpolate(q, max_distance / dist)
    } else {
        q.clone()
    };

    if !checker.check_edge(&near_conf, &new_conf) {
        return None;
    }

    let cost = metric.cost(&near_conf, &new_conf);
    let new_node = tree.insert_node(new_conf);
    tree.add_edge(nearest, new_node, cost);
    cache.insert(cache_key(nearest, new_node), true);
    Some(new_node)
}

/// Inserts a nearest-neighbor step toward `q`, then attempts to reparent the new node and its
/// neighbors within `radius` to reduce cost, skipping any reparenting that would remove an edge
/// on `white_list`. Returns the inserted node on success (spec §4.2).
#[allow(clippy::too_many_arguments)]
pub fn rewire(
    tree: &mut Tree,
    q: &Configuration,
    cache: &mut CheckedCache,
    radius: f64,
    white_list: &HashSet<NodeId>,
    max_distance: f64,
    metric: &dyn Metric,
    checker: &dyn Checker,
) -> Option<NodeId> {
    rewire_in(tree, q, cache, radius, white_list, max_distance, metric, checker, None)
}

/// Like `rewire`, but both the initial `extend` step and the neighbour search it performs are
/// restricted to `allowed` node ids when given.
#[allow(clippy::too_many_arguments)]
pub fn rewire_in(
    tree: &mut Tree,
    q: &Configuration,
    cache: &mut CheckedCache,
    radius: f64,
    white_list: &HashSet<NodeId>,
    max_distance: f64,
    metric: &dyn Metric,
    checker: &dyn Checker,
    allowed: Option<&HashSet<NodeId>>,
) -> Option<NodeId> {
    let new_node = extend_in(tree, q, max_distance, metric, checker, cache, allowed)?;
    let new_conf = tree.node(new_node).configuration.clone();
    let neighbours: Vec<NodeId> = tree
        .within_radius_in(&new_conf, radius, metric, allowed)
        .into_iter()
        .filter(|&n| n != new_node)
        .collect();

    // Choose-parent: is there a cheaper parent for the new node among its neighbours?
    let current_parent = tree.edge(tree.node(new_node).parent_edge.unwrap()).parent;
    let mut best_parent = current_parent;
    let mut best_cost = cost_to_root(tree, new_node);
    for &nb in &neighbours {
        let nb_conf = tree.node(nb).configuration.clone();
        let candidate_cost = cost_to_root(tree, nb) + metric.cost(&nb_conf, &new_conf);
        if candidate_cost < best_cost && cached_check(cache, checker, tree, nb, new_node) {
            best_cost = candidate_cost;
            best_parent = nb;
        }
    }
    if best_parent != current_parent {
        let pe = tree.node(new_node).parent_edge.unwrap();
        tree.remove_edge(pe);
        let cost = metric.cost(&tree.node(best_parent).configuration.clone(), &new_conf);
        tree.add_edge(best_parent, new_node, cost);
    }

    // Rewire: does routing any neighbour through the new node reduce its cost?
    for &nb in &neighbours {
        if nb == best_parent {
            continue;
        }
        let Some(pe) = tree.node(nb).parent_edge else { continue };
        if edge_is_protected(tree, pe, white_list) {
            continue;
        }
        let nb_conf = tree.node(nb).configuration.clone();
        let via_new = cost_to_root(tree, new_node) + metric.cost(&new_conf, &nb_conf);
        if via_new < cost_to_root(tree, nb) && cached_check(cache, checker, tree, new_node, nb) {
            tree.remove_edge(pe);
            let cost = metric.cost(&new_conf, &nb_conf);
            tree.add_edge(new_node, nb, cost);
        }
    }

    Some(new_node)
}

fn traversal_neighbourhood(tree: &Tree, origin: NodeId, depth: usize) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    visited.insert(origin);
    let mut frontier = vec![origin];
    for _ in 0..depth {
        let mut next = Vec::new();
        for &n in &frontier {
            let node = tree.node(n);
            let mut neighbours: Vec<NodeId> = node.child_edges.iter().map(|&e| tree.edge(e).child).collect();
            if let Some(pe) = node.parent_edge {
                neighbours.push(tree.edge(pe).parent);
            }
            for nb in neighbours {
                if visited.insert(nb) {
                    next.push(nb);
                }
            }
        }
        frontier = next;
    }
    visited
}

/// A pure rewire pass within `radius` of `origin`, limited to nodes reachable within
/// `depth` tree hops of `origin`; no new node is added. Returns the number of edges
/// reparented (spec §4.2).
#[allow(clippy::too_many_arguments)]
pub fn rewire_only_with_path_check(
    tree: &mut Tree,
    origin: NodeId,
    cache: &mut CheckedCache,
    radius: f64,
    white_list: &HashSet<NodeId>,
    depth: usize,
    metric: &dyn Metric,
    checker: &dyn Checker,
) -> usize {
    rewire_only_with_path_check_in(tree, origin, cache, radius, white_list, depth, metric, checker, None)
}

/// Like `rewire_only_with_path_check`, but candidates are additionally restricted to `allowed`
/// node ids when given.
#[allow(clippy::too_many_arguments)]
pub fn rewire_only_with_path_check_in(
    tree: &mut Tree,
    origin: NodeId,
    cache: &mut CheckedCache,
    radius: f64,
    white_list: &HashSet<NodeId>,
    depth: usize,
    metric: &dyn Metric,
    checker: &dyn Checker,
    allowed: Option<&HashSet<NodeId>>,
) -> usize {
    let origin_conf = tree.node(origin).configuration.clone();
    let candidates: Vec<NodeId> = traversal_neighbourhood(tree, origin, depth)
        .into_iter()
        .filter(|&n| allowed.map_or(true, |a| a.contains(&n)))
        .filter(|&n| metric.cost(&origin_conf, &tree.node(n).configuration) <= radius)
        .collect();

    let mut improvements = 0;
    for &n in &candidates {
        if n == tree.root() {
            continue;
        }
        let Some(pe) = tree.node(n).parent_edge else { continue };
        if edge_is_protected(tree, pe, white_list) {
            continue;
        }
        let n_conf = tree.node(n).configuration.clone();
        let current_parent = tree.edge(pe).parent;
        let mut best = (current_parent, cost_to_root(tree, n));
        for &candidate_parent in &candidates {
            if candidate_parent == n {
                continue;
            }
            let candidate_conf = tree.node(candidate_parent).configuration.clone();
            let candidate_cost = cost_to_root(tree, candidate_parent) + metric.cost(&candidate_conf, &n_conf);
            if candidate_cost < best.1 && cached_check(cache, checker, tree, candidate_parent, n) {
                best = (candidate_parent, candidate_cost);
            }
        }
        if best.0 != current_parent {
            tree.remove_edge(pe);
            let cost = metric.cost(&tree.node(best.0).configuration.clone(), &n_conf);
            tree.add_edge(best.0, n, cost);
            improvements += 1;
        }
    }
    improvements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{checker::SphericalObstacleChecker, metric::EuclideanMetric};

    fn conf(v: f64) -> Configuration {
        Configuration::new(vec![v, 0.0])
    }

    #[test]
    fn extend_adds_node_toward_target_respecting_max_distance() {
        let mut tree = Tree::new(conf(0.0));
        let metric = EuclideanMetric;
        let checker = SphericalObstacleChecker::new();
        let mut cache = CheckedCache::new();

        let new_node = extend(&mut tree, &conf(5.0), 1.0, &metric, &checker, &mut cache).unwrap();
        assert!((tree.node(new_node).configuration.values[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn extend_blocked_by_obstacle_returns_none() {
        let mut tree = Tree::new(conf(0.0));
        let metric = EuclideanMetric;
        let checker = SphericalObstacleChecker::new().with_obstacle(conf(0.5), 0.3);
        let mut cache = CheckedCache::new();

        assert!(extend(&mut tree, &conf(5.0), 1.0, &metric, &checker, &mut cache).is_none());
    }

    #[test]
    fn rewire_never_removes_a_protected_path_edge() {
        let mut tree = Tree::new(conf(0.0));
        let n1 = tree.insert_node(conf(1.0));
        tree.add_edge(tree.root(), n1, 1.0);
        let n2 = tree.insert_node(conf(2.0));
        tree.add_edge(n1, n2, 1.0);

        let white_list: HashSet<NodeId> = [tree.root(), n1, n2].into_iter().collect();
        let metric = EuclideanMetric;
        let checker = SphericalObstacleChecker::new();
        let mut cache = CheckedCache::new();

        // A shortcut candidate close to both n1 and n2 that would otherwise look attractive.
        rewire(&mut tree, &conf(1.5), &mut cache, 5.0, &white_list, 2.0, &metric, &checker);

        tree.check_invariants();
        let edge_n1_n2 = tree.node(n1).child_edges.iter().find(|&&e| tree.edge(e).child == n2);
        assert!(edge_n1_n2.is_some(), "protected path edge must survive rewiring");
    }

    #[test]
    fn rewire_only_with_path_check_improves_without_adding_nodes() {
        fn p(x: f64, y: f64) -> Configuration {
            Configuration::new(vec![x, y])
        }

        let mut tree = Tree::new(p(0.0, 0.0));
        // A is a deliberate detour: root -> A -> n1 costs 11, far more than going near n1 directly.
        let a = tree.insert_node(p(10.0, 0.0));
        tree.add_edge(tree.root(), a, 10.0);
        let n1 = tree.insert_node(p(10.0, 1.0));
        tree.add_edge(a, n1, 1.0);
        // n2 sits close to n1 but is cheap to reach straight from the root.
        let n2 = tree.insert_node(p(0.5, 1.0));
        tree.add_edge(tree.root(), n2, p(0.0, 0.0).distance(&p(0.5, 1.0)));

        let metric = EuclideanMetric;
        let checker = SphericalObstacleChecker::new();
        let mut cache = CheckedCache::new();
        let before = tree.node_ids().count();
        let original_cost = cost_to_root(&tree, n1);
        assert!((original_cost - 11.0).abs() < 1e-9);

        let root = tree.root();
        rewire_only_with_path_check(&mut tree, root, &mut cache, 20.0, &HashSet::new(), 2, &metric, &checker);

        assert_eq!(tree.node_ids().count(), before);
        tree.check_invariants();
        assert!(cost_to_root(&tree, n1) < original_cost);
    }
}
