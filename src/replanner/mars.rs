// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

//! Multi-path anytime repair (spec §4.4): stitches the current path onto a precomputed alternate
//! "other path" via a single validated bridge edge, rather than regrowing a tree from scratch.
//! MARSHA is the same algorithm with an SSM-weighted `Metric` (see `crate::metric`) and
//! `full_net_search` permanently off.

use std::{collections::HashSet, sync::Arc};

use parking_lot::Mutex;

use crate::{
    checker::Checker,
    configuration::Configuration,
    editor::{self, CheckedCache},
    error::ReplanError,
    metric::Metric,
    replanner::{ReplanOutcome, Replanner},
    time::Instant,
    tree::{EdgeId, NodeId, Path, Tree},
};

/// One candidate stitch: connect `source` (a node already in the working tree) to `target`, the
/// `target_index`-th node of `alternate`, ordered by `bridge_cost` ascending.
struct Bridge {
    source: NodeId,
    alternate: usize,
    target_index: usize,
    bridge_cost: f64,
}

/// Repairs a path by bridging it onto a bank of precomputed alternate paths (spec §4.4).
///
/// `full_net_search: true` considers every node of the current tree as a possible bridge source;
/// `false` (the only option under MARSHA) considers only the node the obstruction was first
/// detected at, a much cheaper search.
pub struct MarsReplanner {
    checker: Box<dyn Checker>,
    metric: Arc<dyn Metric>,
    max_distance: f64,
    full_net_search: bool,
    other_paths: Vec<Path>,
}

impl MarsReplanner {
    /// Plain MARS: `full_net_search` is caller-controlled.
    pub fn new(checker: Box<dyn Checker>, metric: Arc<dyn Metric>, max_distance: f64, full_net_search: bool) -> Self {
        MarsReplanner { checker, metric, max_distance, full_net_search, other_paths: Vec::new() }
    }

    /// MARSHA: `metric` is expected to be an `SsmWeightedMetric`, and `full_net_search` is forced
    /// off (spec §4.4) — there is no way to turn it on via this constructor.
    pub fn new_marsha(checker: Box<dyn Checker>, ssm_weighted_metric: Arc<dyn Metric>, max_distance: f64) -> Self {
        MarsReplanner { checker, metric: ssm_weighted_metric, max_distance, full_net_search: false, other_paths: Vec::new() }
    }

    pub fn alternate_paths(&self) -> &[Path] {
        &self.other_paths
    }
}

impl Replanner for MarsReplanner {
    /// Replaces the bank of alternate paths the manager currently maintains. Called by the
    /// manager before each `replan` invocation, since the bank lives outside the pluggable
    /// replanner contract (spec §4.5).
    fn set_alternate_paths(&mut self, other_paths: Vec<Path>) {
        self.other_paths = other_paths;
    }

    fn replan(&mut self, current_configuration: &Configuration, current_path: &Path, deadline: Instant) -> ReplanOutcome {
        let metric: &dyn Metric = &*self.metric;
        let no_op = || ReplanOutcome { success: false, mutated: false, replanned_path: current_path.clone() };

        let enclosing_index = {
            let tree = current_path.tree.lock();
            editor::locate_enclosing_edge(&tree, &current_path.edges, current_configuration, metric)
        };
        let Some(enclosing_index) = enclosing_index else {
            log::warn!("mars: {}", ReplanError::StartNotOnPath);
            return no_op();
        };
        if current_path.first_obstructed_index_after(enclosing_index).is_none() {
            log::debug!("mars: {}", ReplanError::NothingObstructed);
            return no_op();
        }
        if self.other_paths.is_empty() {
            log::warn!("mars: {}", ReplanError::NoBridgeFound);
            return no_op();
        }

        let mut tree = current_path.tree.lock().deep_clone();

        // The last node the current path is still known valid at: the parent of the first
        // obstructed edge. Under `full_net_search` every node of the working tree is also a
        // candidate bridge source; otherwise only this one is.
        let obstruction_edge = current_path.edges[current_path.first_obstructed_index_after(enclosing_index).unwrap()];
        let bridge_source_anchor = tree.edge(obstruction_edge).parent;

        // Every candidate source must be reachable from the root without crossing an obstructed
        // edge itself — otherwise the prefix `path_to(source)` grafted onto the bridge would carry
        // an infinite-cost edge into the repaired path.
        let sources: Vec<NodeId> = if self.full_net_search {
            tree.node_ids().filter(|&id| tree.path_to(id).iter().all(|&e| !tree.edge(e).is_obstructed())).collect()
        } else {
            vec![bridge_source_anchor]
        };

        // How much of the current path's cost is already spent reaching the obstruction: the
        // threshold an alternate path's own progress must clear for its nodes to count as "beyond
        // the obstruction" (spec §4.4), rather than a needless detour back near the alternate
        // path's own start.
        let obstruction_progress = editor::cost_to_root(&tree, bridge_source_anchor);

        // Collect every (source, alternate path, target node) candidate, ordered by bridge cost.
        let mut candidates = Vec::new();
        for (alt_index, alt) in self.other_paths.iter().enumerate() {
            // Never bridge a path onto itself.
            if Arc::ptr_eq(&alt.tree, &current_path.tree) {
                continue;
            }
            let alt_nodes = alt.nodes();
            let alt_tree = alt.tree.lock();

            // Cumulative cost from the alternate path's own root to each of its nodes, so targets
            // that lie before the point of equivalent progress can be excluded.
            let mut alt_progress = Vec::with_capacity(alt_nodes.len());
            let mut running = 0.0;
            alt_progress.push(running);
            for &e in &alt.edges {
                running += alt_tree.edge(e).cost;
                alt_progress.push(running);
            }

            for &source in &sources {
                let source_conf = tree.node(source).configuration.clone();
                for (target_index, &target_node) in alt_nodes.iter().enumerate() {
                    if alt_progress[target_index] < obstruction_progress {
                        continue;
                    }
                    let target_conf = alt_tree.node(target_node).configuration.clone();
                    let bridge_cost = metric.cost(&source_conf, &target_conf);
                    candidates.push(Bridge { source, alternate: alt_index, target_index, bridge_cost });
                }
            }
        }
        candidates.sort_by(|a, b| a.bridge_cost.partial_cmp(&b.bridge_cost).unwrap());

        let mut stitched: Option<(NodeId, Vec<EdgeId>, usize)> = None;
        for candidate in &candidates {
            if Instant::now() >= deadline {
                break;
            }
            let alt = &self.other_paths[candidate.alternate];
            let alt_nodes = alt.nodes();
            let target_node = alt_nodes[candidate.target_index];
            let source_conf = tree.node(candidate.source).configuration.clone();
            let (target_conf, suffix) = {
                let alt_tree = alt.tree.lock();
                let target_conf = alt_tree.node(target_node).configuration.clone();
                // Suffix: every edge of `alt` from `target_index` onward, carried as
                // (parent_conf, child_conf, cost) triples so they can be grafted without holding
                // `alt`'s lock while mutating `tree`.
                let suffix: Vec<(Configuration, Configuration, f64)> = alt.edges[candidate.target_index..]
                    .iter()
                    .map(|&e| {
                        let edge = alt_tree.edge(e);
                        (
                            alt_tree.node(edge.parent).configuration.clone(),
                            alt_tree.node(edge.child).configuration.clone(),
                            edge.cost,
                        )
                    })
                    .collect();
                (target_conf, suffix)
            };

            if candidate.bridge_cost > 0.0 && !self.checker.check_edge(&source_conf, &target_conf) {
                continue;
            }

            // Graft: insert the target node and its suffix chain into the working tree.
            let grafted_target = tree.insert_node(target_conf.clone());
            tree.add_edge(candidate.source, grafted_target, candidate.bridge_cost);
            let mut cursor = grafted_target;
            let mut new_edges = Vec::with_capacity(suffix.len() + 1);
            new_edges.push(tree.node(cursor).parent_edge.unwrap());
            for (_, child_conf, cost) in &suffix {
                let child = tree.insert_node(child_conf.clone());
                new_edges.push(tree.add_edge(cursor, child, *cost));
                cursor = child;
            }
            stitched = Some((candidate.source, new_edges, candidate.alternate));
            break;
        }

        let Some((source, bridge_and_suffix, used_alternate)) = stitched else {
            log::warn!("mars: {}", ReplanError::NoBridgeFound);
            return no_op();
        };

        let prefix = tree.path_to(source);
        let mut new_edges = prefix;
        new_edges.extend(bridge_and_suffix);

        // Anytime improvement: local rewiring around the stitched region while budget remains.
        let mut cache = CheckedCache::new();
        let white_list: HashSet<NodeId> =
            new_edges.iter().flat_map(|&e| [tree.edge(e).parent, tree.edge(e).child]).collect();
        while Instant::now() < deadline {
            let improved = editor::rewire_only_with_path_check(
                &mut tree,
                source,
                &mut cache,
                3.0 * self.max_distance,
                &white_list,
                2,
                metric,
                &*self.checker,
            );
            if improved == 0 {
                break;
            }
        }

        log::debug!(
            "mars: stitched onto alternate path {} with {} edges in the repaired path",
            used_alternate,
            new_edges.len()
        );
        self.other_paths.push(current_path.clone());

        ReplanOutcome {
            success: true,
            mutated: true,
            replanned_path: Path::new(new_edges, Arc::new(Mutex::new(tree)), self.metric.clone()),
        }
    }
}
