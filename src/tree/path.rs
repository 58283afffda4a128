// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    metric::Metric,
    tree::{
        node::{EdgeId, NodeId},
        tree::Tree,
    },
};

/// An ordered sequence of edges `e_1..e_k` such that `child(e_i) = parent(e_{i+1})`, plus a
/// shared (not owned) handle to the `Tree` it was extracted from and a metric handle for cost
/// computation (spec §3).
///
/// A `Path` shares its `Tree` via `Arc<Mutex<Tree>>` rather than owning it: several `Path`s (the
/// executing path and the alternate-path bank) can reference the same or different trees, and
/// destroying a `Path` must never destroy its tree's nodes.
#[derive(Clone)]
pub struct Path {
    pub edges: Vec<EdgeId>,
    pub tree: Arc<Mutex<Tree>>,
    pub metric: Arc<dyn Metric>,
}

impl Path {
    pub fn new(edges: Vec<EdgeId>, tree: Arc<Mutex<Tree>>, metric: Arc<dyn Metric>) -> Self {
        Path { edges, tree, metric }
    }

    /// The root node of this path, i.e. the parent endpoint of its first edge, or the tree's
    /// root if the path is empty.
    pub fn start(&self) -> NodeId {
        let tree = self.tree.lock();
        self.edges.first().map(|&e| tree.edge(e).parent).unwrap_or_else(|| tree.root())
    }

    /// The final node of this path, i.e. the child endpoint of its last edge.
    pub fn goal(&self) -> Option<NodeId> {
        let tree = self.tree.lock();
        self.edges.last().map(|&e| tree.edge(e).child)
    }

    /// Sum of edge costs (spec §3 invariant: `cost(path) = Σ cost(edge)`).
    pub fn cost(&self) -> f64 {
        let tree = self.tree.lock();
        self.edges.iter().map(|&e| tree.edge(e).cost).sum()
    }

    /// `true` if any edge on the path currently has cost `+∞`.
    pub fn is_obstructed(&self) -> bool {
        let tree = self.tree.lock();
        self.edges.iter().any(|&e| tree.edge(e).is_obstructed())
    }

    /// The index, within `self.edges`, of the first obstructed edge, if any.
    pub fn first_obstructed_index(&self) -> Option<usize> {
        let tree = self.tree.lock();
        self.edges.iter().position(|&e| tree.edge(e).is_obstructed())
    }

    /// The index of the first obstructed edge strictly after `cursor` (the edge the trajectory
    /// thread is currently executing), matching the manager's "obstructed beyond the cursor"
    /// check (spec §4.5).
    pub fn first_obstructed_index_after(&self, cursor: usize) -> Option<usize> {
        let tree = self.tree.lock();
        self.edges
            .iter()
            .enumerate()
            .skip(cursor)
            .find(|&(_, &e)| tree.edge(e).is_obstructed())
            .map(|(i, _)| i)
    }

    /// The node ids visited by this path, root to goal, inclusive.
    pub fn nodes(&self) -> Vec<NodeId> {
        let tree = self.tree.lock();
        let mut nodes = Vec::with_capacity(self.edges.len() + 1);
        if let Some(&first) = self.edges.first() {
            nodes.push(tree.edge(first).parent);
        } else {
            nodes.push(tree.root());
            return nodes;
        }
        for &e in &self.edges {
            nodes.push(tree.edge(e).child);
        }
        nodes
    }

    /// Deep-clones the underlying tree into a fresh, independently-lockable `Tree`, so mutating
    /// the result can never alias `self` (spec §8 property 4; spec §4.4's "replanners operate on
    /// clones" contract).
    pub fn deep_clone(&self) -> Path {
        let cloned_tree = self.tree.lock().deep_clone();
        Path { edges: self.edges.clone(), tree: Arc::new(Mutex::new(cloned_tree)), metric: self.metric.clone() }
    }
}
