// Copyright (c) 2025 Junior Sundar
//
// SPDX-License-Identifier: BSD-3-Clause

use std::collections::HashSet;

use crate::{
    configuration::Configuration,
    metric::Metric,
    tree::{
        edge::Edge,
        node::{EdgeId, Node, NodeId},
    },
};

/// A rooted collection of nodes and edges, stored as two arenas keyed by integer id (spec §9):
/// this breaks the parent↔child ownership cycle an `Rc<RefCell<_>>` graph would otherwise
/// require. Removed slots are tombstoned (`None`) rather than compacted, so previously issued
/// `NodeId`/`EdgeId` values stay valid for the lifetime of the `Tree`.
#[derive(Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    root: NodeId,
}

impl Tree {
    /// Creates a new single-node tree rooted at `root_configuration`.
    pub fn new(root_configuration: Configuration) -> Self {
        Tree { nodes: vec![Some(Node::new(root_configuration))], edges: Vec::new(), root: 0 }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.nodes[id].as_ref().expect("dangling NodeId")
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id].as_mut().expect("dangling NodeId")
    }

    pub fn try_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        self.edges[id].as_ref().expect("dangling EdgeId")
    }

    pub fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        self.edges[id].as_mut().expect("dangling EdgeId")
    }

    pub fn try_edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id).and_then(|e| e.as_ref())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.get(id).map_or(false, |n| n.is_some())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, n)| n.as_ref().map(|_| i))
    }

    /// Inserts a freestanding node with no parent edge. Used to seed a tree or to attach a node
    /// that will be connected via `add_edge` immediately afterwards.
    pub fn insert_node(&mut self, configuration: Configuration) -> NodeId {
        self.nodes.push(Some(Node::new(configuration)));
        self.nodes.len() - 1
    }

    /// Connects `parent` to `child` with the given `cost`. `child` must not already have a
    /// parent edge — the invariant that a node has at most one parent edge is enforced here.
    pub fn add_edge(&mut self, parent: NodeId, child: NodeId, cost: f64) -> EdgeId {
        debug_assert!(
            self.node(child).parent_edge.is_none(),
            "node already has a parent edge"
        );
        self.edges.push(Some(Edge::new(parent, child, cost)));
        let id = self.edges.len() - 1;
        self.node_mut(parent).child_edges.push(id);
        self.node_mut(child).parent_edge = Some(id);
        id
    }

    /// Detaches an edge from both endpoints and tombstones it.
    pub fn remove_edge(&mut self, id: EdgeId) {
        let Edge { parent, child, .. } = *self.edge(id);
        self.node_mut(parent).child_edges.retain(|&e| e != id);
        self.node_mut(child).parent_edge = None;
        self.edges[id] = None;
    }

    /// Tombstones a node. Callers must have already detached every edge touching it.
    fn remove_node(&mut self, id: NodeId) {
        debug_assert!(self.node(id).parent_edge.is_none());
        debug_assert!(self.node(id).child_edges.is_empty());
        self.nodes[id] = None;
    }

    /// Finds the nearest node to `q` by the given `metric`. `O(n)` linear scan, matching
    /// `RRTStar::find_neighbours`'s approach in the teacher planner; a production deployment
    /// would swap in a kd-tree without changing this signature.
    pub fn nearest(&self, q: &Configuration, metric: &dyn Metric) -> Option<NodeId> {
        self.nearest_in(q, metric, None)
    }

    /// Like `nearest`, but restricted to `allowed` node ids when given (used to scope a search to
    /// a `subtree` view during local repair, spec §4.3 Phase B).
    pub fn nearest_in(&self, q: &Configuration, metric: &dyn Metric, allowed: Option<&HashSet<NodeId>>) -> Option<NodeId> {
        self.node_ids()
            .filter(|id| allowed.map_or(true, |a| a.contains(id)))
            .map(|id| (id, metric.cost(&self.node(id).configuration, q)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .map(|(id, _)| id)
    }

    /// Every node within `radius` of `q` (exclusive), by the given `metric`.
    pub fn within_radius(&self, q: &Configuration, radius: f64, metric: &dyn Metric) -> Vec<NodeId> {
        self.within_radius_in(q, radius, metric, None)
    }

    /// Like `within_radius`, but restricted to `allowed` node ids when given.
    pub fn within_radius_in(
        &self,
        q: &Configuration,
        radius: f64,
        metric: &dyn Metric,
        allowed: Option<&HashSet<NodeId>>,
    ) -> Vec<NodeId> {
        self.node_ids()
            .filter(|id| allowed.map_or(true, |a| a.contains(id)))
            .filter(|&id| metric.cost(&self.node(id).configuration, q) < radius)
            .collect()
    }

    /// The ordered sequence of edges from the root to `node`, root-to-leaf.
    pub fn path_to(&self, node: NodeId) -> Vec<EdgeId> {
        let mut chain = Vec::new();
        let mut cur = node;
        while let Some(pe) = self.node(cur).parent_edge {
            chain.push(pe);
            cur = self.edge(pe).parent;
        }
        chain.reverse();
        chain
    }

    /// Reverses the orientation of every edge on the path from the current root to `new_root`,
    /// preserving cost, and makes `new_root` the tree's root. `O(depth)` (spec §4.2).
    pub fn reroot(&mut self, new_root: NodeId) {
        if new_root == self.root {
            return;
        }
        let chain = self.path_to(new_root);
        for &edge_id in &chain {
            let (p, c) = {
                let e = self.edge(edge_id);
                (e.parent, e.child)
            };
            self.node_mut(p).child_edges.retain(|&e| e != edge_id);
            self.node_mut(p).parent_edge = Some(edge_id);
            self.node_mut(c).child_edges.push(edge_id);
            let e = self.edge_mut(edge_id);
            e.parent = c;
            e.child = p;
        }
        self.node_mut(new_root).parent_edge = None;
        self.root = new_root;
    }

    /// The set of node ids reachable from `subtree_root` by following child edges, treating
    /// every node in `black_list` (and everything beneath it) as absent. Used to scope anytime
    /// search to the branch being repaired without ever reattaching to the stale branch hanging
    /// off the obstruction (spec §4.3 step 6).
    pub fn subtree(&self, subtree_root: NodeId, black_list: &HashSet<NodeId>) -> HashSet<NodeId> {
        let mut visited = HashSet::new();
        if black_list.contains(&subtree_root) {
            return visited;
        }
        let mut stack = vec![subtree_root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            for &edge_id in &self.node(id).child_edges {
                let child = self.edge(edge_id).child;
                if !black_list.contains(&child) {
                    stack.push(child);
                }
            }
        }
        visited
    }

    /// Splits the edge `edge_id` by inserting a new node at `conf`, proportioning the original
    /// cost across the two new edges by `metric` distance so that, if `conf` truly lies on the
    /// straight-line motion, `remove_node_if_unreferenced` restores the original single edge
    /// exactly (spec §8 property 6).
    pub fn split_edge_at(&mut self, edge_id: EdgeId, conf: Configuration, metric: &dyn Metric) -> NodeId {
        let Edge { parent, child, cost: original_cost } = self.edge(edge_id).clone();
        let parent_conf = self.node(parent).configuration.clone();
        let child_conf = self.node(child).configuration.clone();

        self.remove_edge(edge_id);
        let new_node = self.insert_node(conf.clone());

        let d1 = metric.cost(&parent_conf, &conf);
        let d2 = metric.cost(&conf, &child_conf);
        let total = d1 + d2;
        let (c1, c2) = if total > 0.0 {
            (original_cost * d1 / total, original_cost * d2 / total)
        } else {
            (0.0, 0.0)
        };

        self.add_edge(parent, new_node, c1);
        self.add_edge(new_node, child, c2);
        new_node
    }

    /// The counterpart to `split_edge_at`: if `node` is a simple pass-through (exactly one
    /// parent edge and one child edge, i.e. nothing used it beyond the split that created it),
    /// merges the two edges back into the original parent→child edge and removes the node.
    /// Otherwise, if the node is a leaf with no children (its attempted reconnection was
    /// abandoned after being cut loose), it is removed along with its parent edge. A node with
    /// more than one child edge is genuinely referenced by the search and is left untouched;
    /// returns `false` in that case.
    pub fn remove_node_if_unreferenced(&mut self, node: NodeId) -> bool {
        let (parent_edge, child_count) = {
            let n = self.node(node);
            (n.parent_edge, n.child_edges.len())
        };

        match (parent_edge, child_count) {
            (Some(pe), 1) => {
                let ce = self.node(node).child_edges[0];
                let parent = self.edge(pe).parent;
                let child = self.edge(ce).child;
                let cost = self.edge(pe).cost + self.edge(ce).cost;
                self.remove_edge(pe);
                self.remove_edge(ce);
                self.remove_node(node);
                self.add_edge(parent, child, cost);
                true
            }
            (Some(pe), 0) => {
                self.remove_edge(pe);
                self.remove_node(node);
                true
            }
            (None, 0) => {
                self.remove_node(node);
                true
            }
            _ => false,
        }
    }

    /// Deep clone: every node and edge is copied into fresh arenas, so mutating the clone can
    /// never affect anything reachable from `self` (spec §8 property 4).
    pub fn deep_clone(&self) -> Tree {
        Tree { nodes: self.nodes.clone(), edges: self.edges.clone(), root: self.root }
    }

    /// Internal consistency check used by tests (spec §8 property 1): every non-root node has
    /// exactly one parent edge, and that edge's child is the node itself.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        for id in self.node_ids() {
            let node = self.node(id);
            if id == self.root {
                assert!(node.parent_edge.is_none(), "root must have no parent edge");
            } else {
                let pe = node.parent_edge.expect("non-root node must have a parent edge");
                assert_eq!(self.edge(pe).child, id, "parent edge's child must be the node");
            }
            for &ce in &node.child_edges {
                assert_eq!(self.edge(ce).parent, id, "child edge's parent must be the node");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::EuclideanMetric;

    fn conf(v: f64) -> Configuration {
        Configuration::new(vec![v, 0.0])
    }

    fn line_tree() -> Tree {
        let mut t = Tree::new(conf(0.0));
        let n1 = t.insert_node(conf(1.0));
        t.add_edge(t.root(), n1, 1.0);
        let n2 = t.insert_node(conf(2.0));
        t.add_edge(n1, n2, 1.0);
        t
    }

    #[test]
    fn fresh_tree_satisfies_invariants() {
        line_tree().check_invariants();
    }

    #[test]
    fn path_to_is_root_to_leaf_order() {
        let t = line_tree();
        let leaf = t.node_ids().find(|&id| t.node(id).configuration.values[0] == 2.0).unwrap();
        let path = t.path_to(leaf);
        assert_eq!(path.len(), 2);
        assert_eq!(t.edge(path[0]).parent, t.root());
    }

    #[test]
    fn reroot_then_reroot_back_restores_tree() {
        let mut t = line_tree();
        let original_root = t.root();
        let leaf = t.node_ids().find(|&id| t.node(id).configuration.values[0] == 2.0).unwrap();

        t.reroot(leaf);
        t.check_invariants();
        assert_eq!(t.root(), leaf);

        t.reroot(original_root);
        t.check_invariants();
        assert_eq!(t.root(), original_root);

        // Same multiset of undirected edges with costs (spec §8 property 3).
        let mut costs: Vec<f64> = t.edges.iter().flatten().map(|e| e.cost).collect();
        costs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(costs, vec![1.0, 1.0]);
    }

    #[test]
    fn deep_clone_does_not_alias_original() {
        let t = line_tree();
        let mut clone = t.deep_clone();
        let leaf = clone.node_ids().find(|&id| clone.node(id).configuration.values[0] == 2.0).unwrap();
        clone.edge_mut(clone.node(leaf).parent_edge.unwrap()).cost = f64::INFINITY;

        let original_leaf = t.node_ids().find(|&id| t.node(id).configuration.values[0] == 2.0).unwrap();
        assert_eq!(t.edge(t.node(original_leaf).parent_edge.unwrap()).cost, 1.0);
    }

    #[test]
    fn split_then_remove_if_unreferenced_restores_edge_list() {
        let mut t = line_tree();
        let metric = EuclideanMetric;
        let edge_id = t.node(t.root()).child_edges[0];
        let original_cost = t.edge(edge_id).cost;
        let (parent, child) = (t.edge(edge_id).parent, t.edge(edge_id).child);

        let mid = t.node(parent).configuration.interpolate(&t.node(child).configuration, 0.5);
        let new_node = t.split_edge_at(edge_id, mid, &metric);
        assert!(t.remove_node_if_unreferenced(new_node));

        let restored = t.node(parent).child_edges[0];
        assert_eq!(t.edge(restored).child, child);
        assert!((t.edge(restored).cost - original_cost).abs() < 1e-9);
    }

    #[test]
    fn subtree_hides_black_listed_branch() {
        let mut t = line_tree();
        let n1 = t.node(t.root()).child_edges[0];
        let n1 = t.edge(n1).child;
        let n2 = t.node(n1).child_edges[0];
        let n2 = t.edge(n2).child;

        let mut black = HashSet::new();
        black.insert(n2);
        let reachable = t.subtree(t.root(), &black);
        assert!(reachable.contains(&t.root()));
        assert!(reachable.contains(&n1));
        assert!(!reachable.contains(&n2));
    }
}
