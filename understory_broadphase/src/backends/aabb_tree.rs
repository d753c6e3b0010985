// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dynamic AABB tree: a binary hierarchy rebalanced online as leaves come and go.
//!
//! Each client is a leaf. Insertion walks down from the root choosing, at every internal node,
//! the child whose bounds grow the least in perimeter when the new leaf is added. The chosen leaf
//! is then paired with the new one under a freshly allocated internal node. Removal splices the
//! sibling of the removed leaf into its parent's place. Internal bounds are re-tightened from the
//! edit point up to the root after every structural change, so each internal node always bounds
//! exactly the union of its two children.
//!
//! Nodes live in a generational [`Pool`]; parent/child links are [`NodeId`] handles and removed
//! nodes are recycled by later insertions.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use kurbo::{Rect, Vec2};

use crate::broadphase::Broadphase;
use crate::client::Client;
use crate::config::{AabbTreeConfig, UpdatePolicy};
use crate::error::Result;
use crate::pool::{Handle, Pool};
use crate::types::{contains, is_well_formed, overlaps, pad, perimeter};

/// Handle of a node in an [`AabbTree`]. A client's placement is the handle of its leaf.
pub type NodeId = Handle;

enum Kind<T> {
    Leaf(T),
    Internal { left: NodeId, right: NodeId },
}

struct Node<T> {
    bounds: Rect,
    parent: Option<NodeId>,
    kind: Kind<T>,
}

/// Read-only view of one node, handed to [`AabbTree::traverse_all`] callbacks.
#[derive(Debug)]
pub struct TreeNodeView<'a, T> {
    /// Handle of the node.
    pub id: NodeId,
    /// Node bounds (padded for leaves).
    pub bounds: Rect,
    /// Parent handle, `None` for the root.
    pub parent: Option<NodeId>,
    /// `(left, right)` for internal nodes, `None` for leaves.
    pub children: Option<(NodeId, NodeId)>,
    /// Payload for leaves, `None` for internal nodes.
    pub value: Option<&'a T>,
    /// Distance from the root.
    pub depth: usize,
}

/// Dynamic AABB tree broadphase.
pub struct AabbTree<T> {
    root: Option<NodeId>,
    nodes: Pool<Node<T>>,
    leaves: usize,
    config: AabbTreeConfig,
}

impl<T> Default for AabbTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AabbTree<T> {
    /// Create an empty tree with no padding and [`UpdatePolicy::Rebuild`].
    pub fn new() -> Self {
        Self {
            root: None,
            nodes: Pool::new(),
            leaves: 0,
            config: AabbTreeConfig::default(),
        }
    }

    /// Create an empty tree from a validated configuration.
    pub fn with_config(config: AabbTreeConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            padding_x = config.padding.x,
            padding_y = config.padding.y,
            policy = ?config.update_policy,
            "created aabb tree"
        );
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// Margin applied to every side of a leaf box.
    pub const fn padding(&self) -> Vec2 {
        self.config.padding
    }

    /// Batch update behavior.
    pub const fn update_policy(&self) -> UpdatePolicy {
        self.config.update_policy
    }

    /// Number of live nodes, leaves and internal nodes together.
    pub const fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Bounds of the root node, `None` when empty.
    pub fn root_bounds(&self) -> Option<Rect> {
        self.root.map(|r| self.nodes[r].bounds)
    }

    /// Whether `client`'s placement refers to a live leaf of this tree.
    pub fn contains(&self, client: &Client<T, NodeId>) -> bool {
        self.live_leaf(client).is_some()
    }

    /// Padded bounds stored for `client`, if it is indexed here.
    pub fn leaf_bounds(&self, client: &Client<T, NodeId>) -> Option<Rect> {
        self.live_leaf(client).map(|id| self.nodes[id].bounds)
    }

    /// Number of edges on the longest root-to-leaf path. An empty tree and a lone leaf both
    /// have height `0`.
    pub fn height(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut max = 0;
        let mut stack = vec![(root, 0_usize)];
        while let Some((id, depth)) = stack.pop() {
            match self.nodes[id].kind {
                Kind::Leaf(_) => max = max.max(depth),
                Kind::Internal { left, right } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        max
    }

    /// Visit every node in post-order (left subtree, right subtree, node) and collect whatever
    /// the callback pushes into the output buffer.
    pub fn traverse_all<U, F>(&self, mut f: F) -> Vec<U>
    where
        F: FnMut(TreeNodeView<'_, T>, &mut Vec<U>),
    {
        let mut out = Vec::new();
        let Some(root) = self.root else {
            return out;
        };
        let mut stack = vec![(root, 0_usize, false)];
        while let Some((id, depth, expanded)) = stack.pop() {
            let node = &self.nodes[id];
            match &node.kind {
                Kind::Internal { left, right } if !expanded => {
                    stack.push((id, depth, true));
                    stack.push((*right, depth + 1, false));
                    stack.push((*left, depth + 1, false));
                }
                kind => {
                    let (children, value) = match kind {
                        Kind::Leaf(v) => (None, Some(v)),
                        Kind::Internal { left, right } => (Some((*left, *right)), None),
                    };
                    let view = TreeNodeView {
                        id,
                        bounds: node.bounds,
                        parent: node.parent,
                        children,
                        value,
                        depth,
                    };
                    f(view, &mut out);
                }
            }
        }
        out
    }

    fn live_leaf(&self, client: &Client<T, NodeId>) -> Option<NodeId> {
        let id = client.node?;
        match self.nodes.get(id)?.kind {
            Kind::Leaf(_) => Some(id),
            Kind::Internal { .. } => None,
        }
    }

    /// Walk down from `current` to the leaf that is the cheapest sibling for `bounds`.
    fn best_sibling(&self, mut current: NodeId, bounds: Rect) -> NodeId {
        loop {
            match self.nodes[current].kind {
                Kind::Leaf(_) => return current,
                Kind::Internal { left, right } => {
                    let left_cost = perimeter(bounds.union(self.nodes[left].bounds));
                    let right_cost = perimeter(bounds.union(self.nodes[right].bounds));
                    current = if left_cost > right_cost { right } else { left };
                }
            }
        }
    }

    fn insert_leaf(&mut self, leaf: NodeId) {
        let Some(root) = self.root else {
            self.root = Some(leaf);
            return;
        };
        let bounds = self.nodes[leaf].bounds;
        let sibling = self.best_sibling(root, bounds);
        let old_parent = self.nodes[sibling].parent;
        let surrogate_bounds = self.nodes[sibling].bounds.union(bounds);
        let surrogate = self.nodes.give(Node {
            bounds: surrogate_bounds,
            parent: old_parent,
            kind: Kind::Internal {
                left: sibling,
                right: leaf,
            },
        });
        match old_parent {
            None => self.root = Some(surrogate),
            Some(parent) => self.replace_child(parent, sibling, surrogate),
        }
        self.nodes[sibling].parent = Some(surrogate);
        self.nodes[leaf].parent = Some(surrogate);
        self.refit(Some(surrogate));
    }

    fn remove_leaf(&mut self, leaf: NodeId) {
        let parent = self.nodes[leaf].parent;
        let _ = self.nodes.take(leaf);
        self.leaves -= 1;
        let Some(parent) = parent else {
            self.root = None;
            return;
        };
        let Kind::Internal { left, right } = self.nodes[parent].kind else {
            unreachable!("parent of a leaf is always internal");
        };
        let sibling = if left == leaf { right } else { left };
        let grandparent = self.nodes[parent].parent;
        self.nodes[sibling].parent = grandparent;
        match grandparent {
            None => self.root = Some(sibling),
            Some(g) => self.replace_child(g, parent, sibling),
        }
        let _ = self.nodes.take(parent);
        self.refit(grandparent);
    }

    fn replace_child(&mut self, parent: NodeId, old: NodeId, new: NodeId) {
        if let Kind::Internal { left, right } = &mut self.nodes[parent].kind {
            if *left == old {
                *left = new;
            } else if *right == old {
                *right = new;
            }
        }
    }

    /// Recompute bounds from `at` up to the root.
    fn refit(&mut self, mut at: Option<NodeId>) {
        while let Some(id) = at {
            if let Kind::Internal { left, right } = self.nodes[id].kind {
                let bounds = self.nodes[left].bounds.union(self.nodes[right].bounds);
                self.nodes[id].bounds = bounds;
            }
            at = self.nodes[id].parent;
        }
    }

    /// Call `f` for every leaf whose bounds overlap `bounds`.
    fn visit_overlapping(&self, bounds: Rect, mut f: impl FnMut(NodeId, &T)) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !overlaps(node.bounds, bounds) {
                continue;
            }
            match &node.kind {
                Kind::Leaf(v) => f(id, v),
                Kind::Internal { left, right } => {
                    stack.push(*right);
                    stack.push(*left);
                }
            }
        }
    }
}

impl<T: Clone> Broadphase<T> for AabbTree<T> {
    type Node = NodeId;

    fn insert(&mut self, client: &mut Client<T, NodeId>, bounds: Rect) -> bool {
        debug_assert!(is_well_formed(bounds), "malformed box {bounds:?}");
        self.remove(client);
        let leaf = self.nodes.give(Node {
            bounds: pad(bounds, self.config.padding),
            parent: None,
            kind: Kind::Leaf(client.value.clone()),
        });
        client.node = Some(leaf);
        self.leaves += 1;
        self.insert_leaf(leaf);
        true
    }

    fn remove(&mut self, client: &mut Client<T, NodeId>) {
        if let Some(leaf) = self.live_leaf(client) {
            self.remove_leaf(leaf);
        }
        client.node = None;
    }

    fn update(&mut self, clients: &mut [Client<T, NodeId>], bounds: &[Rect]) {
        debug_assert_eq!(clients.len(), bounds.len(), "one box per client");
        match self.config.update_policy {
            UpdatePolicy::Rebuild => {
                tracing::trace!(clients = clients.len(), "rebuilding aabb tree");
                self.clear();
                for (client, b) in clients.iter_mut().zip(bounds) {
                    client.node = None;
                    self.insert(client, *b);
                }
            }
            UpdatePolicy::Incremental => {
                for (client, b) in clients.iter_mut().zip(bounds) {
                    if let Some(id) = self.live_leaf(client) {
                        let node = &mut self.nodes[id];
                        if contains(node.bounds, *b) {
                            if let Kind::Leaf(v) = &mut node.kind {
                                v.clone_from(&client.value);
                            }
                            continue;
                        }
                    }
                    self.insert(client, *b);
                }
            }
        }
    }

    fn query_into(&mut self, bounds: Rect, out: &mut Vec<T>) {
        self.visit_overlapping(bounds, |_, v| out.push(v.clone()));
    }

    fn collision_pairs_into<U, F>(
        &self,
        clients: &[Client<T, NodeId>],
        mut checker: F,
        out: &mut Vec<U>,
    ) where
        F: FnMut(&T, &T) -> Option<U>,
    {
        for client in clients {
            let Some(id) = self.live_leaf(client) else {
                continue;
            };
            let bounds = self.nodes[id].bounds;
            self.visit_overlapping(bounds, |other, v| {
                if other != id
                    && let Some(u) = checker(&client.value, v)
                {
                    out.push(u);
                }
            });
        }
    }

    fn len(&self) -> usize {
        self.leaves
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.leaves = 0;
    }
}

impl<T> Debug for AabbTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AabbTree")
            .field("leaves", &self.leaves)
            .field("nodes", &self.nodes.len())
            .field("pooled", &self.nodes.capacity())
            .field("has_root", &self.root.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
