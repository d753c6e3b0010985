// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded quadtree, fully subdivided at construction.
//!
//! The node array is a complete 4-ary tree in breadth-first order: node `i` has children
//! `4i + 1 ..= 4i + 4`, ordered top-left, top-right, bottom-left, bottom-right (y grows downward).
//! Regions never move. An object lives at the deepest node along its descent whose region strictly
//! contains its box, so boxes straddling a split line stay at the parent.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;
use kurbo::Rect;

use crate::broadphase::Broadphase;
use crate::client::Client;
use crate::config::QuadTreeConfig;
use crate::error::Result;
use crate::pool::{Handle, Pool};
use crate::types::{is_well_formed, overlaps, strictly_contains};
use crate::util::warn_once;

bitflags::bitflags! {
    /// Child quadrants touched by a query box.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    struct Quadrants: u8 {
        const TOP_LEFT     = 0b0001;
        const TOP_RIGHT    = 0b0010;
        const BOTTOM_LEFT  = 0b0100;
        const BOTTOM_RIGHT = 0b1000;
    }
}

impl Quadrants {
    /// Child order in the node array.
    const ORDER: [Self; 4] = [
        Self::TOP_LEFT,
        Self::TOP_RIGHT,
        Self::BOTTOM_LEFT,
        Self::BOTTOM_RIGHT,
    ];

    /// Children of `region` that `query` overlaps, assuming `query` overlaps `region`.
    fn overlapped_by(region: Rect, query: Rect) -> Self {
        let (cx, cy) = midpoint(region);
        let left = query.x0 <= cx;
        let right = query.x1 >= cx;
        let top = query.y0 <= cy;
        let bottom = query.y1 >= cy;
        let mut mask = Self::empty();
        mask.set(Self::TOP_LEFT, top && left);
        mask.set(Self::TOP_RIGHT, top && right);
        mask.set(Self::BOTTOM_LEFT, bottom && left);
        mask.set(Self::BOTTOM_RIGHT, bottom && right);
        mask
    }
}

fn midpoint(r: Rect) -> (f64, f64) {
    ((r.x0 + r.x1) * 0.5, (r.y0 + r.y1) * 0.5)
}

fn split(r: Rect) -> [Rect; 4] {
    let (cx, cy) = midpoint(r);
    [
        Rect::new(r.x0, r.y0, cx, cy),
        Rect::new(cx, r.y0, r.x1, cy),
        Rect::new(r.x0, cy, cx, r.y1),
        Rect::new(cx, cy, r.x1, r.y1),
    ]
}

/// Number of nodes in a complete quadtree `depth` levels deep.
const fn nodes_for_depth(depth: u32) -> usize {
    (4_usize.pow(depth + 1) - 1) / 3
}

/// One object stored at a quadtree node.
#[derive(Clone, Debug)]
pub struct QuadObject<T> {
    key: Handle,
    bounds: Rect,
    value: T,
}

impl<T> QuadObject<T> {
    /// The box the object was inserted with.
    pub const fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The stored payload.
    pub const fn value(&self) -> &T {
        &self.value
    }
}

struct QuadNode<T> {
    region: Rect,
    depth: u32,
    objects: Vec<QuadObject<T>>,
}

/// Read-only view of one node, handed to [`QuadTree::traverse_all`] callbacks.
#[derive(Debug)]
pub struct QuadNodeView<'a, T> {
    /// Position in the node array.
    pub index: usize,
    /// Fixed region of the node.
    pub region: Rect,
    /// Distance from the root.
    pub depth: u32,
    /// Objects stored at this node.
    pub objects: &'a [QuadObject<T>],
}

/// Fixed-depth bounded quadtree broadphase.
pub struct QuadTree<T> {
    config: QuadTreeConfig,
    nodes: Vec<QuadNode<T>>,
    /// Object key to the index of the node holding it.
    slots: Pool<usize>,
}

impl<T> Default for QuadTree<T> {
    fn default() -> Self {
        Self::build(QuadTreeConfig::default())
    }
}

impl<T> QuadTree<T> {
    /// Create a tree over `config.bounds` subdivided `config.max_depth` levels deep.
    pub fn new(config: QuadTreeConfig) -> Result<Self> {
        config.validate()?;
        let tree = Self::build(config);
        tracing::debug!(
            bounds = ?config.bounds,
            max_depth = config.max_depth,
            nodes = tree.nodes.len(),
            "created quadtree"
        );
        Ok(tree)
    }

    fn build(config: QuadTreeConfig) -> Self {
        Self {
            nodes: build_nodes(&config),
            config,
            slots: Pool::new(),
        }
    }

    /// Region covered by the root.
    pub const fn bounds(&self) -> Rect {
        self.config.bounds
    }

    /// Number of subdivision levels below the root.
    pub const fn max_depth(&self) -> u32 {
        self.config.max_depth
    }

    /// Number of nodes in the pre-built hierarchy.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Whether `client`'s placement refers to a live object of this tree.
    pub fn contains(&self, client: &Client<T, Handle>) -> bool {
        client.node.is_some_and(|key| self.slots.contains(key))
    }

    /// Depth of the node holding `client`.
    pub fn depth_of(&self, client: &Client<T, Handle>) -> Option<u32> {
        self.node_of(client).map(|i| self.nodes[i].depth)
    }

    /// Region of the node holding `client`.
    pub fn node_region(&self, client: &Client<T, Handle>) -> Option<Rect> {
        self.node_of(client).map(|i| self.nodes[i].region)
    }

    /// Rebuild the hierarchy for a new region and depth and re-place every object.
    ///
    /// Objects no longer strictly inside the new root are dropped and their clients' handles go
    /// stale. Returns how many were dropped. On error the tree is left untouched.
    pub fn resize(&mut self, config: QuadTreeConfig) -> Result<usize> {
        config.validate()?;
        let objects: Vec<QuadObject<T>> = self.nodes.drain(..).flat_map(|n| n.objects).collect();
        self.nodes = build_nodes(&config);
        self.config = config;

        let mut evicted = 0;
        for object in objects {
            if strictly_contains(config.bounds, object.bounds) {
                let index = self.locate(object.bounds);
                if let Some(slot) = self.slots.get_mut(object.key) {
                    *slot = index;
                }
                self.nodes[index].objects.push(object);
            } else {
                let _ = self.slots.take(object.key);
                evicted += 1;
            }
        }
        if evicted > 0 {
            warn_once!(evicted, "quadtree resize dropped objects outside the new root");
        }
        tracing::debug!(
            bounds = ?config.bounds,
            max_depth = config.max_depth,
            kept = self.slots.len(),
            evicted,
            "resized quadtree"
        );
        Ok(evicted)
    }

    /// Visit every node in post-order (children in quadrant order, then the node) and collect
    /// whatever the callback pushes into the output buffer.
    pub fn traverse_all<U, F>(&self, mut f: F) -> Vec<U>
    where
        F: FnMut(QuadNodeView<'_, T>, &mut Vec<U>),
    {
        let mut out = Vec::new();
        let mut stack = vec![(0_usize, false)];
        while let Some((index, expanded)) = stack.pop() {
            let node = &self.nodes[index];
            if !expanded && node.depth < self.config.max_depth {
                stack.push((index, true));
                let first = 4 * index + 1;
                for child in (first..first + 4).rev() {
                    stack.push((child, false));
                }
                continue;
            }
            let view = QuadNodeView {
                index,
                region: node.region,
                depth: node.depth,
                objects: &node.objects,
            };
            f(view, &mut out);
        }
        out
    }

    fn node_of(&self, client: &Client<T, Handle>) -> Option<usize> {
        self.slots.get(client.node?).copied()
    }

    /// Index of the deepest node whose region strictly contains `bounds`, starting at the root.
    fn locate(&self, bounds: Rect) -> usize {
        let mut index = 0;
        while self.nodes[index].depth < self.config.max_depth {
            let first = 4 * index + 1;
            match (first..first + 4).find(|&c| strictly_contains(self.nodes[c].region, bounds)) {
                Some(child) => index = child,
                None => break,
            }
        }
        index
    }

    /// Call `f` for every object whose box overlaps `bounds`.
    fn visit_overlapping(&self, bounds: Rect, mut f: impl FnMut(Handle, &T)) {
        if self.slots.is_empty() || !overlaps(self.config.bounds, bounds) {
            return;
        }
        let mut stack = vec![0_usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            for object in &node.objects {
                if overlaps(object.bounds, bounds) {
                    f(object.key, &object.value);
                }
            }
            if node.depth == self.config.max_depth {
                continue;
            }
            let mask = Quadrants::overlapped_by(node.region, bounds);
            let first = 4 * index + 1;
            for (offset, quadrant) in Quadrants::ORDER.into_iter().enumerate() {
                if mask.contains(quadrant) {
                    stack.push(first + offset);
                }
            }
        }
    }
}

fn build_nodes<T>(config: &QuadTreeConfig) -> Vec<QuadNode<T>> {
    let count = nodes_for_depth(config.max_depth);
    let mut nodes = Vec::with_capacity(count);
    nodes.push(QuadNode {
        region: config.bounds,
        depth: 0,
        objects: Vec::new(),
    });
    let mut parent = 0;
    while nodes.len() < count {
        let (region, depth) = (nodes[parent].region, nodes[parent].depth);
        for child in split(region) {
            nodes.push(QuadNode {
                region: child,
                depth: depth + 1,
                objects: Vec::new(),
            });
        }
        parent += 1;
    }
    nodes
}

impl<T: Clone> Broadphase<T> for QuadTree<T> {
    type Node = Handle;

    fn insert(&mut self, client: &mut Client<T, Handle>, bounds: Rect) -> bool {
        debug_assert!(is_well_formed(bounds), "malformed box {bounds:?}");
        self.remove(client);
        if !strictly_contains(self.config.bounds, bounds) {
            warn_once!(
                ?bounds,
                root = ?self.config.bounds,
                "box is not strictly inside the quadtree root; not indexed"
            );
            return false;
        }
        let index = self.locate(bounds);
        let key = self.slots.give(index);
        self.nodes[index].objects.push(QuadObject {
            key,
            bounds,
            value: client.value.clone(),
        });
        client.node = Some(key);
        true
    }

    fn remove(&mut self, client: &mut Client<T, Handle>) {
        if let Some(key) = client.node.take()
            && let Some(index) = self.slots.take(key)
        {
            let objects = &mut self.nodes[index].objects;
            if let Some(pos) = objects.iter().position(|o| o.key == key) {
                objects.swap_remove(pos);
            }
        }
    }

    fn update(&mut self, clients: &mut [Client<T, Handle>], bounds: &[Rect]) {
        debug_assert_eq!(clients.len(), bounds.len(), "one box per client");
        for (client, b) in clients.iter_mut().zip(bounds) {
            self.insert(client, *b);
        }
    }

    fn query_into(&mut self, bounds: Rect, out: &mut Vec<T>) {
        self.visit_overlapping(bounds, |_, v| out.push(v.clone()));
    }

    fn collision_pairs_into<U, F>(
        &self,
        clients: &[Client<T, Handle>],
        mut checker: F,
        out: &mut Vec<U>,
    ) where
        F: FnMut(&T, &T) -> Option<U>,
    {
        for client in clients {
            let Some(key) = client.node else {
                continue;
            };
            let Some(&index) = self.slots.get(key) else {
                continue;
            };
            let Some(own) = self.nodes[index].objects.iter().find(|o| o.key == key) else {
                continue;
            };
            self.visit_overlapping(own.bounds, |other, v| {
                if other != key
                    && let Some(u) = checker(&client.value, v)
                {
                    out.push(u);
                }
            });
        }
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn clear(&mut self) {
        for node in &mut self.nodes {
            node.objects.clear();
        }
        self.slots.clear();
    }
}

impl<T> Debug for QuadTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QuadTree")
            .field("bounds", &self.config.bounds)
            .field("max_depth", &self.config.max_depth)
            .field("nodes", &self.nodes.len())
            .field("objects", &self.slots.len())
            .finish_non_exhaustive()
    }
}
