// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Broadphase: 2D broadphase collision indexing over moving boxes.
//!
//! Given a dynamic set of axis-aligned boxes ([`kurbo::Rect`]) that move every frame, a broadphase
//! answers "what overlaps this region?" and "which pairs might be touching?" without testing every
//! pair.
//!
//! - Three interchangeable structures behind the [`Broadphase`] trait: [`HashGrid`], [`QuadTree`]
//!   and [`AabbTree`].
//! - A caller-owned [`Client`] links your payload to its placement inside a structure.
//! - Queries and pair enumeration return payloads, never internal nodes.
//!
//! # Example
//!
//! ```rust
//! use kurbo::Rect;
//! use understory_broadphase::{AabbTree, Broadphase, Client};
//!
//! let mut tree = AabbTree::new();
//! let mut a = Client::new("a");
//! let mut b = Client::new("b");
//! tree.insert(&mut a, Rect::new(0.0, 0.0, 10.0, 10.0));
//! tree.insert(&mut b, Rect::new(20.0, 20.0, 30.0, 30.0));
//!
//! assert_eq!(tree.query(Rect::new(5.0, 5.0, 6.0, 6.0)), vec!["a"]);
//!
//! // Move `b` onto `a` and look for touching pairs.
//! let mut clients = [a, b];
//! tree.update(
//!     &mut clients,
//!     &[Rect::new(0.0, 0.0, 10.0, 10.0), Rect::new(8.0, 8.0, 18.0, 18.0)],
//! );
//! let pairs = tree.collision_pairs(&clients, |x, y| (x < y).then_some((*x, *y)));
//! assert_eq!(pairs, vec![("a", "b")]);
//! ```
//!
//! The grid and the quadtree need to know the world extent up front:
//!
//! ```rust
//! use kurbo::Rect;
//! use understory_broadphase::{Broadphase, Client, GridConfig, HashGrid, QuadTree, QuadTreeConfig};
//!
//! let mut grid = HashGrid::new(GridConfig::new(100.0, 100.0, 10, 10)).unwrap();
//! let mut c = Client::new(1_u32);
//! grid.insert(&mut c, Rect::new(50.0, 50.0, 250.0, 150.0));
//! assert_eq!(c.node().unwrap().bins().len(), 6);
//!
//! let config = QuadTreeConfig::new(Rect::new(0.0, 0.0, 100.0, 100.0)).with_max_depth(1);
//! let mut quad = QuadTree::new(config).unwrap();
//! let mut q = Client::new(2_u32);
//! assert!(quad.insert(&mut q, Rect::new(60.0, 60.0, 70.0, 70.0)));
//! // Boxes not strictly inside the root are not indexed.
//! assert!(!quad.insert(&mut q, Rect::new(90.0, 90.0, 120.0, 95.0)));
//! ```
//!
//! ## Choosing a structure
//!
//! - [`HashGrid`]: fixed bins, cheapest updates. Suits many boxes of similar size spread over a
//!   known extent. Boxes outside the extent clamp into the border bins.
//! - [`QuadTree`]: pre-subdivided fixed-depth tree over a known extent. Handles mixed box sizes
//!   better than a grid; boxes outside the root are rejected.
//! - [`AabbTree`]: unbounded dynamic tree. Best general choice when the extent is unknown or
//!   the distribution is uneven. Leaf padding plus [`UpdatePolicy::Incremental`] makes slowly
//!   moving boxes cheap to update.
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events (construction at `debug`, rebuilds at `trace`, rejected or
//! evicted quadtree boxes at `warn`, once per call site). It never installs a subscriber.
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for box coordinates. Overlap tests are inclusive: boxes that only
//! share an edge overlap.

#![no_std]

extern crate alloc;

pub mod backends;
pub mod broadphase;
pub mod client;
pub mod config;
pub mod error;
pub mod pool;
pub mod types;

mod util;

pub use backends::aabb_tree::{AabbTree, NodeId, TreeNodeView};
pub use backends::grid::{BinView, GridNode, HashGrid};
pub use backends::quadtree::{QuadNodeView, QuadObject, QuadTree};
pub use broadphase::Broadphase;
pub use client::Client;
pub use config::{
    AabbTreeConfig, GridConfig, MAX_GRID_BINS, MAX_QUADTREE_DEPTH, QuadTreeConfig, UpdatePolicy,
};
pub use error::{Error, Result};
pub use pool::{Handle, Pool};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use kurbo::{Rect, Vec2};

    /// Run the same script against any structure and return sorted query hits.
    fn script<B: Broadphase<u32>>(b: &mut B, clients: &mut [Client<u32, B::Node>]) -> Vec<u32> {
        let boxes = [
            Rect::new(10.0, 10.0, 20.0, 20.0),
            Rect::new(15.0, 15.0, 25.0, 25.0),
            Rect::new(60.0, 60.0, 70.0, 70.0),
        ];
        for (c, r) in clients.iter_mut().zip(boxes) {
            assert!(b.insert(c, r));
        }
        b.remove(&mut clients[1]);
        let mut hits = b.query(Rect::new(0.0, 0.0, 100.0, 100.0));
        hits.sort_unstable();
        hits
    }

    #[test]
    fn structures_agree_through_the_trait() {
        let mut grid = HashGrid::new(GridConfig::new(10.0, 10.0, 10, 10)).unwrap();
        let mut quad = QuadTree::new(QuadTreeConfig::new(Rect::new(0.0, 0.0, 100.0, 100.0))).unwrap();
        let mut tree = AabbTree::new();

        let mut gc: Vec<Client<u32, GridNode>> = (0..3).map(Client::new).collect();
        let mut qc: Vec<Client<u32, Handle>> = (0..3).map(Client::new).collect();
        let mut tc: Vec<Client<u32, NodeId>> = (0..3).map(Client::new).collect();

        assert_eq!(script(&mut grid, &mut gc), vec![0, 2]);
        assert_eq!(script(&mut quad, &mut qc), vec![0, 2]);
        assert_eq!(script(&mut tree, &mut tc), vec![0, 2]);
        assert_eq!((grid.len(), quad.len(), tree.len()), (2, 2, 2));
    }

    #[test]
    fn reinserting_a_client_moves_it() {
        let mut tree = AabbTree::new();
        let mut c = Client::new(1_u32);
        tree.insert(&mut c, Rect::new(0.0, 0.0, 1.0, 1.0));
        tree.insert(&mut c, Rect::new(50.0, 50.0, 51.0, 51.0));
        assert_eq!(tree.len(), 1);
        assert!(tree.query(Rect::new(0.0, 0.0, 2.0, 2.0)).is_empty());
    }

    #[test]
    fn constructors_report_bad_configs() {
        assert!(matches!(
            HashGrid::<u32>::new(GridConfig::new(-1.0, 1.0, 1, 1)),
            Err(Error::InvalidBinSize { .. })
        ));
        assert!(matches!(
            HashGrid::<u32>::new(GridConfig::new(1.0, 1.0, usize::MAX, 2)),
            Err(Error::GridTooLarge { .. })
        ));
        assert!(matches!(
            QuadTree::<u32>::new(QuadTreeConfig::new(Rect::ZERO)),
            Err(Error::DegenerateRegion(_))
        ));
        assert!(matches!(
            AabbTree::<u32>::with_config(
                AabbTreeConfig::default().with_padding(Vec2::new(f64::NAN, 0.0))
            ),
            Err(Error::InvalidPadding(_))
        ));
    }

    #[test]
    fn empty_structures_return_nothing() {
        let everything = Rect::new(-1e6, -1e6, 1e6, 1e6);
        let mut grid: HashGrid<u32> = HashGrid::default();
        let mut quad: QuadTree<u32> = QuadTree::default();
        let mut tree: AabbTree<u32> = AabbTree::default();
        assert!(grid.query(everything).is_empty());
        assert!(quad.query(everything).is_empty());
        assert!(tree.query(everything).is_empty());
        assert!(tree.traverse_all(|v, out| out.push(v.id)).is_empty());
    }
}
