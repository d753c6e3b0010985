// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The three broadphase strategies.
//!
//! - `grid`: uniform hash grid. Fixed bins over a known extent; a box is referenced from every bin
//!   it touches. Cheapest updates; best when boxes are similar in size and roughly one bin wide.
//! - `quadtree`: bounded quadtree pre-subdivided to a fixed depth. Boxes sit at the deepest node
//!   that strictly contains them, so large or split-straddling boxes stay near the root.
//! - `aabb_tree`: dynamic AABB tree. No fixed extent; each insertion descends by the smallest
//!   perimeter growth and internal bounds are refit on every change. Optional leaf padding lets
//!   small moves skip reinsertion under [`UpdatePolicy::Incremental`](crate::UpdatePolicy).

pub mod aabb_tree;
pub mod grid;
pub mod quadtree;

pub use aabb_tree::{AabbTree, NodeId, TreeNodeView};
pub use grid::{BinView, GridNode, HashGrid};
pub use quadtree::{QuadNodeView, QuadObject, QuadTree};
