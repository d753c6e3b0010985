// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract shared by every broadphase structure.

use alloc::vec::Vec;
use kurbo::Rect;

use crate::client::Client;

/// Broadphase abstraction implemented by [`HashGrid`](crate::HashGrid),
/// [`QuadTree`](crate::QuadTree) and [`AabbTree`](crate::AabbTree).
///
/// Structures store a copy of each client's payload, so queries return `T` values and never
/// internal nodes.
pub trait Broadphase<T: Clone> {
    /// Structure-specific placement stored in [`Client`].
    type Node;

    /// Index `client` with `bounds`. Returns `false` if the structure declined to index it.
    ///
    /// An already-indexed client is removed first, so this also moves a client.
    fn insert(&mut self, client: &mut Client<T, Self::Node>, bounds: Rect) -> bool;

    /// Unindex `client`. No-op if it is not indexed here.
    fn remove(&mut self, client: &mut Client<T, Self::Node>);

    /// Re-derive the placement of `clients[i]` from `bounds[i]`.
    ///
    /// `clients` and `bounds` must have the same length; only the common prefix is processed.
    fn update(&mut self, clients: &mut [Client<T, Self::Node>], bounds: &[Rect]);

    /// Append the payload of every indexed box overlapping `bounds` to `out`.
    fn query_into(&mut self, bounds: Rect, out: &mut Vec<T>);

    /// Payloads of every indexed box overlapping `bounds`.
    fn query(&mut self, bounds: Rect) -> Vec<T> {
        let mut out = Vec::new();
        self.query_into(bounds, &mut out);
        out
    }

    /// Run `checker(client, candidate)` for every structurally plausible pair involving one of
    /// `clients`, appending each `Some` result to `out`.
    ///
    /// Every client is enumerated independently, so a pair of clients is usually reported from
    /// both sides. Checkers that need unordered pairs should canonicalize.
    fn collision_pairs_into<U, F>(
        &self,
        clients: &[Client<T, Self::Node>],
        checker: F,
        out: &mut Vec<U>,
    ) where
        F: FnMut(&T, &T) -> Option<U>;

    /// Collect the results of `checker` over every plausible pair involving one of `clients`.
    fn collision_pairs<U, F>(&self, clients: &[Client<T, Self::Node>], checker: F) -> Vec<U>
    where
        F: FnMut(&T, &T) -> Option<U>,
    {
        let mut out = Vec::new();
        self.collision_pairs_into(clients, checker, &mut out);
        out
    }

    /// Number of indexed clients.
    fn len(&self) -> usize;

    /// True if nothing is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every indexed client. Outstanding placements go stale.
    fn clear(&mut self);
}
