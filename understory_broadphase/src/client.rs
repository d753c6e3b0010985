// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Caller-owned client handles.

/// A caller-owned handle linking a payload to its placement inside one structure.
///
/// `N` is the structure-specific placement: [`NodeId`](crate::NodeId) for the
/// [`AabbTree`](crate::AabbTree), an object [`Handle`](crate::Handle) for the
/// [`QuadTree`](crate::QuadTree), and a [`GridNode`](crate::GridNode) for the
/// [`HashGrid`](crate::HashGrid).
///
/// ## Semantics
///
/// - A new client is not indexed: [`Client::node`] is `None`.
/// - `insert` binds the client; the structure keeps its own copy of [`Client::value`].
/// - `remove` unbinds it and resets the placement to `None`.
/// - A client is linked to at most one structure at a time.
///
/// Structures may invalidate a placement without touching the client (for example a
/// rebuilding tree update that leaves the client out). Such a placement is stale: the structure
/// treats it as "not indexed", and removing the client is a no-op.
#[derive(Clone, Debug)]
pub struct Client<T, N> {
    /// The caller's payload, returned by queries and handed to pair checkers.
    pub value: T,
    pub(crate) node: Option<N>,
}

impl<T, N> Client<T, N> {
    /// Create an unindexed client.
    pub const fn new(value: T) -> Self {
        Self { value, node: None }
    }

    /// Current placement, if the client has been inserted.
    pub const fn node(&self) -> Option<&N> {
        self.node.as_ref()
    }

    /// Whether the client carries a placement.
    ///
    /// A placement can be stale; ask the structure (`contains`) for liveness.
    pub const fn is_bound(&self) -> bool {
        self.node.is_some()
    }

    /// Consume the client and return its payload.
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Default, N> Default for Client<T, N> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T, N> From<T> for Client<T, N> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
