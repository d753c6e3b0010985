// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction parameters for the three structures.
//!
//! Each config has a [`Default`] and builder-style `with_*` methods. Validation happens in the
//! structure constructors ([`HashGrid::new`](crate::HashGrid::new),
//! [`QuadTree::new`](crate::QuadTree::new), [`AabbTree::with_config`](crate::AabbTree::with_config)).

use kurbo::{Rect, Vec2};

use crate::error::{Error, Result};
use crate::types::area;

/// Largest supported [`QuadTreeConfig::max_depth`].
///
/// A depth-`d` tree pre-allocates `(4^(d+1) - 1) / 3` nodes; depth 10 is about 1.4 million.
pub const MAX_QUADTREE_DEPTH: u32 = 10;

/// Largest supported [`GridConfig::bin_count`], about 4.2 million bins.
pub const MAX_GRID_BINS: usize = 1 << 22;

/// Layout of a [`HashGrid`](crate::HashGrid).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridConfig {
    /// Width of one bin.
    pub bin_width: f64,
    /// Height of one bin.
    pub bin_height: f64,
    /// Number of bins along x.
    pub columns: usize,
    /// Number of bins along y.
    pub rows: usize,
    /// World position of the grid's minimum corner.
    pub offset: Vec2,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bin_width: 100.0,
            bin_height: 100.0,
            columns: 10,
            rows: 10,
            offset: Vec2::ZERO,
        }
    }
}

impl GridConfig {
    /// A `columns × rows` grid of `bin_width × bin_height` bins anchored at the origin.
    pub const fn new(bin_width: f64, bin_height: f64, columns: usize, rows: usize) -> Self {
        Self {
            bin_width,
            bin_height,
            columns,
            rows,
            offset: Vec2::ZERO,
        }
    }

    /// The smallest grid of `bin_width × bin_height` bins that covers `extent`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Bin counts are small, non-negative and rounded up before the cast."
    )]
    pub fn covering(extent: Rect, bin_width: f64, bin_height: f64) -> Self {
        let count = |len: f64, size: f64| -> usize {
            if size.is_nan() || size <= 0.0 || len.is_nan() || len <= 0.0 {
                return 1;
            }
            let n = len / size;
            let whole = n as usize;
            if (whole as f64) < n {
                whole.saturating_add(1)
            } else {
                whole.max(1)
            }
        };
        Self {
            bin_width,
            bin_height,
            columns: count(extent.x1 - extent.x0, bin_width),
            rows: count(extent.y1 - extent.y0, bin_height),
            offset: Vec2::new(extent.x0, extent.y0),
        }
    }

    /// Set the world position of the grid's minimum corner.
    pub const fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Total number of bins, saturating at `usize::MAX`.
    pub const fn bin_count(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }

    /// World-space extent covered by the bins.
    #[allow(
        clippy::cast_precision_loss,
        reason = "Bin counts are far below f64's exact integer range."
    )]
    pub fn extent(&self) -> Rect {
        Rect::new(
            self.offset.x,
            self.offset.y,
            self.offset.x + self.bin_width * self.columns as f64,
            self.offset.y + self.bin_height * self.rows as f64,
        )
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.bin_width) || !positive(self.bin_height) {
            return Err(Error::InvalidBinSize {
                width: self.bin_width,
                height: self.bin_height,
            });
        }
        if self.columns == 0 || self.rows == 0 {
            return Err(Error::EmptyGrid {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if self
            .columns
            .checked_mul(self.rows)
            .is_none_or(|bins| bins > MAX_GRID_BINS)
        {
            return Err(Error::GridTooLarge {
                columns: self.columns,
                rows: self.rows,
                max: MAX_GRID_BINS,
            });
        }
        if !self.offset.x.is_finite() || !self.offset.y.is_finite() {
            return Err(Error::InvalidOffset(self.offset));
        }
        Ok(())
    }
}

/// Region and depth of a [`QuadTree`](crate::QuadTree).
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuadTreeConfig {
    /// Region covered by the root node.
    pub bounds: Rect,
    /// Number of subdivision levels below the root. `0` is a single node.
    pub max_depth: u32,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            bounds: Rect::new(0.0, 0.0, 1000.0, 1000.0),
            max_depth: 3,
        }
    }
}

impl QuadTreeConfig {
    /// A tree over `bounds` with the default depth.
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    /// Set the number of subdivision levels.
    pub const fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let b = self.bounds;
        let finite = b.x0.is_finite() && b.y0.is_finite() && b.x1.is_finite() && b.y1.is_finite();
        if !finite || area(b) <= 0.0 {
            return Err(Error::DegenerateRegion(b));
        }
        if self.max_depth > MAX_QUADTREE_DEPTH {
            return Err(Error::DepthTooLarge {
                depth: self.max_depth,
                max: MAX_QUADTREE_DEPTH,
            });
        }
        Ok(())
    }
}

/// How [`AabbTree`](crate::AabbTree) handles a batch `update`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum UpdatePolicy {
    /// Return every node to the pool and reinsert the whole batch.
    ///
    /// Clients left out of the batch are dropped from the tree and their handles go stale.
    #[default]
    Rebuild,
    /// Reinsert a client only when its fresh box escapes the padded leaf bounds.
    Incremental,
}

/// Parameters of an [`AabbTree`](crate::AabbTree).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AabbTreeConfig {
    /// Margin added on every side of a leaf box at insertion time.
    pub padding: Vec2,
    /// Batch update behavior.
    pub update_policy: UpdatePolicy,
}

impl AabbTreeConfig {
    /// Set the leaf padding.
    pub const fn with_padding(mut self, padding: Vec2) -> Self {
        self.padding = padding;
        self
    }

    /// Set the batch update behavior.
    pub const fn with_update_policy(mut self, update_policy: UpdatePolicy) -> Self {
        self.update_policy = update_policy;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let p = self.padding;
        if !(p.x.is_finite() && p.y.is_finite() && p.x >= 0.0 && p.y >= 0.0) {
            return Err(Error::InvalidPadding(p));
        }
        Ok(())
    }
}
