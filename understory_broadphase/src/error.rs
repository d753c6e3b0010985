// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction errors.
//!
//! Only configuration is fallible. Runtime operations (insert, remove, update, queries) never
//! fail; misuse degrades to "object not indexed".

use kurbo::{Rect, Vec2};
use thiserror::Error;

/// Errors returned when a structure is built from an invalid configuration.
#[derive(Clone, Debug, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Grid bins must have a positive, finite width and height.
    #[error("bin size must be positive and finite, got {width}x{height}")]
    InvalidBinSize {
        /// Requested bin width.
        width: f64,
        /// Requested bin height.
        height: f64,
    },
    /// A grid needs at least one column and one row.
    #[error("grid must have at least one column and one row, got {columns}x{rows}")]
    EmptyGrid {
        /// Requested column count.
        columns: usize,
        /// Requested row count.
        rows: usize,
    },
    /// The grid allocates one bin per cell up front, so the cell count is bounded.
    #[error("grid of {columns}x{rows} bins exceeds the supported maximum of {max} bins")]
    GridTooLarge {
        /// Requested column count.
        columns: usize,
        /// Requested row count.
        rows: usize,
        /// Largest supported bin count.
        max: usize,
    },
    /// A grid offset must be finite.
    #[error("grid offset must be finite, got {0:?}")]
    InvalidOffset(Vec2),
    /// The region handed to a quadtree must be finite with positive area.
    #[error("region must be finite with positive area, got {0:?}")]
    DegenerateRegion(Rect),
    /// The quadtree is pre-subdivided, so depth is bounded.
    #[error("quadtree depth {depth} exceeds the supported maximum of {max}")]
    DepthTooLarge {
        /// Requested depth.
        depth: u32,
        /// Largest supported depth.
        max: u32,
    },
    /// Tree padding must be finite and non-negative.
    #[error("padding must be finite and non-negative, got {0:?}")]
    InvalidPadding(Vec2),
}

/// Result alias for fallible constructors.
pub type Result<T, E = Error> = core::result::Result<T, E>;
