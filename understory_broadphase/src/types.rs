// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry helpers shared by the broadphase structures.
//!
//! Bounding boxes are plain [`kurbo::Rect`] values (`x0`/`y0` is the minimum corner, `x1`/`y1` the
//! maximum corner). All helpers assume finite coordinates with no NaNs; debug builds may assert.

use kurbo::{Rect, Vec2};

/// Whether two boxes overlap. Touching edges count as overlap.
#[inline]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && a.x1 >= b.x0 && a.y0 <= b.y1 && a.y1 >= b.y0
}

/// Whether `outer` contains `inner` with no shared edge.
///
/// This is the placement test of the bounded quadtree: a box lying on a quadrant boundary is not
/// contained by either quadrant and settles at their common ancestor.
#[inline]
pub fn strictly_contains(outer: Rect, inner: Rect) -> bool {
    inner.x0 > outer.x0 && inner.y0 > outer.y0 && inner.x1 < outer.x1 && inner.y1 < outer.y1
}

/// Whether `outer` contains `inner`, edges included.
#[inline]
pub fn contains(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Perimeter of a box, the insertion cost metric of the dynamic tree.
#[inline]
pub fn perimeter(r: Rect) -> f64 {
    let w = r.x1 - r.x0;
    let h = r.y1 - r.y0;
    w + w + h + h
}

/// Area of a box. Inverted boxes have zero area.
#[inline]
pub fn area(r: Rect) -> f64 {
    (r.x1 - r.x0).max(0.0) * (r.y1 - r.y0).max(0.0)
}

/// Expand a box by `padding` on every side: `min - padding`, `max + padding`.
#[inline]
pub fn pad(r: Rect, padding: Vec2) -> Rect {
    Rect::new(
        r.x0 - padding.x,
        r.y0 - padding.y,
        r.x1 + padding.x,
        r.y1 + padding.y,
    )
}

/// Move a box by `delta`.
#[inline]
pub fn translate(r: Rect, delta: Vec2) -> Rect {
    Rect::new(r.x0 + delta.x, r.y0 + delta.y, r.x1 + delta.x, r.y1 + delta.y)
}

/// Return true if the box has finite coordinates and `min <= max` on both axes.
#[inline]
pub fn is_well_formed(r: Rect) -> bool {
    r.x0.is_finite()
        && r.y0.is_finite()
        && r.x1.is_finite()
        && r.y1.is_finite()
        && r.x0 <= r.x1
        && r.y0 <= r.y1
}
