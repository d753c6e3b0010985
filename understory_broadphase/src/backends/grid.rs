// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Uniform hash grid with replicated references.
//!
//! A box is referenced from every bin its extent touches. Queries deduplicate entries spanning
//! several bins with a per-grid generation counter stamped onto each visited entry.

use alloc::vec::Vec;
use core::fmt::Debug;
use core::ops::RangeInclusive;
use kurbo::Rect;

use crate::broadphase::Broadphase;
use crate::client::Client;
use crate::config::GridConfig;
use crate::error::Result;
use crate::pool::{Handle, Pool};
use crate::types::{is_well_formed, overlaps};

/// Placement of a client in a [`HashGrid`]: its entry handle and every bin it occupies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridNode {
    key: Handle,
    bins: Vec<usize>,
}

impl GridNode {
    /// Handle of the client's entry.
    pub const fn key(&self) -> Handle {
        self.key
    }

    /// Flat indices (`row * columns + col`) of the occupied bins.
    pub fn bins(&self) -> &[usize] {
        &self.bins
    }
}

struct GridEntry<T> {
    value: T,
    bounds: Rect,
    /// Generation of the last query that visited this entry.
    stamp: u64,
}

/// Read-only view of one bin, handed to [`HashGrid::traverse_all`] callbacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BinView {
    /// Flat bin index.
    pub index: usize,
    /// World-space region of the bin.
    pub region: Rect,
    /// Number of entries referenced from this bin.
    pub occupants: usize,
}

/// Uniform hash grid broadphase.
pub struct HashGrid<T> {
    config: GridConfig,
    bins: Vec<Vec<Handle>>,
    entries: Pool<GridEntry<T>>,
    query_generation: u64,
}

impl<T> Default for HashGrid<T> {
    fn default() -> Self {
        Self::build(GridConfig::default())
    }
}

impl<T> HashGrid<T> {
    /// Create a grid with the given layout.
    pub fn new(config: GridConfig) -> Result<Self> {
        config.validate()?;
        tracing::debug!(
            columns = config.columns,
            rows = config.rows,
            bin_width = config.bin_width,
            bin_height = config.bin_height,
            "created hash grid"
        );
        Ok(Self::build(config))
    }

    fn build(config: GridConfig) -> Self {
        let mut bins = Vec::with_capacity(config.bin_count());
        bins.resize_with(config.bin_count(), Vec::new);
        Self {
            config,
            bins,
            entries: Pool::new(),
            query_generation: 0,
        }
    }

    /// Layout of the grid.
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Whether `client`'s placement refers to a live entry of this grid.
    pub fn contains(&self, client: &Client<T, GridNode>) -> bool {
        client
            .node
            .as_ref()
            .is_some_and(|n| self.entries.contains(n.key))
    }

    /// World-space region of bin `index`, or `None` if out of range.
    #[allow(
        clippy::cast_precision_loss,
        reason = "Bin coordinates are far below f64's exact integer range."
    )]
    pub fn bin_region(&self, index: usize) -> Option<Rect> {
        if index >= self.bins.len() {
            return None;
        }
        let c = &self.config;
        let col = (index % c.columns) as f64;
        let row = (index / c.columns) as f64;
        let x0 = c.offset.x + col * c.bin_width;
        let y0 = c.offset.y + row * c.bin_height;
        Some(Rect::new(x0, y0, x0 + c.bin_width, y0 + c.bin_height))
    }

    /// Flat indices of every bin `bounds` maps to, column by column.
    ///
    /// Coordinates outside the grid clamp to the border bins.
    pub fn bin_indices(&self, bounds: Rect) -> Vec<usize> {
        let (cols, rows) = self.bin_range(bounds);
        let mut out = Vec::with_capacity(cols.clone().count() * rows.clone().count());
        for col in cols {
            for row in rows.clone() {
                out.push(row * self.config.columns + col);
            }
        }
        out
    }

    /// Visit every bin in flat-index order and collect whatever the callback pushes into the
    /// output buffer.
    pub fn traverse_all<U, F>(&self, mut f: F) -> Vec<U>
    where
        F: FnMut(BinView, &mut Vec<U>),
    {
        let mut out = Vec::new();
        for (index, bin) in self.bins.iter().enumerate() {
            if let Some(region) = self.bin_region(index) {
                let view = BinView {
                    index,
                    region,
                    occupants: bin.len(),
                };
                f(view, &mut out);
            }
        }
        out
    }

    /// Append every payload overlapping `bounds` for which `filter` returns `true`.
    ///
    /// The filter runs after the overlap test and sees each entry at most once.
    pub fn query_with<F>(&mut self, bounds: Rect, mut filter: F, out: &mut Vec<T>)
    where
        T: Clone,
        F: FnMut(&T) -> bool,
    {
        let generation = self.next_generation();
        let (cols, rows) = self.bin_range(bounds);
        let columns = self.config.columns;
        for col in cols {
            for row in rows.clone() {
                for &key in &self.bins[row * columns + col] {
                    let entry = &mut self.entries[key];
                    if entry.stamp == generation {
                        continue;
                    }
                    entry.stamp = generation;
                    if overlaps(entry.bounds, bounds) && filter(&entry.value) {
                        out.push(entry.value.clone());
                    }
                }
            }
        }
    }

    /// Run `checker` over every unordered pair of co-occupants of each bin.
    ///
    /// Pairs sharing several bins are reported once per shared bin.
    pub fn bin_pairs<U, F>(&self, mut checker: F) -> Vec<U>
    where
        F: FnMut(&T, &T) -> Option<U>,
    {
        let mut out = Vec::new();
        for bin in &self.bins {
            for (i, &a) in bin.iter().enumerate() {
                for &b in &bin[i + 1..] {
                    if let Some(u) = checker(&self.entries[a].value, &self.entries[b].value) {
                        out.push(u);
                    }
                }
            }
        }
        out
    }

    fn next_generation(&mut self) -> u64 {
        self.query_generation = self.query_generation.wrapping_add(1);
        if self.query_generation == 0 {
            tracing::trace!("grid query generation wrapped; resetting stamps");
            for entry in self.entries.values_mut() {
                entry.stamp = 0;
            }
            self.query_generation = 1;
        }
        self.query_generation
    }

    fn bin_range(&self, bounds: Rect) -> (RangeInclusive<usize>, RangeInclusive<usize>) {
        let c = &self.config;
        let col0 = axis_bin(bounds.x0, c.offset.x, c.bin_width, c.columns);
        let col1 = axis_bin(bounds.x1, c.offset.x, c.bin_width, c.columns);
        let row0 = axis_bin(bounds.y0, c.offset.y, c.bin_height, c.rows);
        let row1 = axis_bin(bounds.y1, c.offset.y, c.bin_height, c.rows);
        (col0..=col1, row0..=row1)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "Saturating float-to-int cast; the result is clamped to the grid."
)]
fn floor_to_i64(v: f64) -> i64 {
    let i = v as i64;
    if (i as f64) > v { i - 1 } else { i }
}

/// Bin coordinate of `v` along one axis, clamped to `[0, count - 1]`.
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Bin counts fit in i64 and the clamped value is non-negative."
)]
fn axis_bin(v: f64, offset: f64, size: f64, count: usize) -> usize {
    let last = count.saturating_sub(1) as i64;
    floor_to_i64((v - offset) / size).clamp(0, last) as usize
}

impl<T: Clone> Broadphase<T> for HashGrid<T> {
    type Node = GridNode;

    fn insert(&mut self, client: &mut Client<T, GridNode>, bounds: Rect) -> bool {
        debug_assert!(is_well_formed(bounds), "malformed box {bounds:?}");
        self.remove(client);
        let bins = self.bin_indices(bounds);
        let key = self.entries.give(GridEntry {
            value: client.value.clone(),
            bounds,
            stamp: 0,
        });
        for &bin in &bins {
            self.bins[bin].push(key);
        }
        client.node = Some(GridNode { key, bins });
        true
    }

    fn remove(&mut self, client: &mut Client<T, GridNode>) {
        let Some(node) = client.node.take() else {
            return;
        };
        if self.entries.take(node.key).is_none() {
            return;
        }
        for bin in node.bins {
            if let Some(bin) = self.bins.get_mut(bin)
                && let Some(pos) = bin.iter().position(|k| *k == node.key)
            {
                bin.swap_remove(pos);
            }
        }
    }

    fn update(&mut self, clients: &mut [Client<T, GridNode>], bounds: &[Rect]) {
        debug_assert_eq!(clients.len(), bounds.len(), "one box per client");
        for (client, b) in clients.iter_mut().zip(bounds) {
            self.insert(client, *b);
        }
    }

    fn query_into(&mut self, bounds: Rect, out: &mut Vec<T>) {
        self.query_with(bounds, |_| true, out);
    }

    fn collision_pairs_into<U, F>(
        &self,
        clients: &[Client<T, GridNode>],
        mut checker: F,
        out: &mut Vec<U>,
    ) where
        F: FnMut(&T, &T) -> Option<U>,
    {
        for client in clients {
            let Some(node) = &client.node else {
                continue;
            };
            if !self.entries.contains(node.key) {
                continue;
            }
            for &bin in &node.bins {
                for &other in &self.bins[bin] {
                    if other == node.key {
                        continue;
                    }
                    if let Some(u) = checker(&client.value, &self.entries[other].value) {
                        out.push(u);
                    }
                }
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        for bin in &mut self.bins {
            bin.clear();
        }
        self.entries.clear();
    }
}

impl<T> Debug for HashGrid<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let occupied = self.bins.iter().filter(|b| !b.is_empty()).count();
        f.debug_struct("HashGrid")
            .field("columns", &self.config.columns)
            .field("rows", &self.config.rows)
            .field("entries", &self.entries.len())
            .field("occupied_bins", &occupied)
            .field("query_generation", &self.query_generation)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use kurbo::Vec2;

    type GridClient = Client<u32, GridNode>;

    fn r(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    #[test]
    fn box_occupies_six_bins() {
        let mut grid = HashGrid::new(GridConfig::new(100.0, 100.0, 10, 10)).unwrap();
        let mut c: GridClient = Client::new(1);
        assert!(grid.insert(&mut c, r(50.0, 50.0, 250.0, 150.0)));
        let mut bins = c.node().unwrap().bins().to_vec();
        bins.sort_unstable();
        assert_eq!(bins, vec![0, 1, 2, 10, 11, 12]);
    }

    #[test]
    fn coordinates_clamp_to_border_bins() {
        let grid: HashGrid<u32> = HashGrid::new(GridConfig::new(10.0, 10.0, 4, 3)).unwrap();
        assert_eq!(grid.bin_indices(r(-50.0, -50.0, -40.0, -40.0)), vec![0]);
        assert_eq!(grid.bin_indices(r(500.0, 500.0, 900.0, 900.0)), vec![11]);
        let shifted: HashGrid<u32> =
            HashGrid::new(GridConfig::new(10.0, 10.0, 4, 4).with_offset(Vec2::new(-20.0, -20.0)))
                .unwrap();
        assert_eq!(shifted.bin_indices(r(-11.0, -1.0, -9.0, -1.0)), vec![4, 5]);
    }

    #[test]
    fn bin_region_round_trips_indices() {
        let grid: HashGrid<u32> =
            HashGrid::new(GridConfig::new(10.0, 20.0, 3, 2).with_offset(Vec2::new(5.0, 0.0)))
                .unwrap();
        assert_eq!(grid.bin_region(4), Some(r(15.0, 20.0, 25.0, 40.0)));
        assert_eq!(grid.bin_region(6), None);
        let regions = grid.traverse_all(|view, out| out.push(view.region));
        assert_eq!(regions.len(), 6);
        assert_eq!(regions[0], r(5.0, 0.0, 15.0, 20.0));
    }

    #[test]
    fn query_deduplicates_multi_bin_entries() {
        let mut grid = HashGrid::new(GridConfig::new(10.0, 10.0, 10, 10)).unwrap();
        let mut big: GridClient = Client::new(1);
        let mut small: GridClient = Client::new(2);
        assert!(grid.insert(&mut big, r(0.0, 0.0, 55.0, 55.0)));
        assert!(grid.insert(&mut small, r(80.0, 80.0, 82.0, 82.0)));
        assert_eq!(grid.query(r(0.0, 0.0, 100.0, 100.0)).len(), 2);
        assert_eq!(grid.query(r(0.0, 0.0, 30.0, 30.0)), vec![1]);
        // Same bin but no box overlap.
        assert!(grid.query(r(85.0, 85.0, 86.0, 86.0)).is_empty());
    }

    #[test]
    fn generation_wrap_resets_stamps() {
        let mut grid = HashGrid::new(GridConfig::new(10.0, 10.0, 4, 4)).unwrap();
        let mut c: GridClient = Client::new(1);
        assert!(grid.insert(&mut c, r(1.0, 1.0, 15.0, 15.0)));
        grid.query_generation = u64::MAX - 1;
        assert_eq!(grid.query(r(0.0, 0.0, 40.0, 40.0)), vec![1]);
        assert_eq!(grid.query(r(0.0, 0.0, 40.0, 40.0)), vec![1]);
        assert_eq!(grid.query_generation, 1);
        assert_eq!(grid.query(r(0.0, 0.0, 40.0, 40.0)), vec![1]);
    }

    #[test]
    fn query_with_filters_after_overlap() {
        let mut grid = HashGrid::default();
        let mut clients: Vec<GridClient> = (0..6).map(Client::new).collect();
        for (i, c) in clients.iter_mut().enumerate() {
            let x = i as f64 * 20.0;
            assert!(grid.insert(c, r(x, 0.0, x + 10.0, 10.0)));
        }
        let mut out = Vec::new();
        grid.query_with(r(0.0, 0.0, 70.0, 10.0), |v| v % 2 == 0, &mut out);
        out.sort_unstable();
        assert_eq!(out, vec![0, 2]);
    }

    #[test]
    fn remove_clears_every_bin() {
        let mut grid = HashGrid::new(GridConfig::new(10.0, 10.0, 5, 5)).unwrap();
        let mut c: GridClient = Client::new(1);
        let mut stranger: GridClient = Client::new(2);
        assert!(grid.insert(&mut c, r(5.0, 5.0, 25.0, 25.0)));
        grid.remove(&mut stranger);
        assert_eq!(grid.len(), 1);
        grid.remove(&mut c);
        grid.remove(&mut c);
        assert!(grid.is_empty());
        let occupied = grid.traverse_all(|view, out| {
            if view.occupants > 0 {
                out.push(view.index);
            }
        });
        assert!(occupied.is_empty());
    }

    #[test]
    fn update_recomputes_bins() {
        let mut grid = HashGrid::new(GridConfig::new(10.0, 10.0, 5, 5)).unwrap();
        let mut clients: Vec<GridClient> = vec![Client::new(1)];
        assert!(grid.insert(&mut clients[0], r(1.0, 1.0, 2.0, 2.0)));
        grid.update(&mut clients, &[r(41.0, 41.0, 42.0, 42.0)]);
        assert_eq!(clients[0].node().unwrap().bins(), &[24]);
        assert!(grid.query(r(0.0, 0.0, 5.0, 5.0)).is_empty());
        assert_eq!(grid.query(r(40.0, 40.0, 50.0, 50.0)), vec![1]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn pairs_are_reported_per_shared_bin() {
        let mut grid = HashGrid::new(GridConfig::new(10.0, 10.0, 5, 5)).unwrap();
        let mut clients: Vec<GridClient> = (0..3).map(Client::new).collect();
        // 0 and 1 share bins 0 and 1; 2 is alone.
        assert!(grid.insert(&mut clients[0], r(1.0, 1.0, 15.0, 5.0)));
        assert!(grid.insert(&mut clients[1], r(2.0, 2.0, 18.0, 6.0)));
        assert!(grid.insert(&mut clients[2], r(41.0, 41.0, 42.0, 42.0)));

        let pairs = grid.collision_pairs(&clients, |a, b| Some((*a, *b)));
        assert_eq!(pairs.iter().filter(|p| **p == (0, 1)).count(), 2);
        assert_eq!(pairs.iter().filter(|p| **p == (1, 0)).count(), 2);
        assert_eq!(pairs.len(), 4);

        let unordered = grid.bin_pairs(|a, b| Some((*a.min(b), *a.max(b))));
        assert_eq!(unordered, vec![(0, 1), (0, 1)]);
    }

    #[test]
    fn clear_stales_placements() {
        let mut grid = HashGrid::new(GridConfig::new(10.0, 10.0, 5, 5)).unwrap();
        let mut c: GridClient = Client::new(1);
        assert!(grid.insert(&mut c, r(1.0, 1.0, 2.0, 2.0)));
        grid.clear();
        assert!(!grid.contains(&c));
        grid.remove(&mut c);
        assert!(grid.is_empty());
    }

    #[test]
    fn placement_from_another_grid_is_ignored() {
        let config = GridConfig::new(10.0, 10.0, 5, 5);
        let mut first = HashGrid::new(config).unwrap();
        let mut second = HashGrid::new(config).unwrap();
        let mut c: GridClient = Client::new(1);
        let mut d: GridClient = Client::new(2);
        assert!(first.insert(&mut c, r(1.0, 1.0, 2.0, 2.0)));
        first.clear();

        // `d` gets the same slot and generation that `c` still points at.
        assert!(second.insert(&mut d, r(3.0, 3.0, 4.0, 4.0)));
        assert_eq!(c.node().unwrap().key().index(), d.node().unwrap().key().index());
        assert!(!second.contains(&c));

        assert!(second.insert(&mut c, r(1.0, 1.0, 2.0, 2.0)));
        assert_eq!(second.len(), 2);
        assert!(second.contains(&c));
        assert!(second.contains(&d));
        let mut hits = second.query(r(0.0, 0.0, 10.0, 10.0));
        hits.sort_unstable();
        assert_eq!(hits, vec![1, 2]);
    }

    #[test]
    fn single_update_matches_remove_then_insert() {
        let config = GridConfig::new(10.0, 10.0, 5, 5);
        let start = r(1.0, 1.0, 2.0, 2.0);
        let moved = r(12.0, 3.0, 31.0, 14.0);

        let mut updated = HashGrid::new(config).unwrap();
        let mut a: Vec<GridClient> = vec![Client::new(1)];
        assert!(updated.insert(&mut a[0], start));
        updated.update(&mut a, &[moved]);

        let mut reinserted = HashGrid::new(config).unwrap();
        let mut b: GridClient = Client::new(1);
        assert!(reinserted.insert(&mut b, start));
        reinserted.remove(&mut b);
        assert!(reinserted.insert(&mut b, moved));

        assert_eq!(a[0].node().unwrap().bins(), b.node().unwrap().bins());
        assert_eq!(updated.len(), reinserted.len());
        let everything = r(0.0, 0.0, 50.0, 50.0);
        assert_eq!(updated.query(everything), reinserted.query(everything));
        assert!(updated.query(r(0.0, 0.0, 5.0, 5.0)).is_empty());
    }
}
