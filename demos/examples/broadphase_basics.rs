// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Broadphase basics.
//!
//! Index the same three boxes in each structure, query a region, list candidate pairs, and dump
//! the node outlines a renderer would draw.
//!
//! Run:
//! - `cargo run -p understory_demos --example broadphase_basics`

use kurbo::Rect;
use understory_broadphase::{
    AabbTree, Broadphase, Client, GridConfig, HashGrid, QuadTree, QuadTreeConfig,
};

const BOXES: [(&str, Rect); 3] = [
    ("crate", Rect::new(10.0, 10.0, 60.0, 60.0)),
    ("barrel", Rect::new(40.0, 40.0, 120.0, 120.0)),
    ("lamp", Rect::new(150.0, 20.0, 170.0, 40.0)),
];

fn run<B: Broadphase<&'static str>>(name: &str, index: &mut B) {
    let mut clients: Vec<Client<&'static str, B::Node>> =
        BOXES.iter().map(|(label, _)| Client::new(*label)).collect();
    for (client, (_, bounds)) in clients.iter_mut().zip(BOXES) {
        index.insert(client, bounds);
    }

    let mut hits = index.query(Rect::new(0.0, 0.0, 50.0, 50.0));
    hits.sort_unstable();
    println!("{name}: query top-left -> {hits:?}");

    let pairs = index.collision_pairs(&clients, |a, b| (a < b).then_some((*a, *b)));
    println!("{name}: candidate pairs -> {pairs:?}");
    assert!(pairs.contains(&("barrel", "crate")));
}

fn main() {
    let mut grid = HashGrid::new(GridConfig::new(50.0, 50.0, 4, 4)).unwrap();
    run("grid", &mut grid);
    let occupied = grid.traverse_all(|bin, out| {
        if bin.occupants > 0 {
            out.push((bin.index, bin.occupants));
        }
    });
    println!("grid: occupied bins (index, occupants) -> {occupied:?}");

    let config = QuadTreeConfig::new(Rect::new(0.0, 0.0, 200.0, 200.0)).with_max_depth(2);
    let mut quad = QuadTree::new(config).unwrap();
    run("quadtree", &mut quad);
    let outlines = quad.traverse_all(|node, out| {
        if !node.objects.is_empty() {
            out.push((node.depth, node.region));
        }
    });
    println!("quadtree: nodes holding objects -> {outlines:?}");

    let mut tree = AabbTree::new();
    run("aabb tree", &mut tree);
    let outlines = tree.traverse_all(|node, out| out.push((node.depth, node.bounds)));
    println!("aabb tree: height {} -> {outlines:?}", tree.height());
}
