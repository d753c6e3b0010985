// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use kurbo::Rect;
use understory_broadphase::{
    AabbTree, AabbTreeConfig, Broadphase, Client, GridConfig, HashGrid, QuadTree, QuadTreeConfig,
    UpdatePolicy,
};

const WORLD: f64 = 2048.0;

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// `count` boxes of up to `max_size` scattered strictly inside the world.
fn gen_random_rects(count: usize, max_size: f64, seed: u64) -> Vec<Rect> {
    let mut rng = Rng::new(seed);
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        let w = 1.0 + rng.next_f64() * max_size;
        let h = 1.0 + rng.next_f64() * max_size;
        let x0 = 1.0 + rng.next_f64() * (WORLD - w - 2.0);
        let y0 = 1.0 + rng.next_f64() * (WORLD - h - 2.0);
        out.push(Rect::new(x0, y0, x0 + w, y0 + h));
    }
    out
}

/// Shift every box by a small amount, clamped to the world.
fn jitter(rects: &[Rect], step: f64, seed: u64) -> Vec<Rect> {
    let mut rng = Rng::new(seed);
    rects
        .iter()
        .map(|r| {
            let dx = (rng.next_f64() - 0.5) * step;
            let dy = (rng.next_f64() - 0.5) * step;
            let dx = dx.clamp(1.0 - r.x0, WORLD - 1.0 - r.x1);
            let dy = dy.clamp(1.0 - r.y0, WORLD - 1.0 - r.y1);
            Rect::new(r.x0 + dx, r.y0 + dy, r.x1 + dx, r.y1 + dy)
        })
        .collect()
}

fn grid() -> HashGrid<u32> {
    let config = GridConfig::covering(Rect::new(0.0, 0.0, WORLD, WORLD), 32.0, 32.0);
    HashGrid::new(config).unwrap()
}

fn quadtree() -> QuadTree<u32> {
    let config = QuadTreeConfig::new(Rect::new(0.0, 0.0, WORLD, WORLD)).with_max_depth(6);
    QuadTree::new(config).unwrap()
}

fn incremental_tree() -> AabbTree<u32> {
    let config = AabbTreeConfig::default()
        .with_padding(kurbo::Vec2::new(4.0, 4.0))
        .with_update_policy(UpdatePolicy::Incremental);
    AabbTree::with_config(config).unwrap()
}

fn populate<B: Broadphase<u32>>(mut index: B, rects: &[Rect]) -> (B, Vec<Client<u32, B::Node>>) {
    let mut clients: Vec<_> = (0..rects.len() as u32).map(Client::new).collect();
    for (c, r) in clients.iter_mut().zip(rects) {
        index.insert(c, *r);
    }
    (index, clients)
}

fn bench_structure<B: Broadphase<u32>>(c: &mut Criterion, name: &str, make: fn() -> B) {
    let mut group = c.benchmark_group(name);
    for &n in &[256usize, 1024, 4096] {
        let rects = gen_random_rects(n, 24.0, 0xCAFE_F00D_DEAD_BEEF);
        let moved = jitter(&rects, 6.0, 0xBADC_F00D_1234_5678);
        let queries = gen_random_rects(64, 200.0, 0xC1A5_7E55_9999_ABCD);
        group.throughput(Throughput::Elements(n as u64));

        group.bench_function(format!("insert_n{n}"), |b| {
            b.iter_batched(
                make,
                |index| {
                    let (index, _clients) = populate(index, &rects);
                    black_box(index.len())
                },
                BatchSize::SmallInput,
            );
        });

        group.bench_function(format!("update_n{n}"), |b| {
            b.iter_batched(
                || populate(make(), &rects),
                |(mut index, mut clients)| {
                    index.update(&mut clients, &moved);
                    black_box(index.len())
                },
                BatchSize::SmallInput,
            );
        });

        let (mut index, clients) = populate(make(), &rects);
        group.bench_function(format!("query_n{n}"), |b| {
            let mut out = Vec::new();
            b.iter(|| {
                let mut hits = 0;
                for q in &queries {
                    out.clear();
                    index.query_into(*q, &mut out);
                    hits += out.len();
                }
                black_box(hits)
            });
        });

        group.bench_function(format!("pairs_n{n}"), |b| {
            b.iter(|| {
                let pairs = index.collision_pairs(&clients, |a, b| (a < b).then_some((*a, *b)));
                black_box(pairs.len())
            });
        });
    }
    group.finish();
}

fn bench_grid(c: &mut Criterion) {
    bench_structure(c, "hash_grid", grid);
}

fn bench_quadtree(c: &mut Criterion) {
    bench_structure(c, "quadtree", quadtree);
}

fn bench_aabb_tree(c: &mut Criterion) {
    bench_structure(c, "aabb_tree_rebuild", AabbTree::<u32>::new);
    bench_structure(c, "aabb_tree_incremental", incremental_tree);
}

criterion_group!(benches, bench_grid, bench_quadtree, bench_aabb_tree);
criterion_main!(benches);
