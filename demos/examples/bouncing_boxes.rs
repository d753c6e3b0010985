// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bouncing boxes.
//!
//! Move a few hundred boxes around a closed arena for a handful of ticks. Each tick pushes the
//! fresh boxes into a padded, incrementally updated AABB tree and counts touching pairs.
//!
//! Run:
//! - `RUST_LOG=trace cargo run -p understory_demos --example bouncing_boxes`

use kurbo::{Rect, Vec2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use understory_broadphase::types::{overlaps, translate};
use understory_broadphase::{AabbTree, AabbTreeConfig, Broadphase, Client, UpdatePolicy};

const ARENA: Rect = Rect::new(0.0, 0.0, 800.0, 600.0);
const BODIES: usize = 300;
const TICKS: usize = 20;

#[derive(Clone, Copy)]
struct Body {
    bounds: Rect,
    velocity: Vec2,
}

impl Body {
    fn step(&mut self) {
        self.bounds = translate(self.bounds, self.velocity);
        if self.bounds.x0 < ARENA.x0 || self.bounds.x1 > ARENA.x1 {
            self.velocity.x = -self.velocity.x;
        }
        if self.bounds.y0 < ARENA.y0 || self.bounds.y1 > ARENA.y1 {
            self.velocity.y = -self.velocity.y;
        }
    }
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut rng = StdRng::seed_from_u64(7);
    let mut bodies: Vec<Body> = (0..BODIES)
        .map(|_| {
            let size = rng.random_range(4.0..16.0);
            let x = rng.random_range(ARENA.x0..ARENA.x1 - size);
            let y = rng.random_range(ARENA.y0..ARENA.y1 - size);
            Body {
                bounds: Rect::new(x, y, x + size, y + size),
                velocity: Vec2::new(rng.random_range(-3.0..3.0), rng.random_range(-3.0..3.0)),
            }
        })
        .collect();

    let config = AabbTreeConfig::default()
        .with_padding(Vec2::new(4.0, 4.0))
        .with_update_policy(UpdatePolicy::Incremental);
    let mut tree = AabbTree::with_config(config).unwrap();
    let mut clients: Vec<Client<usize, _>> = (0..BODIES).map(Client::new).collect();
    for (client, body) in clients.iter_mut().zip(&bodies) {
        tree.insert(client, body.bounds);
    }

    for tick in 0..TICKS {
        for body in &mut bodies {
            body.step();
        }
        let boxes: Vec<Rect> = bodies.iter().map(|b| b.bounds).collect();
        tree.update(&mut clients, &boxes);

        let contacts = tree.collision_pairs(&clients, |a, b| {
            (a < b && overlaps(bodies[*a].bounds, bodies[*b].bounds)).then_some((*a, *b))
        });
        tracing::info!(
            tick,
            contacts = contacts.len(),
            nodes = tree.node_count(),
            height = tree.height(),
            "stepped"
        );
    }
}
