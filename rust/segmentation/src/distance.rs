// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geodesic distance from every free cell to the nearest obstacle.
//!
//! Both wavefront searches in this crate (this one and the door-path search)
//! share the same queue discipline: a max-heap keyed by the negated score,
//! duplicate entries pushed on every improvement, and stale entries skipped
//! when popped. There is no decrease-key.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use indoor_recon_core::{Grid, Pixel};

/// Offsets of the 8-connected neighborhood with their Euclidean lengths.
pub(crate) const NEIGHBORS_8: [(i64, i64, f32); 8] = [
    (-1, -1, std::f32::consts::SQRT_2),
    (0, -1, 1.0),
    (1, -1, std::f32::consts::SQRT_2),
    (-1, 0, 1.0),
    (1, 0, 1.0),
    (-1, 1, std::f32::consts::SQRT_2),
    (0, 1, 1.0),
    (1, 1, std::f32::consts::SQRT_2),
];

/// Heap entry; `priority` is the negated path score.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WavefrontNode {
    pub priority: f32,
    pub pixel: Pixel,
}

impl WavefrontNode {
    pub fn new(score: f32, pixel: Pixel) -> Self {
        Self {
            priority: -score,
            pixel,
        }
    }

    pub fn score(&self) -> f32 {
        -self.priority
    }
}

impl PartialEq for WavefrontNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for WavefrontNode {}

impl PartialOrd for WavefrontNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WavefrontNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| self.pixel.cmp(&other.pixel))
    }
}

/// Free neighbor of `pixel` at offset `(dx, dy)`, if any.
#[inline]
pub(crate) fn free_neighbor(mask: &Grid<bool>, pixel: Pixel, dx: i64, dy: i64) -> Option<Pixel> {
    let x = pixel.0 as i64 + dx;
    let y = pixel.1 as i64 + dy;
    match mask.get_signed(x, y) {
        Some(true) => Some((x as usize, y as usize)),
        _ => None,
    }
}

/// True if a free cell has at least one blocked 4-neighbor.
#[inline]
pub(crate) fn touches_obstacle(mask: &Grid<bool>, x: usize, y: usize) -> bool {
    [(-1, 0), (1, 0), (0, -1), (0, 1)]
        .iter()
        .any(|&(dx, dy)| free_neighbor(mask, (x, y), dx, dy).is_none())
}

/// Multi-source Dijkstra from every free cell that touches an obstacle.
///
/// Steps are 8-connected with lengths 1 and √2. Sources hold 0; cells that
/// are blocked or unreachable hold `f32::INFINITY`.
pub fn distance_to_boundary(mask: &Grid<bool>) -> Grid<f32> {
    let (width, height) = (mask.width(), mask.height());
    let mut distance = Grid::new(width, height, f32::INFINITY);
    let mut wavefront = BinaryHeap::new();

    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            if mask[(x, y)] && touches_obstacle(mask, x, y) {
                distance[(x, y)] = 0.0;
                wavefront.push(WavefrontNode::new(0.0, (x, y)));
            }
        }
    }
    let sources = wavefront.len();

    while let Some(node) = wavefront.pop() {
        let current = node.score();
        if current > distance[node.pixel] {
            continue;
        }

        for &(dx, dy, step) in &NEIGHBORS_8 {
            let Some(next) = free_neighbor(mask, node.pixel, dx, dy) else {
                continue;
            };
            let candidate = current + step;
            if candidate < distance[next] {
                distance[next] = candidate;
                wavefront.push(WavefrontNode::new(candidate, next));
            }
        }
    }

    tracing::debug!(sources, "Computed distance to boundary");
    distance
}
