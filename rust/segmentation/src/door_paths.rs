// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Door evidence from all-pairs shortest paths through free space.
//!
//! Step cost out of a cell is its distance to the boundary times the step
//! length, so paths between seeds funnel through the narrow passages that
//! connect rooms. Counting how many seed-to-seed paths cross each cell and
//! blurring the counts gives a door-evidence field.

use std::collections::BinaryHeap;

use indoor_recon_core::{Grid, Pixel};
use rayon::prelude::*;

use crate::deadline::Deadline;
use crate::distance::{free_neighbor, WavefrontNode, NEIGHBORS_8};
use crate::error::{Error, Result};

/// Per-cell state of a single-source search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathNode {
    /// Cumulative cost from the seed; `f32::INFINITY` if unreached.
    pub score: f32,
    pub previous: Option<Pixel>,
}

impl Default for PathNode {
    fn default() -> Self {
        Self {
            score: f32::INFINITY,
            previous: None,
        }
    }
}

/// Parent-pointer tree produced by [`foreground_path`].
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    seed: Pixel,
    nodes: Grid<PathNode>,
}

impl ShortestPathTree {
    pub fn seed(&self) -> Pixel {
        self.seed
    }

    pub fn node(&self, pixel: Pixel) -> Option<&PathNode> {
        self.nodes.get(pixel.0, pixel.1)
    }

    /// Cost of the best path from the seed to `pixel`.
    pub fn score(&self, pixel: Pixel) -> f32 {
        self.node(pixel).map_or(f32::INFINITY, |n| n.score)
    }

    /// Pixels from `target` back to the seed, target first, seed excluded.
    ///
    /// Empty if `target` was never reached or is the seed itself.
    pub fn trace_back(&self, target: Pixel) -> Vec<Pixel> {
        let mut path = Vec::new();
        if self.score(target) == f32::INFINITY {
            return path;
        }

        let mut pixel = target;
        while pixel != self.seed {
            path.push(pixel);
            match self.nodes[pixel].previous {
                Some(previous) => pixel = previous,
                None => break,
            }
        }
        path
    }
}

/// Single-source Dijkstra from `seed` over the free cells of `mask`.
///
/// Moving from `(x, y)` to a neighbor costs
/// `distance_to_boundary[x, y] * step_length`.
pub fn foreground_path(mask: &Grid<bool>, distance_to_boundary: &Grid<f32>, seed: Pixel) -> Result<ShortestPathTree> {
    if mask.get(seed.0, seed.1) != Some(&true) {
        return Err(Error::SeedOutsideMask { x: seed.0, y: seed.1 });
    }

    let mut nodes = Grid::new(mask.width(), mask.height(), PathNode::default());
    nodes[seed].score = 0.0;
    let mut wavefront = BinaryHeap::new();
    wavefront.push(WavefrontNode::new(0.0, seed));

    while let Some(node) = wavefront.pop() {
        let current = node.score();
        if current > nodes[node.pixel].score {
            continue;
        }

        let weight = distance_to_boundary[node.pixel];
        for &(dx, dy, step) in &NEIGHBORS_8 {
            let Some(next) = free_neighbor(mask, node.pixel, dx, dy) else {
                continue;
            };
            let candidate = current + weight * step;
            if candidate < nodes[next].score {
                nodes[next] = PathNode {
                    score: candidate,
                    previous: Some(node.pixel),
                };
                wavefront.push(WavefrontNode::new(candidate, next));
            }
        }
    }

    Ok(ShortestPathTree { seed, nodes })
}

/// Counts, per cell, the shortest paths from `seed` to each of `targets`
/// that pass through it.
pub fn find_shortest_paths(
    mask: &Grid<bool>,
    distance_to_boundary: &Grid<f32>,
    seed: Pixel,
    targets: &[Pixel],
) -> Result<Grid<f32>> {
    let tree = foreground_path(mask, distance_to_boundary, seed)?;
    let mut path_counts = Grid::new(mask.width(), mask.height(), 0.0f32);
    for &target in targets {
        for pixel in tree.trace_back(target) {
            path_counts[pixel] += 1.0;
        }
    }
    Ok(path_counts)
}

/// Free cells on a regular lattice with spacing `step`, row-major.
pub fn seed_points(mask: &Grid<bool>, step: usize) -> Vec<Pixel> {
    let step = step.max(1);
    let mut seeds = Vec::new();
    for y in (0..mask.height()).step_by(step) {
        for x in (0..mask.width()).step_by(step) {
            if mask[(x, y)] {
                seeds.push((x, y));
            }
        }
    }
    seeds
}

/// Sums path counts over every ordered seed pair.
///
/// Each seed's search is independent and runs in parallel.
pub fn accumulate_path_counts(
    mask: &Grid<bool>,
    distance_to_boundary: &Grid<f32>,
    seeds: &[Pixel],
    deadline: &Deadline,
) -> Result<Grid<f32>> {
    let (width, height) = (mask.width(), mask.height());
    let total = seeds
        .par_iter()
        .map(|&seed| {
            deadline.check()?;
            find_shortest_paths(mask, distance_to_boundary, seed, seeds)
        })
        .try_reduce(
            || Grid::new(width, height, 0.0f32),
            |mut acc, counts| {
                for (a, c) in acc.as_mut_slice().iter_mut().zip(counts.iter()) {
                    *a += c;
                }
                Ok(acc)
            },
        )?;

    tracing::info!(seeds = seeds.len(), "Accumulated shortest-path counts");
    Ok(total)
}

/// Gaussian blur restricted to free cells.
///
/// Each output value is renormalized by the kernel weight that fell on
/// free cells, so obstacles do not pull the field toward zero. Blocked
/// cells are left untouched.
pub fn blur_field(mask: &Grid<bool>, sigma: f64, field: &mut Grid<f32>) -> Result<()> {
    if !mask.same_shape(field) {
        return Err(Error::SizeMismatch {
            expected: mask.len(),
            actual: field.len(),
        });
    }
    if !(sigma > 0.0 && sigma.is_finite()) {
        return Err(Error::InvalidParameter {
            name: "blur sigma",
            value: sigma,
        });
    }

    let sigma2 = 2.0 * sigma * sigma;
    let half = (2.0 * sigma).ceil() as i64;
    let size = (2 * half + 1) as usize;
    let kernel = Grid::from_fn(size, size, |i, j| {
        let dx = i as i64 - half;
        let dy = j as i64 - half;
        (-((dx * dx + dy * dy) as f64) / sigma2).exp() as f32
    });

    let source = field.clone();
    for (x, y, &free) in mask.enumerate() {
        if !free {
            continue;
        }

        let mut numer = 0.0f32;
        let mut denom = 0.0f32;
        for j in -half..=half {
            for i in -half..=half {
                let (xt, yt) = (x as i64 + i, y as i64 + j);
                if mask.get_signed(xt, yt) != Some(&true) {
                    continue;
                }
                let w = kernel[((i + half) as usize, (j + half) as usize)];
                numer += source[(xt as usize, yt as usize)] * w;
                denom += w;
            }
        }

        if denom == 0.0 {
            tracing::warn!(x, y, "blur kernel has no weight on free space");
            continue;
        }
        field[(x, y)] = numer / denom;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::distance_to_boundary;
    use crate::mask::clear_border;
    use approx::assert_relative_eq;

    /// Two 9x9 rooms joined by a one-cell door at (10, 5).
    fn two_rooms() -> Grid<bool> {
        Grid::from_fn(21, 11, |x, y| {
            let left = (1..10).contains(&x) && (1..10).contains(&y);
            let right = (11..20).contains(&x) && (1..10).contains(&y);
            left || right || (x, y) == (10, 5)
        })
    }

    #[test]
    fn test_seed_outside_mask() {
        let mask = two_rooms();
        let distance = distance_to_boundary(&mask);
        assert!(matches!(
            foreground_path(&mask, &distance, (0, 0)),
            Err(Error::SeedOutsideMask { x: 0, y: 0 })
        ));
    }

    #[test]
    fn test_unit_cost_matches_octile_distance() {
        let mut mask = Grid::new(12, 12, true);
        clear_border(&mut mask);
        let ones = Grid::new(12, 12, 1.0f32);
        let tree = foreground_path(&mask, &ones, (2, 2)).unwrap();

        assert_eq!(tree.score((2, 2)), 0.0);
        assert_relative_eq!(tree.score((6, 2)), 4.0);
        assert_relative_eq!(tree.score((5, 5)), 3.0 * std::f32::consts::SQRT_2, epsilon = 1e-5);
        assert!(tree.score((0, 0)).is_infinite());
    }

    #[test]
    fn test_trace_back() {
        let mut mask = Grid::new(12, 12, true);
        clear_border(&mut mask);
        let ones = Grid::new(12, 12, 1.0f32);
        let tree = foreground_path(&mask, &ones, (2, 2)).unwrap();

        let path = tree.trace_back((6, 2));
        assert_eq!(path.len(), 4);
        assert_eq!(path[0], (6, 2));
        assert!(!path.contains(&(2, 2)));
        assert!(tree.trace_back((2, 2)).is_empty());
        assert!(tree.trace_back((0, 0)).is_empty());
    }

    #[test]
    fn test_paths_between_rooms_cross_the_door() {
        let mask = two_rooms();
        let distance = distance_to_boundary(&mask);
        let counts = find_shortest_paths(&mask, &distance, (4, 4), &[(15, 4), (16, 7), (3, 3)]).unwrap();

        assert_eq!(counts[(10, 5)], 2.0);
        assert_eq!(counts[(4, 4)], 0.0);
        assert!(counts[(15, 4)] >= 1.0);
    }

    #[test]
    fn test_unreachable_targets_add_nothing() {
        let mut mask = two_rooms();
        mask[(10, 5)] = false;
        let distance = distance_to_boundary(&mask);
        let counts = find_shortest_paths(&mask, &distance, (4, 4), &[(15, 4)]).unwrap();
        assert!(counts.iter().all(|&c| c == 0.0));
    }

    #[test]
    fn test_seed_points_lattice() {
        let mask = two_rooms();
        let seeds = seed_points(&mask, 5);
        assert_eq!(seeds, vec![(5, 5), (10, 5), (15, 5)]);
    }

    #[test]
    fn test_accumulated_counts_at_door() {
        let mask = two_rooms();
        let distance = distance_to_boundary(&mask);
        let seeds = vec![(3, 3), (6, 7), (14, 3), (17, 6)];
        let counts = accumulate_path_counts(&mask, &distance, &seeds, &Deadline::unbounded("paths")).unwrap();

        // Every cross-room ordered pair crosses the door: 2 * 2 * 2.
        assert_eq!(counts[(10, 5)], 8.0);
        assert!(counts[(3, 3)] < counts[(10, 5)]);
    }

    #[test]
    fn test_blur_preserves_constant_field() {
        let mask = two_rooms();
        let mut field = Grid::new(21, 11, 3.0f32);
        blur_field(&mask, 2.0, &mut field).unwrap();
        for (x, y, &free) in mask.enumerate() {
            if free {
                assert_relative_eq!(field[(x, y)], 3.0, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn test_blur_ignores_blocked_cells() {
        let mask = two_rooms();
        let mut field = Grid::new(21, 11, 0.0f32);
        // Large values on obstacles must not leak into free space.
        for (x, y, &free) in mask.enumerate() {
            if !free {
                field[(x, y)] = 1000.0;
            }
        }
        blur_field(&mask, 1.5, &mut field).unwrap();
        assert_eq!(field[(0, 0)], 1000.0);
        assert_eq!(field[(5, 5)], 0.0);
        assert_eq!(field[(1, 1)], 0.0);
    }

    #[test]
    fn test_blur_rejects_degenerate_sigma() {
        let mask = two_rooms();
        let mut field = Grid::new(21, 11, 2.0f32);
        for sigma in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                blur_field(&mask, sigma, &mut field),
                Err(Error::InvalidParameter { .. })
            ));
        }
        // Rejected calls leave the field alone.
        assert!(field.iter().all(|&v| v == 2.0));

        let mut wrong = Grid::new(5, 5, 0.0f32);
        assert!(matches!(
            blur_field(&mask, 1.0, &mut wrong),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_blur_spreads_a_spike() {
        let mask = two_rooms();
        let mut field = Grid::new(21, 11, 0.0f32);
        field[(5, 5)] = 10.0;
        blur_field(&mask, 1.0, &mut field).unwrap();
        assert!(field[(5, 5)] < 10.0);
        assert!(field[(6, 5)] > 0.0);
        assert!(field[(5, 5)] > field[(6, 5)]);
        assert_eq!(field[(15, 5)], 0.0);
    }
}
