// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boundary pixel extraction and subsampling.

use indoor_recon_core::{Grid, Pixel};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::distance::touches_obstacle;

/// Free pixels with at least one blocked 4-neighbor, in row-major order.
///
/// The outer ring of the raster is never scanned.
pub fn find_boundary(mask: &Grid<bool>) -> Vec<Pixel> {
    let (width, height) = (mask.width(), mask.height());
    let mut boundary = Vec::new();
    for y in 1..height.saturating_sub(1) {
        for x in 1..width.saturating_sub(1) {
            if mask[(x, y)] && touches_obstacle(mask, x, y) {
                boundary.push((x, y));
            }
        }
    }
    boundary
}

/// Keeps a random `ratio` of the boundary, then sorts it by `(x, y)`.
///
/// The sort makes boundary indices independent of the shuffle order, so
/// signatures built on the result can be compared index by index.
pub fn subsample_boundary<R: Rng + ?Sized>(mut boundary: Vec<Pixel>, ratio: f32, rng: &mut R) -> Vec<Pixel> {
    boundary.shuffle(rng);
    let keep = (boundary.len() as f32 * ratio) as usize;
    boundary.truncate(keep);
    boundary.sort_unstable();
    boundary
}
