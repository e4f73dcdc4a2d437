// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Line-of-sight visibility from interior pixels to boundary points.
//!
//! Visibility is evaluated on a regular candidate lattice (every
//! `subsample`-th pixel in both directions). Each candidate ends up with a
//! [`Signature`]: the boundary points it sees, weighted by inverse distance.

use indoor_recon_core::{Grid, Pixel};
use nalgebra::Vector2;
use rayon::prelude::*;

use crate::deadline::Deadline;
use crate::error::{Error, Result};

/// Sparse visibility feature: `(boundary_index, weight)` pairs in ascending
/// boundary index, with weights summing to 1 (or empty).
pub type Signature = Vec<(usize, f32)>;

/// Maps candidate indices to raster pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateLayout {
    pub subsample: usize,
    pub width: usize,
    pub height: usize,
}

impl CandidateLayout {
    /// Lattice over a `width x height` raster.
    pub fn new(width: usize, height: usize, subsample: usize) -> Self {
        let subsample = subsample.max(1);
        Self {
            subsample,
            width: width / subsample,
            height: height / subsample,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raster pixel of candidate `index`.
    pub fn pixel(&self, index: usize) -> Pixel {
        (
            (index % self.width) * self.subsample,
            (index / self.width) * self.subsample,
        )
    }

    /// Candidate index of a lattice pixel, if it is on the lattice.
    pub fn index_of(&self, (x, y): Pixel) -> Option<usize> {
        if x % self.subsample != 0 || y % self.subsample != 0 {
            return None;
        }
        let (cx, cy) = (x / self.subsample, y / self.subsample);
        (cx < self.width && cy < self.height).then_some(cy * self.width + cx)
    }
}

/// Thresholds that keep noisy near-wall pixels out of the visibility test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilityParams {
    /// Candidates closer than this to the boundary are skipped (pixels)
    pub margin_from_boundary: f32,
    /// Samples skipped next to the source
    pub visibility_margin: usize,
}

impl Default for VisibilityParams {
    fn default() -> Self {
        Self {
            margin_from_boundary: 5.0,
            visibility_margin: 10,
        }
    }
}

/// Tests whether the straight segment from `source` to `target` stays in
/// free space.
///
/// The segment is sampled `2 * ceil(length) + 1` times; the first
/// `margin` samples and the target itself are not tested. A sample outside
/// the raster is a precondition violation and is returned as
/// [`Error::OutsideRaster`].
pub fn is_visible(mask: &Grid<bool>, source: Pixel, target: Pixel, margin: usize) -> Result<bool> {
    let start = Vector2::new(source.0 as f32, source.1 as f32);
    let end = Vector2::new(target.0 as f32, target.1 as f32);
    let delta = end - start;
    let num_steps = 2 * delta.norm().ceil() as usize + 1;
    let step = delta / num_steps as f32;

    for i in margin..num_steps {
        let position = start + step * i as f32;
        let x = position.x.round() as i64;
        let y = position.y.round() as i64;
        match mask.get_signed(x, y) {
            Some(true) => {}
            Some(false) => return Ok(false),
            None => {
                return Err(Error::OutsideRaster {
                    x,
                    y,
                    width: mask.width(),
                    height: mask.height(),
                })
            }
        }
    }
    Ok(true)
}

/// For every candidate, the indices of the boundary points it can see.
///
/// Candidates outside the mask or within `margin_from_boundary` of it get
/// an empty list. Candidates are processed in parallel.
pub fn compute_visibility(
    mask: &Grid<bool>,
    distance_to_boundary: &Grid<f32>,
    boundary: &[Pixel],
    layout: &CandidateLayout,
    params: &VisibilityParams,
    deadline: &Deadline,
) -> Result<Vec<Vec<usize>>> {
    let visibility = (0..layout.len())
        .into_par_iter()
        .map(|index| {
            deadline.check()?;

            let pixel = layout.pixel(index);
            if !mask[pixel] || distance_to_boundary[pixel] < params.margin_from_boundary {
                return Ok(Vec::new());
            }

            let mut visible = Vec::new();
            for (b, &target) in boundary.iter().enumerate() {
                if is_visible(mask, pixel, target, params.visibility_margin)? {
                    visible.push(b);
                }
            }
            Ok(visible)
        })
        .collect::<Result<Vec<_>>>()?;

    let candidates = visibility.iter().filter(|v| !v.is_empty()).count();
    tracing::info!(
        candidates,
        lattice = layout.len(),
        boundary = boundary.len(),
        "Computed visibility"
    );
    Ok(visibility)
}

/// Turns visible-index lists into normalized inverse-distance signatures.
///
/// Weight of a boundary point is `1 / (distance + 1)` before normalization.
pub fn associate_weights(layout: &CandidateLayout, boundary: &[Pixel], visibility: &[Vec<usize>]) -> Vec<Signature> {
    visibility
        .iter()
        .enumerate()
        .map(|(index, visible)| {
            if visible.is_empty() {
                return Vec::new();
            }
            let (x, y) = layout.pixel(index);
            let source = Vector2::new(x as f32, y as f32);

            let mut signature: Signature = visible
                .iter()
                .map(|&b| {
                    let target = Vector2::new(boundary[b].0 as f32, boundary[b].1 as f32);
                    (b, 1.0 / ((source - target).norm() + 1.0))
                })
                .collect();
            let weight_sum: f32 = signature.iter().map(|&(_, w)| w).sum();
            for entry in &mut signature {
                entry.1 /= weight_sum;
            }
            signature
        })
        .collect()
}
