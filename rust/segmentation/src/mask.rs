// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Free-space mask construction and cleanup.
//!
//! A mask cell is `true` when the cell is traversable. The outermost ring
//! of cells is always `false`, so every 4- or 8-neighbor lookup made from a
//! `true` cell stays inside the raster.

use indoor_recon_core::Grid;

use crate::image_ops::{image_to_mask, kernel_radius, mask_to_image, morphological_open};

/// Thresholds free-space evidence into a mask.
///
/// A cell is free iff its evidence is strictly greater than `threshold` and
/// it is not on the outer border.
pub fn build_mask(evidence: &Grid<f32>, threshold: f32) -> Grid<bool> {
    Grid::from_fn(evidence.width(), evidence.height(), |x, y| {
        !evidence.on_border(x, y) && evidence[(x, y)] > threshold
    })
}

/// Applies `iterations` morphological openings with a square kernel.
pub fn open_mask(mask: &Grid<bool>, kernel_width: u32, iterations: usize) -> Grid<bool> {
    let radius = kernel_radius(kernel_width);
    let mut image = mask_to_image(mask);
    for _ in 0..iterations {
        image = morphological_open(&image, radius);
    }

    let mut opened = image_to_mask(&image);
    clear_border(&mut opened);
    opened
}

/// Forces the outer ring of cells to `false`.
pub fn clear_border(mask: &mut Grid<bool>) {
    let (width, height) = (mask.width(), mask.height());
    for y in 0..height {
        for x in 0..width {
            if mask.on_border(x, y) {
                mask[(x, y)] = false;
            }
        }
    }
}

/// Number of free cells.
pub fn count_mask(mask: &Grid<bool>) -> usize {
    mask.iter().filter(|&&free| free).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mask_threshold_is_strict() {
        let evidence = Grid::from_fn(5, 5, |x, _| x as f32 * 50.0);
        let mask = build_mask(&evidence, 100.0);
        // x = 2 has evidence exactly 100.
        assert!(!mask[(2, 2)]);
        assert!(mask[(3, 2)]);
    }

    #[test]
    fn test_build_mask_excludes_border() {
        let evidence = Grid::new(6, 4, 1000.0f32);
        let mask = build_mask(&evidence, 100.0);
        assert_eq!(count_mask(&mask), 4 * 2);
        assert!(!mask[(0, 1)]);
        assert!(!mask[(5, 1)]);
        assert!(!mask[(2, 0)]);
        assert!(!mask[(2, 3)]);
    }

    #[test]
    fn test_open_mask_removes_thin_corridor() {
        // Two blocks joined by a one-pixel corridor.
        let mask = Grid::from_fn(40, 20, |x, y| {
            let left = (2..15).contains(&x) && (2..18).contains(&y);
            let right = (25..38).contains(&x) && (2..18).contains(&y);
            let corridor = (15..25).contains(&x) && y == 10;
            left || right || corridor
        });

        let opened = open_mask(&mask, 3, 2);
        assert!(opened[(8, 10)]);
        assert!(opened[(30, 10)]);
        assert!(!opened[(20, 10)]);
    }

    #[test]
    fn test_open_mask_keeps_border_clear() {
        let mut mask = Grid::new(12, 12, true);
        clear_border(&mut mask);
        let opened = open_mask(&mask, 3, 1);
        for (x, y, &free) in opened.enumerate() {
            if opened.on_border(x, y) {
                assert!(!free);
            }
        }
        assert!(opened[(5, 5)]);
    }
}
