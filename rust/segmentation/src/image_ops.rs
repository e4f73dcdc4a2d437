// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raster conversions and morphology for free-space masks

use image::{GrayImage, Luma};
use imageproc::distance_transform::Norm;
use indoor_recon_core::Grid;

const FOREGROUND: u8 = 255;

/// Render a mask as a binary image (free space is white)
pub fn mask_to_image(mask: &Grid<bool>) -> GrayImage {
    GrayImage::from_fn(mask.width() as u32, mask.height() as u32, |x, y| {
        if mask[(x as usize, y as usize)] {
            Luma([FOREGROUND])
        } else {
            Luma([0])
        }
    })
}

/// Read a binary image back into a mask (any non-zero pixel is free)
pub fn image_to_mask(image: &GrayImage) -> Grid<bool> {
    Grid::from_fn(image.width() as usize, image.height() as usize, |x, y| {
        image.get_pixel(x as u32, y as u32).0[0] > 0
    })
}

/// Use a grayscale image's intensities as per-cell evidence
pub fn image_to_evidence(image: &GrayImage) -> Grid<f32> {
    Grid::from_fn(image.width() as usize, image.height() as usize, |x, y| {
        image.get_pixel(x as u32, y as u32).0[0] as f32
    })
}

/// Morphological erosion with a square structuring element
pub fn erode(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::erode(image, Norm::LInf, radius)
}

/// Morphological dilation with a square structuring element
pub fn dilate(image: &GrayImage, radius: u8) -> GrayImage {
    imageproc::morphology::dilate(image, Norm::LInf, radius)
}

/// Morphological opening (erode then dilate) - removes thin noise
pub fn morphological_open(image: &GrayImage, radius: u8) -> GrayImage {
    let eroded = erode(image, radius);
    dilate(&eroded, radius)
}

/// Half-width of a square kernel of the given (odd) side length
pub fn kernel_radius(kernel_width: u32) -> u8 {
    (kernel_width / 2).min(u8::MAX as u32) as u8
}
