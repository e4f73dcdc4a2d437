// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Equirectangular image + depth container and its coordinate transforms.
//!
//! Conventions:
//! - The local frame has the panorama's vertical axis as +Z.
//! - Column `u` grows with `theta = -atan2(y, x)` over `[0, 2π)`.
//! - Row `v` is measured down from the top; the horizon sits at
//!   `height / 2` and each row covers `phi_range / height` radians.
//! - The raster is cyclic horizontally and clamped vertically.

use std::f64::consts::TAU;

use image::{imageops, RgbImage};
use indoor_recon_core::Grid;
use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

use crate::error::{Error, Result};

/// One panorama: color raster, depth raster and camera pose.
#[derive(Debug, Clone)]
pub struct Panorama {
    rgb: RgbImage,
    depth: Grid<f64>,
    local_to_global: Matrix4<f64>,
    global_to_local: Matrix4<f64>,
    phi_range: f64,
    phi_per_pixel: f64,
    phi_per_depth_pixel: f64,
    average_distance: f64,
}

impl Panorama {
    /// Builds a panorama from already decoded rasters.
    ///
    /// `local_to_global` must be a rigid transform (rotation + translation);
    /// its inverse is derived from the rotation transpose.
    pub fn new(rgb: RgbImage, depth: Grid<f64>, local_to_global: Matrix4<f64>, phi_range: f64) -> Self {
        let global_to_local = rigid_inverse(&local_to_global);
        let average_distance = average_depth(&depth);
        let phi_per_pixel = phi_range / rgb.height() as f64;
        let phi_per_depth_pixel = phi_range / depth.height() as f64;

        Self {
            rgb,
            depth,
            local_to_global,
            global_to_local,
            phi_range,
            phi_per_pixel,
            phi_per_depth_pixel,
            average_distance,
        }
    }

    pub fn width(&self) -> usize {
        self.rgb.width() as usize
    }

    pub fn height(&self) -> usize {
        self.rgb.height() as usize
    }

    pub fn depth_width(&self) -> usize {
        self.depth.width()
    }

    pub fn depth_height(&self) -> usize {
        self.depth.height()
    }

    /// Vertical field of view in radians.
    pub fn phi_range(&self) -> f64 {
        self.phi_range
    }

    pub fn phi_per_pixel(&self) -> f64 {
        self.phi_per_pixel
    }

    pub fn phi_per_depth_pixel(&self) -> f64 {
        self.phi_per_depth_pixel
    }

    /// Mean of all depth samples (1.0 when there are none).
    pub fn average_distance(&self) -> f64 {
        self.average_distance
    }

    pub fn local_to_global(&self) -> &Matrix4<f64> {
        &self.local_to_global
    }

    pub fn global_to_local(&self) -> &Matrix4<f64> {
        &self.global_to_local
    }

    /// Camera position in world coordinates.
    pub fn center(&self) -> Vector3<f64> {
        Vector3::new(
            self.local_to_global[(0, 3)],
            self.local_to_global[(1, 3)],
            self.local_to_global[(2, 3)],
        )
    }

    pub fn rgb_image(&self) -> &RgbImage {
        &self.rgb
    }

    pub fn depth_image(&self) -> &Grid<f64> {
        &self.depth
    }

    /// Projects a world point to RGB pixel coordinates.
    ///
    /// The result is not clamped; check [`Panorama::is_inside_rgb`] before
    /// sampling.
    pub fn project(&self, global: &Vector3<f64>) -> Vector2<f64> {
        let local = self.global_to_local_point(global);

        let mut theta = -local.y.atan2(local.x);
        if theta < 0.0 {
            theta += TAU;
        }
        let mut theta_ratio = (theta / TAU).clamp(0.0, 1.0);
        // 2π lands on the seam; fold it back onto column 0.
        if theta_ratio == 1.0 {
            theta_ratio = 0.0;
        }

        let planar = (local.x * local.x + local.y * local.y).sqrt();
        let phi = local.z.atan2(planar);

        Vector2::new(
            theta_ratio * self.width() as f64,
            self.height() as f64 / 2.0 - phi / self.phi_per_pixel,
        )
    }

    /// Inverse of [`Panorama::project`] for a ray of length `distance`.
    pub fn unproject(&self, pixel: &Vector2<f64>, distance: f64) -> Vector3<f64> {
        let theta = -TAU * pixel.x / self.width() as f64;
        let phi = (self.height() as f64 / 2.0 - pixel.y) * self.phi_per_pixel;

        let local = Vector3::new(
            distance * phi.cos() * theta.cos(),
            distance * phi.cos() * theta.sin(),
            distance * phi.sin(),
        );
        self.local_to_global_point(&local)
    }

    pub fn global_to_local_point(&self, global: &Vector3<f64>) -> Vector3<f64> {
        apply_affine(&self.global_to_local, global)
    }

    pub fn local_to_global_point(&self, local: &Vector3<f64>) -> Vector3<f64> {
        apply_affine(&self.local_to_global, local)
    }

    /// Maps an RGB pixel to the depth raster (independent per-axis scale).
    pub fn rgb_to_depth(&self, pixel: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            pixel.x * self.depth_width() as f64 / self.width() as f64,
            pixel.y * self.depth_height() as f64 / self.height() as f64,
        )
    }

    /// Maps a depth pixel to the RGB raster.
    pub fn depth_to_rgb(&self, depth_pixel: &Vector2<f64>) -> Vector2<f64> {
        Vector2::new(
            depth_pixel.x * self.width() as f64 / self.depth_width() as f64,
            depth_pixel.y * self.height() as f64 / self.depth_height() as f64,
        )
    }

    /// True if `pixel` can be bilinearly sampled from the RGB raster.
    pub fn is_inside_rgb(&self, pixel: &Vector2<f64>) -> bool {
        inside_domain(pixel, self.width(), self.height())
    }

    /// True if `depth_pixel` can be bilinearly sampled from the depth raster.
    pub fn is_inside_depth(&self, depth_pixel: &Vector2<f64>) -> bool {
        inside_domain(depth_pixel, self.depth_width(), self.depth_height())
    }

    /// Bilinearly interpolated color at `pixel`, channels in RGB order.
    pub fn rgb(&self, pixel: &Vector2<f64>) -> Result<Vector3<f32>> {
        let taps = bilinear_taps(pixel, self.width(), self.height())?;

        let mut color = Vector3::<f64>::zeros();
        for (x, y, weight) in taps {
            let texel = self.rgb.get_pixel(x as u32, y as u32);
            for c in 0..3 {
                color[c] += weight * texel[c] as f64;
            }
        }
        Ok(color.cast::<f32>())
    }

    /// Bilinearly interpolated depth at `depth_pixel`.
    pub fn depth(&self, depth_pixel: &Vector2<f64>) -> Result<f64> {
        let taps = bilinear_taps(depth_pixel, self.depth_width(), self.depth_height())?;

        Ok(taps
            .iter()
            .map(|&(x, y, weight)| weight * self.depth[(x, y)])
            .sum())
    }

    /// Rescales the color raster and recomputes the per-row angle.
    pub fn resize_rgb(&mut self, width: u32, height: u32) {
        self.rgb = imageops::resize(&self.rgb, width, height, imageops::FilterType::Triangle);
        self.phi_per_pixel = self.phi_range / height as f64;
    }
}

/// Inverse of a rotation + translation, with a canonical last row.
pub(crate) fn rigid_inverse(transform: &Matrix4<f64>) -> Matrix4<f64> {
    let rotation: Matrix3<f64> = transform.fixed_view::<3, 3>(0, 0).into_owned();
    let translation: Vector3<f64> = transform.fixed_view::<3, 1>(0, 3).into_owned();
    let rotation_t = rotation.transpose();

    let mut inverse = Matrix4::identity();
    inverse.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation_t);
    inverse
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&(-rotation_t * translation));
    inverse
}

fn apply_affine(transform: &Matrix4<f64>, point: &Vector3<f64>) -> Vector3<f64> {
    let p = transform * Vector4::new(point.x, point.y, point.z, 1.0);
    Vector3::new(p.x, p.y, p.z)
}

fn average_depth(depth: &Grid<f64>) -> f64 {
    if depth.is_empty() {
        tracing::warn!("depth raster has no samples, using unit average distance");
        return 1.0;
    }
    depth.iter().sum::<f64>() / depth.len() as f64
}

fn inside_domain(pixel: &Vector2<f64>, width: usize, height: usize) -> bool {
    !(pixel.x < 0.0
        || width as f64 <= pixel.x
        || pixel.y < 0.0
        || (height as f64 - 1.0) <= pixel.y)
}

/// The four `(x, y, weight)` taps around `pixel`; the right column wraps.
fn bilinear_taps(pixel: &Vector2<f64>, width: usize, height: usize) -> Result<[(usize, usize, f64); 4]> {
    if !inside_domain(pixel, width, height) {
        return Err(Error::PixelOutside {
            x: pixel.x,
            y: pixel.y,
            width,
            height,
        });
    }

    let u0 = pixel.x.floor() as usize;
    let v0 = pixel.y.floor() as usize;
    let u1 = u0 + 1;
    let v1 = v0 + 1;

    let du0 = u1 as f64 - pixel.x;
    let du1 = pixel.x - u0 as f64;
    let dv0 = v1 as f64 - pixel.y;
    let dv1 = pixel.y - v0 as f64;
    let u1_wrapped = u1 % width;

    Ok([
        (u0, v0, du0 * dv0),
        (u1_wrapped, v0, du1 * dv0),
        (u0, v1, du0 * dv1),
        (u1_wrapped, v1, du1 * dv1),
    ])
}
