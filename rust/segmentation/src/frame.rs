// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scan sweeps and the metric-to-pixel frame fitted around them.

use indoor_recon_core::Pixel;
use nalgebra::Vector3;

use crate::config::FrameConfig;
use crate::error::{Error, Result};

/// A point with its surface normal, as read from a scan file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedPoint {
    pub position: Vector3<f64>,
    pub normal: Vector3<f64>,
}

/// One sample of a sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub position: Vector3<f64>,
    pub normal: Vector3<f64>,
    /// Starts at 1.0; evidence accumulation adjusts it later.
    pub weight: f64,
}

/// A single scan session: origin plus ordered samples.
#[derive(Debug, Clone, PartialEq)]
pub struct Sweep {
    pub center: Vector3<f64>,
    pub points: Vec<SweepPoint>,
}

impl Sweep {
    /// Builds a sweep whose first point is the scan origin.
    pub fn from_points(points: &[OrientedPoint]) -> Result<Self> {
        let (origin, samples) = points.split_first().ok_or(Error::EmptyPointSet("a sweep"))?;
        Ok(Self {
            center: origin.position,
            points: samples
                .iter()
                .map(|p| SweepPoint {
                    position: p.position,
                    normal: p.normal,
                    weight: 1.0,
                })
                .collect(),
        })
    }
}

/// Mean distance from each sample to its sweep center.
///
/// Falls back to 1.0 when there are no samples.
pub fn compute_average_distance(sweeps: &[Sweep]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for sweep in sweeps {
        for point in &sweep.points {
            total += (point.position - sweep.center).norm();
            count += 1;
        }
    }

    if count == 0 {
        tracing::warn!("no sweep points, using unit average distance");
        return 1.0;
    }
    total / count as f64
}

/// Rasterization context: bounding box, scale and resolution.
///
/// `size[a] == round((ranges[a][1] - ranges[a][0]) / unit)` for every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub axes: [Vector3<f64>; 3],
    pub ranges: [[f64; 2]; 3],
    pub unit: f64,
    pub size: [usize; 3],
}

impl Frame {
    /// Fits a frame around all sweep points using robust percentiles.
    pub fn compute(sweeps: &[Sweep], average_distance: f64, config: &FrameConfig) -> Result<Self> {
        let axes = [Vector3::x(), Vector3::y(), Vector3::z()];

        let mut ranges = [[0.0; 2]; 3];
        for (a, axis) in axes.iter().enumerate() {
            let mut projections: Vec<f64> = sweeps
                .iter()
                .flat_map(|s| s.points.iter().map(|p| p.position.dot(axis)))
                .collect();
            if projections.is_empty() {
                return Err(Error::EmptyPointSet("a frame"));
            }
            projections.sort_by(f64::total_cmp);

            let low = percentile(&projections, config.percentile_low);
            let high = percentile(&projections, config.percentile_high);
            let margin = (high - low) * config.margin_ratio;
            ranges[a] = [low - margin, high + margin];
        }

        let mut unit = average_distance / config.unit_divisor;
        let width = ((ranges[0][1] - ranges[0][0]) / unit).round() as usize;
        let height = ((ranges[1][1] - ranges[1][0]) / unit).round() as usize;
        let max_current = width.max(height);
        if config.max_resolution < max_current {
            unit *= max_current as f64 / config.max_resolution as f64;
        }

        let mut size = [0; 3];
        for a in 0..3 {
            size[a] = ((ranges[a][1] - ranges[a][0]) / unit).round() as usize;
        }

        tracing::info!(
            width = size[0],
            height = size[1],
            unit,
            "Computed segmentation frame"
        );

        Ok(Self {
            axes,
            ranges,
            unit,
            size,
        })
    }

    /// A frame covering `[0, width*unit] x [0, height*unit]` directly.
    pub fn from_dimensions(width: usize, height: usize, unit: f64) -> Self {
        Self {
            axes: [Vector3::x(), Vector3::y(), Vector3::z()],
            ranges: [
                [0.0, width as f64 * unit],
                [0.0, height as f64 * unit],
                [0.0, 0.0],
            ],
            unit,
            size: [width, height, 0],
        }
    }

    pub fn width(&self) -> usize {
        self.size[0]
    }

    pub fn height(&self) -> usize {
        self.size[1]
    }

    /// Number of cells in the planar raster.
    pub fn cell_count(&self) -> usize {
        self.size[0] * self.size[1]
    }

    /// Raster cell containing a world point, if any.
    pub fn to_pixel(&self, point: &Vector3<f64>) -> Option<Pixel> {
        let x = ((point.dot(&self.axes[0]) - self.ranges[0][0]) / self.unit).floor();
        let y = ((point.dot(&self.axes[1]) - self.ranges[1][0]) / self.unit).floor();
        if x < 0.0 || y < 0.0 || x >= self.size[0] as f64 || y >= self.size[1] as f64 {
            return None;
        }
        Some((x as usize, y as usize))
    }
}

fn percentile(sorted: &[f64], ratio: f64) -> f64 {
    let index = ((sorted.len() as f64 * ratio) as usize).min(sorted.len() - 1);
    sorted[index]
}
