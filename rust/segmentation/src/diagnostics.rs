// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ASCII PGM/PPM dumps of intermediate rasters.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use indoor_recon_core::Grid;
use rand::Rng;

use crate::clustering::Clustering;
use crate::error::{Error, Result};
use crate::visibility::CandidateLayout;

/// Half-size of the red square drawn on each cluster center.
const CENTER_HALF_SIZE: i64 = 2;

const BACKGROUND: [u8; 3] = [255, 255, 255];
const CENTER_COLOR: [u8; 3] = [255, 0, 0];

/// Writes `mask` as a P2 image: free cells black, blocked cells white.
pub fn write_mask_pgm<W: Write>(writer: &mut W, mask: &Grid<bool>) -> io::Result<()> {
    writeln!(writer, "P2")?;
    writeln!(writer, "{} {}", mask.width(), mask.height())?;
    writeln!(writer, "255")?;
    for &free in mask.iter() {
        write!(writer, "{} ", if free { 0 } else { 255 })?;
    }
    writeln!(writer)
}

/// Writes one clustering as a P3 image.
///
/// Every cluster gets a random color painted on a square around each
/// member; centers are drawn as red 5x5 squares on top.
pub fn write_cluster_ppm<W: Write, R: Rng + ?Sized>(
    writer: &mut W,
    width: usize,
    height: usize,
    layout: &CandidateLayout,
    clustering: &Clustering,
    rng: &mut R,
) -> io::Result<()> {
    let mut colors = Grid::new(width, height, BACKGROUND);
    let margin = (layout.subsample / 2) as i64;

    for (&center, members) in clustering.centers.iter().zip(&clustering.clusters) {
        let color = [
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
            rng.random_range(0..255u8),
        ];
        for &member in members {
            paint_square(&mut colors, layout.pixel(member), margin, color);
        }
        paint_square(&mut colors, layout.pixel(center), CENTER_HALF_SIZE, CENTER_COLOR);
    }

    write_rgb(writer, &colors)
}

/// Writes a scalar field as a grayscale P3 image.
///
/// Intensity is `min(255, value * scale * 255)`.
pub fn write_field_ppm<W: Write>(writer: &mut W, field: &Grid<f32>, scale: f32) -> io::Result<()> {
    let colors = field.map(|&value| {
        let intensity = (value * scale * 255.0).clamp(0.0, 255.0) as u8;
        [intensity; 3]
    });
    write_rgb(writer, &colors)
}

pub fn write_mask_pgm_file(path: &Path, mask: &Grid<bool>) -> Result<()> {
    write_file(path, |w| write_mask_pgm(w, mask))
}

pub fn write_cluster_ppm_file<R: Rng + ?Sized>(
    path: &Path,
    width: usize,
    height: usize,
    layout: &CandidateLayout,
    clustering: &Clustering,
    rng: &mut R,
) -> Result<()> {
    write_file(path, |w| write_cluster_ppm(w, width, height, layout, clustering, rng))
}

pub fn write_field_ppm_file(path: &Path, field: &Grid<f32>, scale: f32) -> Result<()> {
    write_file(path, |w| write_field_ppm(w, field, scale))
}

fn write_file(path: &Path, body: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>) -> Result<()> {
    let io_error = |source| Error::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(io_error)?);
    body(&mut writer).map_err(io_error)?;
    writer.flush().map_err(io_error)?;
    tracing::debug!(path = %path.display(), "Wrote diagnostic image");
    Ok(())
}

fn write_rgb<W: Write>(writer: &mut W, colors: &Grid<[u8; 3]>) -> io::Result<()> {
    writeln!(writer, "P3")?;
    writeln!(writer, "{} {}", colors.width(), colors.height())?;
    writeln!(writer, "255")?;
    for [r, g, b] in colors.iter() {
        write!(writer, "{} {} {} ", r, g, b)?;
    }
    writeln!(writer)
}

fn paint_square(colors: &mut Grid<[u8; 3]>, (x, y): (usize, usize), half: i64, color: [u8; 3]) {
    for j in -half..=half {
        for i in -half..=half {
            let (xt, yt) = (x as i64 + i, y as i64 + j);
            if colors.contains(xt, yt) {
                colors[(xt as usize, yt as usize)] = color;
            }
        }
    }
}
