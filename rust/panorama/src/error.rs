// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for panorama loading and sampling.

use std::path::PathBuf;

/// Result type alias for panorama operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or sampling a panorama.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The color image could not be opened or decoded.
    #[error("panorama image cannot be loaded: {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The color image decoded to zero pixels.
    #[error("panorama image is empty: {0}")]
    EmptyImage(PathBuf),

    /// A depth or transform file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The depth file header or samples are malformed.
    #[error("malformed depth file {path}: {reason}")]
    MalformedDepth { path: PathBuf, reason: String },

    /// The transform file is malformed.
    #[error("malformed transform file {path}: {reason}")]
    MalformedTransform { path: PathBuf, reason: String },

    /// A sample was requested outside the valid raster domain.
    #[error("pixel ({x}, {y}) outside the {width}x{height} sampling domain")]
    PixelOutside {
        x: f64,
        y: f64,
        width: usize,
        height: usize,
    },

    /// The rasters backing the panorama are inconsistent.
    #[error("invalid raster: {0}")]
    InvalidRaster(#[from] indoor_recon_core::Error),
}
