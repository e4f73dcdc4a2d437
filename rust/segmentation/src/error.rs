// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the segmentation pipeline.

use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for segmentation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during segmentation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A line-of-sight sample left the raster. Both endpoints of a
    /// visibility test must lie inside the grid, so this is a caller bug.
    #[error("visibility sample ({x}, {y}) outside the {width}x{height} raster")]
    OutsideRaster {
        x: i64,
        y: i64,
        width: usize,
        height: usize,
    },

    /// An input raster does not match the frame it is paired with.
    #[error("raster holds {actual} cells, frame expects {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A sweep or frame was requested from zero points.
    #[error("no points to build {0} from")]
    EmptyPointSet(&'static str),

    /// Members need assigning but there are no cluster centers.
    #[error("cannot assign {0} signatures to zero cluster centers")]
    NoClusterCenters(usize),

    /// A shortest-path seed is outside the free-space mask.
    #[error("seed ({x}, {y}) is not inside the free-space mask")]
    SeedOutsideMask { x: usize, y: usize },

    /// A stage exceeded its configured wall-clock budget.
    #[error("{stage} timed out after {elapsed:?}")]
    Timeout {
        stage: &'static str,
        elapsed: Duration,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration file could not be parsed.
    #[error("invalid configuration {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A numeric parameter is outside its valid range.
    #[error("{name} must be positive and finite, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}
