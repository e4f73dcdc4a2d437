// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for raster construction.

/// Result type alias for grid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a grid.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The supplied buffer does not hold exactly `width * height` cells.
    #[error("grid buffer holds {actual} cells, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}
