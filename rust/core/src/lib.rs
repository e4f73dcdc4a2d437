// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Indoor-Recon Core
//!
//! Raster storage shared by the panorama model and the room segmentation
//! pipeline. Every image, depth map, mask and scalar field in the workspace
//! is a [`Grid`]: a row-major buffer that owns its cells and knows its own
//! width and height, so no component ever indexes a raw buffer with a
//! hand-computed stride.

pub mod error;
pub mod grid;

pub use error::{Error, Result};
pub use grid::{Grid, Pixel};
