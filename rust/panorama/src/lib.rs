// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Panorama model for indoor reconstruction
//!
//! A panorama is one equirectangular photograph plus a separately sampled,
//! co-registered depth grid and the rigid transform that places the camera
//! in the scene. This crate provides:
//! 1. Loading the three files that describe a panorama
//! 2. Global/local coordinate transforms
//! 3. Pixel/ray projection and unprojection
//! 4. Bilinear sampling of color and depth with horizontal wraparound
//!
//! # Usage
//!
//! ```rust,ignore
//! use indoor_recon_panorama::{Panorama, PanoramaPaths};
//! use nalgebra::Vector3;
//!
//! let panorama = Panorama::load(&PanoramaPaths::new(
//!     "panorama/000.png",
//!     "depth/000.depth",
//!     "transformations/000.txt",
//! ))?;
//!
//! let uv = panorama.project(&Vector3::new(1.0, 2.0, 0.5));
//! if panorama.is_inside_rgb(&uv) {
//!     let color = panorama.rgb(&uv)?;
//! }
//! ```

pub mod error;
pub mod io;
pub mod panorama;

pub use error::{Error, Result};
pub use io::PanoramaPaths;
pub use panorama::Panorama;
