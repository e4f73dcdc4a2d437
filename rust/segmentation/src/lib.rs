// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Room segmentation and door detection over rasterized floor plans
//!
//! This crate provides the pipeline that turns a free-space evidence raster
//! into a room-level decomposition:
//! 1. Thresholding the evidence into a free-space mask and opening it
//! 2. Extracting boundary pixels and a geodesic distance-to-boundary field
//! 3. Line-of-sight visibility signatures for a lattice of candidate pixels
//! 4. Visibility-distance k-medoids clustering with center merging
//! 5. Door evidence from shortest paths between seed pixels
//!
//! # Usage
//!
//! ```rust,ignore
//! use indoor_recon_segmentation::{detect_doors, rng_from_seed, Frame, SegmentationConfig};
//!
//! let frame = Frame::compute(&sweeps, average_distance, &FrameConfig::default())?;
//! let config = SegmentationConfig::default();
//! let mut rng = rng_from_seed(config.rng_seed);
//!
//! let detection = detect_doors(&frame, &free_space_evidence, &config, &mut rng, None)?;
//! for clustering in &detection.clusterings {
//!     println!("{} rooms", clustering.len());
//! }
//! ```

pub mod boundary;
pub mod clustering;
pub mod config;
pub mod deadline;
pub mod diagnostics;
pub mod distance;
pub mod door_paths;
pub mod error;
pub mod frame;
pub mod image_ops;
pub mod mask;
pub mod pipeline;
pub mod visibility;

// Re-export commonly used types and functions
pub use boundary::{find_boundary, subsample_boundary};
pub use clustering::{cluster_merge, initial_centers, visibility_distance, Clustering};
pub use config::{ClusterParams, FrameConfig, SegmentationConfig};
pub use deadline::Deadline;
pub use distance::distance_to_boundary;
pub use door_paths::{
    accumulate_path_counts, blur_field, find_shortest_paths, foreground_path, seed_points, PathNode,
    ShortestPathTree,
};
pub use error::{Error, Result};
pub use frame::{compute_average_distance, Frame, OrientedPoint, Sweep, SweepPoint};
pub use mask::{build_mask, count_mask, open_mask};
pub use pipeline::{detect_doors, rng_from_seed, DoorDetection};
pub use visibility::{
    associate_weights, compute_visibility, is_visible, CandidateLayout, Signature, VisibilityParams,
};
