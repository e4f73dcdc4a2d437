// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end door detection over a free-space evidence raster.

use std::path::Path;

use indoor_recon_core::{Grid, Pixel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::boundary::{find_boundary, subsample_boundary};
use crate::clustering::{cluster_merge, initial_centers, Clustering};
use crate::config::SegmentationConfig;
use crate::deadline::Deadline;
use crate::diagnostics;
use crate::distance::distance_to_boundary;
use crate::door_paths::{accumulate_path_counts, blur_field, seed_points};
use crate::error::{Error, Result};
use crate::frame::Frame;
use crate::mask::{build_mask, count_mask, open_mask};
use crate::visibility::{associate_weights, compute_visibility, CandidateLayout, Signature, VisibilityParams};

/// Everything the pipeline computed along the way.
#[derive(Debug, Clone)]
pub struct DoorDetection {
    /// Free-space mask after opening
    pub mask: Grid<bool>,
    /// Subsampled boundary points, sorted
    pub boundary: Vec<Pixel>,
    pub distance_to_boundary: Grid<f32>,
    pub layout: CandidateLayout,
    /// One signature per candidate of `layout`
    pub signatures: Vec<Signature>,
    /// One clustering per restart
    pub clusterings: Vec<Clustering>,
    /// Blurred path counts, when path evidence was requested
    pub door_evidence: Option<Grid<f32>>,
}

/// Random source for a run: seeded if `seed` is given, from the OS otherwise.
pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Runs mask construction, visibility clustering and (optionally) the
/// shortest-path door evidence.
///
/// When `diagnostics_dir` is given, intermediate rasters are written there
/// as PGM/PPM files.
pub fn detect_doors<R: Rng + ?Sized>(
    frame: &Frame,
    free_space_evidence: &Grid<f32>,
    config: &SegmentationConfig,
    rng: &mut R,
    diagnostics_dir: Option<&Path>,
) -> Result<DoorDetection> {
    if free_space_evidence.width() != frame.width() || free_space_evidence.height() != frame.height() {
        return Err(Error::SizeMismatch {
            expected: frame.cell_count(),
            actual: free_space_evidence.len(),
        });
    }
    let (width, height) = (frame.width(), frame.height());

    let mask = build_mask(free_space_evidence, config.good_free_space_evidence);
    tracing::info!(free = count_mask(&mask), width, height, "Built free-space mask");
    if let Some(dir) = diagnostics_dir {
        diagnostics::write_mask_pgm_file(&dir.join("mask_before_open.pgm"), &mask)?;
    }

    let mask = open_mask(&mask, config.open_kernel_width, config.open_iterations);
    tracing::info!(free = count_mask(&mask), "Opened free-space mask");
    if let Some(dir) = diagnostics_dir {
        diagnostics::write_mask_pgm_file(&dir.join("mask_after_open.pgm"), &mask)?;
    }

    let boundary = find_boundary(&mask);
    let found = boundary.len();
    let boundary = subsample_boundary(boundary, config.boundary_subsample_ratio, rng);
    tracing::info!(found, kept = boundary.len(), "Extracted boundary");

    let distance = distance_to_boundary(&mask);

    let layout = CandidateLayout::new(width, height, config.clustering_subsample);
    let params = VisibilityParams {
        margin_from_boundary: config.margin_from_boundary_for_visibility,
        visibility_margin: config.visibility_margin,
    };
    let deadline = Deadline::new("visibility", config.visibility_timeout());
    let visibility = compute_visibility(&mask, &distance, &boundary, &layout, &params, &deadline)?;
    let signatures = associate_weights(&layout, &boundary, &visibility);

    let cluster_params = config.cluster_params();
    let mut clusterings = Vec::with_capacity(config.clustering_restarts);
    for restart in 0..config.clustering_restarts {
        let centers = initial_centers(&signatures, config.initial_cluster_num, rng);
        // Drawn on every restart, with or without diagnostics.
        let color_seed: u64 = rng.random();
        let clustering = cluster_merge(&signatures, centers, &cluster_params)?;
        tracing::info!(restart, clusters = clustering.len(), "Clustered candidates");

        if let Some(dir) = diagnostics_dir {
            let path = dir.join(format!("cluster-{:02}.ppm", restart));
            let mut colors = StdRng::seed_from_u64(color_seed);
            diagnostics::write_cluster_ppm_file(&path, width, height, &layout, &clustering, &mut colors)?;
        }
        clusterings.push(clustering);
    }

    let door_evidence = if config.compute_path_evidence {
        let seeds = seed_points(&mask, config.seed_step);
        let deadline = Deadline::new("path evidence", config.path_timeout());
        let mut evidence = accumulate_path_counts(&mask, &distance, &seeds, &deadline)?;
        blur_field(&mask, config.door_blur_sigma, &mut evidence)?;
        if let Some(dir) = diagnostics_dir {
            diagnostics::write_field_ppm_file(&dir.join("door_detection.ppm"), &evidence, config.door_detection_scale)?;
        }
        Some(evidence)
    } else {
        None
    };

    Ok(DoorDetection {
        mask,
        boundary,
        distance_to_boundary: distance,
        layout,
        signatures,
        clusterings,
        door_evidence,
    })
}
