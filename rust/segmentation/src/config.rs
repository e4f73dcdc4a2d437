// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunable parameters for frame construction and segmentation.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parameters of the segmentation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Free-space evidence a cell must strictly exceed to enter the mask
    pub good_free_space_evidence: f32,
    /// Side of the square structuring element used by the opening (pixels)
    pub open_kernel_width: u32,
    /// Number of successive openings
    pub open_iterations: usize,
    /// Fraction of boundary pixels kept for visibility tests
    pub boundary_subsample_ratio: f32,
    /// Candidate pixels are taken every `clustering_subsample` pixels
    pub clustering_subsample: usize,
    /// Candidates closer than this to the boundary get no signature (pixels)
    pub margin_from_boundary_for_visibility: f32,
    /// Line-of-sight steps skipped next to the source
    pub visibility_margin: usize,
    /// Number of k-means centers drawn for each restart
    pub initial_cluster_num: usize,
    /// Centers closer than this visibility distance are merged
    pub merge_threshold: f32,
    /// Assignment/medoid iterations per clustering pass
    pub cluster_iterations: usize,
    /// Maximum cluster-then-merge rounds
    pub cluster_merge_rounds: usize,
    /// Independent clusterings, each from a fresh random set of centers
    pub clustering_restarts: usize,
    /// Spacing of shortest-path seeds (pixels)
    pub seed_step: usize,
    /// Sigma of the masked Gaussian applied to path counts (pixels)
    pub door_blur_sigma: f64,
    /// Scale applied to door evidence when rendering it
    pub door_detection_scale: f32,
    /// Also accumulate door evidence from all-pairs shortest paths
    pub compute_path_evidence: bool,
    /// Wall-clock budget for the visibility sweep
    pub visibility_timeout_secs: Option<u64>,
    /// Wall-clock budget for the shortest-path evidence
    pub path_timeout_secs: Option<u64>,
    /// Seed for boundary subsampling and center selection
    pub rng_seed: Option<u64>,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            good_free_space_evidence: 100.0,
            open_kernel_width: 9,
            open_iterations: 20,
            boundary_subsample_ratio: 0.2,
            clustering_subsample: 4,
            margin_from_boundary_for_visibility: 5.0,
            visibility_margin: 10,
            initial_cluster_num: 20,
            merge_threshold: 0.5,
            cluster_iterations: 10,
            cluster_merge_rounds: 5,
            clustering_restarts: 5,
            seed_step: 10,
            door_blur_sigma: 5.0,
            door_detection_scale: 0.01,
            compute_path_evidence: false,
            visibility_timeout_secs: None,
            path_timeout_secs: None,
            rng_seed: None,
        }
    }
}

impl SegmentationConfig {
    /// Loads a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn visibility_timeout(&self) -> Option<Duration> {
        self.visibility_timeout_secs.map(Duration::from_secs)
    }

    pub fn path_timeout(&self) -> Option<Duration> {
        self.path_timeout_secs.map(Duration::from_secs)
    }

    pub fn cluster_params(&self) -> ClusterParams {
        ClusterParams {
            iterations: self.cluster_iterations,
            rounds: self.cluster_merge_rounds,
            merge_threshold: self.merge_threshold,
        }
    }
}

/// Parameters of one cluster-and-merge run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    pub iterations: usize,
    pub rounds: usize,
    pub merge_threshold: f32,
}

impl Default for ClusterParams {
    fn default() -> Self {
        SegmentationConfig::default().cluster_params()
    }
}

/// Parameters of the percentile-based frame fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Lower percentile of projected sample coordinates (0..1)
    pub percentile_low: f64,
    /// Upper percentile of projected sample coordinates (0..1)
    pub percentile_high: f64,
    /// Margin added on both sides, as a fraction of the percentile span
    pub margin_ratio: f64,
    /// Initial unit is `average_distance / unit_divisor`
    pub unit_divisor: f64,
    /// Largest allowed planar raster dimension (pixels)
    pub max_resolution: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            percentile_low: 0.05,
            percentile_high: 0.95,
            margin_ratio: 0.05,
            unit_divisor: 50.0,
            max_resolution: 600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "merge_threshold": 0.3, "rng_seed": 7 }}"#).unwrap();

        let config = SegmentationConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.merge_threshold, 0.3);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.open_kernel_width, 9);
        assert_eq!(config.initial_cluster_num, 20);
    }

    #[test]
    fn test_bad_json_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            SegmentationConfig::from_json_file(file.path()),
            Err(Error::Json { .. })
        ));
    }

    #[test]
    fn test_timeouts() {
        let config = SegmentationConfig {
            visibility_timeout_secs: Some(30),
            ..Default::default()
        };
        assert_eq!(config.visibility_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.path_timeout(), None);
    }
}
