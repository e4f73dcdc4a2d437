// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loading a panorama from its image, depth and transform files.
//!
//! Depth file: `tag width height min_depth max_depth` followed by
//! `width * height` whitespace-separated samples in row-major order.
//!
//! Transform file: a tag, 16 numbers forming the row-major 4x4
//! local-to-global matrix, then the vertical field of view `phi_range`.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::SplitWhitespace;

use indoor_recon_core::Grid;
use nalgebra::Matrix4;

use crate::error::{Error, Result};
use crate::panorama::Panorama;

/// Locations of the three files that describe one panorama.
#[derive(Debug, Clone)]
pub struct PanoramaPaths {
    pub image: PathBuf,
    pub depth: PathBuf,
    pub transform: PathBuf,
}

impl PanoramaPaths {
    pub fn new(
        image: impl Into<PathBuf>,
        depth: impl Into<PathBuf>,
        transform: impl Into<PathBuf>,
    ) -> Self {
        Self {
            image: image.into(),
            depth: depth.into(),
            transform: transform.into(),
        }
    }
}

impl Panorama {
    /// Loads a panorama. Any missing or malformed file fails the whole load.
    pub fn load(paths: &PanoramaPaths) -> Result<Self> {
        let rgb = image::open(&paths.image)
            .map_err(|source| Error::Image {
                path: paths.image.clone(),
                source,
            })?
            .to_rgb8();
        if rgb.width() == 0 && rgb.height() == 0 {
            return Err(Error::EmptyImage(paths.image.clone()));
        }

        let depth = parse_depth(&read_text(&paths.depth)?, &paths.depth)?;
        let (local_to_global, phi_range) =
            parse_transform(&read_text(&paths.transform)?, &paths.transform)?;

        tracing::debug!(
            image = %paths.image.display(),
            width = rgb.width(),
            height = rgb.height(),
            depth_width = depth.width(),
            depth_height = depth.height(),
            phi_range,
            "Loaded panorama"
        );

        Ok(Panorama::new(rgb, depth, local_to_global, phi_range))
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn next_number<T: std::str::FromStr>(
    tokens: &mut SplitWhitespace<'_>,
    what: &str,
) -> std::result::Result<T, String> {
    let token = tokens.next().ok_or_else(|| format!("missing {what}"))?;
    token
        .parse()
        .map_err(|_| format!("invalid {what}: {token:?}"))
}

/// Parses the text of a depth file into a row-major grid.
pub fn parse_depth(text: &str, path: &Path) -> Result<Grid<f64>> {
    let malformed = |reason: String| Error::MalformedDepth {
        path: path.to_path_buf(),
        reason,
    };

    let mut tokens = text.split_whitespace();
    tokens.next().ok_or_else(|| malformed("missing header tag".into()))?;
    let width: usize = next_number(&mut tokens, "width").map_err(malformed)?;
    let height: usize = next_number(&mut tokens, "height").map_err(malformed)?;
    let _min_depth: f64 = next_number(&mut tokens, "min depth").map_err(malformed)?;
    let _max_depth: f64 = next_number(&mut tokens, "max depth").map_err(malformed)?;

    let count = width
        .checked_mul(height)
        .ok_or_else(|| malformed(format!("{width}x{height} samples overflow")))?;
    // Every sample takes at least two bytes of text.
    let mut samples = Vec::with_capacity(count.min(text.len() / 2));
    for i in 0..count {
        let sample: f64 = next_number(&mut tokens, &format!("sample {i}")).map_err(malformed)?;
        samples.push(sample);
    }

    Ok(Grid::from_vec(width, height, samples)?)
}

/// Parses a transform file into `(local_to_global, phi_range)`.
pub fn parse_transform(text: &str, path: &Path) -> Result<(Matrix4<f64>, f64)> {
    let malformed = |reason: String| Error::MalformedTransform {
        path: path.to_path_buf(),
        reason,
    };

    let mut tokens = text.split_whitespace();
    tokens.next().ok_or_else(|| malformed("missing tag".into()))?;

    let mut local_to_global = Matrix4::zeros();
    for row in 0..4 {
        for col in 0..4 {
            local_to_global[(row, col)] =
                next_number(&mut tokens, &format!("matrix entry ({row}, {col})")).map_err(malformed)?;
        }
    }
    let phi_range: f64 = next_number(&mut tokens, "phi_range").map_err(malformed)?;

    Ok((local_to_global, phi_range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use image::{Rgb, RgbImage};
    use nalgebra::Vector3;
    use std::io::Write;

    const TRANSFORM: &str = "transform\n\
        0 -1 0 2\n\
        1 0 0 3\n\
        0 0 1 1\n\
        0 0 0 1\n\
        2.5\n";

    #[test]
    fn test_parse_depth() {
        let grid = parse_depth("depth 3 2 0.5 4\n1 2 3\n4 5 6\n", Path::new("d")).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid[(2, 1)], 6.0);
    }

    #[test]
    fn test_parse_depth_oversized_header() {
        let err = parse_depth("depth 4294967296 4294967296 0 1 1 2", Path::new("d")).unwrap_err();
        assert!(matches!(err, Error::MalformedDepth { .. }));
        let err = parse_depth("depth 1000000 1000000 0 1\n1 2 3\n", Path::new("d")).unwrap_err();
        assert!(matches!(err, Error::MalformedDepth { .. }));
    }

    #[test]
    fn test_parse_depth_short_file() {
        let err = parse_depth("depth 3 2 0.5 4\n1 2 3\n4\n", Path::new("d")).unwrap_err();
        assert!(matches!(err, Error::MalformedDepth { .. }));
        let err = parse_depth("depth x 2 0 1", Path::new("d")).unwrap_err();
        assert!(matches!(err, Error::MalformedDepth { .. }));
    }

    #[test]
    fn test_parse_transform() {
        let (m, phi_range) = parse_transform(TRANSFORM, Path::new("t")).unwrap();
        assert_eq!(m[(0, 1)], -1.0);
        assert_eq!(m[(1, 3)], 3.0);
        assert_relative_eq!(phi_range, 2.5);

        let err = parse_transform("transform 1 0 0", Path::new("t")).unwrap_err();
        assert!(matches!(err, Error::MalformedTransform { .. }));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("pano.png");
        let depth_path = dir.path().join("pano.depth");
        let transform_path = dir.path().join("pano.txt");

        RgbImage::from_pixel(8, 4, Rgb([10, 20, 30]))
            .save(&image_path)
            .unwrap();
        let mut depth = fs::File::create(&depth_path).unwrap();
        writeln!(depth, "depth 4 2 1 3").unwrap();
        writeln!(depth, "1 1 1 1 3 3 3 3").unwrap();
        fs::write(&transform_path, TRANSFORM).unwrap();

        let panorama =
            Panorama::load(&PanoramaPaths::new(&image_path, &depth_path, &transform_path)).unwrap();
        assert_eq!(panorama.width(), 8);
        assert_eq!(panorama.depth_height(), 2);
        assert_relative_eq!(panorama.average_distance(), 2.0);
        assert_relative_eq!(panorama.center(), Vector3::new(2.0, 3.0, 1.0));
        assert_relative_eq!(panorama.phi_per_pixel(), 2.5 / 4.0);
    }

    #[test]
    fn test_load_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PanoramaPaths::new(
            dir.path().join("missing.png"),
            dir.path().join("missing.depth"),
            dir.path().join("missing.txt"),
        );
        assert!(matches!(Panorama::load(&paths), Err(Error::Image { .. })));
    }
}
