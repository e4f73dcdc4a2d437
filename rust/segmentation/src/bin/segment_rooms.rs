// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: Segment a free-space evidence raster into rooms and doors
//!
//! The input image is read as grayscale; each pixel value is used directly
//! as free-space evidence for the matching cell.
//!
//! Usage:
//!   segment-rooms <evidence-image> [options]

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use image::ImageReader;
use indoor_recon_segmentation::image_ops::image_to_evidence;
use indoor_recon_segmentation::{count_mask, detect_doors, rng_from_seed, Frame, SegmentationConfig};

struct Options {
    image_path: PathBuf,
    config_path: Option<PathBuf>,
    output_dir: PathBuf,
    threshold: Option<f32>,
    seed: Option<u64>,
    paths: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return Ok(());
    }
    let options = parse_args(&args)?;

    println!("=== Room Segmentation ===");
    println!();

    // Step 1: Load evidence
    println!("[1/3] Loading evidence: {}", options.image_path.display());
    let image = ImageReader::open(&options.image_path)
        .with_context(|| format!("cannot open image '{}'", options.image_path.display()))?
        .decode()
        .with_context(|| format!("cannot decode image '{}'", options.image_path.display()))?
        .to_luma8();
    let evidence = image_to_evidence(&image);
    println!("  Raster size: {}x{} cells", evidence.width(), evidence.height());

    // Step 2: Configure
    println!("[2/3] Configuring segmentation...");
    let mut config = match &options.config_path {
        Some(path) => SegmentationConfig::from_json_file(path)?,
        None => SegmentationConfig::default(),
    };
    if let Some(threshold) = options.threshold {
        config.good_free_space_evidence = threshold;
    }
    if options.seed.is_some() {
        config.rng_seed = options.seed;
    }
    if options.paths {
        config.compute_path_evidence = true;
    }
    println!(
        "  Threshold: {}, restarts: {}, path evidence: {}",
        config.good_free_space_evidence, config.clustering_restarts, config.compute_path_evidence
    );

    fs::create_dir_all(&options.output_dir)
        .with_context(|| format!("cannot create output directory '{}'", options.output_dir.display()))?;

    // Step 3: Detect
    println!("[3/3] Detecting rooms and doors...");
    let frame = Frame::from_dimensions(evidence.width(), evidence.height(), 1.0);
    let mut rng = rng_from_seed(config.rng_seed);
    let detection = detect_doors(&frame, &evidence, &config, &mut rng, Some(&options.output_dir))?;

    println!();
    println!("=== Summary ===");
    println!("  Free cells:      {}", count_mask(&detection.mask));
    println!("  Boundary points: {}", detection.boundary.len());
    println!(
        "  Candidates:      {} with visibility, {} total",
        detection.signatures.iter().filter(|s| !s.is_empty()).count(),
        detection.layout.len()
    );
    for (restart, clustering) in detection.clusterings.iter().enumerate() {
        println!("  Restart {:02}:      {} clusters", restart, clustering.len());
    }
    if let Some(door) = &detection.door_evidence {
        let peak = door.iter().cloned().fold(0.0f32, f32::max);
        println!("  Door evidence peak: {:.1}", peak);
    }
    println!("  Diagnostics written to {}", options.output_dir.display());

    Ok(())
}

fn parse_args(args: &[String]) -> Result<Options> {
    let mut options = Options {
        image_path: PathBuf::from(&args[1]),
        config_path: None,
        output_dir: PathBuf::from("."),
        threshold: None,
        seed: None,
        paths: false,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                options.config_path = Some(PathBuf::from(value(args, &mut i, "--config")?));
            }
            "--output" => {
                options.output_dir = PathBuf::from(value(args, &mut i, "--output")?);
            }
            "--threshold" => {
                let v = value(args, &mut i, "--threshold")?;
                options.threshold = Some(v.parse().with_context(|| format!("invalid threshold '{}'", v))?);
            }
            "--seed" => {
                let v = value(args, &mut i, "--seed")?;
                options.seed = Some(v.parse().with_context(|| format!("invalid seed '{}'", v))?);
            }
            "--paths" => {
                options.paths = true;
            }
            other => {
                print_usage();
                bail!("unknown option: {}", other);
            }
        }
        i += 1;
    }
    Ok(options)
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    match args.get(*i) {
        Some(v) => Ok(v.as_str()),
        None => bail!("{} needs a value", flag),
    }
}

fn print_usage() {
    println!("segment-rooms - Room segmentation and door detection");
    println!();
    println!("Usage: segment-rooms <evidence-image> [options]");
    println!();
    println!("Options:");
    println!("  --config <file>     JSON segmentation config (missing fields use defaults)");
    println!("  --output <dir>      Directory for diagnostic images (default: .)");
    println!("  --threshold <v>     Free-space evidence threshold (default: 100)");
    println!("  --seed <n>          Seed for reproducible subsampling and clustering");
    println!("  --paths             Also compute shortest-path door evidence");
}
