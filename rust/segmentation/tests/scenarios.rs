// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end checks on small synthetic floor plans.

use approx::assert_relative_eq;
use indoor_recon_core::Grid;
use indoor_recon_segmentation::mask::clear_border;
use indoor_recon_segmentation::{
    associate_weights, cluster_merge, compute_visibility, distance_to_boundary, find_boundary, foreground_path,
    is_visible, visibility_distance, CandidateLayout, ClusterParams, Deadline, Signature, VisibilityParams,
};

/// 20x20 free square with a 2x2 obstacle near the top-right corner.
fn square_with_obstacle() -> Grid<bool> {
    let mut mask = Grid::new(20, 20, true);
    clear_border(&mut mask);
    for x in 15..=16 {
        for y in 2..=3 {
            mask[(x, y)] = false;
        }
    }
    mask
}

/// Two 18x18 rooms separated by a solid two-cell wall.
fn separated_rooms() -> Grid<bool> {
    Grid::from_fn(40, 20, |x, y| {
        let left = (1..=18).contains(&x);
        let right = (21..=38).contains(&x);
        (left || right) && (1..=18).contains(&y)
    })
}

/// One 28x18 room whose two halves are split by a wall hanging from the
/// top, leaving a passage along the bottom.
fn room_with_partial_wall() -> Grid<bool> {
    let mut mask = Grid::new(30, 20, true);
    clear_border(&mut mask);
    for x in 14..=15 {
        for y in 1..=13 {
            mask[(x, y)] = false;
        }
    }
    mask
}

fn signatures_for(mask: &Grid<bool>, layout: &CandidateLayout) -> Vec<Signature> {
    let distance = distance_to_boundary(mask);
    let boundary = find_boundary(mask);
    let params = VisibilityParams {
        margin_from_boundary: 2.0,
        visibility_margin: 1,
    };
    let visibility =
        compute_visibility(mask, &distance, &boundary, layout, &params, &Deadline::unbounded("visibility")).unwrap();
    associate_weights(layout, &boundary, &visibility)
}

#[test]
fn boundary_is_outer_ring_plus_obstacle_outline() {
    let mask = square_with_obstacle();
    let boundary = find_boundary(&mask);

    let mut expected = Vec::new();
    for y in 1..=18usize {
        for x in 1..=18usize {
            let ring = x == 1 || x == 18 || y == 1 || y == 18;
            let around_obstacle = matches!((x, y), (14, 2) | (14, 3) | (17, 2) | (17, 3) | (15, 4) | (16, 4));
            if ring || around_obstacle {
                expected.push((x, y));
            }
        }
    }

    assert_eq!(expected.len(), 74);
    assert_eq!(boundary, expected);
}

#[test]
fn distance_peaks_at_the_center() {
    let mask = square_with_obstacle();
    let distance = distance_to_boundary(&mask);

    let peak = distance
        .iter()
        .cloned()
        .filter(|d| d.is_finite())
        .fold(0.0f32, f32::max);
    assert_relative_eq!(peak, 8.0, epsilon = 1e-5);

    for (x, y, &d) in distance.enumerate() {
        if d.is_finite() && d >= peak - 1e-5 {
            let dx = x as f32 - 9.5;
            let dy = y as f32 - 9.5;
            assert!((dx * dx + dy * dy).sqrt() <= 1.0, "peak at ({x}, {y})");
        }
    }

    // The obstacle pulls the nearby quadrant down.
    assert!(distance[(10, 9)] < peak);
}

#[test]
fn rooms_without_line_of_sight_cluster_apart() {
    let mask = separated_rooms();
    let layout = CandidateLayout::new(40, 20, 2);
    let signatures = signatures_for(&mask, &layout);

    let left = layout.index_of((8, 8)).unwrap();
    let right = layout.index_of((30, 8)).unwrap();
    assert!(!signatures[left].is_empty());
    assert!(!signatures[right].is_empty());
    assert_relative_eq!(visibility_distance(&signatures[left], &signatures[right]), 1.0, epsilon = 1e-5);

    let clustering = cluster_merge(&signatures, vec![left, right], &ClusterParams::default()).unwrap();
    let left_cluster = clustering.cluster_of(left).unwrap();
    let right_cluster = clustering.cluster_of(right).unwrap();
    assert_ne!(left_cluster, right_cluster);

    // Every member sits in the room of its cluster.
    for members in &clustering.clusters {
        let sides: Vec<bool> = members.iter().map(|&m| layout.pixel(m).0 < 20).collect();
        assert!(sides.windows(2).all(|w| w[0] == w[1]));
    }

    // Centers are already far apart, so another merge changes nothing.
    let mut again = clustering.clone();
    assert!(!again.merge(&signatures, ClusterParams::default().merge_threshold));
    assert_eq!(again, clustering);
}

#[test]
fn partial_wall_separates_connected_halves() {
    let mask = room_with_partial_wall();
    let layout = CandidateLayout::new(30, 20, 2);
    let signatures = signatures_for(&mask, &layout);

    // Same free region, no mutual line of sight.
    let distance = distance_to_boundary(&mask);
    let tree = foreground_path(&mask, &distance, (6, 4)).unwrap();
    assert!(tree.score((24, 4)).is_finite());
    assert!(!is_visible(&mask, (6, 4), (24, 4), 1).unwrap());

    let left = layout.index_of((6, 4)).unwrap();
    let right = layout.index_of((24, 4)).unwrap();
    let d = visibility_distance(&signatures[left], &signatures[right]);
    assert!(d > ClusterParams::default().merge_threshold, "distance {d}");
    assert!(d <= 1.0 + 1e-5);

    let clustering = cluster_merge(&signatures, vec![left, right], &ClusterParams::default()).unwrap();
    assert_ne!(clustering.cluster_of(left), clustering.cluster_of(right));
}
