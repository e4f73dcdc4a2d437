// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! k-medoids clustering of visibility signatures with pairwise merging.
//!
//! Signatures are sparse sets, not vectors, so cluster centers are medoids:
//! the member with the smallest sum of squared distances to the rest of its
//! cluster. Indices throughout are candidate indices into the signature
//! slice.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::ClusterParams;
use crate::error::{Error, Result};
use crate::visibility::Signature;

/// Half the total weight of boundary points seen by exactly one side.
///
/// Both signatures must be sorted by boundary index. Shared indices cost
/// nothing regardless of their weights. The result lies in `[0, 1]` for
/// normalized signatures.
pub fn visibility_distance(lhs: &[(usize, f32)], rhs: &[(usize, f32)]) -> f32 {
    let mut l = 0;
    let mut r = 0;
    let mut distance = 0.0;

    while l < lhs.len() || r < rhs.len() {
        if l == lhs.len() {
            distance += rhs[r].1;
            r += 1;
        } else if r == rhs.len() {
            distance += lhs[l].1;
            l += 1;
        } else if lhs[l].0 == rhs[r].0 {
            l += 1;
            r += 1;
        } else if lhs[l].0 < rhs[r].0 {
            distance += lhs[l].1;
            l += 1;
        } else {
            distance += rhs[r].1;
            r += 1;
        }
    }

    distance / 2.0
}

/// Picks up to `k` random candidates with a non-empty signature.
pub fn initial_centers<R: Rng + ?Sized>(signatures: &[Signature], k: usize, rng: &mut R) -> Vec<usize> {
    let mut centers: Vec<usize> = signatures
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.is_empty())
        .map(|(i, _)| i)
        .collect();
    centers.shuffle(rng);
    centers.truncate(k);
    centers
}

/// Current centers and the members assigned to each.
///
/// `centers[c]` is the medoid of `clusters[c]`; the two vectors always have
/// the same length.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clustering {
    pub centers: Vec<usize>,
    pub clusters: Vec<Vec<usize>>,
}

impl Clustering {
    /// Starts from the given centers with no members assigned.
    pub fn new(centers: Vec<usize>) -> Self {
        let clusters = vec![Vec::new(); centers.len()];
        Self { centers, clusters }
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    /// Cluster that contains `member`, if any.
    pub fn cluster_of(&self, member: usize) -> Option<usize> {
        self.clusters.iter().position(|c| c.contains(&member))
    }

    /// Runs `iterations` rounds of assignment followed by medoid update.
    ///
    /// There is no convergence test; the round count is fixed.
    pub fn cluster(&mut self, signatures: &[Signature], iterations: usize) -> Result<()> {
        for _ in 0..iterations {
            self.assign(signatures)?;
            self.update_centers(signatures);
        }
        Ok(())
    }

    /// Assigns every non-empty signature to its closest center.
    ///
    /// Ties go to the lowest center index.
    pub fn assign(&mut self, signatures: &[Signature]) -> Result<()> {
        let mut clusters = vec![Vec::new(); self.centers.len()];
        for (index, signature) in signatures.iter().enumerate() {
            if signature.is_empty() {
                continue;
            }
            let closest = closest_center(signatures, signature, &self.centers)
                .ok_or_else(|| Error::NoClusterCenters(signatures.iter().filter(|s| !s.is_empty()).count()))?;
            clusters[closest].push(index);
        }
        self.clusters = clusters;
        Ok(())
    }

    /// Moves each center to its cluster's medoid.
    ///
    /// An empty cluster keeps its previous center.
    pub fn update_centers(&mut self, signatures: &[Signature]) {
        for (center, members) in self.centers.iter_mut().zip(&self.clusters) {
            if let Some(medoid) = medoid(signatures, members) {
                *center = medoid;
            }
        }
    }

    /// Merges center pairs closer than `threshold`, closest first.
    ///
    /// Each center takes part in at most one merge per call. Returns whether
    /// anything was merged; if so, centers are recomputed as medoids.
    pub fn merge(&mut self, signatures: &[Signature], threshold: f32) -> bool {
        let n = self.centers.len();
        let mut distances = vec![vec![f32::INFINITY; n]; n];
        for i in 0..n {
            for j in i + 1..n {
                distances[i][j] =
                    visibility_distance(&signatures[self.centers[i]], &signatures[self.centers[j]]);
            }
        }
        tracing::trace!(?distances, "Center distance matrix");

        let mut pairs = Vec::new();
        loop {
            let mut closest = None;
            let mut closest_distance = f32::INFINITY;
            for (i, row) in distances.iter().enumerate() {
                for (j, &distance) in row.iter().enumerate().skip(i + 1) {
                    if distance < closest_distance {
                        closest_distance = distance;
                        closest = Some((i, j));
                    }
                }
            }

            match closest {
                Some((a, b)) if closest_distance < threshold => {
                    pairs.push((a, b));
                    for k in 0..n {
                        distances[a][k] = f32::INFINITY;
                        distances[b][k] = f32::INFINITY;
                        distances[k][a] = f32::INFINITY;
                        distances[k][b] = f32::INFINITY;
                    }
                }
                _ => break,
            }
        }

        if pairs.is_empty() {
            return false;
        }

        let mut absorbed = Vec::with_capacity(pairs.len());
        for &(keep, gone) in &pairs {
            let moved = std::mem::take(&mut self.clusters[gone]);
            self.clusters[keep].extend(moved);
            absorbed.push(gone);
        }
        absorbed.sort_unstable_by(|a, b| b.cmp(a));
        for gone in absorbed {
            self.clusters.remove(gone);
            self.centers.remove(gone);
        }
        self.update_centers(signatures);

        tracing::debug!(merged = pairs.len(), remaining = self.centers.len(), "Merged clusters");
        true
    }
}

/// Alternates clustering and merging, then finishes with a clustering pass.
///
/// Stops early after the first round whose merge changes nothing. The last
/// step is always a clustering pass, so assignments match the final centers.
pub fn cluster_merge(signatures: &[Signature], initial_centers: Vec<usize>, params: &ClusterParams) -> Result<Clustering> {
    let mut clustering = Clustering::new(initial_centers);
    for round in 0..params.rounds {
        clustering.cluster(signatures, params.iterations)?;
        let merged = clustering.merge(signatures, params.merge_threshold);
        tracing::debug!(round, merged, clusters = clustering.len(), "Cluster/merge round");
        if !merged {
            break;
        }
    }
    clustering.cluster(signatures, params.iterations)?;
    Ok(clustering)
}

fn closest_center(signatures: &[Signature], signature: &[(usize, f32)], centers: &[usize]) -> Option<usize> {
    let mut closest = None;
    let mut closest_distance = f32::INFINITY;
    for (c, &center) in centers.iter().enumerate() {
        let distance = visibility_distance(signature, &signatures[center]);
        if distance < closest_distance {
            closest_distance = distance;
            closest = Some(c);
        }
    }
    closest
}

/// Member minimizing the sum of squared distances to the other members.
fn medoid(signatures: &[Signature], members: &[usize]) -> Option<usize> {
    if members.is_empty() {
        return None;
    }
    let mut sums = vec![0.0f32; members.len()];
    for i in 0..members.len() {
        for j in i + 1..members.len() {
            let d = visibility_distance(&signatures[members[i]], &signatures[members[j]]);
            sums[i] += d * d;
            sums[j] += d * d;
        }
    }

    let mut best = 0;
    for (i, &sum) in sums.iter().enumerate() {
        if sum < sums[best] {
            best = i;
        }
    }
    Some(members[best])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn uniform(indices: &[usize]) -> Signature {
        let w = 1.0 / indices.len() as f32;
        indices.iter().map(|&i| (i, w)).collect()
    }

    /// Candidates 0..3 see boundary points 0..4, candidates 4..7 see 10..14,
    /// candidate 8 sees nothing.
    fn two_groups() -> Vec<Signature> {
        vec![
            uniform(&[0, 1, 2, 3]),
            uniform(&[0, 1, 2]),
            uniform(&[0, 1, 2, 3, 4]),
            uniform(&[1, 2, 3, 4]),
            uniform(&[10, 11, 12, 13]),
            uniform(&[10, 11, 12]),
            uniform(&[11, 12, 13, 14]),
            uniform(&[10, 11, 12, 13, 14]),
            Vec::new(),
        ]
    }

    #[test]
    fn test_distance_identity_and_symmetry() {
        let signatures = two_groups();
        for a in &signatures {
            assert_eq!(visibility_distance(a, a), 0.0);
            for b in &signatures {
                let d = visibility_distance(a, b);
                assert_eq!(d, visibility_distance(b, a));
                assert!((0.0..=1.0 + 1e-6).contains(&d));
            }
        }
    }

    #[test]
    fn test_distance_of_disjoint_signatures_is_one() {
        let d = visibility_distance(&uniform(&[0, 1]), &uniform(&[5, 6, 7]));
        assert_relative_eq!(d, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_shared_indices_cost_nothing() {
        let a: Signature = vec![(1, 0.9), (2, 0.1)];
        let b: Signature = vec![(1, 0.1), (3, 0.9)];
        // Only 2 (0.1) and 3 (0.9) are unshared.
        assert_relative_eq!(visibility_distance(&a, &b), 0.5);
        assert_relative_eq!(visibility_distance(&a, &[]), 0.5);
    }

    #[test]
    fn test_initial_centers_skip_empty() {
        let signatures = two_groups();
        let mut rng = StdRng::seed_from_u64(5);
        let centers = initial_centers(&signatures, 20, &mut rng);
        assert_eq!(centers.len(), 8);
        assert!(!centers.contains(&8));

        let centers = initial_centers(&signatures, 3, &mut rng);
        assert_eq!(centers.len(), 3);
    }

    #[test]
    fn test_assignment_ties_go_to_first_center() {
        let signatures = vec![uniform(&[0]), uniform(&[1]), uniform(&[2])];
        let mut clustering = Clustering::new(vec![0, 1]);
        clustering.assign(&signatures).unwrap();
        // Candidate 2 is at distance 1 from both centers.
        assert_eq!(clustering.clusters, vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn test_assignment_without_centers_fails() {
        let mut clustering = Clustering::new(Vec::new());
        assert!(matches!(
            clustering.assign(&two_groups()),
            Err(Error::NoClusterCenters(8))
        ));
        // Nothing to assign is fine.
        let nothing: Vec<Signature> = vec![Vec::new()];
        assert!(clustering.assign(&nothing).is_ok());
    }

    #[test]
    fn test_cluster_separates_groups() {
        let signatures = two_groups();
        let mut clustering = Clustering::new(vec![1, 5]);
        clustering.cluster(&signatures, 10).unwrap();

        assert_eq!(clustering.clusters[0], vec![0, 1, 2, 3]);
        assert_eq!(clustering.clusters[1], vec![4, 5, 6, 7]);
        assert!(clustering.cluster_of(8).is_none());
        assert!(clustering.clusters[0].contains(&clustering.centers[0]));
        assert!(clustering.clusters[1].contains(&clustering.centers[1]));
    }

    #[test]
    fn test_medoid_minimizes_squared_distances() {
        let signatures = vec![uniform(&[0, 1]), uniform(&[0, 1, 2]), uniform(&[0, 1, 2, 3]), uniform(&[2, 3])];
        // The widest signature overlaps everyone.
        assert_eq!(medoid(&signatures, &[0, 1, 2, 3]), Some(2));
        assert_eq!(medoid(&signatures, &[]), None);
    }

    #[test]
    fn test_empty_cluster_keeps_center() {
        let signatures = two_groups();
        // Two centers in the same group: the second attracts nobody
        // because ties go to the first.
        let mut clustering = Clustering::new(vec![0, 0]);
        clustering.assign(&signatures).unwrap();
        clustering.update_centers(&signatures);
        assert!(clustering.clusters[1].is_empty());
        assert_eq!(clustering.centers[1], 0);
    }

    #[test]
    fn test_merge_joins_close_centers_only() {
        let signatures = two_groups();
        let mut clustering = Clustering::new(vec![0, 2, 4, 6]);
        clustering.cluster(&signatures, 1).unwrap();
        assert!(clustering.merge(&signatures, 0.5));

        assert_eq!(clustering.len(), 2);
        assert_eq!(clustering.clusters.len(), 2);
        let first = clustering.cluster_of(0).unwrap();
        assert_eq!(clustering.cluster_of(3), Some(first));
        assert_ne!(clustering.cluster_of(5), Some(first));
    }

    #[test]
    fn test_merge_uses_each_center_once() {
        let signatures = vec![uniform(&[0, 1]), uniform(&[0, 1]), uniform(&[0, 1])];
        let mut clustering = Clustering::new(vec![0, 1, 2]);
        clustering.assign(&signatures).unwrap();
        assert!(clustering.merge(&signatures, 0.5));
        // One pair merged, the third center waits for the next call.
        assert_eq!(clustering.len(), 2);
        assert!(clustering.merge(&signatures, 0.5));
        assert_eq!(clustering.len(), 1);
    }

    #[test]
    fn test_merge_without_close_pairs_is_noop() {
        let signatures = two_groups();
        let mut clustering = Clustering::new(vec![0, 4]);
        clustering.cluster(&signatures, 2).unwrap();
        let before = clustering.clone();
        assert!(!clustering.merge(&signatures, 0.5));
        assert_eq!(clustering, before);
    }

    #[test]
    fn test_cluster_merge_collapses_to_groups() {
        let signatures = two_groups();
        let clustering = cluster_merge(&signatures, vec![0, 1, 2, 4, 5, 6], &ClusterParams::default()).unwrap();

        assert_eq!(clustering.len(), 2);
        let mut clusters = clustering.clusters.clone();
        clusters.sort();
        assert_eq!(clusters, vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7]]);

        // Settled: a further merge changes nothing.
        let mut settled = clustering.clone();
        assert!(!settled.merge(&signatures, 0.5));
        assert_eq!(settled, clustering);
    }
}
