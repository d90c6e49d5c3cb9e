//! 2D k-d tree for spatial indexing
//!
//! Provides O(log n) nearest-neighbour, k-nearest and radius queries over
//! sample points. Built once before cell evaluation starts; all queries take
//! `&self` and may run concurrently.
//!
//! Reference:
//! Bentley, J.L. (1975). Multidimensional binary search trees used
//! for associative searching. CACM, 18(9).

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use scatterfill_core::{Error, Result};

use crate::points::SamplePoint;
use crate::search::{Neighbor, SpatialIndex};

/// A 2D k-d tree over sample points.
#[derive(Debug)]
pub struct KdTree {
    nodes: Vec<KdNode>,
    /// Points in their original order; `Neighbor::index` refers to this order
    points: Vec<SamplePoint>,
}

#[derive(Debug)]
struct KdNode {
    point_idx: usize,
    /// 0 = x, 1 = y
    split_dim: u8,
    left: Option<usize>,
    right: Option<usize>,
}

/// Max-heap entry keyed on distance
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance_sq: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.index.cmp(&other.index))
    }
}

#[inline]
fn coord(p: &SamplePoint, dim: u8) -> f64 {
    if dim == 0 { p.x } else { p.y }
}

impl KdTree {
    /// Build a k-d tree from sample points.
    ///
    /// Construction is O(n log n) using median splits. Fails on an empty
    /// slice or on non-finite coordinates, which cannot be ordered.
    pub fn build(points: &[SamplePoint]) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::SearchIndex("cannot index an empty point set".into()));
        }
        if let Some(p) = points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(Error::SearchIndex(format!(
                "non-finite coordinate ({}, {})",
                p.x, p.y
            )));
        }

        let mut indices: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        build_recursive(points, &mut indices, 0, &mut nodes);

        Ok(Self {
            nodes,
            points: points.to_vec(),
        })
    }

    /// Find the single nearest point to (qx, qy).
    pub fn nearest(&self, qx: f64, qy: f64) -> Option<Neighbor> {
        self.k_nearest(qx, qy, 1).into_iter().next()
    }

    fn neighbor(&self, index: usize, distance_sq: f64) -> Neighbor {
        Neighbor {
            index,
            point: self.points[index],
            distance_sq,
        }
    }

    fn knn_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];
        let candidate = Candidate {
            distance_sq: p.dist_sq(qx, qy),
            index: node.point_idx,
        };

        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().is_some_and(|worst| candidate < *worst) {
            heap.pop();
            heap.push(candidate);
        }

        let diff = if node.split_dim == 0 { qx - p.x } else { qy - p.y };
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.knn_recursive(child, qx, qy, k, heap);
        }

        let threshold = match heap.peek() {
            Some(worst) if heap.len() >= k => worst.distance_sq,
            _ => f64::INFINITY,
        };
        if diff * diff <= threshold
            && let Some(child) = second
        {
            self.knn_recursive(child, qx, qy, k, heap);
        }
    }

    fn radius_recursive(
        &self,
        node_idx: usize,
        qx: f64,
        qy: f64,
        radius_sq: f64,
        results: &mut Vec<Neighbor>,
    ) {
        let node = &self.nodes[node_idx];
        let p = &self.points[node.point_idx];

        let dist_sq = p.dist_sq(qx, qy);
        if dist_sq <= radius_sq {
            results.push(self.neighbor(node.point_idx, dist_sq));
        }

        let diff = if node.split_dim == 0 { qx - p.x } else { qy - p.y };
        let plane_within = diff * diff <= radius_sq;

        if let Some(left) = node.left
            && (diff <= 0.0 || plane_within)
        {
            self.radius_recursive(left, qx, qy, radius_sq, results);
        }
        if let Some(right) = node.right
            && (diff >= 0.0 || plane_within)
        {
            self.radius_recursive(right, qx, qy, radius_sq, results);
        }
    }
}

impl SpatialIndex for KdTree {
    fn len(&self) -> usize {
        self.points.len()
    }

    fn k_nearest(&self, x: f64, y: f64, k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k + 1);
        self.knn_recursive(0, x, y, k, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|c| self.neighbor(c.index, c.distance_sq))
            .collect()
    }

    fn within_radius(&self, x: f64, y: f64, radius: f64) -> Vec<Neighbor> {
        if !(radius > 0.0) {
            return Vec::new();
        }

        let mut results = Vec::new();
        self.radius_recursive(0, x, y, radius * radius, &mut results);
        results
    }
}

/// Median-split construction. Left children hold coordinates ≤ the split,
/// right children ≥ the split.
fn build_recursive(
    points: &[SamplePoint],
    indices: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> usize {
    let split_dim = (depth % 2) as u8;
    let median = indices.len() / 2;

    indices.select_nth_unstable_by(median, |&a, &b| {
        coord(&points[a], split_dim).total_cmp(&coord(&points[b], split_dim))
    });

    let node_idx = nodes.len();
    nodes.push(KdNode {
        point_idx: indices[median],
        split_dim,
        left: None,
        right: None,
    });

    let (left, rest) = indices.split_at_mut(median);
    let right = &mut rest[1..];

    if !left.is_empty() {
        nodes[node_idx].left = Some(build_recursive(points, left, depth + 1, nodes));
    }
    if !right.is_empty() {
        nodes[node_idx].right = Some(build_recursive(points, right, depth + 1, nodes));
    }

    node_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<SamplePoint> {
        vec![
            SamplePoint::new(2.0, 3.0, 10.0),
            SamplePoint::new(5.0, 4.0, 20.0),
            SamplePoint::new(9.0, 6.0, 30.0),
            SamplePoint::new(4.0, 7.0, 40.0),
            SamplePoint::new(8.0, 1.0, 50.0),
            SamplePoint::new(7.0, 2.0, 60.0),
            SamplePoint::new(1.0, 8.0, 70.0),
            SamplePoint::new(6.0, 5.0, 80.0),
        ]
    }

    fn scattered(n: usize) -> Vec<SamplePoint> {
        (0..n)
            .map(|i| {
                let x = ((i * 7 + 13) % 100) as f64;
                let y = ((i * 11 + 37) % 100) as f64;
                SamplePoint::new(x, y, i as f64)
            })
            .collect()
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = KdTree::build(&[]).unwrap_err();
        assert_eq!(err.kind(), scatterfill_core::ErrorKind::Resource);
    }

    #[test]
    fn test_non_finite_coordinate_is_an_error() {
        let pts = vec![SamplePoint::new(f64::NAN, 0.0, 1.0)];
        assert!(KdTree::build(&pts).is_err());
    }

    #[test]
    fn test_nearest_keeps_original_index() {
        let tree = KdTree::build(&sample_points()).unwrap();
        let n = tree.nearest(6.1, 5.1).unwrap();
        assert_eq!(n.index, 7);
        assert_eq!(n.point.value, 80.0);
    }

    #[test]
    fn test_k_nearest_matches_brute_force() {
        let pts = scattered(500);
        let tree = KdTree::build(&pts).unwrap();

        for (qx, qy) in [(50.0, 50.0), (0.5, 99.5), (-10.0, 20.0), (33.3, 66.6)] {
            let found = tree.k_nearest(qx, qy, 12);
            assert_eq!(found.len(), 12);
            for w in found.windows(2) {
                assert!(w[0].distance_sq <= w[1].distance_sq);
            }

            let mut bf: Vec<f64> = pts.iter().map(|p| p.dist_sq(qx, qy)).collect();
            bf.sort_by(f64::total_cmp);
            for (n, d) in found.iter().zip(&bf) {
                assert!((n.distance_sq - d).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_k_nearest_more_than_points() {
        let pts = sample_points();
        let tree = KdTree::build(&pts).unwrap();
        assert_eq!(tree.k_nearest(5.0, 5.0, 100).len(), pts.len());
        assert!(tree.k_nearest(5.0, 5.0, 0).is_empty());
    }

    #[test]
    fn test_within_radius_matches_brute_force() {
        let pts = scattered(500);
        let tree = KdTree::build(&pts).unwrap();

        for radius in [0.5, 3.0, 12.0, 40.0] {
            let found = tree.within_radius(47.0, 52.0, radius);
            let bf = pts
                .iter()
                .filter(|p| p.dist_sq(47.0, 52.0) <= radius * radius)
                .count();
            assert_eq!(found.len(), bf, "radius {radius}");
        }
        assert!(tree.within_radius(47.0, 52.0, 0.0).is_empty());
    }

    #[test]
    fn test_duplicate_coordinates() {
        let pts: Vec<SamplePoint> = (0..6).map(|i| SamplePoint::new(1.0, 1.0, i as f64)).collect();
        let tree = KdTree::build(&pts).unwrap();
        assert_eq!(tree.within_radius(1.0, 1.0, 0.1).len(), 6);
        assert_eq!(tree.k_nearest(1.0, 1.0, 4).len(), 4);
    }

    #[test]
    fn test_collinear_points() {
        let pts: Vec<SamplePoint> = (0..10)
            .map(|i| SamplePoint::new(i as f64, 0.0, i as f64))
            .collect();
        let tree = KdTree::build(&pts).unwrap();

        let result = tree.nearest(4.5, 0.0).unwrap();
        assert!(result.distance_sq <= 0.25 + 1e-10);
        assert_eq!(tree.k_nearest(4.5, 0.0, 3).len(), 3);
    }
}
