//! R-tree based spatial index using the rstar crate.
//!
//! Provides O(log n) hit testing over the current layout:
//! - Nearest neighbor
//! - Point-in-radius
//! - Rectangle intersection
//!
//! Entries are node slots (indices into the simulation's buffers); the
//! simulation maps them back to driver ids.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

/// A point in the spatial index with its node slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePoint {
    /// Index of the node in the simulation buffers.
    pub slot: usize,
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl NodePoint {
    /// Create a new NodePoint.
    pub fn new(slot: usize, x: f64, y: f64) -> Self {
        Self { slot, x, y }
    }
}

impl RTreeObject for NodePoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for NodePoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over node positions.
///
/// Uses an R*-tree, bulk loaded from the latest positions.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<NodePoint>,
}

impl SpatialIndex {
    /// Create a new empty spatial index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Find the nearest node slot within a maximum distance.
    pub fn nearest_within(&self, x: f64, y: f64, max_distance: f64) -> Option<usize> {
        let max_distance_sq = max_distance * max_distance;
        self.tree
            .nearest_neighbor(&[x, y])
            .filter(|point| point.distance_2(&[x, y]) <= max_distance_sq)
            .map(|point| point.slot)
    }

    /// Find all node slots within a rectangle.
    pub fn in_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        self.tree
            .locate_in_envelope(&envelope)
            .map(|point| point.slot)
            .collect()
    }

    /// Find all node slots within a radius of a point.
    pub fn in_radius(&self, x: f64, y: f64, radius: f64) -> Vec<usize> {
        self.tree
            .locate_within_distance([x, y], radius * radius)
            .map(|point| point.slot)
            .collect()
    }

    /// Rebuild the index from parallel coordinate buffers.
    ///
    /// Slots whose coordinates are not finite are left out.
    pub fn rebuild(&mut self, xs: &[f64], ys: &[f64]) {
        let points: Vec<_> = xs
            .iter()
            .zip(ys)
            .enumerate()
            .filter(|(_, (x, y))| x.is_finite() && y.is_finite())
            .map(|(slot, (&x, &y))| NodePoint::new(slot, x, y))
            .collect();

        self.tree = RTree::bulk_load(points);
    }

    /// Clear all nodes from the index.
    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    /// Get the number of nodes in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
