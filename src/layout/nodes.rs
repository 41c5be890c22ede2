//! Nearest-node lookup for the collage canvas

use super::types::{Node, NodeId, Point};

/// Result of a nearest-node query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeHit {
    pub node: NodeId,
    pub center: Point,
    pub distance: f64,
}

impl NodeHit {
    /// Whether the hit lies within a snap radius
    pub fn within(&self, radius: f64) -> bool {
        self.distance <= radius
    }
}

/// Snapshot of node centers, rebuilt whenever the visible nodes change
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    entries: Vec<(NodeId, Point)>,
}

impl NodeIndex {
    pub fn new<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        Self {
            entries: nodes.into_iter().map(|n| (n.id, n.position)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest node by Euclidean distance to its center. Ties go to the
    /// node listed first.
    pub fn nearest(&self, point: Point) -> Option<NodeHit> {
        let mut best: Option<NodeHit> = None;
        for &(node, center) in &self.entries {
            let distance = center.distance_to(point);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(NodeHit {
                    node,
                    center,
                    distance,
                });
            }
        }
        best
    }

    /// Nearest node, only if it lies within `radius`
    pub fn snap_target(&self, point: Point, radius: f64) -> Option<NodeHit> {
        self.nearest(point).filter(|hit| hit.within(radius))
    }
}
