//! KD-tree index over world node positions.
//!
//! Queries work on the horizontal (x, z) plane; heights are ignored. The
//! index is a snapshot: nodes inserted into the world after it was built are
//! not visible to it.

use kiddo::float::kdtree::KdTree;
use kiddo::SquaredEuclidean;
use tracing::debug;

use crate::node::{NodeGraph, NodeUid};

/// KD-tree bucket size (kiddo default).
const BUCKET_SIZE: usize = 32;

/// Spatial index over the nodes of a [`NodeGraph`].
pub struct NodeIndex {
    tree: KdTree<f32, usize, 2, BUCKET_SIZE, u32>,
    uids: Vec<NodeUid>,
}

impl NodeIndex {
    pub fn build(graph: &NodeGraph) -> Self {
        let mut tree: KdTree<f32, usize, 2, BUCKET_SIZE, u32> = KdTree::new();
        let mut uids = Vec::with_capacity(graph.len());
        for node in graph.iter().filter(|node| node.loaded) {
            tree.add(&[node.x, node.z], uids.len());
            uids.push(node.uid);
        }
        debug!(node_count = uids.len(), "built node index");
        Self { tree, uids }
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// The `k` nodes closest to (x, z), nearest first.
    pub fn nearest(&self, x: f64, z: f64, k: usize) -> Vec<(NodeUid, f64)> {
        if k == 0 || self.uids.is_empty() {
            return Vec::new();
        }

        let query = [x as f32, z as f32];
        self.tree
            .nearest_n::<SquaredEuclidean>(&query, k)
            .into_iter()
            .filter_map(|neighbour| {
                let uid = self.uids.get(neighbour.item)?;
                Some((*uid, f64::from(neighbour.distance).sqrt()))
            })
            .collect()
    }

    /// Every node within `radius` of (x, z), nearest first.
    pub fn within_radius(&self, x: f64, z: f64, radius: f64) -> Vec<(NodeUid, f64)> {
        if radius <= 0.0 || self.uids.is_empty() {
            return Vec::new();
        }

        let query = [x as f32, z as f32];
        let squared_radius = (radius * radius) as f32;
        let mut found: Vec<(NodeUid, f64)> = self
            .tree
            .within::<SquaredEuclidean>(&query, squared_radius)
            .into_iter()
            .filter_map(|neighbour| {
                let uid = self.uids.get(neighbour.item)?;
                Some((*uid, f64::from(neighbour.distance).sqrt()))
            })
            .collect();

        found.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        found
    }
}

impl std::fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeIndex")
            .field("node_count", &self.uids.len())
            .finish()
    }
}
