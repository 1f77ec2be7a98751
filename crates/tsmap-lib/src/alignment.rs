//! Placement of template-local geometry in world space.
//!
//! A placed prefab is defined by its anchor world node (`nodes[0]`) and the
//! template node it sits on (`origin`). The transform rotates the template so
//! the origin node's stored heading matches the anchor's heading, and
//! translates it so the origin node lands exactly on the anchor.

use std::f64::consts::{FRAC_PI_2, PI};

use crate::error::ItemIssue;
use crate::item::PrefabItem;
use crate::node::{Node, NodeGraph, NodeUid};
use crate::template::{PrefabNode, PrefabTemplate};

/// Distance within which a world point matches a template node.
pub const NODE_MATCH_RADIUS: f64 = 0.2;

/// Rigid transform from template-local to world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    anchor: (f64, f64, f64),
    origin: (f64, f64, f64),
    rotation: f64,
    sin: f64,
    cos: f64,
}

impl Transform {
    /// Rotation around the vertical axis, in radians.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Map a local (x, z) to world (x, z).
    ///
    /// The point is expressed relative to the origin node and rotated about
    /// the anchor, so the origin node itself maps to the anchor exactly.
    pub fn apply(&self, x: f64, z: f64) -> (f64, f64) {
        let dx = x - self.origin.0;
        let dz = z - self.origin.2;
        (
            self.anchor.0 + dx * self.cos - dz * self.sin,
            self.anchor.2 + dx * self.sin + dz * self.cos,
        )
    }

    /// Map a local height to world height. Heights are never rotated.
    pub fn apply_y(&self, y: f64) -> f64 {
        self.anchor.1 + (y - self.origin.1)
    }

    pub fn apply_point(&self, x: f32, y: f32, z: f32) -> (f64, f64, f64) {
        let (wx, wz) = self.apply(f64::from(x), f64::from(z));
        (wx, self.apply_y(f64::from(y)), wz)
    }
}

/// Compute the transform that places `template` with local node `origin` on
/// `anchor`.
pub fn align(template: &PrefabTemplate, origin: u8, anchor: &Node) -> Result<Transform, ItemIssue> {
    let origin_node = template
        .node(usize::from(origin))
        .ok_or(ItemIssue::OriginOutOfRange {
            origin,
            node_count: template.prefab_nodes.len(),
        })?;

    let heading = f64::from(origin_node.rot_z).atan2(f64::from(origin_node.rot_x));
    let rotation = anchor.rotation - PI - heading + FRAC_PI_2;

    Ok(Transform {
        anchor: (
            f64::from(anchor.x),
            f64::from(anchor.y),
            f64::from(anchor.z),
        ),
        origin: (
            f64::from(origin_node.x),
            f64::from(origin_node.y),
            f64::from(origin_node.z),
        ),
        rotation,
        sin: rotation.sin(),
        cos: rotation.cos(),
    })
}

/// Connectivity a matched template node must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFilter {
    /// Node must start at least one curve.
    Input,
    /// Node must end at least one curve.
    Output,
    Any,
}

impl NodeFilter {
    /// Map the numeric direction mode used by map tooling: 0 = input,
    /// 1 = output, anything else = unfiltered.
    pub fn from_mode(mode: i32) -> Self {
        match mode {
            0 => NodeFilter::Input,
            1 => NodeFilter::Output,
            _ => NodeFilter::Any,
        }
    }

    fn accepts(self, node: &PrefabNode) -> bool {
        match self {
            NodeFilter::Input => !node.input_points.is_empty(),
            NodeFilter::Output => !node.output_points.is_empty(),
            NodeFilter::Any => true,
        }
    }
}

/// A prefab item together with its template and world transform.
#[derive(Debug, Clone, Copy)]
pub struct PlacedPrefab<'a> {
    pub item: &'a PrefabItem,
    pub template: &'a PrefabTemplate,
    pub transform: Transform,
}

impl<'a> PlacedPrefab<'a> {
    /// World position of a template node.
    pub fn node_position(&self, node: &PrefabNode) -> (f64, f64, f64) {
        self.transform.apply_point(node.x, node.y, node.z)
    }

    /// Template node closest to world point (x, z), if one lies within
    /// [`NODE_MATCH_RADIUS`]. Ties keep the first node in template order.
    pub fn nearest_node(&self, x: f64, z: f64, filter: NodeFilter) -> Option<&'a PrefabNode> {
        let template: &'a PrefabTemplate = self.template;
        let mut best: Option<(&'a PrefabNode, f64)> = None;
        for node in template.prefab_nodes.iter().filter(|n| filter.accepts(n)) {
            let (wx, wz) = self.transform.apply(f64::from(node.x), f64::from(node.z));
            let distance = (wx - x).hypot(wz - z);
            if distance >= NODE_MATCH_RADIUS {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((node, distance));
            }
        }
        best.map(|(node, _)| node)
    }

    /// Local template node id for every world node of the item, in the order
    /// of the item's node list.
    ///
    /// A world node is matched geometrically first; when nothing lies within
    /// tolerance the index rule `(origin + i) % node_count` applies.
    pub fn map_local_nodes(&self, graph: &NodeGraph) -> Result<Vec<(NodeUid, usize)>, ItemIssue> {
        let count = self.template.prefab_nodes.len();
        let origin = usize::from(self.item.origin);
        if origin >= count {
            return Err(ItemIssue::OriginOutOfRange {
                origin: self.item.origin,
                node_count: count,
            });
        }
        self.item
            .base
            .nodes
            .iter()
            .enumerate()
            .map(|(i, &uid)| {
                let node = graph
                    .get_loaded(uid)
                    .ok_or(ItemIssue::NodeNotFound { node: uid })?;
                let local = self
                    .nearest_node(f64::from(node.x), f64::from(node.z), NodeFilter::Any)
                    .map(|n| n.id)
                    .unwrap_or((origin + i) % count);
                Ok((uid, local))
            })
            .collect()
    }
}

/// Align a prefab item on its anchor node.
///
/// The anchor must have loaded geometry; a node that only exists because an
/// item referenced it is reported as missing.
pub fn place_prefab<'a>(
    item: &'a PrefabItem,
    template: &'a PrefabTemplate,
    graph: &NodeGraph,
) -> Result<PlacedPrefab<'a>, ItemIssue> {
    let anchor_uid = *item.base.nodes.first().ok_or(ItemIssue::NoNodes)?;
    let anchor = graph
        .get_loaded(anchor_uid)
        .ok_or(ItemIssue::NodeNotFound { node: anchor_uid })?;
    let transform = align(template, item.origin, anchor)?;
    Ok(PlacedPrefab {
        item,
        template,
        transform,
    })
}
