use std::collections::BTreeMap;

use tracing::warn;

use crate::item::ItemUid;

/// Identifier of a world node.
pub type NodeUid = u64;

/// Vertex of the world graph where items meet.
///
/// The two item slots are plain identifiers resolved through the world's item
/// arena; a node never keeps an item alive.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub uid: NodeUid,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
    /// Heading around the vertical axis, in radians.
    pub rotation: f64,
    pub forward_item: Option<ItemUid>,
    pub backward_item: Option<ItemUid>,
    /// False while the node only exists because an item referenced it.
    pub loaded: bool,
}

impl Node {
    pub fn new(uid: NodeUid, x: f32, y: f32, z: f32, rotation: f64) -> Self {
        Self {
            uid,
            x,
            y,
            z,
            rx: 0.0,
            ry: 0.0,
            rz: 0.0,
            rotation,
            forward_item: None,
            backward_item: None,
            loaded: true,
        }
    }

    /// Node created on first reference, before its geometry is known.
    pub fn placeholder(uid: NodeUid) -> Self {
        Self {
            loaded: false,
            ..Self::new(uid, 0.0, 0.0, 0.0, 0.0)
        }
    }

    /// The item on the other side of this node as seen from `item`.
    pub fn other_item(&self, item: ItemUid) -> Option<ItemUid> {
        [self.forward_item, self.backward_item]
            .into_iter()
            .flatten()
            .find(|&uid| uid != item)
    }

    pub fn has_item(&self, item: ItemUid) -> bool {
        self.forward_item == Some(item) || self.backward_item == Some(item)
    }
}

/// Which of a node's two item slots to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeSlot {
    Forward,
    Backward,
}

/// All world nodes of the loaded map, keyed by uid.
#[derive(Debug, Clone, Default)]
pub struct NodeGraph {
    nodes: BTreeMap<NodeUid, Node>,
}

impl NodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_node_by_uid(&self, uid: NodeUid) -> Option<&Node> {
        self.nodes.get(&uid)
    }

    /// Node whose geometry has been loaded; placeholders are not returned.
    pub fn get_loaded(&self, uid: NodeUid) -> Option<&Node> {
        self.nodes.get(&uid).filter(|node| node.loaded)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Insert or update a node's geometry.
    ///
    /// Item slots already registered on a placeholder are kept.
    pub fn insert(&mut self, node: Node) {
        match self.nodes.get_mut(&node.uid) {
            Some(existing) => {
                let forward = existing.forward_item.or(node.forward_item);
                let backward = existing.backward_item.or(node.backward_item);
                *existing = Node {
                    forward_item: forward,
                    backward_item: backward,
                    loaded: true,
                    ..node
                };
            }
            None => {
                self.nodes.insert(node.uid, node);
            }
        }
    }

    /// Register `item` on node `uid`, creating the node if needed.
    ///
    /// The preferred slot is used when free, the other one otherwise. Returns
    /// `false` when both slots are already taken by other items.
    pub fn attach(&mut self, uid: NodeUid, item: ItemUid, preferred: NodeSlot) -> bool {
        let node = self
            .nodes
            .entry(uid)
            .or_insert_with(|| Node::placeholder(uid));

        if node.has_item(item) {
            return true;
        }

        let (first, second) = match preferred {
            NodeSlot::Forward => (&mut node.forward_item, &mut node.backward_item),
            NodeSlot::Backward => (&mut node.backward_item, &mut node.forward_item),
        };
        if first.is_none() {
            *first = Some(item);
            true
        } else if second.is_none() {
            *second = Some(item);
            true
        } else {
            warn!(
                node = %format_args!("{uid:#x}"),
                item = %format_args!("{item:#x}"),
                "node already connects two items"
            );
            false
        }
    }
}
