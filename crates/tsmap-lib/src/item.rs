//! Map items: the placeable entities of a sector.

use std::fmt;

use crate::error::ItemIssue;
use crate::node::NodeUid;

/// Unique identifier of a map item.
pub type ItemUid = u64;

/// Item type tag stored in every record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Terrain,
    Building,
    Road,
    Prefab,
    Model,
    Company,
    Service,
    CutPlane,
    Mover,
    NoWeather,
    City,
    Hinge,
    MapOverlay,
    Ferry,
    Sound,
    Garage,
    CameraPoint,
    Trigger,
    FuelPump,
    RoadSideItem,
    BusStop,
    TrafficRule,
    Compound,
    Other(u32),
}

impl ItemType {
    pub fn from_tag(tag: u32) -> Self {
        match tag {
            0x01 => ItemType::Terrain,
            0x02 => ItemType::Building,
            0x03 => ItemType::Road,
            0x04 => ItemType::Prefab,
            0x05 => ItemType::Model,
            0x06 => ItemType::Company,
            0x07 => ItemType::Service,
            0x08 => ItemType::CutPlane,
            0x09 => ItemType::Mover,
            0x0B => ItemType::NoWeather,
            0x0C => ItemType::City,
            0x0D => ItemType::Hinge,
            0x12 => ItemType::MapOverlay,
            0x13 => ItemType::Ferry,
            0x15 => ItemType::Sound,
            0x16 => ItemType::Garage,
            0x17 => ItemType::CameraPoint,
            0x22 => ItemType::Trigger,
            0x23 => ItemType::FuelPump,
            0x24 => ItemType::RoadSideItem,
            0x25 => ItemType::BusStop,
            0x26 => ItemType::TrafficRule,
            0x28 => ItemType::Compound,
            other => ItemType::Other(other),
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            ItemType::Terrain => 0x01,
            ItemType::Building => 0x02,
            ItemType::Road => 0x03,
            ItemType::Prefab => 0x04,
            ItemType::Model => 0x05,
            ItemType::Company => 0x06,
            ItemType::Service => 0x07,
            ItemType::CutPlane => 0x08,
            ItemType::Mover => 0x09,
            ItemType::NoWeather => 0x0B,
            ItemType::City => 0x0C,
            ItemType::Hinge => 0x0D,
            ItemType::MapOverlay => 0x12,
            ItemType::Ferry => 0x13,
            ItemType::Sound => 0x15,
            ItemType::Garage => 0x16,
            ItemType::CameraPoint => 0x17,
            ItemType::Trigger => 0x22,
            ItemType::FuelPump => 0x23,
            ItemType::RoadSideItem => 0x24,
            ItemType::BusStop => 0x25,
            ItemType::TrafficRule => 0x26,
            ItemType::Compound => 0x28,
            ItemType::Other(tag) => tag,
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Other(tag) => write!(f, "Unknown({tag:#x})"),
            known => fmt::Debug::fmt(known, f),
        }
    }
}

/// Fields shared by every item.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemBase {
    pub uid: ItemUid,
    pub item_type: ItemType,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub hidden: bool,
    /// False when a referenced resource could not be resolved.
    pub valid: bool,
    /// Length of the decoded record in bytes.
    pub block_size: usize,
    pub flags: u32,
    /// Attached world nodes; for prefabs index 0 is the alignment anchor.
    pub nodes: Vec<NodeUid>,
    pub dlc_guard: u8,
    /// Problems found while decoding this item.
    pub issues: Vec<ItemIssue>,
}

impl ItemBase {
    pub fn new(uid: ItemUid, item_type: ItemType, nodes: Vec<NodeUid>) -> Self {
        Self {
            uid,
            item_type,
            x: 0.0,
            y: 0.0,
            z: 0.0,
            hidden: false,
            valid: true,
            block_size: 0,
            flags: 0,
            nodes,
            dlc_guard: 0,
            issues: Vec::new(),
        }
    }

    /// Mark the item invalid and remember why.
    pub fn invalidate(&mut self, issue: ItemIssue) {
        self.valid = false;
        self.issues.push(issue);
    }
}

/// Capabilities every map item offers.
pub trait Item {
    fn base(&self) -> &ItemBase;

    fn uid(&self) -> ItemUid {
        self.base().uid
    }

    fn item_type(&self) -> ItemType {
        self.base().item_type
    }

    fn position(&self) -> (f32, f32, f32) {
        let base = self.base();
        (base.x, base.y, base.z)
    }

    fn node_uids(&self) -> &[NodeUid] {
        &self.base().nodes
    }

    fn is_valid(&self) -> bool {
        self.base().valid
    }
}

/// World-space polyline drawn for one template curve.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefabLook {
    pub curve_id: usize,
    pub points: Vec<(f32, f32)>,
}

/// Placed instance of a prefab template.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefabItem {
    pub base: ItemBase,
    /// Token of the template; the catalog key, kept even when unresolved.
    pub template: u64,
    /// Template node that `base.nodes[0]` is placed on.
    pub origin: u8,
    pub padding: i32,
    /// Ferry terminal this prefab serves, zero when none.
    pub ferry_uid: ItemUid,
    pub is_secret: bool,
    looks: Vec<PrefabLook>,
}

impl PrefabItem {
    pub fn new(uid: ItemUid, template: u64, origin: u8, nodes: Vec<NodeUid>) -> Self {
        Self {
            base: ItemBase::new(uid, ItemType::Prefab, nodes),
            template,
            origin,
            padding: 0,
            ferry_uid: 0,
            is_secret: false,
            looks: Vec::new(),
        }
    }

    pub fn add_look(&mut self, look: PrefabLook) {
        self.looks.push(look);
    }

    pub fn looks(&self) -> &[PrefabLook] {
        &self.looks
    }

    pub fn has_looks(&self) -> bool {
        !self.looks.is_empty()
    }
}

impl Item for PrefabItem {
    fn base(&self) -> &ItemBase {
        &self.base
    }
}

/// Road segment between two nodes.
///
/// The length is supplied by the road decoder; it is treated as an opaque
/// positive distance.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadItem {
    pub base: ItemBase,
    pub start_node: NodeUid,
    pub end_node: NodeUid,
    pub length: f64,
    pub is_secret: bool,
}

impl RoadItem {
    pub fn new(uid: ItemUid, start_node: NodeUid, end_node: NodeUid, length: f64) -> Self {
        Self {
            base: ItemBase::new(uid, ItemType::Road, vec![start_node, end_node]),
            start_node,
            end_node,
            length,
            is_secret: false,
        }
    }

    /// The road's other end as seen from `node`.
    pub fn other_end(&self, node: NodeUid) -> Option<NodeUid> {
        if node == self.start_node {
            Some(self.end_node)
        } else if node == self.end_node {
            Some(self.start_node)
        } else {
            None
        }
    }
}

impl Item for RoadItem {
    fn base(&self) -> &ItemBase {
        &self.base
    }
}

/// Ferry or train terminal.
#[derive(Debug, Clone, PartialEq)]
pub struct FerryItem {
    pub base: ItemBase,
    /// Token naming the port in the connection table.
    pub port_token: u64,
    pub is_train: bool,
}

impl FerryItem {
    pub fn new(uid: ItemUid, port_token: u64, nodes: Vec<NodeUid>) -> Self {
        Self {
            base: ItemBase::new(uid, ItemType::Ferry, nodes),
            port_token,
            is_train: false,
        }
    }
}

impl Item for FerryItem {
    fn base(&self) -> &ItemBase {
        &self.base
    }
}

/// Scheduled crossing between two ports.
#[derive(Debug, Clone, PartialEq)]
pub struct FerryConnection {
    pub start_port: u64,
    pub end_port: u64,
    pub price: u32,
    pub time: u32,
    pub distance: f64,
}

/// Any item stored in the world arena.
#[derive(Debug, Clone, PartialEq)]
pub enum MapItem {
    Prefab(PrefabItem),
    Road(RoadItem),
    Ferry(FerryItem),
}

impl Item for MapItem {
    fn base(&self) -> &ItemBase {
        match self {
            MapItem::Prefab(item) => &item.base,
            MapItem::Road(item) => &item.base,
            MapItem::Ferry(item) => &item.base,
        }
    }
}
