//! The loaded map: item arena, node graph and template catalog.

use std::collections::BTreeMap;

use once_cell::unsync::OnceCell;
use tracing::{info, warn};

use crate::alignment::{place_prefab, PlacedPrefab};
use crate::error::ItemIssue;
use crate::item::{FerryConnection, FerryItem, ItemUid, MapItem, PrefabItem, PrefabLook, RoadItem};
use crate::node::{Node, NodeGraph, NodeSlot};
use crate::overlay::{prefab_points_of_interest, PointOfInterest};
use crate::routes::sample_curve;
use crate::spatial::NodeIndex;
use crate::template::{PrefabTemplate, TemplateCatalog};
use crate::token::token_to_string;

/// Number of candidate nodes inspected when looking for the nearest prefab.
const NEAREST_PREFAB_CANDIDATES: usize = 16;

/// Every item, node and template of the map.
///
/// Items reference templates by token and nodes by uid; nodes reference items
/// by uid. Nothing in the world owns anything else across those links.
#[derive(Debug, Default)]
pub struct MapWorld {
    catalog: TemplateCatalog,
    nodes: NodeGraph,
    items: BTreeMap<ItemUid, MapItem>,
    ferry_connections: Vec<FerryConnection>,
    node_index: OnceCell<NodeIndex>,
}

impl MapWorld {
    pub fn new(catalog: TemplateCatalog) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn nodes(&self) -> &NodeGraph {
        &self.nodes
    }

    /// Add or update a world node.
    pub fn insert_node(&mut self, node: Node) {
        self.nodes.insert(node);
        self.node_index.take();
    }

    /// Add a prefab item and register it on its nodes.
    pub fn add_prefab(&mut self, item: PrefabItem) {
        for &node in &item.base.nodes {
            self.nodes.attach(node, item.base.uid, NodeSlot::Forward);
        }
        self.insert_item(MapItem::Prefab(item));
    }

    /// Add a road; it takes the forward slot of its start node and the
    /// backward slot of its end node.
    pub fn add_road(&mut self, road: RoadItem) {
        self.nodes
            .attach(road.start_node, road.base.uid, NodeSlot::Forward);
        self.nodes
            .attach(road.end_node, road.base.uid, NodeSlot::Backward);
        self.insert_item(MapItem::Road(road));
    }

    pub fn add_ferry(&mut self, ferry: FerryItem) {
        for &node in &ferry.base.nodes {
            self.nodes.attach(node, ferry.base.uid, NodeSlot::Forward);
        }
        self.insert_item(MapItem::Ferry(ferry));
    }

    pub fn add_ferry_connection(&mut self, connection: FerryConnection) {
        self.ferry_connections.push(connection);
    }

    fn insert_item(&mut self, item: MapItem) {
        let uid = match &item {
            MapItem::Prefab(prefab) => prefab.base.uid,
            MapItem::Road(road) => road.base.uid,
            MapItem::Ferry(ferry) => ferry.base.uid,
        };
        if self.items.insert(uid, item).is_some() {
            warn!(uid = %format_args!("{uid:#x}"), "replaced item with duplicate uid");
        }
        self.node_index.take();
    }

    pub fn item(&self, uid: ItemUid) -> Option<&MapItem> {
        self.items.get(&uid)
    }

    pub fn items(&self) -> impl Iterator<Item = &MapItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn prefab(&self, uid: ItemUid) -> Option<&PrefabItem> {
        match self.items.get(&uid)? {
            MapItem::Prefab(prefab) => Some(prefab),
            _ => None,
        }
    }

    pub fn road(&self, uid: ItemUid) -> Option<&RoadItem> {
        match self.items.get(&uid)? {
            MapItem::Road(road) => Some(road),
            _ => None,
        }
    }

    pub fn ferry(&self, uid: ItemUid) -> Option<&FerryItem> {
        match self.items.get(&uid)? {
            MapItem::Ferry(ferry) => Some(ferry),
            _ => None,
        }
    }

    /// Prefab items in uid order.
    pub fn prefabs(&self) -> impl Iterator<Item = &PrefabItem> {
        self.items.values().filter_map(|item| match item {
            MapItem::Prefab(prefab) => Some(prefab),
            _ => None,
        })
    }

    pub fn roads(&self) -> impl Iterator<Item = &RoadItem> {
        self.items.values().filter_map(|item| match item {
            MapItem::Road(road) => Some(road),
            _ => None,
        })
    }

    pub fn ferries(&self) -> impl Iterator<Item = &FerryItem> {
        self.items.values().filter_map(|item| match item {
            MapItem::Ferry(ferry) => Some(ferry),
            _ => None,
        })
    }

    pub fn ferry_connections(&self) -> &[FerryConnection] {
        &self.ferry_connections
    }

    pub fn template_for(&self, item: &PrefabItem) -> Option<&PrefabTemplate> {
        self.catalog.get(item.template)
    }

    /// Align a valid prefab in the world.
    ///
    /// Invalid items report the first issue recorded while decoding them.
    pub fn place<'a>(&'a self, item: &'a PrefabItem) -> Result<PlacedPrefab<'a>, ItemIssue> {
        if let Some(issue) = item.base.issues.first() {
            if !item.base.valid {
                return Err(issue.clone());
            }
        }
        let template = self
            .template_for(item)
            .ok_or_else(|| ItemIssue::TemplateNotFound {
                token: token_to_string(item.template),
                raw: item.template,
                offset: 0,
            })?;
        place_prefab(item, template, &self.nodes)
    }

    /// Sample every template curve of every valid prefab into world space and
    /// store the polylines as the prefab's looks. Returns the number of
    /// prefabs that received looks.
    pub fn build_prefab_looks(&mut self) -> usize {
        let mut computed: Vec<(ItemUid, Vec<PrefabLook>)> = Vec::new();
        for prefab in self.prefabs().filter(|p| p.base.valid && !p.has_looks()) {
            let Ok(placed) = self.place(prefab) else {
                continue;
            };
            let looks = placed
                .template
                .prefab_curves
                .iter()
                .map(|curve| PrefabLook {
                    curve_id: curve.id,
                    points: sample_curve(curve)
                        .into_iter()
                        .map(|(x, z)| {
                            let (wx, wz) = placed.transform.apply(x, z);
                            (wx as f32, wz as f32)
                        })
                        .collect(),
                })
                .collect();
            computed.push((prefab.base.uid, looks));
        }

        let count = computed.len();
        for (uid, looks) in computed {
            if let Some(MapItem::Prefab(prefab)) = self.items.get_mut(&uid) {
                for look in looks {
                    prefab.add_look(look);
                }
            }
        }
        info!(prefabs = count, "built prefab looks");
        count
    }

    /// Points of interest of every valid, placeable prefab.
    pub fn points_of_interest(&self) -> Vec<PointOfInterest> {
        self.prefabs()
            .filter(|prefab| prefab.base.valid)
            .filter_map(|prefab| self.place(prefab).ok())
            .flat_map(|placed| prefab_points_of_interest(&placed))
            .collect()
    }

    /// Points of interest of one prefab; empty when it cannot be placed.
    pub fn points_of_interest_for(&self, uid: ItemUid) -> Vec<PointOfInterest> {
        self.prefab(uid)
            .filter(|prefab| prefab.base.valid)
            .and_then(|prefab| self.place(prefab).ok())
            .map(|placed| prefab_points_of_interest(&placed))
            .unwrap_or_default()
    }

    /// KD-tree over the current node set, built on first use.
    pub fn node_index(&self) -> &NodeIndex {
        self.node_index.get_or_init(|| NodeIndex::build(&self.nodes))
    }

    /// Valid prefab attached to the node closest to (x, z).
    pub fn nearest_prefab(&self, x: f64, z: f64) -> Option<ItemUid> {
        self.node_index()
            .nearest(x, z, NEAREST_PREFAB_CANDIDATES)
            .into_iter()
            .filter_map(|(uid, _)| self.nodes.get_node_by_uid(uid))
            .flat_map(|node| [node.forward_item, node.backward_item])
            .flatten()
            .find(|&uid| self.prefab(uid).is_some_and(|prefab| prefab.base.valid))
    }
}
