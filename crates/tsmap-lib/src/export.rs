//! Flattening of the world and its navigation graph into JSON collections.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::graph::NavigationGraph;
use crate::item::{Item, ItemUid};
use crate::node::NodeUid;
use crate::template::{MapPoint, PrefabCurve, PrefabLane, PrefabNode, SpawnPoint, TriggerPoint};
use crate::token::token_to_string;
use crate::world::MapWorld;

/// Reference to another item by uid and type name.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemRefModel {
    pub uid: ItemUid,
    #[serde(rename = "type")]
    pub item_type: String,
}

impl ItemRefModel {
    fn resolve(world: &MapWorld, uid: ItemUid) -> Self {
        let item_type = world
            .item(uid)
            .map(|item| item.item_type().to_string())
            .unwrap_or_else(|| "Unknown".to_string());
        Self { uid, item_type }
    }
}

/// One navigation entry: distance and the items leading to the target, the
/// target itself last.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NavigationModel {
    pub distance: f64,
    pub items: Vec<ItemRefModel>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteModel {
    pub start_node: usize,
    pub end_node: usize,
    pub curve_ids: Vec<usize>,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrefabTemplateModel {
    pub token: u64,
    pub name: String,
    pub file_path: String,
    pub category: String,
    pub valid_road: bool,
    pub nodes: Vec<PrefabNode>,
    pub spawn_points: Vec<SpawnPoint>,
    pub map_points: Vec<MapPoint>,
    pub trigger_points: Vec<TriggerPoint>,
    pub curves: Vec<PrefabCurve>,
    pub lanes: Vec<PrefabLane>,
    /// Keyed by `"<start>/<end>"` local node ids.
    pub navigation_routes: BTreeMap<String, RouteModel>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PrefabItemModel {
    pub uid: ItemUid,
    #[serde(rename = "type")]
    pub item_type: String,
    pub token: u64,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub hidden: bool,
    pub valid: bool,
    pub block_size: usize,
    pub flags: u32,
    pub dlc_guard: u8,
    pub origin: u8,
    pub padding: i32,
    pub ferry_uid: ItemUid,
    pub is_secret: bool,
    pub nodes: Vec<NodeUid>,
    pub navigation: BTreeMap<ItemUid, NavigationModel>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FerryPortModel {
    pub uid: ItemUid,
    pub port_token: u64,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub is_train: bool,
    pub nodes: Vec<NodeUid>,
}

/// One crossing out of a port; grouped under its start port token.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FerryConnectionModel {
    pub end_port: u64,
    pub start_name: String,
    pub end_name: String,
    pub price: u32,
    pub time: u32,
    pub distance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoadItemModel {
    pub uid: ItemUid,
    #[serde(rename = "type")]
    pub item_type: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub start_node: NodeUid,
    pub end_node: NodeUid,
    pub nodes: Vec<NodeUid>,
    pub length: f64,
    pub hidden: bool,
    pub valid: bool,
    pub block_size: usize,
    pub flags: u32,
    pub dlc_guard: u8,
    pub is_secret: bool,
    pub navigation: BTreeMap<ItemUid, NavigationModel>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeModel {
    pub uid: NodeUid,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rx: f32,
    pub ry: f32,
    pub rz: f32,
    pub rotation: f64,
    pub forward_item: Option<ItemRefModel>,
    pub backward_item: Option<ItemRefModel>,
}

/// Every exported collection, ready to be serialised.
///
/// Templates are keyed by token, items by uid and ferry connections by start
/// port token. Nodes are a list in uid order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExportBundle {
    pub prefabs: BTreeMap<u64, PrefabTemplateModel>,
    pub prefab_items: BTreeMap<ItemUid, PrefabItemModel>,
    pub ferry_ports: BTreeMap<ItemUid, FerryPortModel>,
    pub ferry_connections: BTreeMap<u64, Vec<FerryConnectionModel>>,
    pub roads: BTreeMap<ItemUid, RoadItemModel>,
    pub nodes: Vec<NodeModel>,
}

impl ExportBundle {
    pub fn build(world: &MapWorld, navigation: &NavigationGraph) -> Self {
        let navigation_of = |uid: ItemUid| -> BTreeMap<ItemUid, NavigationModel> {
            navigation
                .entries(uid)
                .map(|(target, entry)| {
                    let items = entry
                        .items
                        .iter()
                        .chain(std::iter::once(&target))
                        .map(|&item| ItemRefModel::resolve(world, item))
                        .collect();
                    (
                        target,
                        NavigationModel {
                            distance: entry.distance,
                            items,
                        },
                    )
                })
                .collect()
        };

        let prefabs = world
            .catalog()
            .iter()
            .map(|template| {
                let model = PrefabTemplateModel {
                    token: template.token,
                    name: token_to_string(template.token),
                    file_path: template.file_path.clone(),
                    category: template.category.clone(),
                    valid_road: template.valid_road,
                    nodes: template.prefab_nodes.clone(),
                    spawn_points: template.spawn_points.clone(),
                    map_points: template.map_points.clone(),
                    trigger_points: template.trigger_points.clone(),
                    curves: template.prefab_curves.clone(),
                    lanes: template.lanes.clone(),
                    navigation_routes: template
                        .navigation_routes
                        .iter()
                        .map(|(key, route)| {
                            (
                                key.to_string(),
                                RouteModel {
                                    start_node: key.start,
                                    end_node: key.end,
                                    curve_ids: route.curve_ids.clone(),
                                    distance: route.distance,
                                },
                            )
                        })
                        .collect(),
                };
                (template.token, model)
            })
            .collect();

        let prefab_items = world
            .prefabs()
            .map(|item| {
                let model = PrefabItemModel {
                    uid: item.base.uid,
                    item_type: item.base.item_type.to_string(),
                    token: item.template,
                    x: item.base.x,
                    y: item.base.y,
                    z: item.base.z,
                    hidden: item.base.hidden,
                    valid: item.base.valid,
                    block_size: item.base.block_size,
                    flags: item.base.flags,
                    dlc_guard: item.base.dlc_guard,
                    origin: item.origin,
                    padding: item.padding,
                    ferry_uid: item.ferry_uid,
                    is_secret: item.is_secret,
                    nodes: item.base.nodes.clone(),
                    navigation: navigation_of(item.base.uid),
                };
                (item.base.uid, model)
            })
            .collect();

        let ferry_ports = world
            .ferries()
            .map(|ferry| {
                let model = FerryPortModel {
                    uid: ferry.base.uid,
                    port_token: ferry.port_token,
                    name: token_to_string(ferry.port_token),
                    x: ferry.base.x,
                    y: ferry.base.y,
                    z: ferry.base.z,
                    is_train: ferry.is_train,
                    nodes: ferry.base.nodes.clone(),
                };
                (ferry.base.uid, model)
            })
            .collect();

        let mut ferry_connections: BTreeMap<u64, Vec<FerryConnectionModel>> = BTreeMap::new();
        for connection in world.ferry_connections() {
            ferry_connections
                .entry(connection.start_port)
                .or_default()
                .push(FerryConnectionModel {
                    end_port: connection.end_port,
                    start_name: token_to_string(connection.start_port),
                    end_name: token_to_string(connection.end_port),
                    price: connection.price,
                    time: connection.time,
                    distance: connection.distance,
                });
        }

        let roads = world
            .roads()
            .map(|road| {
                let model = RoadItemModel {
                    uid: road.base.uid,
                    item_type: road.base.item_type.to_string(),
                    x: road.base.x,
                    y: road.base.y,
                    z: road.base.z,
                    start_node: road.start_node,
                    end_node: road.end_node,
                    nodes: road.base.nodes.clone(),
                    length: road.length,
                    hidden: road.base.hidden,
                    valid: road.base.valid,
                    block_size: road.base.block_size,
                    flags: road.base.flags,
                    dlc_guard: road.base.dlc_guard,
                    is_secret: road.is_secret,
                    navigation: navigation_of(road.base.uid),
                };
                (road.base.uid, model)
            })
            .collect();

        let nodes = world
            .nodes()
            .iter()
            .map(|node| NodeModel {
                uid: node.uid,
                x: node.x,
                y: node.y,
                z: node.z,
                rx: node.rx,
                ry: node.ry,
                rz: node.rz,
                rotation: node.rotation,
                forward_item: node
                    .forward_item
                    .map(|uid| ItemRefModel::resolve(world, uid)),
                backward_item: node
                    .backward_item
                    .map(|uid| ItemRefModel::resolve(world, uid)),
            })
            .collect();

        Self {
            prefabs,
            prefab_items,
            ferry_ports,
            ferry_connections,
            roads,
            nodes,
        }
    }

    /// Write each collection to its own pretty-printed JSON file in `dir`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        if !dir.is_dir() {
            return Err(Error::ExportTarget {
                path: dir.to_path_buf(),
            });
        }

        write_json(&dir.join("prefabs.json"), &self.prefabs)?;
        write_json(&dir.join("prefab_items.json"), &self.prefab_items)?;
        write_json(&dir.join("ferry_ports.json"), &self.ferry_ports)?;
        write_json(&dir.join("ferry_connections.json"), &self.ferry_connections)?;
        write_json(&dir.join("roads.json"), &self.roads)?;
        write_json(&dir.join("nodes.json"), &self.nodes)?;

        info!(
            dir = %dir.display(),
            prefabs = self.prefabs.len(),
            prefab_items = self.prefab_items.len(),
            roads = self.roads.len(),
            nodes = self.nodes.len(),
            "wrote map export"
        );
        Ok(())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}
