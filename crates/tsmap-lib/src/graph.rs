//! Item-level navigation graph.
//!
//! Built in a separate pass once every sector has been decoded and added to
//! the [`MapWorld`]. Each placed prefab turns its template's routing table
//! into world routes between its own world nodes. From each of its nodes the
//! builder follows the node links across roads until it reaches the next
//! prefab. Ferry terminals add links to prefabs at the other end of a ferry
//! connection.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::{debug, info, warn};

use crate::error::ItemIssue;
use crate::item::{Item, ItemUid, MapItem, PrefabItem};
use crate::node::NodeUid;
use crate::world::MapWorld;

/// How a navigation entry crosses from one item to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LinkKind {
    Road,
    Ferry,
}

/// Route from an item to a neighbouring prefab.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationEntry {
    /// Length of the connecting items, excluding both endpoints.
    pub distance: f64,
    /// Items driven between the two prefabs, in order.
    pub items: Vec<ItemUid>,
    /// Node the source item is left through.
    pub exit_node: NodeUid,
    /// Node the target prefab is entered through.
    pub entry_node: NodeUid,
    pub kind: LinkKind,
}

/// Template route translated to the world nodes of one prefab instance.
/// World routes can be driven in both directions.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldRoute {
    pub from: NodeUid,
    pub to: NodeUid,
    pub distance: f64,
    pub curve_ids: Vec<usize>,
}

/// An item left out of the navigation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedItem {
    pub uid: ItemUid,
    pub issues: Vec<ItemIssue>,
}

/// Summary of one navigation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationReport {
    pub navigated_prefabs: usize,
    pub navigated_roads: usize,
    pub skipped: Vec<SkippedItem>,
}

/// Reachability between neighbouring items.
#[derive(Debug, Clone, Default)]
pub struct NavigationGraph {
    navigation: BTreeMap<ItemUid, BTreeMap<ItemUid, NavigationEntry>>,
    world_routes: BTreeMap<ItemUid, Vec<WorldRoute>>,
    report: NavigationReport,
}

impl NavigationGraph {
    /// Navigation map of an item: neighbouring prefab uid to entry.
    pub fn navigation(&self, uid: ItemUid) -> Option<&BTreeMap<ItemUid, NavigationEntry>> {
        self.navigation.get(&uid)
    }

    /// Entries of an item in target uid order.
    pub fn entries(&self, uid: ItemUid) -> impl Iterator<Item = (ItemUid, &NavigationEntry)> {
        self.navigation
            .get(&uid)
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(target, entry)| (*target, entry)))
    }

    /// Whether the item took part in navigation.
    pub fn is_navigable(&self, uid: ItemUid) -> bool {
        self.world_routes.contains_key(&uid)
    }

    pub fn world_routes(&self, uid: ItemUid) -> &[WorldRoute] {
        self.world_routes
            .get(&uid)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Shortest world route of `prefab` between two of its nodes, in either
    /// direction. A prefab is never crossed back to the node it was entered
    /// through, so identical nodes yield `None`.
    pub fn route_distance(&self, prefab: ItemUid, a: NodeUid, b: NodeUid) -> Option<f64> {
        if a == b {
            return None;
        }
        self.world_routes(prefab)
            .iter()
            .filter(|route| (route.from == a && route.to == b) || (route.from == b && route.to == a))
            .map(|route| route.distance)
            .min_by(f64::total_cmp)
    }

    pub fn report(&self) -> &NavigationReport {
        &self.report
    }

    /// Items with a navigation map, in uid order.
    pub fn items(&self) -> impl Iterator<Item = ItemUid> + '_ {
        self.navigation.keys().copied()
    }

    fn offer(&mut self, source: ItemUid, target: ItemUid, entry: NavigationEntry) {
        let entries = self.navigation.entry(source).or_default();
        match entries.get(&target) {
            Some(existing) if existing.distance <= entry.distance => {}
            _ => {
                entries.insert(target, entry);
            }
        }
    }
}

/// Build the navigation graph of every valid item in `world`.
pub fn build_navigation(world: &MapWorld) -> NavigationGraph {
    let mut graph = NavigationGraph::default();

    for prefab in world.prefabs() {
        if !prefab.is_valid() {
            debug!(uid = %format_args!("{:#x}", prefab.uid()), "skipping invalid prefab");
            graph.report.skipped.push(SkippedItem {
                uid: prefab.uid(),
                issues: prefab.base.issues.clone(),
            });
            continue;
        }

        match prefab_world_routes(world, prefab) {
            Ok(routes) => {
                graph.world_routes.insert(prefab.uid(), routes);
            }
            Err(issue) => {
                warn!(
                    uid = %format_args!("{:#x}", prefab.uid()),
                    %issue,
                    "prefab excluded from navigation"
                );
                graph.report.skipped.push(SkippedItem {
                    uid: prefab.uid(),
                    issues: vec![issue],
                });
            }
        }
    }

    let navigable: BTreeSet<ItemUid> = graph.world_routes.keys().copied().collect();

    for &uid in &navigable {
        let exits: BTreeSet<NodeUid> = world
            .prefab(uid)
            .map(|prefab| prefab.node_uids().iter().copied().collect())
            .unwrap_or_default();
        for exit in exits {
            if let Some((target, entry)) = walk_to_prefab(world, &navigable, uid, exit) {
                graph.offer(uid, target, entry);
            }
        }
        link_ferries(world, &navigable, &mut graph, uid);
        graph.report.navigated_prefabs += 1;
    }

    for road in world.roads() {
        if !road.is_valid() {
            graph.report.skipped.push(SkippedItem {
                uid: road.uid(),
                issues: road.base.issues.clone(),
            });
            continue;
        }
        for end in [road.start_node, road.end_node] {
            if let Some((target, entry)) = walk_to_prefab(world, &navigable, road.uid(), end) {
                graph.offer(road.uid(), target, entry);
            }
        }
        graph.report.navigated_roads += 1;
    }

    info!(
        prefabs = graph.report.navigated_prefabs,
        roads = graph.report.navigated_roads,
        skipped = graph.report.skipped.len(),
        "built navigation graph"
    );
    graph
}

fn prefab_world_routes(world: &MapWorld, prefab: &PrefabItem) -> Result<Vec<WorldRoute>, ItemIssue> {
    let placed = world.place(prefab)?;
    let mapping = placed.map_local_nodes(world.nodes())?;

    // First world node matched to a local node wins.
    let mut local_to_world: BTreeMap<usize, NodeUid> = BTreeMap::new();
    for (world_node, local) in mapping {
        local_to_world.entry(local).or_insert(world_node);
    }

    let routes = placed
        .template
        .navigation_routes
        .iter()
        .filter_map(|(key, route)| {
            let from = *local_to_world.get(&key.start)?;
            let to = *local_to_world.get(&key.end)?;
            Some(WorldRoute {
                from,
                to,
                distance: route.distance,
                curve_ids: route.curve_ids.clone(),
            })
        })
        .collect();
    Ok(routes)
}

/// Follow node links from `exit` of `source` across roads until a navigable
/// prefab is reached.
fn walk_to_prefab(
    world: &MapWorld,
    navigable: &BTreeSet<ItemUid>,
    source: ItemUid,
    exit: NodeUid,
) -> Option<(ItemUid, NavigationEntry)> {
    let mut visited = HashSet::new();
    let mut current_item = source;
    let mut node_uid = exit;
    let mut distance = 0.0;
    let mut roads = Vec::new();

    loop {
        if !visited.insert(node_uid) {
            return None;
        }
        let node = world.nodes().get_node_by_uid(node_uid)?;
        let next = node.other_item(current_item)?;
        match world.item(next)? {
            MapItem::Road(road) => {
                if !road.is_valid() {
                    return None;
                }
                distance += road.length;
                roads.push(road.uid());
                node_uid = road.other_end(node_uid)?;
                current_item = road.uid();
            }
            MapItem::Prefab(prefab) => {
                if prefab.uid() == source || !navigable.contains(&prefab.uid()) {
                    return None;
                }
                return Some((
                    prefab.uid(),
                    NavigationEntry {
                        distance,
                        items: roads,
                        exit_node: exit,
                        entry_node: node_uid,
                        kind: LinkKind::Road,
                    },
                ));
            }
            MapItem::Ferry(_) => return None,
        }
    }
}

fn link_ferries(
    world: &MapWorld,
    navigable: &BTreeSet<ItemUid>,
    graph: &mut NavigationGraph,
    uid: ItemUid,
) {
    let Some(prefab) = world.prefab(uid) else {
        return;
    };
    if prefab.ferry_uid == 0 {
        return;
    }
    let Some(origin) = world.ferry(prefab.ferry_uid) else {
        debug!(
            uid = %format_args!("{uid:#x}"),
            ferry = %format_args!("{:#x}", prefab.ferry_uid),
            "ferry terminal not loaded"
        );
        return;
    };
    let Some(&exit_node) = origin.node_uids().first() else {
        return;
    };

    let connections = world
        .ferry_connections()
        .iter()
        .filter(|connection| connection.start_port == origin.port_token);
    for connection in connections {
        for destination in world
            .ferries()
            .filter(|ferry| ferry.port_token == connection.end_port && ferry.uid() != origin.uid())
        {
            let Some(&entry_node) = destination.node_uids().first() else {
                continue;
            };
            let targets = world.prefabs().filter(|target| {
                target.ferry_uid == destination.uid()
                    && target.uid() != uid
                    && navigable.contains(&target.uid())
            });
            for target in targets {
                graph.offer(
                    uid,
                    target.uid(),
                    NavigationEntry {
                        distance: connection.distance,
                        items: vec![origin.uid(), destination.uid()],
                        exit_node,
                        entry_node,
                        kind: LinkKind::Ferry,
                    },
                );
            }
        }
    }
}
