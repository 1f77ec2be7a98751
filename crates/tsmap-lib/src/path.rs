use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::graph::{LinkKind, NavigationGraph};
use crate::item::ItemUid;
use crate::node::NodeUid;
use crate::overlay::{PoiKind, PointOfInterest};
use crate::world::MapWorld;

/// Constraints applied during reachability searches.
#[derive(Debug, Clone)]
pub struct ReachConstraints {
    /// Items farther than this are not reported or expanded.
    pub max_distance: Option<f64>,
    /// Keep only the closest results.
    pub max_results: Option<usize>,
    /// Follow ferry links when `true`.
    pub allow_ferries: bool,
}

impl Default for ReachConstraints {
    fn default() -> Self {
        Self {
            max_distance: None,
            max_results: None,
            allow_ferries: true,
        }
    }
}

impl ReachConstraints {
    fn within(&self, distance: f64) -> bool {
        self.max_distance.map_or(true, |limit| distance <= limit)
    }

    fn truncate<T>(&self, results: &mut Vec<T>) {
        if let Some(limit) = self.max_results {
            results.truncate(limit);
        }
    }
}

/// A prefab reachable from the search start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reachable {
    pub uid: ItemUid,
    pub distance: f64,
    /// Items traversed from the start, both ends included.
    pub path: Vec<ItemUid>,
}

/// A point of interest reachable from the search start.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReachablePoi {
    pub point: PointOfInterest,
    pub distance: f64,
    pub path: Vec<ItemUid>,
}

/// Search state: a prefab and the node it was entered through. The start
/// prefab has no entry node and may be left through any of its nodes.
type State = (ItemUid, Option<NodeUid>);

/// Every prefab reachable from `start`, nearest first.
///
/// Crossing a prefab costs its world route distance between the entry and the
/// exit node; moving on to the next prefab costs the navigation entry's
/// distance. The start item is reported at distance zero. An invalid or
/// unplaceable start has no reachable items.
pub fn find_reachable(
    world: &MapWorld,
    navigation: &NavigationGraph,
    start: ItemUid,
    constraints: &ReachConstraints,
) -> Result<Vec<Reachable>> {
    if world.item(start).is_none() {
        return Err(Error::UnknownItem { uid: start });
    }
    if !navigation.is_navigable(start) {
        return Ok(Vec::new());
    }

    let start_state: State = (start, None);
    let mut distances: HashMap<State, f64> = HashMap::new();
    let mut parents: HashMap<State, (State, Vec<ItemUid>)> = HashMap::new();
    let mut settled: HashMap<ItemUid, (f64, State)> = HashMap::new();
    let mut queue = BinaryHeap::new();

    distances.insert(start_state, 0.0);
    queue.push(QueueEntry::new(start_state, 0.0));

    while let Some(entry) = queue.pop() {
        let state = entry.state;
        let cost = entry.cost.0;
        if distances.get(&state).is_some_and(|best| *best < cost) {
            continue;
        }
        settled.entry(state.0).or_insert((cost, state));

        for (target, link) in navigation.entries(state.0) {
            if link.kind == LinkKind::Ferry && !constraints.allow_ferries {
                continue;
            }
            let crossing = match (state.1, link.kind) {
                (None, _) | (_, LinkKind::Ferry) => 0.0,
                (Some(entered), LinkKind::Road) => {
                    match navigation.route_distance(state.0, entered, link.exit_node) {
                        Some(distance) => distance,
                        None => continue,
                    }
                }
            };
            // Ferries drop the traveller in the port, not at a prefab node.
            let next: State = match link.kind {
                LinkKind::Road => (target, Some(link.entry_node)),
                LinkKind::Ferry => (target, None),
            };
            let next_cost = cost + crossing + link.distance;
            if !constraints.within(next_cost) {
                continue;
            }
            if next_cost < *distances.get(&next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                parents.insert(next, (state, link.items.clone()));
                queue.push(QueueEntry::new(next, next_cost));
            }
        }
    }

    let mut results: Vec<Reachable> = settled
        .into_iter()
        .map(|(uid, (distance, state))| Reachable {
            uid,
            distance,
            path: reconstruct_path(&parents, start_state, state),
        })
        .collect();
    results.sort_by(|a, b| a.distance.total_cmp(&b.distance).then_with(|| a.uid.cmp(&b.uid)));
    constraints.truncate(&mut results);
    Ok(results)
}

/// Points of interest of one kind reachable from `start`, nearest first.
///
/// A point's distance is the distance of the prefab that carries it.
pub fn find_points_of_interest(
    world: &MapWorld,
    navigation: &NavigationGraph,
    start: ItemUid,
    kind: PoiKind,
    constraints: &ReachConstraints,
) -> Result<Vec<ReachablePoi>> {
    let search = ReachConstraints {
        max_results: None,
        ..constraints.clone()
    };
    let mut found: Vec<ReachablePoi> = find_reachable(world, navigation, start, &search)?
        .into_iter()
        .flat_map(|reachable| {
            world
                .points_of_interest_for(reachable.uid)
                .into_iter()
                .filter(|point| point.kind == kind)
                .map(move |point| ReachablePoi {
                    point,
                    distance: reachable.distance,
                    path: reachable.path.clone(),
                })
                .collect::<Vec<_>>()
        })
        .collect();
    found.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.point.item_uid.cmp(&b.point.item_uid))
    });
    constraints.truncate(&mut found);
    Ok(found)
}

fn reconstruct_path(
    parents: &HashMap<State, (State, Vec<ItemUid>)>,
    start: State,
    goal: State,
) -> Vec<ItemUid> {
    let mut reversed = vec![goal.0];
    let mut current = goal;
    while current != start {
        let Some((parent, via)) = parents.get(&current) else {
            break;
        };
        reversed.extend(via.iter().rev());
        reversed.push(parent.0);
        current = *parent;
    }
    reversed.reverse();
    reversed
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct FloatOrd(pub(crate) f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct QueueEntry {
    state: State,
    cost: FloatOrd,
}

impl QueueEntry {
    fn new(state: State, cost: f64) -> Self {
        Self {
            state,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.state.cmp(&self.state))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
