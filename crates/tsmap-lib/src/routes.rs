//! Template-local routing tables.
//!
//! Every template gets a table of node-to-node routes, built once when the
//! template enters the catalog and shared by all of its placed instances. Each
//! route lists the curves driven in order and the total arc length, where the
//! length of a curve is measured on a sampled cubic Hermite spline.

use std::collections::{BTreeMap, BinaryHeap, HashMap};
use std::fmt;

use crate::path::FloatOrd;
use crate::template::{PrefabCurve, PrefabNode, PrefabTemplate};

/// Curve samples per unit of chord length.
pub const PREFAB_QUALITY: f64 = 0.5;

/// Minimum number of samples per curve; two points make a line.
pub const MIN_QUALITY: usize = 2;

/// Evaluate one axis of a cubic Hermite spline at `s` in `[0, 1]`.
pub fn hermite(s: f64, p0: f64, p1: f64, t0: f64, t1: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    let h1 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h2 = -2.0 * s3 + 3.0 * s2;
    let h3 = s3 - 2.0 * s2 + s;
    let h4 = s3 - s2;
    h1 * p0 + h2 * p1 + h3 * t0 + h4 * t1
}

/// Straight-line distance between the curve's endpoints in the x/z plane.
pub fn chord_length(curve: &PrefabCurve) -> f64 {
    let dx = f64::from(curve.end.x) - f64::from(curve.start.x);
    let dz = f64::from(curve.end.z) - f64::from(curve.start.z);
    dx.hypot(dz)
}

/// Upper bound on samples per curve; never reached by catalog templates.
pub const MAX_QUALITY: usize = 1 << 18;

/// Number of samples taken along `curve`.
pub fn sample_count(curve: &PrefabCurve) -> usize {
    ((chord_length(curve) * PREFAB_QUALITY).ceil() as usize).clamp(MIN_QUALITY, MAX_QUALITY)
}

/// Point on the curve at parameter `s`, in template-local x/z.
pub fn curve_point(curve: &PrefabCurve, s: f64) -> (f64, f64) {
    let chord = chord_length(curve);
    let x = hermite(
        s,
        f64::from(curve.start.x),
        f64::from(curve.end.x),
        f64::from(curve.start_tangent.x) * chord,
        f64::from(curve.end_tangent.x) * chord,
    );
    let z = hermite(
        s,
        f64::from(curve.start.z),
        f64::from(curve.end.z),
        f64::from(curve.start_tangent.z) * chord,
        f64::from(curve.end_tangent.z) * chord,
    );
    (x, z)
}

/// Sample the curve at evenly spaced parameters, endpoints included.
pub fn sample_curve(curve: &PrefabCurve) -> Vec<(f64, f64)> {
    let count = sample_count(curve);
    let last = (count - 1) as f64;
    (0..count)
        .map(|i| curve_point(curve, i as f64 / last))
        .collect()
}

/// Arc length of the curve, approximated by the sampled polyline.
pub fn curve_arc_length(curve: &PrefabCurve) -> f64 {
    sample_curve(curve)
        .windows(2)
        .map(|pair| (pair[1].0 - pair[0].0).hypot(pair[1].1 - pair[0].1))
        .sum()
}

/// Ordered pair of local node ids; the order is the direction the route was
/// discovered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    pub start: usize,
    pub end: usize,
}

impl RouteKey {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    fn reversed(self) -> Self {
        Self {
            start: self.end,
            end: self.start,
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

/// Curves driven between two nodes and their total length.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefabRoute {
    pub curve_ids: Vec<usize>,
    pub distance: f64,
}

/// Routes of one template, at most one per unordered node pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteTable {
    routes: BTreeMap<RouteKey, PrefabRoute>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Route between two nodes regardless of the stored direction.
    pub fn get(&self, a: usize, b: usize) -> Option<(&RouteKey, &PrefabRoute)> {
        self.routes
            .get_key_value(&RouteKey::new(a, b))
            .or_else(|| self.routes.get_key_value(&RouteKey::new(b, a)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RouteKey, &PrefabRoute)> {
        self.routes.iter()
    }

    /// Keep `route` unless the pair already has a route that is no longer.
    fn offer(&mut self, key: RouteKey, route: PrefabRoute) {
        if route.distance <= 0.0 || route.curve_ids.is_empty() {
            return;
        }
        let reverse = key.reversed();
        match self.routes.get(&reverse) {
            Some(existing) if existing.distance <= route.distance => {}
            Some(_) => {
                self.routes.remove(&reverse);
                self.routes.insert(key, route);
            }
            None => {
                self.routes.entry(key).or_insert(route);
            }
        }
    }
}

/// Build the routing table of a template.
///
/// Nodes are vertices and curves are directed edges. From every node with
/// input curves, Dijkstra over the curve chain finds the shortest path to
/// every node that some reachable curve ends at.
pub fn build_route_table(template: &PrefabTemplate) -> RouteTable {
    let lengths: Vec<f64> = template.prefab_curves.iter().map(curve_arc_length).collect();

    let mut ends: HashMap<usize, Vec<usize>> = HashMap::new();
    for node in &template.prefab_nodes {
        for &curve in &node.output_points {
            ends.entry(curve).or_default().push(node.id);
        }
    }

    let mut table = RouteTable::default();
    for start in &template.prefab_nodes {
        if start.input_points.is_empty() {
            continue;
        }
        for (end, route) in shortest_routes_from(template, start, &lengths, &ends) {
            table.offer(RouteKey::new(start.id, end), route);
        }
    }
    table
}

fn shortest_routes_from(
    template: &PrefabTemplate,
    start: &PrefabNode,
    lengths: &[f64],
    ends: &HashMap<usize, Vec<usize>>,
) -> BTreeMap<usize, PrefabRoute> {
    let mut distances: HashMap<usize, f64> = HashMap::new();
    let mut parents: HashMap<usize, Option<usize>> = HashMap::new();
    let mut queue = BinaryHeap::new();
    let mut found = BTreeMap::new();

    for &curve in &start.input_points {
        let Some(&cost) = lengths.get(curve) else {
            continue;
        };
        if cost < *distances.get(&curve).unwrap_or(&f64::INFINITY) {
            distances.insert(curve, cost);
            parents.insert(curve, None);
            queue.push(CurveEntry::new(curve, cost));
        }
    }

    while let Some(entry) = queue.pop() {
        let cost = entry.cost.0;
        if distances.get(&entry.curve).is_some_and(|best| *best < cost) {
            continue;
        }

        for &end in ends.get(&entry.curve).into_iter().flatten() {
            if end != start.id && !found.contains_key(&end) {
                found.insert(
                    end,
                    PrefabRoute {
                        curve_ids: reconstruct_curves(&parents, entry.curve),
                        distance: cost,
                    },
                );
            }
        }

        let Some(curve) = template.curve(entry.curve) else {
            continue;
        };
        for &next in &curve.next_curves {
            let Some(&length) = lengths.get(next) else {
                continue;
            };
            let next_cost = cost + length;
            if next_cost < *distances.get(&next).unwrap_or(&f64::INFINITY) {
                distances.insert(next, next_cost);
                parents.insert(next, Some(entry.curve));
                queue.push(CurveEntry::new(next, next_cost));
            }
        }
    }

    found
}

fn reconstruct_curves(parents: &HashMap<usize, Option<usize>>, last: usize) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = Some(last);
    while let Some(curve) = current {
        path.push(curve);
        current = parents.get(&curve).copied().flatten();
    }
    path.reverse();
    path
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct CurveEntry {
    curve: usize,
    cost: FloatOrd,
}

impl CurveEntry {
    fn new(curve: usize, cost: f64) -> Self {
        Self {
            curve,
            cost: FloatOrd(cost),
        }
    }
}

impl Ord for CurveEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Reverse ordering so BinaryHeap becomes a min-heap by cost.
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.curve.cmp(&self.curve))
    }
}

impl PartialOrd for CurveEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{LocalPoint, PrefabCurve, PrefabNode, Tangent};

    /// Numerical reference: Simpson integration of |P'(s)| in closed form.
    fn reference_length(curve: &PrefabCurve) -> f64 {
        let chord = chord_length(curve);
        let (p0x, p1x) = (f64::from(curve.start.x), f64::from(curve.end.x));
        let (p0z, p1z) = (f64::from(curve.start.z), f64::from(curve.end.z));
        let (t0x, t1x) = (
            f64::from(curve.start_tangent.x) * chord,
            f64::from(curve.end_tangent.x) * chord,
        );
        let (t0z, t1z) = (
            f64::from(curve.start_tangent.z) * chord,
            f64::from(curve.end_tangent.z) * chord,
        );
        let derivative = |s: f64, p0: f64, p1: f64, t0: f64, t1: f64| {
            (6.0 * s * s - 6.0 * s) * p0
                + (-6.0 * s * s + 6.0 * s) * p1
                + (3.0 * s * s - 4.0 * s + 1.0) * t0
                + (3.0 * s * s - 2.0 * s) * t1
        };
        let speed = |s: f64| {
            derivative(s, p0x, p1x, t0x, t1x).hypot(derivative(s, p0z, p1z, t0z, t1z))
        };

        let steps = 20_000;
        let h = 1.0 / steps as f64;
        let mut sum = speed(0.0) + speed(1.0);
        for i in 1..steps {
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * speed(i as f64 * h);
        }
        sum * h / 3.0
    }

    fn quarter_turn() -> PrefabCurve {
        PrefabCurve::straight(0, LocalPoint::new(0.0, 0.0), LocalPoint::new(50.0, 50.0))
            .with_tangents(Tangent::new(1.0, 0.0), Tangent::new(0.0, 1.0))
    }

    #[test]
    fn hermite_hits_endpoints() {
        assert_eq!(hermite(0.0, 3.0, 9.0, 1.0, -1.0), 3.0);
        assert_eq!(hermite(1.0, 3.0, 9.0, 1.0, -1.0), 9.0);
    }

    #[test]
    fn straight_curve_length_is_exact() {
        let curve =
            PrefabCurve::straight(0, LocalPoint::new(2.0, 3.0), LocalPoint::new(14.0, 8.0));
        assert!((curve_arc_length(&curve) - 13.0).abs() < 1e-9);
    }

    #[test]
    fn curved_length_is_within_one_percent_of_reference() {
        let curve = quarter_turn();
        let sampled = curve_arc_length(&curve);
        let reference = reference_length(&curve);
        assert!(
            ((sampled - reference) / reference).abs() < 0.01,
            "sampled {sampled} vs reference {reference}"
        );
    }

    #[test]
    fn short_curves_use_minimum_quality() {
        let curve = PrefabCurve::straight(0, LocalPoint::new(0.0, 0.0), LocalPoint::new(1.0, 0.0));
        assert_eq!(sample_count(&curve), MIN_QUALITY);
        assert_eq!(sample_count(&quarter_turn()), 36);
    }

    #[test]
    fn huge_curves_are_capped() {
        let far = PrefabCurve::straight(0, LocalPoint::new(0.0, 0.0), LocalPoint::new(3e38, 0.0));
        assert_eq!(sample_count(&far), MAX_QUALITY);
        let nan =
            PrefabCurve::straight(0, LocalPoint::new(0.0, 0.0), LocalPoint::new(f32::NAN, 0.0));
        assert_eq!(sample_count(&nan), MIN_QUALITY);
    }

    #[test]
    fn chained_curves_sum_and_keep_order() {
        // 0 --c0--> (mid) --c1--> 1, plus a direct but longer detour c2 -> c3.
        let template = PrefabTemplate::new(
            1,
            vec![
                PrefabNode::new(0, 0.0, 0.0).with_inputs([0, 2]),
                PrefabNode::new(1, 20.0, 0.0).with_outputs([1, 3]),
            ],
            vec![
                PrefabCurve::straight(0, LocalPoint::new(0.0, 0.0), LocalPoint::new(10.0, 0.0))
                    .with_next([1]),
                PrefabCurve::straight(1, LocalPoint::new(10.0, 0.0), LocalPoint::new(20.0, 0.0)),
                PrefabCurve::straight(2, LocalPoint::new(0.0, 0.0), LocalPoint::new(10.0, 10.0))
                    .with_next([3]),
                PrefabCurve::straight(3, LocalPoint::new(10.0, 10.0), LocalPoint::new(20.0, 0.0)),
            ],
        );

        let table = build_route_table(&template);
        assert_eq!(table.len(), 1);
        let (key, route) = table.get(1, 0).expect("route in either order");
        assert_eq!(*key, RouteKey::new(0, 1));
        assert_eq!(route.curve_ids, vec![0, 1]);
        assert!((route.distance - 20.0).abs() < 1e-9);
    }

    #[test]
    fn unordered_pair_keeps_shorter_direction() {
        let template = PrefabTemplate::new(
            2,
            vec![
                PrefabNode::new(0, 0.0, 0.0).with_inputs([0]).with_outputs([1]),
                PrefabNode::new(1, 10.0, 0.0).with_inputs([1]).with_outputs([0]),
            ],
            vec![
                // Forward lane bulges out, so it is longer than the return lane.
                PrefabCurve::straight(0, LocalPoint::new(0.0, 0.0), LocalPoint::new(10.0, 0.0))
                    .with_tangents(Tangent::new(0.0, 1.0), Tangent::new(0.0, -1.0)),
                PrefabCurve::straight(1, LocalPoint::new(10.0, 0.0), LocalPoint::new(0.0, 0.0)),
            ],
        );

        let table = build_route_table(&template);
        assert_eq!(table.len(), 1);
        let (key, route) = table.get(0, 1).unwrap();
        assert_eq!(*key, RouteKey::new(1, 0));
        assert_eq!(route.curve_ids, vec![1]);
        assert_eq!(key.to_string(), "1/0");
    }

    #[test]
    fn unconnected_nodes_have_no_entry() {
        let template = PrefabTemplate::new(
            3,
            vec![
                PrefabNode::new(0, 0.0, 0.0).with_inputs([0]),
                PrefabNode::new(1, 10.0, 0.0).with_outputs([0]),
                PrefabNode::new(2, 0.0, 30.0),
            ],
            vec![PrefabCurve::straight(
                0,
                LocalPoint::new(0.0, 0.0),
                LocalPoint::new(10.0, 0.0),
            )],
        );

        let table = build_route_table(&template);
        assert!(table.get(0, 2).is_none());
        assert!(table.get(1, 2).is_none());
        for (_, route) in table.iter() {
            assert!(route.distance > 0.0);
            assert!(!route.curve_ids.is_empty());
        }
    }
}
