//! Common test utilities and fixture helpers.
//!
//! This module writes binary prefab records for every format epoch and builds
//! small worlds of prefabs joined by roads.

#![allow(dead_code)]

use tsmap_lib::template::{LocalPoint, PrefabCurve, PrefabNode, SpawnPoint, SpawnPointKind};
use tsmap_lib::{
    string_to_token, FerryConnection, FerryItem, MapWorld, Node, PrefabItem, PrefabTemplate,
    RoadItem, TemplateCatalog,
};

/// Filler written into every skipped block so a misaligned read shows up.
const FILL: u8 = 0xAB;

/// Field values of a prefab record to encode.
#[derive(Debug, Clone)]
pub struct PrefabRecord {
    pub uid: u64,
    pub token: u64,
    pub position: [f32; 3],
    pub flags: u32,
    pub nodes: Vec<u64>,
    pub connected: Vec<u64>,
    pub origin: u8,
    pub padding: u8,
    pub parts: usize,
    pub vegetation: usize,
    pub spheres: usize,
    pub ferry_uid: u64,
    pub tail: i32,
}

impl Default for PrefabRecord {
    fn default() -> Self {
        Self {
            uid: 0x1000,
            token: 0,
            position: [10.0, 2.0, -30.0],
            flags: 0,
            nodes: vec![0x10, 0x11],
            connected: Vec::new(),
            origin: 0,
            padding: 0,
            parts: 0,
            vegetation: 0,
            spheres: 0,
            ferry_uid: 0,
            tail: 0,
        }
    }
}

struct Writer(Vec<u8>);

impl Writer {
    fn u8(&mut self, value: u8) {
        self.0.push(value);
    }

    fn u32(&mut self, value: u32) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }

    fn i32(&mut self, value: i32) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }

    fn u64(&mut self, value: u64) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }

    fn f32(&mut self, value: f32) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }

    fn fill(&mut self, len: usize) {
        self.0.extend(std::iter::repeat(FILL).take(len));
    }

    fn count(&mut self, value: usize) {
        self.i32(i32::try_from(value).expect("count fits in i32"));
    }

    fn uids(&mut self, uids: &[u64]) {
        for &uid in uids {
            self.u64(uid);
        }
    }
}

/// Encode a prefab record in the layout used by `version`.
pub fn encode_prefab(record: &PrefabRecord, version: u32) -> Vec<u8> {
    let mut w = Writer(Vec::new());
    w.u32(0x04);
    w.u64(record.uid);
    for axis in record.position {
        w.f32(axis);
    }
    w.fill(0x34 - 0x18);
    w.u32(record.flags);
    w.u8(FILL);
    w.u64(record.token);

    let n = record.nodes.len();
    match version {
        825..=828 => {
            w.fill(0x10);
            w.count(n);
            w.uids(&record.nodes);
            w.count(record.connected.len());
            w.uids(&record.connected);
            w.u8(record.origin);
            w.u8(record.padding);
            w.fill(0x38 * n);
            w.count(record.vegetation);
            w.fill(0x20 * record.vegetation);
            w.fill(0x04);
            w.count(record.spheres);
            w.fill(0x10 * record.spheres);
        }
        829..=853 => {
            w.fill(0x10);
            w.count(record.parts);
            w.fill(0x08 * record.parts);
            w.u8(u8::try_from(n).expect("node count fits in u8"));
            w.fill(3);
            w.uids(&record.nodes);
            w.count(record.connected.len());
            w.uids(&record.connected);
            w.fill(0x08);
            w.u8(record.origin);
            w.u8(record.padding);
            let look = if version >= 846 { 0x3A } else { 0x38 };
            w.fill(look * n);
            w.count(record.vegetation);
            w.fill(0x20 * record.vegetation);
            w.fill(0x04);
            w.count(record.spheres);
            w.fill(0x14 * record.spheres);
            if version >= 831 {
                w.fill(0x18 * n);
            }
        }
        854 => {
            w.fill(0x08);
            w.count(record.parts);
            w.fill(0x08 * record.parts);
            w.count(n);
            w.uids(&record.nodes);
            w.count(record.connected.len());
            w.uids(&record.connected);
            w.fill(0x08);
            w.u8(record.origin);
            w.u8(record.padding);
            w.fill(0x0C * n);
        }
        _ => {
            w.fill(0x08);
            w.count(record.parts);
            w.fill(0x08 * record.parts);
            w.count(n);
            w.uids(&record.nodes);
            w.count(record.connected.len());
            w.uids(&record.connected);
            w.u64(record.ferry_uid);
            w.u8(record.origin);
            w.u8(record.padding);
            w.fill(0x0C * n);
            w.i32(record.tail);
            w.fill(0x04);
        }
    }
    w.0
}

/// Token of the two-way test template.
pub fn road_token() -> u64 {
    string_to_token("road_two").expect("valid token")
}

/// Token of the two-way template that carries a fuel spawn point.
pub fn fuel_token() -> u64 {
    string_to_token("gas_two").expect("valid token")
}

/// Template with node 0 at the local origin and node 1 twenty units along z,
/// joined by one straight curve in each direction.
///
/// Node 0's heading points away from node 1, so an anchor with rotation 0
/// places the template without rotating it.
pub fn two_way_template(token: u64) -> PrefabTemplate {
    let a = LocalPoint::new(0.0, 0.0);
    let b = LocalPoint::new(0.0, 20.0);
    PrefabTemplate::new(
        token,
        vec![
            PrefabNode::new(0, 0.0, 0.0)
                .with_rotation(0.0, -1.0)
                .with_inputs([0])
                .with_outputs([1]),
            PrefabNode::new(1, 0.0, 20.0)
                .with_rotation(0.0, 1.0)
                .with_inputs([1])
                .with_outputs([0]),
        ],
        vec![PrefabCurve::straight(0, a, b), PrefabCurve::straight(1, b, a)],
    )
}

pub fn test_catalog() -> TemplateCatalog {
    let mut fuel = two_way_template(fuel_token());
    fuel.spawn_points.push(SpawnPoint {
        x: 3.0,
        y: 0.0,
        z: 10.0,
        kind: SpawnPointKind::GasPos,
    });
    TemplateCatalog::from_templates([two_way_template(road_token()), fuel])
        .expect("test templates are valid")
}

pub const PREFAB_A: u64 = 100;
pub const PREFAB_B: u64 = 101;
pub const PREFAB_C: u64 = 102;
pub const PREFAB_INVALID: u64 = 103;
pub const PREFAB_FERRY_TARGET: u64 = 104;
pub const ROAD_AB: u64 = 200;
pub const ROAD_BC: u64 = 201;
pub const FERRY_ORIGIN: u64 = 300;
pub const FERRY_DESTINATION: u64 = 301;

/// Prefab placed on two nodes along the z axis.
pub fn place(world: &mut MapWorld, uid: u64, token: u64, nodes: [u64; 2], z: f32) {
    world.insert_node(Node::new(nodes[0], 0.0, 0.0, z, 0.0));
    world.insert_node(Node::new(nodes[1], 0.0, 0.0, z + 20.0, 0.0));
    world.add_prefab(PrefabItem::new(uid, token, 0, nodes.to_vec()));
}

/// A line of three prefabs joined by two roads:
///
/// `A [1..2] --30-- [3..4] B --10-- [5..6] C`
///
/// C carries a fuel station and an invalid prefab hangs off its far node.
/// Two ferry ports joined by a crossing of length 500 are loaded too, with a
/// fourth prefab at the far port; `line_world_with_ferry` makes C the
/// terminal of the near port.
pub fn line_world() -> MapWorld {
    let mut world = MapWorld::new(test_catalog());
    place(&mut world, PREFAB_A, road_token(), [1, 2], 0.0);
    place(&mut world, PREFAB_B, road_token(), [3, 4], 50.0);
    place(&mut world, PREFAB_C, fuel_token(), [5, 6], 80.0);

    world.add_road(RoadItem::new(ROAD_AB, 2, 3, 30.0));
    world.add_road(RoadItem::new(ROAD_BC, 4, 5, 10.0));

    let mut invalid = PrefabItem::new(PREFAB_INVALID, 0xDEAD, 0, vec![6]);
    invalid.base.valid = false;
    world.add_prefab(invalid);

    let port_a = string_to_token("port_a").expect("valid token");
    let port_b = string_to_token("port_b").expect("valid token");
    world.insert_node(Node::new(7, 5.0, 0.0, 90.0, 0.0));
    world.insert_node(Node::new(8, 5000.0, 0.0, 0.0, 0.0));
    world.add_ferry(FerryItem::new(FERRY_ORIGIN, port_a, vec![7]));
    world.add_ferry(FerryItem::new(FERRY_DESTINATION, port_b, vec![8]));
    world.add_ferry_connection(FerryConnection {
        start_port: port_a,
        end_port: port_b,
        price: 100,
        time: 60,
        distance: 500.0,
    });

    world.insert_node(Node::new(9, 5000.0, 0.0, 10.0, 0.0));
    world.insert_node(Node::new(10, 5000.0, 0.0, 30.0, 0.0));
    let mut target = PrefabItem::new(PREFAB_FERRY_TARGET, road_token(), 0, vec![9, 10]);
    target.ferry_uid = FERRY_DESTINATION;
    world.add_prefab(target);

    world
}

/// Mark prefab C as the terminal of the origin ferry.
pub fn line_world_with_ferry() -> MapWorld {
    let mut world = line_world();
    let mut c = world.prefab(PREFAB_C).expect("prefab C").clone();
    c.ferry_uid = FERRY_ORIGIN;
    world.add_prefab(c);
    world
}
