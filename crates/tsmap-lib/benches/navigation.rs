use criterion::{criterion_group, criterion_main, Criterion};
use once_cell::sync::Lazy;
use std::hint::black_box;
use tsmap_lib::template::{LocalPoint, PrefabCurve, PrefabNode};
use tsmap_lib::{
    build_navigation, build_route_table, find_reachable, MapWorld, Node, PrefabItem,
    PrefabTemplate, ReachConstraints, RoadItem, TemplateCatalog,
};

const TOKEN: u64 = 0x42;
const PREFABS: u64 = 2_000;
const SPACING: f32 = 60.0;

fn crossing_template() -> PrefabTemplate {
    let a = LocalPoint::new(0.0, 0.0);
    let b = LocalPoint::new(0.0, 20.0);
    PrefabTemplate::new(
        TOKEN,
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

/// A long chain of prefabs, each joined to the next by one road.
fn chain_world() -> MapWorld {
    let catalog =
        TemplateCatalog::from_templates([crossing_template()]).expect("template is valid");
    let mut world = MapWorld::new(catalog);
    for i in 0..PREFABS {
        let z = i as f32 * SPACING;
        let (near, far) = (2 * i + 1, 2 * i + 2);
        world.insert_node(Node::new(near, 0.0, 0.0, z, 0.0));
        world.insert_node(Node::new(far, 0.0, 0.0, z + 20.0, 0.0));
        world.add_prefab(PrefabItem::new(10_000 + i, TOKEN, 0, vec![near, far]));
        if i > 0 {
            world.add_road(RoadItem::new(50_000 + i, near - 1, near, 40.0));
        }
    }
    world
}

static TEMPLATE: Lazy<PrefabTemplate> = Lazy::new(crossing_template);

fn benchmark_navigation(c: &mut Criterion) {
    c.bench_function("route_table_two_way", |b| {
        let template = &*TEMPLATE;
        b.iter(|| black_box(build_route_table(template).len()));
    });

    // MapWorld is not Sync and cannot live in a static.
    let world = &chain_world();
    c.bench_function("build_navigation_chain", |b| {
        b.iter(|| black_box(build_navigation(world).report().navigated_prefabs));
    });

    let navigation = &build_navigation(world);
    c.bench_function("reachable_from_chain_start", |b| {
        let constraints = ReachConstraints::default();
        b.iter(|| {
            let found =
                find_reachable(world, navigation, 10_000, &constraints).expect("start exists");
            black_box(found.len())
        });
    });

    c.bench_function("reachable_within_radius", |b| {
        let constraints = ReachConstraints {
            max_distance: Some(5_000.0),
            ..ReachConstraints::default()
        };
        b.iter(|| {
            let found =
                find_reachable(world, navigation, 11_000, &constraints).expect("start exists");
            black_box(found.len())
        });
    });
}

criterion_group!(benches, benchmark_navigation);
criterion_main!(benches);
