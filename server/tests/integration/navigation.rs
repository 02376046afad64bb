// tag_arena/server/tests/integration/navigation.rs

use tag_arena_core::core::config::SimConfig;
use tag_arena_core::core::geometry::Aabb;
use tag_arena_core::core::types::{ObstacleId, RadiusClass, Vec2};
use tag_arena_core::server::instance::Stage;
use tag_arena_core::world::map_generator::{MapGenerator, MapLayout};
use tag_arena_core::world::obstacle::{BodyRef, Obstacle};
use tag_arena_core::world::obstacle_index::ObstacleSet;

fn arena_stage(seed: u64) -> Stage {
    let mut config = SimConfig::default();
    config.seed = seed;
    Stage::new(config, MapGenerator::generate_arena(seed)).expect("arena stage")
}

#[test]
fn arena_graph_paths_are_walkable() {
    let stage = arena_stage(11);
    let graph = stage.nav_graph(RadiusClass(16)).expect("default class built at load");
    let walls = ObstacleSet::walls_only(stage.walls());
    let radius = graph.radius_class().radius();
    assert!(graph.len() > 20, "arena produced only {} waypoints", graph.len());

    let step = (graph.len() / 12).max(1);
    for i in (0..graph.len()).step_by(step) {
        for j in (0..graph.len()).step_by(step) {
            let d = graph.distance(i, j);
            assert_eq!(d, graph.distance(j, i));
            let path = graph.path(i, j);
            if !d.is_finite() {
                assert!(path.is_empty());
                continue;
            }
            assert_eq!(path.first(), Some(&graph.position(i)));
            assert_eq!(path.last(), Some(&graph.position(j)));
            for hop in path.windows(2) {
                assert!(
                    walls.corridor_clear(hop[0], hop[1], radius),
                    "hop {:?} -> {:?} crosses a wall",
                    hop[0],
                    hop[1]
                );
            }
        }
    }
}

#[test]
fn routes_between_spawns_end_at_goal() {
    let stage = arena_stage(5);
    let graph = stage.nav_graph(RadiusClass(16)).expect("graph");
    let walls = ObstacleSet::walls_only(stage.walls());
    let spawns = stage.character_spawns().to_vec();
    let (from, goal) = (spawns[0], spawns[spawns.len() / 2]);

    let route = graph.find_route(from, 16.0, goal, &walls).expect("spawns are connected");
    assert_eq!(route.last(), Some(&goal));
    let mut at = from;
    for next in &route {
        assert!(walls.corridor_clear(at, *next, 16.0));
        at = *next;
    }
}

#[test]
fn larger_classes_are_built_on_demand_with_more_clearance() {
    let mut stage = arena_stage(2);
    assert!(stage.nav_graph(RadiusClass(30)).is_none());
    let graph = stage.ensure_nav_graph(RadiusClass(30)).expect("graph");
    assert_eq!(graph.radius_class(), RadiusClass(30));
    let positions: Vec<Vec2> = graph.waypoints().iter().map(|w| w.position).collect();
    for p in positions {
        assert!(stage.walls().all().iter().all(|w| w.distance_to(p) >= 30.0));
    }
}

#[test]
fn sealed_pocket_is_unreachable() {
    let bounds = Aabb::new(Vec2::new(-400.0, -300.0), Vec2::new(400.0, 300.0));
    let mut layout = MapLayout::open(bounds);
    let wall = |id: u32, x: f64, y: f64, w: f64, h: f64| Obstacle::rect(BodyRef::Wall(ObstacleId(id)), x, y, w, h);
    layout.walls.extend([
        wall(100, 200.0, -25.0, 50.0, 10.0),
        wall(101, 200.0, 15.0, 50.0, 10.0),
        wall(102, 200.0, -25.0, 10.0, 50.0),
        wall(103, 240.0, -25.0, 10.0, 50.0),
    ]);
    let stage = Stage::new(SimConfig::default(), layout).expect("stage");
    let graph = stage.nav_graph(RadiusClass(16)).expect("graph");
    let walls = ObstacleSet::walls_only(stage.walls());

    assert!(graph.find_route(Vec2::new(-200.0, 0.0), 16.0, Vec2::new(225.0, 0.0), &walls).is_none());
    assert!(graph.find_route(Vec2::new(-200.0, 0.0), 16.0, Vec2::new(100.0, 150.0), &walls).is_some());
}
