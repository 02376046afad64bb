// tag_arena/server/tests/performance/nav_graph_stress.rs
use metrics::histogram;
use std::time::Instant;
use tag_arena_core::core::config::SimConfig;
use tag_arena_core::core::types::RadiusClass;
use tag_arena_core::server::instance::Stage;
use tag_arena_core::systems::bots::BotManager;
use tag_arena_core::world::map_generator::MapGenerator;

#[test]
fn stress_build_graphs_for_several_classes() {
    let mut stage = Stage::new(SimConfig::default(), MapGenerator::generate_arena(21)).unwrap();
    for class in [8, 16, 24, 32, 40] {
        let start = Instant::now();
        let graph = stage.ensure_nav_graph(RadiusClass(class)).unwrap();
        let elapsed = start.elapsed();
        histogram!("navgraph_stress_build_ms").record(elapsed.as_secs_f64() * 1000.0);
        println!("class {} -> {} waypoints in {:?}", class, graph.len(), elapsed);
        assert!(!graph.is_empty());
    }
}

#[tokio::test]
async fn stress_test_full_roster_ticks() {
    let layout = MapGenerator::generate_arena(4);
    let spawns = layout.character_spawns.clone();
    let mut stage = Stage::new(SimConfig::default(), layout).unwrap();
    BotManager::new(20).initialize_bots(&mut stage, &spawns).unwrap();

    let delta_time = 1.0 / 60.0;
    for _ in 0..600 {
        let start = Instant::now();
        let report = stage.step(delta_time).unwrap();
        histogram!("stage_tick_duration_ms").record(start.elapsed().as_secs_f64() * 1000.0);
        assert_eq!(report.decision_errors, 0);
    }
}
