// tag_arena/server/tests/integration/bot_behavior.rs

use tag_arena_core::core::config::SimConfig;
use tag_arena_core::core::geometry::Aabb;
use tag_arena_core::core::types::{ObstacleId, PathLabel, Vec2};
use tag_arena_core::entities::agent::AgentSpec;
use tag_arena_core::server::instance::Stage;
use tag_arena_core::world::map_generator::{MapGenerator, MapLayout};
use tag_arena_core::world::obstacle::{BodyRef, Obstacle};

const DT: f64 = 1.0 / 60.0;

fn bounds() -> Aabb {
    Aabb::new(Vec2::new(-500.0, -400.0), Vec2::new(500.0, 400.0))
}

fn open_stage() -> Stage {
    Stage::new(SimConfig::default(), MapLayout::open(bounds())).expect("stage")
}

#[test]
fn it_bot_pursues_visible_player() {
    let mut stage = open_stage();
    let bot = stage.add_agent(AgentSpec::bot(Vec2::new(-100.0, 0.0)).it()).unwrap();
    let player = stage.add_agent(AgentSpec::player(Vec2::new(100.0, 0.0))).unwrap();

    let report = stage.step(DT).unwrap();
    assert_eq!(report.decision_errors, 0);

    let state = stage.bot_state(bot).unwrap();
    assert_eq!(state.label, PathLabel::Pursue);
    let target = stage.agent_position(player).unwrap();
    assert_eq!(state.path.iter().copied().collect::<Vec<_>>(), vec![target]);

    // Force from the decision lands on the next physics step.
    stage.step(DT).unwrap();
    assert!(stage.agent_position(bot).unwrap().x > -100.0);
}

#[test]
fn hunted_bot_flees_away_from_it() {
    let mut stage = open_stage();
    stage.add_agent(AgentSpec::player(Vec2::new(150.0, 0.0)).it()).unwrap();
    let bot = stage.add_agent(AgentSpec::bot(Vec2::ZERO)).unwrap();

    stage.step(DT).unwrap();
    let state = stage.bot_state(bot).unwrap();
    assert_eq!(state.label, PathLabel::Flee);
    assert!(state.path.front().map_or(false, |p| p.x < 0.0));
}

#[test]
fn unreachable_goal_goes_lost_then_recovers() {
    let mut layout = MapLayout::open(bounds());
    let wall = |id: u32, x: f64, y: f64, w: f64, h: f64| Obstacle::rect(BodyRef::Wall(ObstacleId(id)), x, y, w, h);
    layout.walls.extend([
        wall(100, 200.0, -25.0, 50.0, 10.0),
        wall(101, 200.0, 15.0, 50.0, 10.0),
        wall(102, 200.0, -25.0, 10.0, 50.0),
        wall(103, 240.0, -25.0, 10.0, 50.0),
    ]);
    let mut config = SimConfig::default();
    config.debug.show_lost = true;
    let mut stage = Stage::new(config, layout).expect("stage");
    let bot = stage.add_agent(AgentSpec::bot(Vec2::new(-200.0, 0.0)).it()).unwrap();

    stage.set_bot_goal(bot, Vec2::new(225.0, 0.0)).unwrap();
    assert_eq!(stage.bot_state(bot).unwrap().label, PathLabel::Explore);

    let report = stage.step(DT).unwrap();
    assert_eq!(report.lost, vec![bot]);
    assert_eq!(report.decision_errors, 0);
    let state = stage.bot_state(bot).unwrap();
    assert_eq!(state.label, PathLabel::Lost);
    assert!(state.path.is_empty());
    assert!(state.last_lost_at.is_some());
    let view = stage.update(bot).unwrap();
    assert!(!view.debug_circles.is_empty());

    let report = stage.step(DT).unwrap();
    assert!(report.lost.is_empty());
    assert_eq!(stage.bot_state(bot).unwrap().label, PathLabel::Explore);
}

#[test]
fn bots_keep_running_on_generated_arena() {
    let layout = MapGenerator::generate_arena(9);
    let spawns = layout.character_spawns.clone();
    let mut stage = Stage::new(SimConfig::default(), layout).expect("stage");
    let mut bots = tag_arena_core::systems::bots::BotManager::new(6);
    let ids = bots.initialize_bots(&mut stage, &spawns).unwrap();
    assert_eq!(ids.len(), 6);
    assert_eq!(bots.spawned(), ids.as_slice());

    let mut errors = 0;
    for _ in 0..240 {
        errors += stage.step(DT).unwrap().decision_errors;
    }
    assert_eq!(errors, 0);
    assert_eq!(stage.agents().filter(|a| a.role.is_it()).count(), 1);
    for id in ids {
        let p = stage.agent_position(id).unwrap();
        assert!(stage.bounds().contains(p), "bot {} escaped to {:?}", id, p);
    }
}
