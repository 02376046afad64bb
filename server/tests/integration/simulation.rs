// tag_arena/server/tests/integration/simulation.rs

use tag_arena_core::core::config::{DebugToggles, SimConfig};
use tag_arena_core::core::error::SimError;
use tag_arena_core::core::geometry::Aabb;
use tag_arena_core::core::types::{AgentId, ControlState, ObstacleId, Role, Vec2, VisibleShape};
use tag_arena_core::entities::agent::AgentSpec;
use tag_arena_core::server::instance::Stage;
use tag_arena_core::world::map_generator::MapLayout;
use tag_arena_core::world::obstacle::{BodyRef, Obstacle};

const DT: f64 = 1.0 / 60.0;

fn bounds() -> Aabb {
    Aabb::new(Vec2::new(-500.0, -400.0), Vec2::new(500.0, 400.0))
}

fn fast_rules() -> SimConfig {
    let mut config = SimConfig::default();
    config.rules.ready_delay_ms = 100;
    config.rules.prop_respawn_ms = 100;
    config
}

fn right() -> ControlState {
    ControlState { right: true, ..Default::default() }
}

#[test]
fn contact_swaps_roles_and_starts_ghost_window() {
    let mut stage = Stage::new(fast_rules(), MapLayout::open(bounds())).unwrap();
    let it = stage.add_agent(AgentSpec::player(Vec2::ZERO).it()).unwrap();
    let runner = stage.add_agent(AgentSpec::player(Vec2::new(40.0, 0.0))).unwrap();
    stage.set_controls(it, right()).unwrap();

    let mut tags = Vec::new();
    for _ in 0..120 {
        tags = stage.step(DT).unwrap().tags;
        if !tags.is_empty() {
            break;
        }
    }
    assert_eq!(tags, vec![(it, runner)]);
    stage.set_controls(it, ControlState::default()).unwrap();

    let old_it = stage.agent(it).unwrap();
    assert_eq!(old_it.role, Role::NotIt);
    assert!(!old_it.ready);
    assert_eq!(stage.agent(runner).unwrap().role, Role::It);
    assert_eq!(stage.pending_timers(), 1);

    for _ in 0..10 {
        let report = stage.step(DT).unwrap();
        assert!(report.tags.is_empty(), "no tag back while bodies stay in contact");
    }
    assert!(stage.agent(it).unwrap().ready);
    assert_eq!(stage.pending_timers(), 0);
}

#[test]
fn removal_rules() {
    let mut stage = Stage::new(SimConfig::default(), MapLayout::open(bounds())).unwrap();
    let host = stage.add_agent(AgentSpec::player(Vec2::ZERO).protected()).unwrap();
    let guest = stage.add_agent(AgentSpec::player(Vec2::new(100.0, 0.0))).unwrap();

    assert!(matches!(stage.remove_agent(host), Err(SimError::ProtectedAgent(id)) if id == host));
    stage.remove_agent(guest).unwrap();
    assert!(matches!(stage.remove_agent(guest), Err(SimError::UnknownAgent(_))));
    assert!(matches!(stage.update(AgentId(99)), Err(SimError::UnknownAgent(_))));
    assert!(matches!(stage.set_controls(guest, right()), Err(SimError::UnknownAgent(_))));
    assert_eq!(stage.agent_count(), 1);
    stage.step(DT).unwrap();
}

#[test]
fn view_respects_walls_and_fog() {
    let mut layout = MapLayout::open(bounds());
    layout
        .walls
        .push(Obstacle::rect(BodyRef::Wall(ObstacleId(100)), 100.0, -100.0, 20.0, 200.0));
    let mut stage = Stage::new(SimConfig::default(), layout).unwrap();
    let me = stage.add_agent(AgentSpec::player(Vec2::ZERO)).unwrap();
    let hidden = stage.add_agent(AgentSpec::player(Vec2::new(250.0, 0.0))).unwrap();
    let beside = stage.add_agent(AgentSpec::player(Vec2::new(-150.0, 50.0))).unwrap();

    let view = stage.update(me).unwrap();
    let seen: Vec<AgentId> = view
        .visible_shapes
        .iter()
        .filter_map(|s| match s {
            VisibleShape::Character { id, .. } => Some(*id),
            _ => None,
        })
        .collect();
    assert!(seen.contains(&me));
    assert!(seen.contains(&beside));
    assert!(!seen.contains(&hidden));
    assert!(view
        .visible_shapes
        .iter()
        .any(|s| matches!(s, VisibleShape::Wall { id, .. } if *id == ObstacleId(100))));
    assert_eq!(view.focus_body_id, Some(stage.agent(me).unwrap().body));
}

#[test]
fn debug_overlay_follows_toggles() {
    let mut stage = Stage::new(SimConfig::default(), MapLayout::open(bounds())).unwrap();
    stage.add_agent(AgentSpec::bot(Vec2::new(-100.0, 0.0)).it()).unwrap();
    let player = stage.add_agent(AgentSpec::player(Vec2::new(100.0, 0.0))).unwrap();

    stage.step(DT).unwrap();
    assert!(stage.update(player).unwrap().debug_lines.is_empty());

    stage.set_debug_toggles(DebugToggles {
        show_pathing: true,
        show_sightlines: true,
        ..Default::default()
    });
    stage.step(DT).unwrap();
    assert!(!stage.update(player).unwrap().debug_lines.is_empty());
}

#[test]
fn select_smashes_props_which_respawn() {
    let mut stage = Stage::new(fast_rules(), MapLayout::open(bounds())).unwrap();
    let prop = stage.spawn_prop(Vec2::new(60.0, 0.0));
    let smasher = stage.add_agent(AgentSpec::player(Vec2::ZERO).it()).unwrap();
    stage
        .set_controls(smasher, ControlState { right: true, select: true, ..Default::default() })
        .unwrap();

    let mut smashed = Vec::new();
    for _ in 0..120 {
        smashed = stage.step(DT).unwrap().smashed;
        if !smashed.is_empty() {
            break;
        }
    }
    assert_eq!(smashed, vec![prop]);
    assert!(!stage.prop(prop).unwrap().is_alive());
    stage.set_controls(smasher, ControlState::default()).unwrap();
    stage.step(DT).unwrap();
    assert!(stage.prop_obstacles().is_empty());

    for _ in 0..10 {
        stage.step(DT).unwrap();
    }
    assert!(stage.prop(prop).unwrap().is_alive());
    assert_eq!(stage.prop_obstacles().len(), 1);
}
