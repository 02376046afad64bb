// tag_arena/server/src/systems/ai/path_planner.rs
//! Small route helpers shared by the decision engine.

use std::collections::VecDeque;

use crate::core::error::SimResult;
use crate::core::geometry::validate_heading;
use crate::core::types::Vec2;
use crate::world::obstacle_index::ObstacleSet;
use crate::world::waypoints::NavGraph;

/// Routes through the graph, returning the points still to visit.
pub fn plan_route(
    graph: &NavGraph,
    from: Vec2,
    radius: f64,
    goal: Vec2,
    obstacles: &ObstacleSet<'_>,
) -> Option<VecDeque<Vec2>> {
    graph
        .find_route(from, radius, goal, obstacles)
        .map(VecDeque::from)
}

/// Drops reached intermediate points. The final point is left for the arrival check.
pub fn advance_path(path: &mut VecDeque<Vec2>, position: Vec2, arrive_radius: f64) -> usize {
    let mut popped = 0;
    while path.len() > 1 && path.front().map_or(false, |p| p.distance(position) <= arrive_radius) {
        path.pop_front();
        popped += 1;
    }
    popped
}

/// Point mirrored through the enemy's predicted position: run directly away from where the
/// enemy is about to be.
pub fn flee_target(me: Vec2, enemy: Vec2, enemy_velocity: Vec2, tick_seconds: f64, extrapolation: f64) -> Vec2 {
    let predicted = enemy + enemy_velocity * (tick_seconds * extrapolation);
    me + (me - predicted)
}

/// Is the space directly behind `me`, away from `threat`, closed for a body of `radius`?
pub fn is_blocked(obstacles: &ObstacleSet<'_>, me: Vec2, radius: f64, threat: Vec2, check_distance: f64) -> bool {
    let away = (me - threat).normalize();
    if away == Vec2::ZERO {
        return false;
    }
    !obstacles.corridor_clear(me, me + away * check_distance, radius)
}

/// Heading angle toward `target`, rejecting garbage before it reaches the physics engine.
pub fn steering_heading(from: Vec2, target: Vec2) -> SimResult<Option<f64>> {
    let delta = target - from;
    if delta.length_sq() < f64::EPSILON {
        return Ok(None);
    }
    validate_heading(delta.angle()).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ObstacleId;
    use crate::world::obstacle::{BodyRef, Obstacle};
    use crate::world::obstacle_index::ObstacleIndex;

    #[test]
    fn advance_keeps_final_point() {
        let mut path: VecDeque<Vec2> = vec![Vec2::new(1.0, 0.0), Vec2::new(5.0, 0.0), Vec2::new(100.0, 0.0)].into();
        assert_eq!(advance_path(&mut path, Vec2::ZERO, 6.0), 2);
        assert_eq!(path.len(), 1);
        assert_eq!(advance_path(&mut path, Vec2::new(100.0, 0.0), 6.0), 0);
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn flee_mirrors_extrapolated_enemy() {
        let target = flee_target(Vec2::ZERO, Vec2::new(100.0, 0.0), Vec2::new(-60.0, 0.0), 1.0 / 60.0, 5.0);
        assert!((target.x + 95.0).abs() < 1e-9);
        assert_eq!(target.y, 0.0);
    }

    #[test]
    fn blocked_when_backed_against_wall() {
        let walls = ObstacleIndex::new(vec![Obstacle::rect(BodyRef::Wall(ObstacleId(0)), -40.0, -100.0, 10.0, 200.0)]);
        let set = ObstacleSet::walls_only(&walls);
        assert!(is_blocked(&set, Vec2::ZERO, 16.0, Vec2::new(100.0, 0.0), 40.0));
        assert!(!is_blocked(&set, Vec2::ZERO, 16.0, Vec2::new(-100.0, 0.0), 40.0));
    }

    #[test]
    fn heading_for_degenerate_target_is_none() {
        assert_eq!(steering_heading(Vec2::ZERO, Vec2::ZERO).unwrap(), None);
        let h = steering_heading(Vec2::ZERO, Vec2::new(0.0, 10.0)).unwrap().unwrap();
        assert!((h - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
