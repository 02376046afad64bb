// tag_arena/server/src/systems/ai/exploration.rs
use ahash::AHashSet;

use crate::core::geometry::angle_between;
use crate::core::types::{AgentId, Millis, RadiusClass, Vec2, WaypointId};
use crate::entities::agent::AgentSnapshot;
use crate::world::obstacle_index::ObstacleSet;
use crate::world::raycast::VisionRect;
use crate::world::waypoints::NavGraph;

/// A bot's memory of one waypoint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Heading {
    pub waypoint_id: WaypointId,
    pub last_visited_time: Millis,
    pub distance_to_agent: f64,
    pub explored: bool,
    /// Seen through a single sightline, or by exactly one other character.
    pub tight: bool,
}

/// One bot's headings for one radius class, indexed by waypoint id.
#[derive(Clone, Debug)]
pub struct HeadingTable {
    radius_class: RadiusClass,
    headings: Vec<Heading>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExploreChoice {
    pub waypoint_id: WaypointId,
    pub position: Vec2,
    pub tight: bool,
}

impl HeadingTable {
    pub fn new(graph: &NavGraph, origin: Vec2) -> Self {
        let mut table = HeadingTable {
            radius_class: graph.radius_class(),
            headings: Vec::with_capacity(graph.len()),
        };
        table.reset(graph, origin);
        table
    }

    /// Forget everything: unexplored, never visited, distances measured from `origin`.
    pub fn reset(&mut self, graph: &NavGraph, origin: Vec2) {
        self.radius_class = graph.radius_class();
        self.headings = graph
            .waypoints()
            .iter()
            .map(|w| Heading {
                waypoint_id: w.id,
                last_visited_time: 0,
                distance_to_agent: w.position.distance(origin),
                explored: false,
                tight: false,
            })
            .collect();
    }

    pub fn radius_class(&self) -> RadiusClass {
        self.radius_class
    }

    pub fn get(&self, id: WaypointId) -> Option<&Heading> {
        self.headings.get(id)
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }

    pub fn explored_count(&self) -> usize {
        self.headings.iter().filter(|h| h.explored).count()
    }

    /// Stamps waypoints within `arrive_radius` of `position` as visited at `now`.
    pub fn mark_visited(&mut self, graph: &NavGraph, position: Vec2, arrive_radius: f64, now: Millis) -> usize {
        let mut stamped = 0;
        for (heading, waypoint) in self.headings.iter_mut().zip(graph.waypoints()) {
            if waypoint.position.distance(position) <= arrive_radius {
                heading.last_visited_time = now;
                heading.explored = true;
                stamped += 1;
            }
        }
        stamped
    }

    /// Least recently visited waypoint in view, farthest first on ties. Tight waypoints,
    /// when there are any, are the only candidates.
    pub fn choose_explore_target(
        &mut self,
        graph: &NavGraph,
        me: &AgentSnapshot,
        others: &[AgentSnapshot],
        obstacles: &ObstacleSet<'_>,
        vision: VisionRect,
    ) -> Option<ExploreChoice> {
        let area = vision.around(me.position);
        let mut candidates: Vec<WaypointId> = Vec::new();

        for waypoint in graph.waypoints_within(area) {
            let clear_casts = obstacles.clear_cast_count(me.position, waypoint.position, me.radius);
            let watchers = if clear_casts > 0 {
                watchers_of(waypoint.position, me.id, others, obstacles, vision)
            } else {
                0
            };
            let heading = &mut self.headings[waypoint.id];
            heading.distance_to_agent = waypoint.position.distance(me.position);
            if clear_casts == 0 {
                heading.tight = false;
                continue;
            }
            heading.tight = clear_casts == 1 || watchers == 1;
            candidates.push(waypoint.id);
        }

        if candidates.iter().any(|id| self.headings[*id].tight) {
            candidates.retain(|id| self.headings[*id].tight);
        }

        let best = candidates.into_iter().min_by(|a, b| {
            let (ha, hb) = (&self.headings[*a], &self.headings[*b]);
            ha.last_visited_time
                .cmp(&hb.last_visited_time)
                .then_with(|| hb.distance_to_agent.total_cmp(&ha.distance_to_agent))
        })?;

        Some(ExploreChoice {
            waypoint_id: best,
            position: graph.position(best),
            tight: self.headings[best].tight,
        })
    }
}

/// Picks an escape waypoint: untried, not too close, directly reachable, and pointing as far
/// away from the threat's bearing as possible. Marks the pick as tried.
pub fn choose_unblock_target(
    graph: &NavGraph,
    me: &AgentSnapshot,
    threat: Vec2,
    too_close_radius: f64,
    attempted: &mut AHashSet<WaypointId>,
    obstacles: &ObstacleSet<'_>,
) -> Option<WaypointId> {
    let threat_bearing = (threat - me.position).angle();
    let pick = graph
        .waypoints()
        .iter()
        .filter(|w| !attempted.contains(&w.id))
        .filter(|w| w.position.distance(me.position) > too_close_radius)
        .filter(|w| obstacles.corridor_clear(me.position, w.position, me.radius))
        .map(|w| (w.id, angle_between((w.position - me.position).angle(), threat_bearing)))
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)?;
    attempted.insert(pick);
    Some(pick)
}

/// How many other characters can see `point` from inside their own fog rectangle. A body
/// poking out past a corner counts, so any one clear body cast is enough.
pub fn watchers_of(point: Vec2, me: AgentId, others: &[AgentSnapshot], obstacles: &ObstacleSet<'_>, vision: VisionRect) -> usize {
    others
        .iter()
        .filter(|o| o.id != me)
        .filter(|o| vision.contains(o.position, point))
        .filter(|o| obstacles.corridor_shown(o.position, point, o.radius))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BodyHandle, ObstacleId, Role};
    use crate::world::obstacle::{BodyRef, Obstacle};
    use crate::world::obstacle_index::ObstacleIndex;

    fn snapshot(id: u32, position: Vec2) -> AgentSnapshot {
        AgentSnapshot {
            id: AgentId(id),
            body: BodyHandle(id),
            position,
            velocity: Vec2::ZERO,
            radius: 16.0,
            role: Role::NotIt,
            ready: true,
        }
    }

    fn vision() -> VisionRect {
        VisionRect { half_width: 480.0, half_height: 270.0 }
    }

    fn graph(walls: &ObstacleIndex, positions: Vec<Vec2>) -> NavGraph {
        NavGraph::from_positions(RadiusClass(16), positions, walls).unwrap()
    }

    #[test]
    fn explore_prefers_stale_then_far() {
        let walls = ObstacleIndex::new(Vec::new());
        let g = graph(&walls, vec![Vec2::new(100.0, 0.0), Vec2::new(300.0, 0.0), Vec2::new(-200.0, 0.0)]);
        let set = ObstacleSet::walls_only(&walls);
        let me = snapshot(0, Vec2::ZERO);
        let mut table = HeadingTable::new(&g, me.position);

        let first = table.choose_explore_target(&g, &me, &[], &set, vision()).unwrap();
        assert_eq!(first.waypoint_id, 1);

        table.mark_visited(&g, Vec2::new(300.0, 0.0), 12.0, 500);
        let second = table.choose_explore_target(&g, &me, &[], &set, vision()).unwrap();
        assert_eq!(second.waypoint_id, 2);
        assert!(table.get(1).unwrap().explored);
        assert_eq!(table.explored_count(), 1);
    }

    #[test]
    fn tight_waypoints_win() {
        // Waypoint 1 hides behind a wall that leaves only one side cast open.
        let walls = ObstacleIndex::new(vec![Obstacle::rect(
            BodyRef::Wall(ObstacleId(0)),
            95.0,
            -5.0,
            10.0,
            105.0,
        )]);
        let g = graph(&walls, vec![Vec2::new(-300.0, 0.0), Vec2::new(200.0, 0.0)]);
        let set = ObstacleSet::walls_only(&walls);
        let me = snapshot(0, Vec2::ZERO);
        let mut table = HeadingTable::new(&g, me.position);
        let pick = table.choose_explore_target(&g, &me, &[], &set, vision()).unwrap();
        assert_eq!(pick.waypoint_id, 1);
        assert!(pick.tight);
    }

    #[test]
    fn unblock_turns_away_from_threat() {
        let walls = ObstacleIndex::new(Vec::new());
        let g = graph(&walls, vec![Vec2::new(100.0, 0.0), Vec2::new(-100.0, 10.0), Vec2::new(0.0, 30.0)]);
        let set = ObstacleSet::walls_only(&walls);
        let me = snapshot(0, Vec2::ZERO);
        let mut attempted = AHashSet::new();

        let first = choose_unblock_target(&g, &me, Vec2::new(200.0, 0.0), 60.0, &mut attempted, &set);
        assert_eq!(first, Some(1));
        let second = choose_unblock_target(&g, &me, Vec2::new(200.0, 0.0), 60.0, &mut attempted, &set);
        assert_eq!(second, Some(0));
        assert_eq!(choose_unblock_target(&g, &me, Vec2::new(200.0, 0.0), 60.0, &mut attempted, &set), None);
    }

    #[test]
    fn watchers_count_clear_lines_only() {
        let walls = ObstacleIndex::new(vec![Obstacle::rect(BodyRef::Wall(ObstacleId(0)), 40.0, -50.0, 10.0, 100.0)]);
        let set = ObstacleSet::walls_only(&walls);
        let others = [snapshot(1, Vec2::new(0.0, 0.0)), snapshot(2, Vec2::new(200.0, 0.0))];
        assert_eq!(watchers_of(Vec2::new(100.0, 0.0), AgentId(9), &others, &set, vision()), 1);
    }

    #[test]
    fn watcher_peeking_past_a_corner_counts() {
        // Centre line hits the wall; the upper body cast passes above it.
        let walls = ObstacleIndex::new(vec![Obstacle::rect(BodyRef::Wall(ObstacleId(0)), 40.0, -50.0, 10.0, 55.0)]);
        let set = ObstacleSet::walls_only(&walls);
        let others = [snapshot(1, Vec2::ZERO)];
        assert!(!set.segment_clear(Vec2::ZERO, Vec2::new(100.0, 0.0)));
        assert_eq!(watchers_of(Vec2::new(100.0, 0.0), AgentId(9), &others, &set, vision()), 1);
    }
}
