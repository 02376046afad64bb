// tag_arena/server/src/systems/visibility.rs
use crate::core::types::{AgentId, Vec2, VisibleShape};
use crate::entities::agent::AgentSnapshot;
use crate::world::obstacle::Obstacle;
use crate::world::obstacle_index::{ObstacleIndex, ObstacleSet};
use crate::world::raycast::VisionRect;

/// Shapes a viewer of `radius` at `viewer` can see: everything inside the fog rectangle
/// with an unobstructed line to it. The character `viewer_id` is always included.
pub fn visible_shapes(
    viewer_id: AgentId,
    viewer: Vec2,
    radius: f64,
    vision: VisionRect,
    walls: &ObstacleIndex,
    props: &[Obstacle],
    agents: &[AgentSnapshot],
) -> Vec<VisibleShape> {
    let area = vision.around(viewer);
    let set = ObstacleSet::new(walls, props);
    let nearby = set.within(area);

    let mut shapes: Vec<VisibleShape> = nearby
        .iter()
        .filter(|o| o.visible_from(viewer, radius, &nearby))
        .map(|o| o.to_visible_shape())
        .collect();

    for agent in agents {
        if !area.contains(agent.position) {
            continue;
        }
        let is_self = agent.id == viewer_id;
        if is_self || set.circle_shown(viewer, radius, agent.position, agent.radius) {
            shapes.push(VisibleShape::Character {
                id: agent.id,
                body: agent.body,
                center: agent.position,
                radius: agent.radius,
                it: agent.role.is_it(),
                ready: agent.ready,
            });
        }
    }
    shapes
}
