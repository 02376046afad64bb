// tag_arena/server/src/world/obstacle_index.rs
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use crate::core::geometry::Aabb;
use crate::core::types::{ObstacleId, Vec2};
use crate::world::obstacle::{BodyRef, Obstacle};
use crate::world::raycast;

#[derive(Clone, Debug)]
struct IndexedObstacle {
    slot: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedObstacle {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(b: Aabb) -> AABB<[f64; 2]> {
    AABB::from_corners([b.min.x, b.min.y], [b.max.x, b.max.y])
}

/// Broad phase over the static walls of a map. Walls never move, so the tree is bulk loaded
/// once and only read afterwards.
pub struct ObstacleIndex {
    obstacles: Vec<Obstacle>,
    rtree: RTree<IndexedObstacle>,
}

impl ObstacleIndex {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        let entries: Vec<IndexedObstacle> = obstacles
            .iter()
            .enumerate()
            .map(|(slot, o)| IndexedObstacle {
                slot,
                envelope: envelope_of(o.bounds()),
            })
            .collect();
        let rtree = RTree::bulk_load(entries);
        debug!("Obstacle index built with {} obstacles", rtree.size());
        ObstacleIndex { obstacles, rtree }
    }

    /// Obstacles whose bounding box touches `area`.
    pub fn within(&self, area: Aabb) -> Vec<&Obstacle> {
        let mut slots: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&envelope_of(area))
            .map(|entry| entry.slot)
            .collect();
        // Stable order keeps raycast results independent of tree layout.
        slots.sort_unstable();
        slots.into_iter().map(|slot| &self.obstacles[slot]).collect()
    }

    /// Candidates for a cast along `start -> end`, padded for body-width corridors.
    pub fn along(&self, start: Vec2, end: Vec2, pad: f64) -> Vec<&Obstacle> {
        self.within(Aabb::new(start, end).expand(pad.max(1.0)))
    }

    pub fn all(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn get(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.iter().find(|o| o.body == BodyRef::Wall(id))
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }
}

/// Static walls plus this tick's prop obstacles, queried together.
#[derive(Clone, Copy)]
pub struct ObstacleSet<'a> {
    pub walls: &'a ObstacleIndex,
    pub props: &'a [Obstacle],
}

impl<'a> ObstacleSet<'a> {
    pub fn new(walls: &'a ObstacleIndex, props: &'a [Obstacle]) -> Self {
        ObstacleSet { walls, props }
    }

    pub fn walls_only(walls: &'a ObstacleIndex) -> Self {
        ObstacleSet { walls, props: &[] }
    }

    pub fn within(&self, area: Aabb) -> Vec<&'a Obstacle> {
        let mut found = self.walls.within(area);
        found.extend(self.props.iter().filter(|p| p.bounds().intersects(&area)));
        found
    }

    pub fn along(&self, start: Vec2, end: Vec2, pad: f64) -> Vec<&'a Obstacle> {
        self.within(Aabb::new(start, end).expand(pad.max(1.0)))
    }

    pub fn segment_clear(&self, start: Vec2, end: Vec2) -> bool {
        raycast::segment_clear(start, end, &self.along(start, end, 1.0))
    }

    pub fn corridor_clear(&self, start: Vec2, end: Vec2, radius: f64) -> bool {
        raycast::corridor_clear(start, end, radius, &self.along(start, end, radius))
    }

    pub fn corridor_shown(&self, start: Vec2, end: Vec2, radius: f64) -> bool {
        raycast::corridor_shown(start, end, radius, &self.along(start, end, radius))
    }

    pub fn clear_cast_count(&self, start: Vec2, end: Vec2, radius: f64) -> usize {
        raycast::clear_cast_count(start, end, radius, &self.along(start, end, radius))
    }

    pub fn circle_shown(&self, start: Vec2, start_radius: f64, end: Vec2, end_radius: f64) -> bool {
        let pad = start_radius.max(end_radius);
        raycast::circle_shown(start, start_radius, end, end_radius, &self.along(start, end, pad))
    }
}
