// tag_arena/server/src/world/raycast.rs
//! Line-of-sight and corridor casts against an explicit obstacle set.
//!
//! Every function here is pure: the obstacle slice is passed in by the caller (usually a
//! broad-phase query from [`ObstacleIndex`](crate::world::obstacle_index::ObstacleIndex)
//! plus this tick's prop obstacles). Accepts `&[Obstacle]` and `&[&Obstacle]` alike.

use metrics::counter;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::borrow::Borrow;

use crate::core::config::VisionConfig;
use crate::core::geometry::{interval_hits_open_segment, Aabb};
use crate::core::types::Vec2;
use crate::world::obstacle::{BodyRef, Obstacle};

const ZERO_LENGTH_SQ: f64 = 1e-18;

type Casts = SmallVec<[(Vec2, Vec2); 3]>;

/// Fog-of-war window, centred on whoever is looking.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisionRect {
    pub half_width: f64,
    pub half_height: f64,
}

impl VisionRect {
    pub fn around(&self, center: Vec2) -> Aabb {
        Aabb::from_center(center, self.half_width, self.half_height)
    }

    pub fn contains(&self, origin: Vec2, p: Vec2) -> bool {
        (p.x - origin.x).abs() <= self.half_width && (p.y - origin.y).abs() <= self.half_height
    }
}

impl From<&VisionConfig> for VisionRect {
    fn from(config: &VisionConfig) -> Self {
        VisionRect {
            half_width: config.half_width,
            half_height: config.half_height,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    pub entry_point: Vec2,
    pub exit_point: Option<Vec2>,
    pub hit_body: Option<BodyRef>,
}

impl RayHit {
    fn miss(end: Vec2) -> Self {
        RayHit {
            entry_point: end,
            exit_point: None,
            hit_body: None,
        }
    }
}

fn is_zero_length(start: Vec2, end: Vec2) -> bool {
    start.distance_sq(end) < ZERO_LENGTH_SQ
}

/// True iff no obstacle overlaps the open segment `start -> end`.
pub fn segment_clear<O: Borrow<Obstacle>>(start: Vec2, end: Vec2, obstacles: &[O]) -> bool {
    counter!("arena_raycasts_total").increment(1);
    if is_zero_length(start, end) {
        return true;
    }
    !obstacles.iter().any(|o| o.borrow().blocks_segment(start, end))
}

/// Centreline plus two casts offset sideways by `start_offset` / `end_offset`.
fn side_casts(start: Vec2, end: Vec2, start_offset: f64, end_offset: f64) -> Casts {
    let side = (end - start).normalize().perp();
    let mut casts = Casts::new();
    casts.push((start, end));
    casts.push((start + side * start_offset, end + side * end_offset));
    casts.push((start - side * start_offset, end - side * end_offset));
    casts
}

fn body_casts(start: Vec2, end: Vec2, radius: f64) -> Casts {
    let offset = (radius - 1.0).max(0.0);
    side_casts(start, end, offset, offset)
}

/// Movement feasibility for an agent of `radius`: all three body casts must be clear.
pub fn corridor_clear<O: Borrow<Obstacle>>(start: Vec2, end: Vec2, radius: f64, obstacles: &[O]) -> bool {
    if is_zero_length(start, end) {
        return true;
    }
    body_casts(start, end, radius)
        .iter()
        .all(|(a, b)| segment_clear(*a, *b, obstacles))
}

/// Visibility variant of [`corridor_clear`]: any one clear cast is enough.
pub fn corridor_shown<O: Borrow<Obstacle>>(start: Vec2, end: Vec2, radius: f64, obstacles: &[O]) -> bool {
    if is_zero_length(start, end) {
        return true;
    }
    body_casts(start, end, radius)
        .iter()
        .any(|(a, b)| segment_clear(*a, *b, obstacles))
}

/// How many of the three body casts are clear. `1` marks a tight sightline.
pub fn clear_cast_count<O: Borrow<Obstacle>>(start: Vec2, end: Vec2, radius: f64, obstacles: &[O]) -> usize {
    if is_zero_length(start, end) {
        return 3;
    }
    body_casts(start, end, radius)
        .iter()
        .filter(|(a, b)| segment_clear(*a, *b, obstacles))
        .count()
}

/// Circle-to-circle visibility: centre cast plus left and right tangent casts, each end
/// offset by its own radius. Any clear cast means the discs can see each other.
pub fn circle_shown<O: Borrow<Obstacle>>(
    start: Vec2,
    start_radius: f64,
    end: Vec2,
    end_radius: f64,
    obstacles: &[O],
) -> bool {
    if is_zero_length(start, end) {
        return true;
    }
    side_casts(start, end, start_radius, end_radius)
        .iter()
        .any(|(a, b)| segment_clear(*a, *b, obstacles))
}

/// Casts a ray and reports where it first enters an obstacle. Entry and exit come from a
/// slab test on the closest obstacle's bounding box; hits outside the fog-of-war window
/// centred on `start` are reported as a clean miss ending at `end`.
pub fn nearest_hit<O: Borrow<Obstacle>>(start: Vec2, end: Vec2, obstacles: &[O], vision: VisionRect) -> RayHit {
    counter!("arena_raycasts_total").increment(1);
    if is_zero_length(start, end) {
        return RayHit::miss(end);
    }

    let closest = obstacles
        .iter()
        .map(Borrow::borrow)
        .filter_map(|o| {
            let clip = o.clip_segment(start, end);
            if interval_hits_open_segment(clip) {
                clip.map(|(t0, t1)| (t0, t1, o))
            } else {
                None
            }
        })
        .min_by(|a, b| a.0.total_cmp(&b.0));

    let Some((t0, t1, obstacle)) = closest else {
        return RayHit::miss(end);
    };

    let (t_in, t_out) = obstacle.bounds().slab_intersect(start, end).unwrap_or((t0, t1));
    let entry_point = start.lerp(end, t_in);
    if !vision.contains(start, entry_point) {
        return RayHit::miss(end);
    }
    let exit_point = (t_out < 1.0).then(|| start.lerp(end, t_out));
    RayHit {
        entry_point,
        exit_point,
        hit_body: Some(obstacle.body),
    }
}

/// Polygon visibility: the viewer looks from its centre and from both tangent points
/// (perpendicular to the direction of the polygon); one clear cast to any vertex is enough.
/// The polygon itself is excluded from the blocking set.
pub fn polygon_visible<O: Borrow<Obstacle>>(
    viewer_pos: Vec2,
    viewer_radius: f64,
    polygon: &Obstacle,
    other_obstacles: &[O],
) -> bool {
    let side = (polygon.centroid() - viewer_pos).normalize().perp() * viewer_radius;
    let viewpoints = [viewer_pos, viewer_pos + side, viewer_pos - side];
    let blockers: Vec<&Obstacle> = other_obstacles
        .iter()
        .map(Borrow::borrow)
        .filter(|o| o.body != polygon.body)
        .collect();

    polygon.vertices().iter().any(|vertex| {
        viewpoints
            .iter()
            .any(|viewpoint| segment_clear(*viewpoint, *vertex, &blockers))
    })
}
