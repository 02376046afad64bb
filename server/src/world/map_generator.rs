// tag_arena/server/src/world/map_generator.rs
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::info;

use crate::core::constants::*;
use crate::core::geometry::Aabb;
use crate::core::types::{ObstacleId, Vec2};
use crate::world::obstacle::{BodyRef, Obstacle};

/// Everything a stage needs from a map: bounds, static walls and spawn points.
#[derive(Debug, Clone)]
pub struct MapLayout {
    pub bounds: Aabb,
    pub walls: Vec<Obstacle>,
    pub prop_spawns: Vec<Vec2>,
    pub character_spawns: Vec<Vec2>,
}

impl MapLayout {
    /// Bordered empty field.
    pub fn open(bounds: Aabb) -> Self {
        let mut ids = WallIds::default();
        let walls = MapGenerator::create_border_walls(bounds, &mut ids);
        let character_spawns = vec![bounds.center()];
        MapLayout {
            bounds,
            walls,
            prop_spawns: Vec::new(),
            character_spawns,
        }
    }

    /// Same bounds and walls with no border. Useful for hand-built test maps.
    pub fn bare(bounds: Aabb, walls: Vec<Obstacle>) -> Self {
        MapLayout {
            bounds,
            walls,
            prop_spawns: Vec::new(),
            character_spawns: vec![bounds.center()],
        }
    }

    /// True when a disc of `radius` at `p` is inside the bounds and clear of every wall.
    pub fn is_open(&self, p: Vec2, radius: f64) -> bool {
        self.bounds.shrink(radius).contains(p) && self.walls.iter().all(|w| w.distance_to(p) >= radius)
    }
}

#[derive(Default)]
struct WallIds(u32);

impl WallIds {
    fn next(&mut self) -> BodyRef {
        let id = ObstacleId(self.0);
        self.0 += 1;
        BodyRef::Wall(id)
    }
}

pub struct MapGenerator;

impl MapGenerator {
    pub fn world_bounds() -> Aabb {
        Aabb::new(Vec2::new(WORLD_MIN_X, WORLD_MIN_Y), Vec2::new(WORLD_MAX_X, WORLD_MAX_Y))
    }

    /// Deterministic arena for `seed`: border, central pillars, scattered crates and
    /// columns, then prop and character spawns on open ground.
    pub fn generate_arena(seed: u64) -> MapLayout {
        let bounds = Self::world_bounds();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut ids = WallIds::default();

        let mut walls = Vec::new();
        walls.extend(Self::create_border_walls(bounds, &mut ids));
        walls.extend(Self::create_central_pillars(&mut ids));
        walls.extend(Self::create_lane_dividers(&mut ids));
        walls.extend(Self::create_crates(&mut rng, &mut ids, &walls));
        walls.extend(Self::create_columns(&mut rng, &mut ids, &walls));

        let mut layout = MapLayout {
            bounds,
            walls,
            prop_spawns: Vec::new(),
            character_spawns: Vec::new(),
        };
        layout.prop_spawns = Self::pick_open_points(&layout, &mut rng, 10, PROP_RADIUS + CHARACTER_RADIUS);
        layout.character_spawns = Self::character_spawn_ring(&layout);

        info!(
            "Generated arena (seed {:#x}): {} walls, {} prop spawns, {} character spawns",
            seed,
            layout.walls.len(),
            layout.prop_spawns.len(),
            layout.character_spawns.len()
        );
        layout
    }

    fn create_border_walls(bounds: Aabb, ids: &mut WallIds) -> Vec<Obstacle> {
        let t = BORDER_WALL_THICKNESS;
        let (min, max) = (bounds.min, bounds.max);
        vec![
            Obstacle::rect(ids.next(), min.x, min.y, bounds.width(), t),
            Obstacle::rect(ids.next(), min.x, max.y - t, bounds.width(), t),
            Obstacle::rect(ids.next(), min.x, min.y, t, bounds.height()),
            Obstacle::rect(ids.next(), max.x - t, min.y, t, bounds.height()),
        ]
    }

    fn create_central_pillars(ids: &mut WallIds) -> Vec<Obstacle> {
        let offset = 160.0;
        let size = 60.0;
        [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)]
            .iter()
            .map(|(sx, sy)| {
                Obstacle::rect(
                    ids.next(),
                    sx * offset - size / 2.0,
                    sy * offset - size / 2.0,
                    size,
                    size,
                )
            })
            .collect()
    }

    fn create_lane_dividers(ids: &mut WallIds) -> Vec<Obstacle> {
        let thickness = 15.0;
        let top = WORLD_MIN_Y / 2.5;
        let bottom = WORLD_MAX_Y / 2.5;
        vec![
            Obstacle::rect(ids.next(), WORLD_MIN_X + 250.0, top, 350.0, thickness),
            Obstacle::rect(ids.next(), WORLD_MAX_X - 600.0, top, 350.0, thickness),
            Obstacle::rect(ids.next(), WORLD_MIN_X + 250.0, bottom, 350.0, thickness),
            Obstacle::rect(ids.next(), WORLD_MAX_X - 600.0, bottom, 350.0, thickness),
        ]
    }

    fn create_crates(rng: &mut impl Rng, ids: &mut WallIds, existing: &[Obstacle]) -> Vec<Obstacle> {
        let mut crates = Vec::new();
        for _ in 0..8 {
            let center = Vec2::new(
                rng.gen_range(WORLD_MIN_X + 150.0..WORLD_MAX_X - 150.0),
                rng.gen_range(WORLD_MIN_Y + 150.0..WORLD_MAX_Y - 150.0),
            );
            if center.length() < 260.0 {
                continue;
            }
            let half_w = rng.gen_range(20.0..45.0);
            let half_h = rng.gen_range(12.0..25.0);
            let angle = rng.gen_range(-PI / 4.0..PI / 4.0);
            let spacing = half_w + 3.0 * CHARACTER_RADIUS;
            if Self::crowded(center, spacing, existing.iter().chain(crates.iter())) {
                continue;
            }
            crates.push(Obstacle::rotated_rect(ids.next(), center, half_w, half_h, angle));
        }
        crates
    }

    fn create_columns(rng: &mut impl Rng, ids: &mut WallIds, existing: &[Obstacle]) -> Vec<Obstacle> {
        let mut columns = Vec::new();
        for _ in 0..5 {
            let center = Vec2::new(
                rng.gen_range(WORLD_MIN_X + 200.0..WORLD_MAX_X - 200.0),
                rng.gen_range(WORLD_MIN_Y + 200.0..WORLD_MAX_Y - 200.0),
            );
            let radius = rng.gen_range(18.0..32.0);
            if Self::crowded(center, radius + 3.0 * CHARACTER_RADIUS, existing.iter().chain(columns.iter())) {
                continue;
            }
            columns.push(Obstacle::circle(ids.next(), center, radius));
        }
        columns
    }

    fn crowded<'a>(center: Vec2, spacing: f64, mut walls: impl Iterator<Item = &'a Obstacle>) -> bool {
        walls.any(|w| w.distance_to(center) < spacing)
    }

    fn pick_open_points(layout: &MapLayout, rng: &mut impl Rng, count: usize, clearance: f64) -> Vec<Vec2> {
        let mut points: Vec<Vec2> = Vec::with_capacity(count);
        let inner = layout.bounds.shrink(BORDER_WALL_THICKNESS + clearance);
        for _ in 0..count * 20 {
            if points.len() == count {
                break;
            }
            let p = Vec2::new(
                rng.gen_range(inner.min.x..inner.max.x),
                rng.gen_range(inner.min.y..inner.max.y),
            );
            if layout.is_open(p, clearance) && points.iter().all(|q| q.distance(p) > 2.0 * clearance) {
                points.push(p);
            }
        }
        points
    }

    /// Spawns evenly around the arena, nudged inward until they are on open ground.
    fn character_spawn_ring(layout: &MapLayout) -> Vec<Vec2> {
        let clearance = CHARACTER_RADIUS + WAYPOINT_MARGIN;
        let half_w = layout.bounds.width() * 0.4;
        let half_h = layout.bounds.height() * 0.4;
        let center = layout.bounds.center();
        (0..12)
            .filter_map(|i| {
                let dir = Vec2::from_angle(2.0 * PI * i as f64 / 12.0);
                (0..8)
                    .map(|step| 1.0 - step as f64 * 0.1)
                    .map(|scale| center + Vec2::new(dir.x * half_w, dir.y * half_h) * scale)
                    .find(|p| layout.is_open(*p, clearance))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_map() {
        let a = MapGenerator::generate_arena(7);
        let b = MapGenerator::generate_arena(7);
        assert_eq!(a.walls, b.walls);
        assert_eq!(a.prop_spawns, b.prop_spawns);
    }

    #[test]
    fn spawns_are_on_open_ground() {
        let layout = MapGenerator::generate_arena(42);
        assert!(layout.walls.len() >= 12);
        assert!(!layout.character_spawns.is_empty());
        for p in &layout.character_spawns {
            assert!(layout.is_open(*p, CHARACTER_RADIUS));
        }
        for p in &layout.prop_spawns {
            assert!(layout.is_open(*p, PROP_RADIUS));
        }
    }

    #[test]
    fn open_layout_has_only_borders() {
        let layout = MapLayout::open(MapGenerator::world_bounds());
        assert_eq!(layout.walls.len(), 4);
        assert!(layout.is_open(Vec2::ZERO, CHARACTER_RADIUS));
    }
}
