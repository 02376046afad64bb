// tag_arena/server/src/systems/physics/kinematic.rs
use ahash::AHashSet;
use tracing::trace;

use super::{BodyDesc, BodyKind, CollisionEvent, ContactPhase, PhysicsEngine};
use crate::core::geometry::{outward_normal, point_segment_distance, Aabb};
use crate::core::types::{BodyHandle, Vec2};
use crate::world::obstacle::{Obstacle, Shape};
use crate::world::obstacle_index::ObstacleIndex;

#[derive(Debug, Clone)]
struct Body {
    desc: BodyDesc,
    position: Vec2,
    velocity: Vec2,
    force: Vec2,
}

/// Force/mass integration with linear damping, circle-vs-wall push-out and circle-circle
/// separation. Good enough for steering and contact events; no rotation, no restitution.
pub struct KinematicPhysics {
    walls: ObstacleIndex,
    bodies: Vec<Option<Body>>,
    contacts: AHashSet<(BodyHandle, BodyHandle)>,
}

impl KinematicPhysics {
    pub fn new(walls: Vec<Obstacle>) -> Self {
        KinematicPhysics {
            walls: ObstacleIndex::new(walls),
            bodies: Vec::new(),
            contacts: AHashSet::new(),
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_some()).count()
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.index()).and_then(Option::as_mut)
    }

    fn integrate(body: &mut Body, dt: f64) {
        let mass = body.desc.mass.max(f64::EPSILON);
        body.velocity += body.force * (dt / mass);
        body.velocity = body.velocity * (1.0 / (1.0 + body.desc.linear_damping * dt));
        body.position += body.velocity * dt;
        body.force = Vec2::ZERO;
    }

    fn resolve_walls(walls: &ObstacleIndex, body: &mut Body) {
        let radius = body.desc.radius;
        let area = Aabb::from_center(body.position, radius, radius);
        for wall in walls.within(area) {
            if let Some(push) = push_out(wall, body.position, radius) {
                body.position += push;
                let n = push.normalize();
                let into = body.velocity.dot(n);
                if into < 0.0 {
                    body.velocity -= n * into;
                }
            }
        }
    }

    fn separate_bodies(&mut self) -> Vec<(BodyHandle, BodyHandle)> {
        let live: Vec<usize> = (0..self.bodies.len()).filter(|i| self.bodies[*i].is_some()).collect();
        let mut touching = Vec::new();
        for (n, &i) in live.iter().enumerate() {
            for &j in &live[n + 1..] {
                let (Some(a), Some(b)) = (&self.bodies[i], &self.bodies[j]) else {
                    continue;
                };
                let reach = a.desc.radius + b.desc.radius;
                let delta = b.position - a.position;
                let dist = delta.length();
                if dist >= reach {
                    continue;
                }
                touching.push((BodyHandle(i as u32), BodyHandle(j as u32)));

                // Characters overlap freely; props get shoved apart by mass ratio.
                if a.desc.kind == BodyKind::Character && b.desc.kind == BodyKind::Character {
                    continue;
                }
                let normal = if dist > f64::EPSILON { delta / dist } else { Vec2::new(1.0, 0.0) };
                let overlap = reach - dist;
                let total = a.desc.mass + b.desc.mass;
                let (share_a, share_b) = (b.desc.mass / total, a.desc.mass / total);
                if let Some(a) = self.bodies[i].as_mut() {
                    a.position -= normal * (overlap * share_a);
                }
                if let Some(b) = self.bodies[j].as_mut() {
                    b.position += normal * (overlap * share_b);
                }
            }
        }
        touching
    }
}

/// Correction that moves a circle at `p` out of `obstacle`, if they overlap.
fn push_out(obstacle: &Obstacle, p: Vec2, radius: f64) -> Option<Vec2> {
    match obstacle.shape() {
        Shape::Circle { center, radius: r } => {
            let delta = p - *center;
            let dist = delta.length();
            let reach = radius + r;
            if dist >= reach {
                return None;
            }
            let n = if dist > f64::EPSILON { delta / dist } else { Vec2::new(1.0, 0.0) };
            Some(n * (reach - dist))
        }
        Shape::Polygon { vertices } => {
            let n = vertices.len();
            let mut deepest: Option<(f64, Vec2)> = None;
            let mut inside = true;
            for i in 0..n {
                let (a, b) = (vertices[i], vertices[(i + 1) % n]);
                let normal = outward_normal(a, b);
                let s = normal.dot(p - a);
                if s > 0.0 {
                    inside = false;
                }
                if deepest.map_or(true, |(best, _)| s > best) {
                    deepest = Some((s, normal));
                }
            }
            if inside {
                let (s, normal) = deepest?;
                return Some(normal * (radius - s));
            }
            let (dist, closest) = (0..n)
                .map(|i| {
                    let (a, b) = (vertices[i], vertices[(i + 1) % n]);
                    let d = point_segment_distance(p, a, b);
                    (d, closest_on_segment(p, a, b))
                })
                .min_by(|x, y| x.0.total_cmp(&y.0))?;
            if dist >= radius || dist <= f64::EPSILON {
                return None;
            }
            Some((p - closest) / dist * (radius - dist))
        }
    }
}

fn closest_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq < f64::EPSILON {
        return a;
    }
    a + ab * ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
}

impl PhysicsEngine for KinematicPhysics {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(Some(Body {
            desc,
            position: desc.position,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
        }));
        trace!("Body {} created ({:?})", handle, desc.kind);
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) -> bool {
        let removed = self.bodies.get_mut(body.index()).and_then(Option::take).is_some();
        if removed {
            self.contacts.retain(|(a, b)| *a != body && *b != body);
        }
        removed
    }

    fn position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.index())?.as_ref().map(|b| b.position)
    }

    fn velocity(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.index())?.as_ref().map(|b| b.velocity)
    }

    fn set_position(&mut self, body: BodyHandle, position: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.position = position;
            b.velocity = Vec2::ZERO;
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec2) {
        if let Some(b) = self.body_mut(body) {
            b.force += force;
        }
    }

    fn step(&mut self, dt: f64) -> Vec<CollisionEvent> {
        for body in self.bodies.iter_mut().flatten() {
            Self::integrate(body, dt);
            Self::resolve_walls(&self.walls, body);
        }

        let touching = self.separate_bodies();
        let mut events = Vec::with_capacity(touching.len());
        let mut now_touching = AHashSet::with_capacity(touching.len());
        for pair in touching {
            let phase = if self.contacts.contains(&pair) {
                ContactPhase::Active
            } else {
                ContactPhase::Start
            };
            events.push(CollisionEvent {
                phase,
                a: pair.0,
                b: pair.1,
            });
            now_touching.insert(pair);
        }
        self.contacts = now_touching;
        events
    }
}
