// tag_arena/server/src/systems/physics/mod.rs
//! Boundary to the rigid-body engine. The simulation only needs body bookkeeping, forces and
//! a contact stream; `KinematicPhysics` is the in-process engine used by the binary and tests.

pub mod collision;
pub mod kinematic;

use crate::core::types::{BodyHandle, Vec2};

pub use kinematic::KinematicPhysics;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    Character,
    Prop,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub radius: f64,
    pub mass: f64,
    pub linear_damping: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    /// First step the two bodies touch.
    Start,
    /// Still touching on a later step.
    Active,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CollisionEvent {
    pub phase: ContactPhase,
    pub a: BodyHandle,
    pub b: BodyHandle,
}

impl CollisionEvent {
    pub fn involves(&self, body: BodyHandle) -> bool {
        self.a == body || self.b == body
    }

    pub fn other(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.a == body {
            Some(self.b)
        } else if self.b == body {
            Some(self.a)
        } else {
            None
        }
    }
}

pub trait PhysicsEngine: Send {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;
    /// Returns false when the handle was unknown or already destroyed.
    fn destroy_body(&mut self, body: BodyHandle) -> bool;
    fn position(&self, body: BodyHandle) -> Option<Vec2>;
    fn velocity(&self, body: BodyHandle) -> Option<Vec2>;
    fn set_position(&mut self, body: BodyHandle, position: Vec2);
    /// Accumulates a force for the next step only.
    fn apply_force(&mut self, body: BodyHandle, force: Vec2);
    /// Integrates `dt` seconds and reports body-body contacts.
    fn step(&mut self, dt: f64) -> Vec<CollisionEvent>;
}
