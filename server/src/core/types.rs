// tag_arena/server/src/core/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use super::constants::MAX_RADIUS_CLASS;

/// Simulation clock in milliseconds since the stage was created.
pub type Millis = u64;

/// Index of a waypoint inside its radius class. Contiguous from zero.
pub type WaypointId = usize;

// --- Handles ---

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "{}"), self.0)
            }
        }
    };
}

handle!(
    /// Stable arena handle for a character. Never reused within a stage.
    AgentId, "agent#"
);
handle!(
    /// Handle for a static wall inside the obstacle index.
    ObstacleId, "wall#"
);
handle!(PropId, "prop#");
handle!(
    /// Body handle issued by the physics engine.
    BodyHandle, "body#"
);

// --- Basic Geometric Types ---

/// 2D point / vector. Immutable value type; every operation returns a new value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    pub fn from_angle(angle: f64) -> Self {
        Vec2::new(angle.cos(), angle.sin())
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z component of the 3D cross product.
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length_sq(self) -> f64 {
        self.dot(self)
    }

    pub fn length(self) -> f64 {
        self.length_sq().sqrt()
    }

    pub fn distance(self, other: Vec2) -> f64 {
        (other - self).length()
    }

    pub fn distance_sq(self, other: Vec2) -> f64 {
        (other - self).length_sq()
    }

    /// Unit vector, or zero for a (near) zero-length input.
    pub fn normalize(self) -> Vec2 {
        let len = self.length();
        if !len.is_finite() || len < f64::EPSILON {
            return Vec2::ZERO;
        }
        Vec2::new(self.x / len, self.y / len)
    }

    /// Counter-clockwise perpendicular.
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn lerp(self, other: Vec2, t: f64) -> Vec2 {
        self + (other - self) * t
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    fn div(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

// --- Radius classes ---

/// Agent size bucket: `ceil(radius)` capped at [`MAX_RADIUS_CLASS`]. Each class owns
/// its own navigation graph because reachability depends on the footprint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RadiusClass(pub u8);

impl RadiusClass {
    pub fn for_radius(radius: f64) -> Self {
        let bucket = radius.ceil().clamp(1.0, MAX_RADIUS_CLASS as f64);
        RadiusClass(bucket as u8)
    }

    /// Radius every member of the class fits inside.
    pub fn radius(self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for RadiusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r={}", self.0)
    }
}

// --- Roles & labels ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    It,
    NotIt,
}

impl Role {
    pub fn is_it(self) -> bool {
        matches!(self, Role::It)
    }

    pub fn opposite(self) -> Role {
        match self {
            Role::It => Role::NotIt,
            Role::NotIt => Role::It,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathLabel {
    Reset,
    Unblock,
    Pursue,
    Flee,
    Explore,
    Lost,
}

// --- Input ---

/// Per-connection input written into a character once per tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlState {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub select: bool,
}

impl ControlState {
    /// Unnormalised movement direction implied by the arrow keys. y grows downward.
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.up { dir.y -= 1.0; }
        if self.down { dir.y += 1.0; }
        if self.left { dir.x -= 1.0; }
        if self.right { dir.x += 1.0; }
        dir
    }
}

// --- Debug records ---

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DebugColor {
    Path,
    Exploration,
    Sightline,
    Lost,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugLine {
    pub from: Vec2,
    pub to: Vec2,
    pub color: DebugColor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugCircle {
    pub center: Vec2,
    pub radius: f64,
    pub color: DebugColor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugLabel {
    pub at: Vec2,
    pub text: String,
}

// --- View handed to the transport layer ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisibleShape {
    Wall { id: ObstacleId, vertices: Vec<Vec2> },
    Pillar { id: ObstacleId, center: Vec2, radius: f64 },
    Prop { id: PropId, center: Vec2, radius: f64 },
    Character { id: AgentId, body: BodyHandle, center: Vec2, radius: f64, it: bool, ready: bool },
}

/// Per-agent frame payload: what the agent can see plus this tick's debug overlay.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub visible_shapes: Vec<VisibleShape>,
    pub debug_lines: Vec<DebugLine>,
    pub debug_circles: Vec<DebugCircle>,
    pub debug_labels: Vec<DebugLabel>,
    pub focus_body_id: Option<BodyHandle>,
}
