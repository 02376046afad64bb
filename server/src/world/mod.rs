// tag_arena/server/src/world/mod.rs
pub mod map_generator;
pub mod obstacle;
pub mod obstacle_index;
pub mod raycast;
pub mod waypoints;

pub use map_generator::{MapGenerator, MapLayout};
pub use obstacle::{BodyRef, Obstacle, Shape};
pub use obstacle_index::{ObstacleIndex, ObstacleSet};
pub use raycast::{RayHit, VisionRect};
pub use waypoints::{NavGraph, Waypoint};
