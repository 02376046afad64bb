// tag_arena/server/src/lib.rs

pub mod core;
pub mod entities;
pub mod operational;
pub mod server;
pub mod systems;
pub mod world;

pub use crate::core::config::SimConfig;
pub use crate::core::error::{SimError, SimResult};
pub use crate::server::instance::Stage;
