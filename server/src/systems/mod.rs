// tag_arena/server/src/systems/mod.rs
pub mod ai;
pub mod bots;
pub mod debug_draw;
pub mod physics;
pub mod timers;
pub mod visibility;
